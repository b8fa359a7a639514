//! Building a dictionary: term blocks, the FST index, and the metadata
//! sidecar.
//!
//! Terms arrive in strictly increasing byte order. At `finish` the sorted
//! stream is folded into a prefix trie bottom-up: a prefix whose collected
//! entries reach `min_block_size` becomes its own block (indexed by the
//! FST), smaller groups are inlined into their parent with longer
//! suffixes, and blocks larger than `max_block_size` are split into floor
//! sub-blocks keyed by their leading suffix byte.

use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::dictionary::{
    BLOCKS_MAGIC, DictionaryInfo, FORMAT_VERSION, INDEX_MAGIC, OUTPUT_FLAG_HAS_TERMS,
    OUTPUT_FLAG_IS_FLOOR, OUTPUT_FLAGS_BITS, TermMeta, blocks_file_name, index_file_name,
    meta_file_name,
};
use crate::error::{Result, VerbenaError};
use crate::storage::Storage;
use crate::util::varint::encode_u64_into;

/// Block sizing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermDictionaryConfig {
    /// Minimum number of entries a prefix must collect to become its own
    /// block. Must be at least 2.
    pub min_block_size: usize,
    /// Entry count above which a block is floor-split. Must be at least
    /// `min_block_size`.
    pub max_block_size: usize,
}

impl Default for TermDictionaryConfig {
    fn default() -> Self {
        TermDictionaryConfig {
            min_block_size: 25,
            max_block_size: 48,
        }
    }
}

/// What a pending entry routes to.
enum EntryKind {
    /// A term; statistics come from the buffered term metadata.
    Term,
    /// A child block at this file pointer.
    Block { fp: u64 },
}

/// One entry of a block under construction. The entry's bytes are spelled
/// by `terms[term_ord][..end]`; the suffix written to disk is whatever
/// extends past the prefix of the block that finally owns the entry.
struct PendingEntry {
    term_ord: usize,
    end: usize,
    kind: EntryKind,
    max_version: u64,
}

struct BlockHandle {
    fp: u64,
    version_bound: u64,
}

/// Accumulates the blocks file body and the index entries during the
/// bottom-up build.
struct BlockSink {
    out: Vec<u8>,
    index_entries: Vec<(Vec<u8>, Vec<u8>)>,
    block_count: u64,
}

/// Writer for one dictionary. Buffers the sorted term stream and builds
/// all files at [`finish`](TermDictionaryWriter::finish).
pub struct TermDictionaryWriter {
    storage: Arc<dyn Storage>,
    name: String,
    config: TermDictionaryConfig,
    terms: Vec<(Vec<u8>, TermMeta)>,
    finished: bool,
}

impl std::fmt::Debug for TermDictionaryWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermDictionaryWriter")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("pending_terms", &self.terms.len())
            .field("finished", &self.finished)
            .finish()
    }
}

impl TermDictionaryWriter {
    pub fn new(
        storage: Arc<dyn Storage>,
        name: &str,
        config: TermDictionaryConfig,
    ) -> Result<Self> {
        if config.min_block_size < 2 {
            return Err(VerbenaError::invalid_argument(
                "min_block_size must be at least 2",
            ));
        }
        if config.max_block_size < config.min_block_size {
            return Err(VerbenaError::invalid_argument(
                "max_block_size must be at least min_block_size",
            ));
        }
        Ok(TermDictionaryWriter {
            storage,
            name: name.to_string(),
            config,
            terms: Vec::new(),
            finished: false,
        })
    }

    /// Buffer one term. Terms must arrive in strictly increasing byte
    /// order, with consistent statistics.
    pub fn add(&mut self, term: &[u8], meta: TermMeta) -> Result<()> {
        if self.finished {
            return Err(VerbenaError::illegal_state("writer is already finished"));
        }
        if let Some((last, _)) = self.terms.last()
            && last.as_slice() >= term
        {
            return Err(VerbenaError::invalid_argument(
                "terms must be added in strictly increasing order",
            ));
        }
        if meta.doc_freq == 0 {
            return Err(VerbenaError::invalid_argument("doc_freq must be at least 1"));
        }
        if meta.total_term_freq < meta.doc_freq as u64 {
            return Err(VerbenaError::invalid_argument(
                "total_term_freq cannot be smaller than doc_freq",
            ));
        }
        self.terms.push((term.to_vec(), meta));
        Ok(())
    }

    /// Build and persist the blocks file, the index file, and the metadata
    /// sidecar. Consumes the buffered terms.
    pub fn finish(&mut self) -> Result<DictionaryInfo> {
        if self.finished {
            return Err(VerbenaError::illegal_state("writer is already finished"));
        }
        self.finished = true;

        let mut sink = BlockSink {
            out: Vec::new(),
            index_entries: Vec::new(),
            block_count: 0,
        };
        let mut word = [0u8; 4];
        BigEndian::write_u32(&mut word, BLOCKS_MAGIC);
        sink.out.extend_from_slice(&word);
        sink.out.push(FORMAT_VERSION);

        let entries = collect_entries(&self.terms, &self.config, 0, self.terms.len(), 0, &mut sink)?;
        write_block(&self.terms, &self.config, &mut sink, 0, 0, entries)?;

        // Blocks file: payload + checksum.
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&sink.out);
        BigEndian::write_u32(&mut word, hasher.finalize());
        sink.out.extend_from_slice(&word);

        let mut out = self.storage.create_output(&blocks_file_name(&self.name))?;
        out.write_all(&sink.out)?;
        out.finish()?;

        // Index file: root frame data, FST over block prefixes, frame blob.
        let root_data = sink
            .index_entries
            .iter()
            .find(|(prefix, _)| prefix.is_empty())
            .map(|(_, data)| data.clone())
            .ok_or_else(|| VerbenaError::illegal_state("root block was not written"))?;

        sink.index_entries.sort_by(|a, b| a.0.cmp(&b.0));
        let mut frames = Vec::new();
        let mut builder = fst::MapBuilder::memory();
        for (prefix, data) in &sink.index_entries {
            let offset = frames.len() as u64;
            frames.extend_from_slice(data);
            builder.insert(prefix, offset)?;
        }
        let fst_bytes = builder.into_inner()?;

        let mut index = Vec::new();
        BigEndian::write_u32(&mut word, INDEX_MAGIC);
        index.extend_from_slice(&word);
        index.push(FORMAT_VERSION);
        encode_u64_into(&mut index, root_data.len() as u64);
        index.extend_from_slice(&root_data);
        encode_u64_into(&mut index, fst_bytes.len() as u64);
        index.extend_from_slice(&fst_bytes);
        encode_u64_into(&mut index, frames.len() as u64);
        index.extend_from_slice(&frames);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&index);
        BigEndian::write_u32(&mut word, hasher.finalize());
        index.extend_from_slice(&word);

        let mut out = self.storage.create_output(&index_file_name(&self.name))?;
        out.write_all(&index)?;
        out.finish()?;

        let info = DictionaryInfo {
            term_count: self.terms.len() as u64,
            block_count: sink.block_count,
            max_version: self
                .terms
                .iter()
                .map(|(_, meta)| meta.version)
                .max()
                .unwrap_or(0),
            config: self.config,
        };
        let info_bytes = serde_json::to_vec_pretty(&info)
            .map_err(|e| VerbenaError::illegal_state(format!("metadata serialization: {e}")))?;
        let mut out = self.storage.create_output(&meta_file_name(&self.name))?;
        out.write_all(&info_bytes)?;
        out.finish()?;

        debug!(
            "finished dictionary {}: {} terms in {} blocks, {} index entries",
            self.name,
            info.term_count,
            info.block_count,
            sink.index_entries.len()
        );

        self.terms = Vec::new();
        Ok(info)
    }
}

/// Fold `terms[start..end]` (all sharing `prefix_len` bytes) into pending
/// entries for the parent. A child prefix that collects at least
/// `min_block_size` entries is written as its own block; smaller groups
/// float up with longer suffixes.
fn collect_entries(
    terms: &[(Vec<u8>, TermMeta)],
    config: &TermDictionaryConfig,
    start: usize,
    end: usize,
    prefix_len: usize,
    sink: &mut BlockSink,
) -> Result<Vec<PendingEntry>> {
    let mut entries = Vec::new();
    let mut i = start;

    // A term equal to the prefix itself sorts first.
    if i < end && terms[i].0.len() == prefix_len {
        entries.push(PendingEntry {
            term_ord: i,
            end: prefix_len,
            kind: EntryKind::Term,
            max_version: terms[i].1.version,
        });
        i += 1;
    }

    while i < end {
        let label = terms[i].0[prefix_len];
        let mut j = i + 1;
        while j < end && terms[j].0[prefix_len] == label {
            j += 1;
        }

        let child = collect_entries(terms, config, i, j, prefix_len + 1, sink)?;
        if child.len() >= config.min_block_size {
            let handle = write_block(terms, config, sink, i, prefix_len + 1, child)?;
            entries.push(PendingEntry {
                term_ord: i,
                end: prefix_len + 1,
                kind: EntryKind::Block { fp: handle.fp },
                max_version: handle.version_bound,
            });
        } else {
            entries.extend(child);
        }
        i = j;
    }

    Ok(entries)
}

/// Write the logical block for one prefix, floor-splitting when the entry
/// list exceeds the maximum, and record its index entry.
fn write_block(
    terms: &[(Vec<u8>, TermMeta)],
    config: &TermDictionaryConfig,
    sink: &mut BlockSink,
    first_term_ord: usize,
    prefix_len: usize,
    entries: Vec<PendingEntry>,
) -> Result<BlockHandle> {
    let version_bound = entries.iter().map(|e| e.max_version).max().unwrap_or(0);
    let prefix: Vec<u8> = if prefix_len == 0 {
        Vec::new()
    } else {
        terms[first_term_ord].0[..prefix_len].to_vec()
    };

    // Partition into floor chunks. Entries sharing a leading suffix byte
    // must stay in one chunk, because floor selection is by that byte.
    let chunks: Vec<Vec<PendingEntry>> = if entries.len() <= config.max_block_size {
        vec![entries]
    } else {
        let mut label_groups: Vec<(Option<u8>, Vec<PendingEntry>)> = Vec::new();
        for entry in entries {
            let lead = if entry.end == prefix_len {
                None
            } else {
                Some(terms[entry.term_ord].0[prefix_len])
            };
            match label_groups.last_mut() {
                Some((last_lead, group)) if *last_lead == lead => group.push(entry),
                _ => label_groups.push((lead, vec![entry])),
            }
        }

        let mut chunks: Vec<Vec<PendingEntry>> = Vec::new();
        for (_, group) in label_groups {
            match chunks.last_mut() {
                Some(chunk) if chunk.len() + group.len() <= config.max_block_size => {
                    chunk.extend(group);
                }
                _ => chunks.push(group),
            }
        }
        chunks
    };

    let is_floor = chunks.len() > 1;
    let chunk_count = chunks.len();
    let mut fps = Vec::with_capacity(chunk_count);
    let mut has_terms_flags = Vec::with_capacity(chunk_count);
    let mut floor_labels = Vec::with_capacity(chunk_count);

    for (chunk_index, chunk) in chunks.iter().enumerate() {
        let fp = sink.out.len() as u64;
        let body = encode_block_body(terms, chunk, prefix_len, fp, chunk_index == chunk_count - 1)?;
        encode_u64_into(&mut sink.out, body.len() as u64);
        sink.out.extend_from_slice(&body);
        sink.block_count += 1;

        fps.push(fp);
        has_terms_flags.push(
            chunk
                .iter()
                .any(|entry| matches!(entry.kind, EntryKind::Term)),
        );
        floor_labels.push(
            chunk
                .first()
                .filter(|entry| entry.end > prefix_len)
                .map(|entry| terms[entry.term_ord].0[prefix_len]),
        );
    }

    // Index entry: code, optional floor follower table, version bound.
    let fp_orig = fps[0];
    let mut code = fp_orig << OUTPUT_FLAGS_BITS;
    if has_terms_flags[0] {
        code |= OUTPUT_FLAG_HAS_TERMS;
    }
    if is_floor {
        code |= OUTPUT_FLAG_IS_FLOOR;
    }

    let mut data = Vec::new();
    encode_u64_into(&mut data, code);
    if is_floor {
        let mut floor = Vec::new();
        encode_u64_into(&mut floor, (chunk_count - 1) as u64);
        for chunk_index in 1..chunk_count {
            let label = floor_labels[chunk_index].ok_or_else(|| {
                VerbenaError::illegal_state("floor follower without a leading label")
            })?;
            floor.push(label);
            let delta = fps[chunk_index] - fp_orig;
            encode_u64_into(&mut floor, (delta << 1) | u64::from(has_terms_flags[chunk_index]));
        }
        encode_u64_into(&mut data, floor.len() as u64);
        data.extend_from_slice(&floor);
    }
    encode_u64_into(&mut data, version_bound);

    sink.index_entries.push((prefix, data));

    Ok(BlockHandle {
        fp: fp_orig,
        version_bound,
    })
}

/// Encode one physical block's body: header, suffix stream, stats stream.
fn encode_block_body(
    terms: &[(Vec<u8>, TermMeta)],
    chunk: &[PendingEntry],
    prefix_len: usize,
    fp: u64,
    is_last_in_floor: bool,
) -> Result<Vec<u8>> {
    let is_leaf = chunk
        .iter()
        .all(|entry| matches!(entry.kind, EntryKind::Term));

    let mut suffixes = Vec::new();
    for entry in chunk {
        let suffix = &terms[entry.term_ord].0[prefix_len..entry.end];
        match entry.kind {
            EntryKind::Term => {
                if is_leaf {
                    encode_u64_into(&mut suffixes, suffix.len() as u64);
                } else {
                    encode_u64_into(&mut suffixes, (suffix.len() as u64) << 1);
                }
                suffixes.extend_from_slice(suffix);
            }
            EntryKind::Block { fp: child_fp } => {
                encode_u64_into(&mut suffixes, ((suffix.len() as u64) << 1) | 1);
                suffixes.extend_from_slice(suffix);
                debug_assert!(child_fp < fp);
                encode_u64_into(&mut suffixes, fp - child_fp);
            }
        }
    }

    let mut stats = Vec::new();
    for entry in chunk {
        if let EntryKind::Term = entry.kind {
            let meta = &terms[entry.term_ord].1;
            encode_u64_into(&mut stats, meta.doc_freq as u64);
            encode_u64_into(&mut stats, meta.total_term_freq - meta.doc_freq as u64);
            encode_u64_into(&mut stats, meta.version);
            encode_u64_into(&mut stats, meta.postings_offset);
        }
    }

    let mut body = Vec::new();
    encode_u64_into(
        &mut body,
        ((chunk.len() as u64) << 1) | u64::from(is_last_in_floor),
    );
    encode_u64_into(&mut body, ((suffixes.len() as u64) << 1) | u64::from(is_leaf));
    body.extend_from_slice(&suffixes);
    encode_u64_into(&mut body, stats.len() as u64);
    body.extend_from_slice(&stats);
    Ok(body)
}
