//! One frame of the enumerator's traversal: the decoded state of a single
//! on-disk term block (or one floor sub-block of it).

use std::cmp::Ordering;

use log::trace;

use crate::dictionary::SeekStatus;
use crate::dictionary::index::{FrameData, IndexArc};
use crate::dictionary::state::TermState;
use crate::error::{Result, VerbenaError};
use crate::storage::StorageInput;
use crate::util::bytes::{BytesBuffer, SliceReader};
use crate::util::varint;

/// Read one varint at an absolute file offset.
fn read_varint_at(input: &dyn StorageInput, offset: u64) -> Result<(u64, usize)> {
    let file_len = input.len();
    if offset >= file_len {
        return Err(VerbenaError::corrupt("block pointer past end of file"));
    }
    let avail = ((file_len - offset) as usize).min(10);
    let mut buf = [0u8; 10];
    input.read_at(offset, &mut buf[..avail])?;
    varint::decode_u64(&buf[..avail])
}

/// Decoded state for one block at one trie depth.
///
/// Frames are created once per depth and reused for the life of the
/// enumerator; a reload overwrites the block-specific fields. A frame is
/// trusted across calls only while `fp_orig` still names the same block
/// and the block has been loaded (`next_ent` is `Some`).
#[derive(Debug)]
pub(crate) struct Frame {
    /// Depth slot in the frame stack.
    pub ord: usize,

    /// Working file pointer; moves along a floor chain.
    pub fp: u64,
    /// File pointer of the logical block; identity key for reuse.
    pub fp_orig: u64,
    /// End of the currently loaded physical block.
    pub fp_end: u64,

    /// Length of the term prefix this frame represents.
    pub prefix_len: usize,

    /// Entries in the loaded physical block.
    pub ent_count: usize,
    /// Scan cursor; `None` until the block is loaded.
    pub next_ent: Option<usize>,

    /// Whether the loaded block holds only term entries.
    pub is_leaf: bool,
    /// Working copy: whether this (sub-)block holds term entries.
    pub has_terms: bool,
    /// Has-terms flag as recorded in the index entry.
    pub has_terms_orig: bool,
    /// Whether the logical block is floor-split.
    pub is_floor: bool,
    /// Whether the loaded physical block is the last of its floor chain.
    pub is_last_in_floor: bool,

    /// File pointer of the most recently seen child block entry.
    pub last_sub_fp: Option<u64>,

    /// Aggregated maximum version under this prefix, from the index entry;
    /// `u64::MAX` when the frame was reached by iteration instead.
    pub version_bound: u64,

    /// Arc that led to this frame; `None` for frames reached by iteration.
    pub arc: Option<IndexArc>,

    // Floor follower table bookkeeping.
    floor_data: Vec<u8>,
    num_follow_floor_blocks: usize,
    next_floor_label: Option<u8>,
    floor_pos: usize,
    floor_num_orig: usize,
    floor_first_label: u8,
    floor_entries_pos: usize,

    // Decoded block streams and cursors into them.
    scratch: Vec<u8>,
    suffix_bytes: Vec<u8>,
    suffix_pos: usize,
    stat_bytes: Vec<u8>,
    stats_pos: usize,

    // Current entry bookkeeping for term assembly.
    start_byte_pos: usize,
    cur_suffix_len: usize,

    /// How many term entries' metadata has been decoded so far.
    pub metadata_upto: usize,
    /// Decoded state of the current term.
    pub state: TermState,
}

impl Frame {
    pub fn new(ord: usize) -> Self {
        Frame {
            ord,
            fp: 0,
            fp_orig: u64::MAX,
            fp_end: 0,
            prefix_len: 0,
            ent_count: 0,
            next_ent: None,
            is_leaf: true,
            has_terms: false,
            has_terms_orig: false,
            is_floor: false,
            is_last_in_floor: true,
            last_sub_fp: None,
            version_bound: u64::MAX,
            arc: None,
            floor_data: Vec::new(),
            num_follow_floor_blocks: 0,
            next_floor_label: None,
            floor_pos: 0,
            floor_num_orig: 0,
            floor_first_label: 0,
            floor_entries_pos: 0,
            scratch: Vec::new(),
            suffix_bytes: Vec::new(),
            suffix_pos: 0,
            stat_bytes: Vec::new(),
            stats_pos: 0,
            start_byte_pos: 0,
            cur_suffix_len: 0,
            metadata_upto: 0,
            state: TermState::default(),
        }
    }

    /// Seed the frame's index-derived fields from a decoded index entry.
    pub fn init_from_frame_data(&mut self, data: &FrameData<'_>) -> Result<()> {
        self.has_terms = data.has_terms;
        self.has_terms_orig = data.has_terms;
        self.is_floor = data.is_floor;
        self.version_bound = data.version_bound;
        if data.is_floor {
            self.set_floor_data(data.floor_data)?;
        } else {
            self.floor_data.clear();
            self.num_follow_floor_blocks = 0;
            self.next_floor_label = None;
        }
        Ok(())
    }

    fn set_floor_data(&mut self, data: &[u8]) -> Result<()> {
        self.floor_data.clear();
        self.floor_data.extend_from_slice(data);
        let mut reader = SliceReader::new(&self.floor_data);
        let count = reader.read_varint()? as usize;
        if count == 0 {
            return Err(VerbenaError::corrupt("floor block without followers"));
        }
        self.floor_num_orig = count;
        self.floor_first_label = reader.read_u8()?;
        self.floor_entries_pos = reader.position();
        self.rewind_floor();
        Ok(())
    }

    fn rewind_floor(&mut self) {
        self.num_follow_floor_blocks = self.floor_num_orig;
        self.next_floor_label = Some(self.floor_first_label);
        self.floor_pos = self.floor_entries_pos;
    }

    /// Reset the scan to the start of the logical block without reloading.
    /// The next `load_block` re-reads from storage.
    pub fn rewind(&mut self) {
        self.fp = self.fp_orig;
        self.next_ent = None;
        self.has_terms = self.has_terms_orig;
        if self.is_floor {
            self.rewind_floor();
        }
    }

    /// Decode the physical block at `fp`: header, suffix stream, stats
    /// stream. Does not decode any per-term metadata.
    pub fn load_block(&mut self, input: &dyn StorageInput) -> Result<()> {
        if self.next_ent.is_some() {
            // Already loaded.
            return Ok(());
        }

        let (body_len, probe_len) = read_varint_at(input, self.fp)?;
        let body_start = self.fp + probe_len as u64;
        if body_start
            .checked_add(body_len)
            .is_none_or(|end| end > input.len())
        {
            return Err(VerbenaError::corrupt("block body runs past end of file"));
        }
        self.scratch.resize(body_len as usize, 0);
        if body_len > 0 {
            input.read_at(body_start, &mut self.scratch)?;
        }
        self.fp_end = body_start + body_len;

        let mut reader = SliceReader::new(&self.scratch);
        let code = reader.read_varint()?;
        self.ent_count = (code >> 1) as usize;
        self.is_last_in_floor = code & 1 != 0;

        let code = reader.read_varint()?;
        let suffix_len = (code >> 1) as usize;
        self.is_leaf = code & 1 != 0;
        let suffixes = reader.read_bytes(suffix_len)?;
        self.suffix_bytes.clear();
        self.suffix_bytes.extend_from_slice(suffixes);

        let stats_len = reader.read_varint()? as usize;
        let stats = reader.read_bytes(stats_len)?;
        self.stat_bytes.clear();
        self.stat_bytes.extend_from_slice(stats);

        if !reader.is_exhausted() {
            return Err(VerbenaError::corrupt("trailing bytes in block body"));
        }

        self.next_ent = Some(0);
        self.suffix_pos = 0;
        self.stats_pos = 0;
        self.metadata_upto = 0;
        self.state.term_block_ord = 0;
        self.last_sub_fp = None;
        self.start_byte_pos = 0;
        self.cur_suffix_len = 0;

        trace!(
            "loaded block fp={} entries={} leaf={} last_in_floor={}",
            self.fp, self.ent_count, self.is_leaf, self.is_last_in_floor
        );
        Ok(())
    }

    /// Chain to the next physical floor sub-block and load it.
    pub fn load_next_floor_block(&mut self, input: &dyn StorageInput) -> Result<()> {
        debug_assert!(!self.is_last_in_floor);
        self.fp = self.fp_end;
        self.next_ent = None;
        self.load_block(input)
    }

    /// When this frame is floor-split, pick the physical sub-block that can
    /// hold `target` by the first byte past the prefix, and point `fp` at
    /// it. No-op otherwise.
    pub fn scan_to_floor_frame(&mut self, target: &[u8]) -> Result<()> {
        if !self.is_floor || target.len() <= self.prefix_len {
            return Ok(());
        }

        let target_label = target[self.prefix_len];
        let Some(next_label) = self.next_floor_label else {
            // All followers consumed; fp already rests on the last one.
            return Ok(());
        };
        if target_label < next_label {
            // The first (implicit) sub-block covers everything below the
            // first follower label.
            return Ok(());
        }

        let mut new_fp;
        let mut reader = SliceReader::at(&self.floor_data, self.floor_pos);
        loop {
            if self.num_follow_floor_blocks == 0 {
                return Err(VerbenaError::corrupt("floor follower table exhausted"));
            }
            let code = reader.read_varint()?;
            new_fp = self.fp_orig + (code >> 1);
            self.has_terms = code & 1 != 0;
            self.is_last_in_floor = self.num_follow_floor_blocks == 1;
            self.num_follow_floor_blocks -= 1;

            if self.is_last_in_floor {
                self.next_floor_label = None;
                break;
            }
            let label = reader.read_u8()?;
            if target_label < label {
                self.next_floor_label = Some(label);
                break;
            }
        }
        self.floor_pos = reader.position();

        if new_fp != self.fp {
            // Force re-load of the selected sub-block.
            self.next_ent = None;
            self.fp = new_fp;
        }
        Ok(())
    }

    /// Ordinal of the current term's metadata within the block.
    pub fn term_block_ord(&self) -> usize {
        if self.is_leaf {
            self.next_ent.unwrap_or(0)
        } else {
            self.state.term_block_ord
        }
    }

    /// Advance to the next entry, extending `term` with its suffix.
    /// Returns `true` when the entry routes into a sub-block.
    pub fn next_entry(&mut self, term: &mut BytesBuffer) -> Result<bool> {
        if self.is_leaf {
            self.next_leaf_entry(term).map(|_| false)
        } else {
            self.next_non_leaf_entry(term)
        }
    }

    fn next_leaf_entry(&mut self, term: &mut BytesBuffer) -> Result<()> {
        let ent = self
            .next_ent
            .ok_or_else(|| VerbenaError::illegal_state("block is not loaded"))?;
        debug_assert!(ent < self.ent_count);
        let mut reader = SliceReader::at(&self.suffix_bytes, self.suffix_pos);
        let suffix_len = reader.read_varint()? as usize;
        self.start_byte_pos = reader.position();
        self.cur_suffix_len = suffix_len;
        reader.skip(suffix_len)?;
        self.suffix_pos = reader.position();
        self.next_ent = Some(ent + 1);
        self.fill_term(term);
        Ok(())
    }

    fn next_non_leaf_entry(&mut self, term: &mut BytesBuffer) -> Result<bool> {
        let ent = self
            .next_ent
            .ok_or_else(|| VerbenaError::illegal_state("block is not loaded"))?;
        debug_assert!(ent < self.ent_count);
        let mut reader = SliceReader::at(&self.suffix_bytes, self.suffix_pos);
        let code = reader.read_varint()?;
        let suffix_len = (code >> 1) as usize;
        let is_sub_block = code & 1 != 0;
        self.start_byte_pos = reader.position();
        self.cur_suffix_len = suffix_len;
        reader.skip(suffix_len)?;
        let result = if is_sub_block {
            let delta = reader.read_varint()?;
            self.last_sub_fp = Some(
                self.fp
                    .checked_sub(delta)
                    .ok_or_else(|| VerbenaError::corrupt("sub-block pointer underflow"))?,
            );
            true
        } else {
            self.state.term_block_ord += 1;
            false
        };
        self.suffix_pos = reader.position();
        self.next_ent = Some(ent + 1);
        self.fill_term(term);
        Ok(result)
    }

    fn fill_term(&self, term: &mut BytesBuffer) {
        let len = self.prefix_len + self.cur_suffix_len;
        term.copy_slice_at(
            self.prefix_len,
            &self.suffix_bytes[self.start_byte_pos..self.start_byte_pos + self.cur_suffix_len],
        );
        term.set_len(len);
    }

    // The term buffer's logical length can lag behind the prefix during a
    // seek, so this reads the raw bytes the walk already wrote.
    fn prefix_matches(&self, term: &BytesBuffer, target: &[u8]) -> bool {
        self.prefix_len <= target.len()
            && self.prefix_len <= term.raw_bytes().len()
            && term.raw_bytes()[..self.prefix_len] == target[..self.prefix_len]
    }

    /// Scan entries for `target`, leaving the cursor per [`SeekStatus`].
    ///
    /// `term_exists` is set to whether the positioned entry is a real term
    /// (as opposed to a sub-block). With `exact_only`, positioning still
    /// occurs but callers treat anything except `Found` as terminal.
    pub fn scan_to_term(
        &mut self,
        term: &mut BytesBuffer,
        term_exists: &mut bool,
        target: &[u8],
        exact_only: bool,
    ) -> Result<SeekStatus> {
        if self.is_leaf {
            self.scan_to_term_leaf(term, term_exists, target, exact_only)
        } else {
            self.scan_to_term_non_leaf(term, term_exists, target, exact_only)
        }
    }

    fn scan_to_term_leaf(
        &mut self,
        term: &mut BytesBuffer,
        term_exists: &mut bool,
        target: &[u8],
        exact_only: bool,
    ) -> Result<SeekStatus> {
        let Some(mut ent) = self.next_ent else {
            return Err(VerbenaError::illegal_state("block is not loaded"));
        };
        *term_exists = true;

        if ent == self.ent_count {
            if exact_only {
                self.fill_term(term);
            }
            return Ok(SeekStatus::End);
        }

        debug_assert!(self.prefix_matches(term, target));

        let mut reader = SliceReader::at(&self.suffix_bytes, self.suffix_pos);
        'next_term: loop {
            ent += 1;
            let suffix_len = reader.read_varint()? as usize;
            let term_len = self.prefix_len + suffix_len;
            self.start_byte_pos = reader.position();
            self.cur_suffix_len = suffix_len;
            reader.skip(suffix_len)?;
            self.next_ent = Some(ent);

            let target_limit = target.len().min(term_len);
            let mut target_pos = self.prefix_len;
            let mut byte_pos = self.start_byte_pos;
            loop {
                let (cmp, stop) = if target_pos < target_limit {
                    let cmp = self.suffix_bytes[byte_pos].cmp(&target[target_pos]);
                    byte_pos += 1;
                    target_pos += 1;
                    (cmp, false)
                } else {
                    (term_len.cmp(&target.len()), true)
                };

                match cmp {
                    Ordering::Less => {
                        // Entry is still before the target.
                        if ent == self.ent_count {
                            self.suffix_pos = reader.position();
                            if exact_only {
                                self.fill_term(term);
                            }
                            return Ok(SeekStatus::End);
                        }
                        continue 'next_term;
                    }
                    Ordering::Greater => {
                        self.suffix_pos = reader.position();
                        self.fill_term(term);
                        return Ok(SeekStatus::NotFound);
                    }
                    Ordering::Equal => {
                        if stop {
                            self.suffix_pos = reader.position();
                            self.fill_term(term);
                            return Ok(SeekStatus::Found);
                        }
                        // Bytes equal so far; keep comparing.
                    }
                }
            }
        }
    }

    fn scan_to_term_non_leaf(
        &mut self,
        term: &mut BytesBuffer,
        term_exists: &mut bool,
        target: &[u8],
        exact_only: bool,
    ) -> Result<SeekStatus> {
        let Some(mut ent) = self.next_ent else {
            return Err(VerbenaError::illegal_state("block is not loaded"));
        };

        if ent == self.ent_count {
            // The stale current entry may be a sub-block; leave the
            // exists flag as the last scan set it.
            if exact_only {
                self.fill_term(term);
            }
            return Ok(SeekStatus::End);
        }

        debug_assert!(self.prefix_matches(term, target));

        let mut reader = SliceReader::at(&self.suffix_bytes, self.suffix_pos);
        'next_term: loop {
            ent += 1;
            let code = reader.read_varint()?;
            let suffix_len = (code >> 1) as usize;
            let is_sub_block = code & 1 != 0;
            *term_exists = !is_sub_block;
            let term_len = self.prefix_len + suffix_len;
            self.start_byte_pos = reader.position();
            self.cur_suffix_len = suffix_len;
            reader.skip(suffix_len)?;
            if is_sub_block {
                let delta = reader.read_varint()?;
                self.last_sub_fp = Some(
                    self.fp
                        .checked_sub(delta)
                        .ok_or_else(|| VerbenaError::corrupt("sub-block pointer underflow"))?,
                );
            } else {
                self.state.term_block_ord += 1;
            }
            self.next_ent = Some(ent);

            let target_limit = target.len().min(term_len);
            let mut target_pos = self.prefix_len;
            let mut byte_pos = self.start_byte_pos;
            loop {
                let (cmp, stop) = if target_pos < target_limit {
                    let cmp = self.suffix_bytes[byte_pos].cmp(&target[target_pos]);
                    byte_pos += 1;
                    target_pos += 1;
                    (cmp, false)
                } else {
                    (term_len.cmp(&target.len()), true)
                };

                match cmp {
                    Ordering::Less => {
                        if ent == self.ent_count {
                            self.suffix_pos = reader.position();
                            if exact_only {
                                self.fill_term(term);
                            }
                            return Ok(SeekStatus::End);
                        }
                        continue 'next_term;
                    }
                    Ordering::Greater => {
                        self.suffix_pos = reader.position();
                        self.fill_term(term);
                        // When parked on a sub-block the enumerator
                        // descends into it before reporting NOT_FOUND.
                        return Ok(SeekStatus::NotFound);
                    }
                    Ordering::Equal => {
                        if stop {
                            // An exact match cannot be a sub-block: the
                            // index would have routed there directly.
                            debug_assert!(*term_exists);
                            self.suffix_pos = reader.position();
                            self.fill_term(term);
                            return Ok(SeekStatus::Found);
                        }
                    }
                }
            }
        }
    }

    /// Re-park the cursor on the entry that owns the child block at
    /// `sub_fp`, after returning into this frame from that child.
    pub fn scan_to_sub_block(&mut self, sub_fp: u64) -> Result<()> {
        if self.is_leaf {
            return Err(VerbenaError::corrupt("leaf block cannot own sub-blocks"));
        }
        if self.last_sub_fp == Some(sub_fp) {
            return Ok(());
        }
        let Some(mut ent) = self.next_ent else {
            return Err(VerbenaError::illegal_state("block is not loaded"));
        };
        debug_assert!(sub_fp < self.fp);
        let target_delta = self.fp - sub_fp;

        let mut reader = SliceReader::at(&self.suffix_bytes, self.suffix_pos);
        while ent < self.ent_count {
            ent += 1;
            let code = reader.read_varint()?;
            reader.skip((code >> 1) as usize)?;
            if code & 1 != 0 {
                let delta = reader.read_varint()?;
                if delta == target_delta {
                    self.last_sub_fp = Some(sub_fp);
                    self.suffix_pos = reader.position();
                    self.next_ent = Some(ent);
                    return Ok(());
                }
            } else {
                self.state.term_block_ord += 1;
            }
        }
        Err(VerbenaError::corrupt("child block not found in parent"))
    }

    /// Decode per-term metadata up to the current entry. Decoding is
    /// strictly sequential within a block and happens at most once per
    /// entry per load.
    pub fn decode_metadata(&mut self) -> Result<()> {
        let limit = self.term_block_ord();
        if limit == 0 {
            return Err(VerbenaError::illegal_state("no term is positioned"));
        }
        while self.metadata_upto < limit {
            let mut reader = SliceReader::at(&self.stat_bytes, self.stats_pos);
            let doc_freq = reader.read_varint()?;
            let freq_delta = reader.read_varint()?;
            let version = reader.read_varint()?;
            let postings_offset = reader.read_varint()?;
            self.stats_pos = reader.position();

            self.state.doc_freq = u32::try_from(doc_freq)
                .map_err(|_| VerbenaError::corrupt("doc freq out of range"))?;
            self.state.total_term_freq = doc_freq
                .checked_add(freq_delta)
                .ok_or_else(|| VerbenaError::corrupt("term frequency out of range"))?;
            self.state.version = version;
            self.state.postings_offset = postings_offset;
            self.metadata_upto += 1;
        }
        self.state.term_block_ord = self.metadata_upto;
        Ok(())
    }
}
