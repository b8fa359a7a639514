//! Label index navigator: the FST mapping block prefixes to frame data.
//!
//! The automaton itself comes from the `fst` crate; outputs are offsets
//! into a sidecar blob holding each block's frame data (file pointer,
//! flags, floor table, aggregated version bound). Arcs carry accumulated
//! outputs so a final arc resolves directly to its prefix's frame data.

use fst::raw::{CompiledAddr, Fst};

use crate::dictionary::{OUTPUT_FLAG_HAS_TERMS, OUTPUT_FLAG_IS_FLOOR, OUTPUT_FLAGS_BITS};
use crate::error::{Result, VerbenaError};
use crate::util::bytes::SliceReader;

/// One step of an index walk: the reached node plus accumulated outputs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexArc {
    /// Address of the node this arc leads to.
    addr: CompiledAddr,
    /// Label consumed by this arc (0 for the start arc).
    pub label: u8,
    /// Output accumulated along the path up to and including this arc.
    output: u64,
    /// Whether the reached node is final, i.e. the consumed prefix owns a
    /// block.
    pub is_final: bool,
    /// Accumulated output including the node's final output; only
    /// meaningful when `is_final`. Resolves to the prefix's frame data.
    pub final_output: u64,
}

/// Decoded index entry for one logical block.
#[derive(Debug)]
pub(crate) struct FrameData<'a> {
    /// File pointer of the block (first floor sub-block when split).
    pub fp: u64,
    /// Whether the block (its first sub-block when floored) holds term
    /// entries directly.
    pub has_terms: bool,
    /// Whether the logical block is split into floor sub-blocks.
    pub is_floor: bool,
    /// Encoded floor follower table; empty unless `is_floor`.
    pub floor_data: &'a [u8],
    /// Maximum version of any term under this prefix.
    pub version_bound: u64,
}

/// Decode frame data starting at `offset` within `buf`.
pub(crate) fn decode_frame_data(buf: &[u8], offset: u64) -> Result<FrameData<'_>> {
    if offset as usize > buf.len() {
        return Err(VerbenaError::corrupt("frame data offset out of range"));
    }
    let mut reader = SliceReader::at(buf, offset as usize);
    let code = reader.read_varint()?;
    let is_floor = code & OUTPUT_FLAG_IS_FLOOR != 0;
    let has_terms = code & OUTPUT_FLAG_HAS_TERMS != 0;
    let fp = code >> OUTPUT_FLAGS_BITS;
    let floor_data = if is_floor {
        let len = reader.read_varint()? as usize;
        reader.read_bytes(len)?
    } else {
        &[]
    };
    let version_bound = reader.read_varint()?;
    Ok(FrameData {
        fp,
        has_terms,
        is_floor,
        floor_data,
        version_bound,
    })
}

/// The term index: block prefixes to frame data, via the FST.
pub(crate) struct TermIndex {
    fst: Fst<Vec<u8>>,
    frames: Vec<u8>,
}

impl std::fmt::Debug for TermIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermIndex")
            .field("fst_bytes", &self.fst.as_bytes().len())
            .field("frame_bytes", &self.frames.len())
            .finish()
    }
}

impl TermIndex {
    /// Build a navigator over serialized FST bytes and the frame-data blob.
    pub fn open(fst_bytes: Vec<u8>, frames: Vec<u8>) -> Result<Self> {
        let fst = Fst::new(fst_bytes)?;
        // The empty prefix always owns the root block.
        if !fst.root().is_final() {
            return Err(VerbenaError::corrupt("index root does not accept the empty prefix"));
        }
        Ok(TermIndex { fst, frames })
    }

    /// The start arc, positioned before any byte is consumed. Always final.
    pub fn first_arc(&self) -> IndexArc {
        let root = self.fst.root();
        IndexArc {
            addr: root.addr(),
            label: 0,
            output: 0,
            is_final: root.is_final(),
            final_output: root.final_output().value(),
        }
    }

    /// Follow `label` out of `from`; `None` when the index has no such
    /// transition.
    pub fn find_arc(&self, from: &IndexArc, label: u8) -> Option<IndexArc> {
        let node = self.fst.node(from.addr);
        let transition = node.transition(node.find_input(label)?);
        let target = self.fst.node(transition.addr);
        let output = from.output + transition.out.value();
        Some(IndexArc {
            addr: transition.addr,
            label,
            output,
            is_final: target.is_final(),
            final_output: output + target.final_output().value(),
        })
    }

    /// Resolve an accumulated final output to its frame data.
    pub fn frame_data(&self, offset: u64) -> Result<FrameData<'_>> {
        decode_frame_data(&self.frames, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::varint::encode_u64_into;

    fn build_index(entries: &[(&[u8], Vec<u8>)]) -> TermIndex {
        let mut frames = Vec::new();
        let mut builder = fst::MapBuilder::memory();
        for (prefix, data) in entries {
            let offset = frames.len() as u64;
            frames.extend_from_slice(data);
            builder.insert(prefix, offset).unwrap();
        }
        TermIndex::open(builder.into_inner().unwrap(), frames).unwrap()
    }

    fn encode_plain(fp: u64, has_terms: bool, version_bound: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        let code = (fp << OUTPUT_FLAGS_BITS) | if has_terms { OUTPUT_FLAG_HAS_TERMS } else { 0 };
        encode_u64_into(&mut buf, code);
        encode_u64_into(&mut buf, version_bound);
        buf
    }

    #[test]
    fn test_walk_and_resolve() {
        let index = build_index(&[
            (b"", encode_plain(5, true, 40)),
            (b"ab", encode_plain(900, false, 7)),
        ]);

        let first = index.first_arc();
        assert!(first.is_final);
        let root = index.frame_data(first.final_output).unwrap();
        assert_eq!(root.fp, 5);
        assert!(root.has_terms);
        assert!(!root.is_floor);
        assert_eq!(root.version_bound, 40);

        let a = index.find_arc(&first, b'a').unwrap();
        assert!(!a.is_final);
        let ab = index.find_arc(&a, b'b').unwrap();
        assert!(ab.is_final);
        assert_eq!(ab.label, b'b');
        let data = index.frame_data(ab.final_output).unwrap();
        assert_eq!(data.fp, 900);
        assert!(!data.has_terms);
        assert_eq!(data.version_bound, 7);

        assert!(index.find_arc(&a, b'z').is_none());
        assert!(index.find_arc(&first, b'q').is_none());
    }

    #[test]
    fn test_floor_frame_data() {
        let mut floor = Vec::new();
        encode_u64_into(&mut floor, 1); // one follower
        floor.push(b'm');
        encode_u64_into(&mut floor, (120 << 1) | 1);

        let mut data = Vec::new();
        let code = (64 << OUTPUT_FLAGS_BITS) | OUTPUT_FLAG_HAS_TERMS | OUTPUT_FLAG_IS_FLOOR;
        encode_u64_into(&mut data, code);
        encode_u64_into(&mut data, floor.len() as u64);
        data.extend_from_slice(&floor);
        encode_u64_into(&mut data, 99);

        let index = build_index(&[(b"", data)]);
        let decoded = index.frame_data(index.first_arc().final_output).unwrap();
        assert_eq!(decoded.fp, 64);
        assert!(decoded.is_floor);
        assert_eq!(decoded.floor_data, floor.as_slice());
        assert_eq!(decoded.version_bound, 99);
    }

    #[test]
    fn test_root_must_be_final() {
        let mut builder = fst::MapBuilder::memory();
        builder.insert(b"abc", 0).unwrap();
        let bytes = builder.into_inner().unwrap();
        assert!(TermIndex::open(bytes, Vec::new()).is_err());
    }
}
