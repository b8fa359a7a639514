//! Versioned term dictionary: prefix-compressed term blocks behind an FST
//! index.
//!
//! A dictionary stores one field's sorted terms. Terms are grouped into
//! on-disk blocks by shared prefix; an FST maps each block's prefix to the
//! block location plus the maximum version of any term below that prefix.
//! Oversized blocks are split into "floor" sub-blocks selected by the first
//! unmatched target byte.
//!
//! Every term carries a monotonically assigned version. Lookups may demand
//! a minimum version; a whole prefix sub-tree is skipped without I/O when
//! its aggregated bound proves every term below it is too old.
//!
//! The write path lives in [`writer`], the read path in [`reader`] and
//! [`enumerator`].

pub mod enumerator;
mod frame;
mod index;
pub mod reader;
pub mod state;
pub mod writer;

use serde::{Deserialize, Serialize};

/// Magic number opening the blocks file.
pub(crate) const BLOCKS_MAGIC: u32 = 0x5645_424C; // "VEBL"
/// Magic number opening the index file.
pub(crate) const INDEX_MAGIC: u32 = 0x5645_4958; // "VEIX"
/// On-disk format version.
pub(crate) const FORMAT_VERSION: u8 = 1;

/// Frame-data code flags: low bits of `code`, file pointer above them.
pub(crate) const OUTPUT_FLAGS_BITS: u64 = 2;
pub(crate) const OUTPUT_FLAG_IS_FLOOR: u64 = 0x1;
pub(crate) const OUTPUT_FLAG_HAS_TERMS: u64 = 0x2;

pub(crate) fn blocks_file_name(name: &str) -> String {
    format!("{name}.blk")
}

pub(crate) fn index_file_name(name: &str) -> String {
    format!("{name}.tix")
}

pub(crate) fn meta_file_name(name: &str) -> String {
    format!("{name}.meta")
}

/// Per-term statistics and postings location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermMeta {
    /// Number of documents containing the term.
    pub doc_freq: u32,
    /// Total occurrences of the term across all documents.
    pub total_term_freq: u64,
    /// Application-assigned monotonic version of the term.
    pub version: u64,
    /// Opaque location token for the term's postings.
    pub postings_offset: u64,
}

/// Outcome of a ceiling seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekStatus {
    /// The exact target term is positioned.
    Found,
    /// The smallest term greater than the target is positioned.
    NotFound,
    /// No term is greater than or equal to the target.
    End,
}

/// Summary of a written dictionary, persisted as the `.meta` sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryInfo {
    /// Number of terms in the dictionary.
    pub term_count: u64,
    /// Number of physical blocks written.
    pub block_count: u64,
    /// Maximum version across all terms (0 for an empty dictionary).
    pub max_version: u64,
    /// Configuration the dictionary was built with.
    pub config: writer::TermDictionaryConfig,
}
