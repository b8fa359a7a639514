//! # Verbena
//!
//! A versioned term dictionary for segment-based search indexes.
//!
//! Terms are stored sorted in prefix-compressed blocks behind an FST
//! index; each term carries a monotonically assigned version, and lookups
//! can require a minimum version, skipping whole prefix sub-trees without
//! I/O when their aggregated version bound proves them stale.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use verbena::storage::memory::MemoryStorage;
//! use verbena::{SeekStatus, TermDictionary, TermDictionaryConfig, TermDictionaryWriter, TermMeta};
//!
//! # fn main() -> verbena::Result<()> {
//! let storage = Arc::new(MemoryStorage::new());
//!
//! let mut writer = TermDictionaryWriter::new(storage.clone(), "field", TermDictionaryConfig::default())?;
//! for (term, version) in [(&b"app"[..], 5), (&b"apple"[..], 9), (&b"banana"[..], 3)] {
//!     writer.add(term, TermMeta { doc_freq: 1, total_term_freq: 2, version, postings_offset: 0 })?;
//! }
//! writer.finish()?;
//!
//! let dict = TermDictionary::open(storage, "field")?;
//! let mut terms = dict.terms();
//! assert!(terms.seek_exact_min_version(b"apple", 8)?);
//! assert!(!terms.seek_exact_min_version(b"apple", 10)?);
//! assert_eq!(terms.seek_ceil(b"b")?, SeekStatus::NotFound);
//! assert_eq!(terms.term(), b"banana");
//! # Ok(())
//! # }
//! ```

pub mod dictionary;
mod error;
mod postings;
pub mod storage;
mod util;

pub use dictionary::enumerator::TermsEnum;
pub use dictionary::reader::TermDictionary;
pub use dictionary::state::TermState;
pub use dictionary::writer::{TermDictionaryConfig, TermDictionaryWriter};
pub use dictionary::{DictionaryInfo, SeekStatus, TermMeta};
pub use error::{Result, VerbenaError};
pub use postings::PostingsReader;
pub use storage::{Storage, StorageInput, StorageOutput};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
