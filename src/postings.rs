//! Postings reader seam.
//!
//! The dictionary resolves a term to its decoded metadata, including an
//! opaque postings location; turning that location into document or
//! position iterators belongs to an external postings reader.

use crate::dictionary::state::TermState;
use crate::error::Result;

/// Resolves a positioned term's decoded state into a postings iterator.
pub trait PostingsReader {
    /// Iterator type produced for one term's postings.
    type Postings;

    /// Build the postings for the term described by `state`.
    fn postings(&self, state: &TermState) -> Result<Self::Postings>;
}
