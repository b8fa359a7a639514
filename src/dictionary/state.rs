//! Snapshots of a positioned term's decoded metadata.

/// Cloneable snapshot of one term's fully decoded state.
///
/// Obtained from [`TermsEnum::term_state`] and accepted back by
/// [`TermsEnum::seek_exact_state`], which repositions on the same term
/// without re-walking the index.
///
/// [`TermsEnum::term_state`]: crate::dictionary::enumerator::TermsEnum::term_state
/// [`TermsEnum::seek_exact_state`]: crate::dictionary::enumerator::TermsEnum::seek_exact_state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermState {
    /// Number of documents containing the term.
    pub doc_freq: u32,
    /// Total occurrences of the term across all documents.
    pub total_term_freq: u64,
    /// The term's version.
    pub version: u64,
    /// Opaque postings location token.
    pub postings_offset: u64,
    /// Ordinal of the term's metadata within its block; drives the
    /// incremental metadata decode.
    pub(crate) term_block_ord: usize,
}
