//! The term enumerator: a stateful cursor over one dictionary's sorted
//! terms.
//!
//! Seeks walk the FST index byte by byte, reusing per-depth arc and frame
//! state from the previous call for the shared target prefix
//! (`valid_index_prefix` bounds how much of that state is trustworthy).
//! Blocks are decoded lazily, and per-term metadata is decoded only when a
//! caller asks for more than the term bytes.

use std::cmp::Ordering;

use crate::dictionary::SeekStatus;
use crate::dictionary::frame::Frame;
use crate::dictionary::index::{FrameData, IndexArc};
use crate::dictionary::reader::TermDictionary;
use crate::dictionary::state::TermState;
use crate::error::{Result, VerbenaError};
use crate::postings::PostingsReader;
use crate::storage::StorageInput;
use crate::util::bytes::BytesBuffer;

/// Resolve the current frame from the stack or the static frame.
fn frame_at<'f>(
    stack: &'f mut Vec<Frame>,
    static_frame: &'f mut Frame,
    current: Option<usize>,
) -> &'f mut Frame {
    match current {
        Some(ord) => &mut stack[ord],
        None => static_frame,
    }
}

/// Frame slot for `ord`, growing the stack on demand. Frames are never
/// deallocated; deeper slots are reused across calls.
fn get_frame(stack: &mut Vec<Frame>, ord: usize) -> &mut Frame {
    while stack.len() <= ord {
        stack.push(Frame::new(stack.len()));
    }
    debug_assert_eq!(stack[ord].ord, ord);
    &mut stack[ord]
}

/// Arc slot for `ord`, growing the cache on demand.
fn store_arc(arcs: &mut Vec<IndexArc>, ord: usize, arc: IndexArc) {
    if arcs.len() <= ord {
        arcs.resize(ord + 1, arc);
    } else {
        arcs[ord] = arc;
    }
}

/// The enumerator's block-file handle, cloned from the reader on first use
/// so every enumerator owns independent position state.
fn input_handle<'s>(
    slot: &'s mut Option<Box<dyn StorageInput>>,
    reader: &TermDictionary,
) -> Result<&'s dyn StorageInput> {
    if slot.is_none() {
        *slot = Some(reader.blocks_input().clone_input());
    }
    match slot.as_deref() {
        Some(input) => Ok(input),
        None => Err(VerbenaError::illegal_state("block input unavailable")),
    }
}

/// Where a seek resumes after reconciling with the previous position.
enum SeekStart {
    /// Already positioned exactly on the target with a trusted term.
    AtTarget,
    /// Walk the index from this arc and target offset.
    Walk { arc: IndexArc, target_upto: usize },
}

/// How the index walk ended.
enum WalkEnd {
    /// The index had no arc for the byte at `fail_len - 1`; that label is
    /// already written into the term scratch.
    Exhausted { fail_len: usize },
    /// The index consumed the whole target.
    Consumed { len: usize },
}

/// Stateful cursor over a dictionary's terms.
///
/// Not safe for concurrent use; create one enumerator per thread. The
/// slice returned by [`term`] and [`next`] borrows the internal term
/// buffer and is valid only until the next mutating call.
///
/// [`term`]: TermsEnum::term
/// [`next`]: TermsEnum::next
pub struct TermsEnum<'a> {
    reader: &'a TermDictionary,
    input: Option<Box<dyn StorageInput>>,
    stack: Vec<Frame>,
    static_frame: Frame,
    /// Index into `stack`, or `None` when the static frame is current.
    current: Option<usize>,
    arcs: Vec<IndexArc>,
    term: BytesBuffer,
    term_exists: bool,
    /// Longest prefix of the current term whose cached arc/frame state is
    /// still trustworthy.
    valid_index_prefix: usize,
    /// Frame depth the previous position is valid up to; `None` forces
    /// reused frames to rewind.
    target_before_current: Option<usize>,
    eof: bool,
}

impl std::fmt::Debug for TermsEnum<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermsEnum")
            .field("term", &self.term.as_slice())
            .field("positioned", &!self.term.is_empty())
            .field("term_exists", &self.term_exists)
            .field("depth", &self.current)
            .field("valid_index_prefix", &self.valid_index_prefix)
            .finish()
    }
}

impl<'a> TermsEnum<'a> {
    pub(crate) fn new(reader: &'a TermDictionary) -> Self {
        TermsEnum {
            reader,
            input: None,
            stack: Vec::new(),
            static_frame: Frame::new(0),
            current: None,
            arcs: Vec::new(),
            term: BytesBuffer::new(),
            term_exists: false,
            valid_index_prefix: 0,
            target_before_current: None,
            eof: false,
        }
    }

    /// Bytes of the currently positioned term. Empty when unpositioned or
    /// exhausted.
    pub fn term(&self) -> &[u8] {
        debug_assert!(!self.eof);
        self.term.as_slice()
    }

    /// Position exactly on `target`. Returns `false` when the term does
    /// not exist.
    pub fn seek_exact(&mut self, target: &[u8]) -> Result<bool> {
        self.seek_exact_min_version(target, 0)
    }

    /// Position exactly on `target`, requiring its version to be at least
    /// `min_version`. Returns `false` when the term does not exist or
    /// exists with an older version.
    ///
    /// Whole prefix sub-trees are skipped without any block I/O when their
    /// aggregated maximum version proves every term below them is too old.
    pub fn seek_exact_min_version(&mut self, target: &[u8], min_version: u64) -> Result<bool> {
        if self.reader.index().is_none() {
            return Err(VerbenaError::illegal_state("terms index was not loaded"));
        }

        self.term.ensure_capacity(target.len() + 1);
        self.eof = false;

        match self.seek_init(target)? {
            SeekStart::AtTarget => {
                // Already parked on the target; only the version gate
                // remains. The decode is cached within the block.
                let frame = frame_at(&mut self.stack, &mut self.static_frame, self.current);
                frame.decode_metadata()?;
                Ok(frame.state.version >= min_version)
            }
            SeekStart::Walk { arc, target_upto } => {
                let fail_len = match self.walk_index(target, arc, target_upto)? {
                    WalkEnd::Exhausted { fail_len } => fail_len,
                    WalkEnd::Consumed { len } => len,
                };
                self.finish_seek_exact(target, min_version, fail_len)
            }
        }
    }

    /// Position on the smallest term greater than or equal to `target`.
    pub fn seek_ceil(&mut self, target: &[u8]) -> Result<SeekStatus> {
        if self.reader.index().is_none() {
            return Err(VerbenaError::illegal_state("terms index was not loaded"));
        }

        self.term.ensure_capacity(target.len() + 1);
        self.eof = false;

        match self.seek_init(target)? {
            SeekStart::AtTarget => Ok(SeekStatus::Found),
            SeekStart::Walk { arc, target_upto } => {
                self.walk_index(target, arc, target_upto)?;
                self.finish_seek_ceil(target)
            }
        }
    }

    /// Reconcile the new target with the previous position, reusing cached
    /// arc/frame state for the shared prefix; or push the root frame when
    /// there is no previous position.
    fn seek_init(&mut self, target: &[u8]) -> Result<SeekStart> {
        if let Some(cur) = self.current {
            self.target_before_current = Some(cur);

            // Compare against the cached term up to the valid index
            // prefix, re-using the per-byte arc state for the shared span.
            let mut arc = self.arcs[0];
            debug_assert!(arc.is_final);
            let mut target_upto = 0;
            let mut last_frame_ord = 0;

            debug_assert!(self.valid_index_prefix <= self.term.len());
            let target_limit = target.len().min(self.valid_index_prefix);
            let mut cmp = Ordering::Equal;

            while target_upto < target_limit {
                cmp = self.term.as_slice()[target_upto].cmp(&target[target_upto]);
                if cmp != Ordering::Equal {
                    break;
                }
                arc = self.arcs[1 + target_upto];
                debug_assert_eq!(arc.label, target[target_upto]);
                if arc.is_final {
                    last_frame_ord += 1;
                }
                target_upto += 1;
            }

            if cmp == Ordering::Equal {
                // Compare the rest without saving arc state; this only
                // classifies the target as before/equal/after the cached
                // term.
                let target_upto_mid = target_upto;
                let target_limit2 = target.len().min(self.term.len());
                while target_upto < target_limit2 {
                    cmp = self.term.as_slice()[target_upto].cmp(&target[target_upto]);
                    if cmp != Ordering::Equal {
                        break;
                    }
                    target_upto += 1;
                }
                if cmp == Ordering::Equal {
                    cmp = self.term.len().cmp(&target.len());
                }
                target_upto = target_upto_mid;
            }

            match cmp {
                Ordering::Less => {
                    // Common case: the target is after the current term
                    // (sorted seek pattern); keep the deepest shared frame.
                    self.current = Some(last_frame_ord);
                }
                Ordering::Greater => {
                    // Target is before the current term: keep the frame
                    // but rescan it from the start.
                    self.target_before_current = None;
                    self.current = Some(last_frame_ord);
                    self.stack[last_frame_ord].rewind();
                }
                Ordering::Equal => {
                    debug_assert_eq!(self.term.len(), target.len());
                    if self.term_exists {
                        return Ok(SeekStart::AtTarget);
                    }
                    // Byte-equal but never confirmed to exist: re-walk.
                }
            }
            Ok(SeekStart::Walk { arc, target_upto })
        } else {
            self.target_before_current = None;
            let reader = self.reader;
            let index = reader
                .index()
                .ok_or_else(|| VerbenaError::illegal_state("terms index was not loaded"))?;
            let arc = index.first_arc();
            debug_assert!(arc.is_final);
            store_arc(&mut self.arcs, 0, arc);
            let ord = self.push_frame_output(Some(arc), arc.final_output, 0)?;
            self.current = Some(ord);
            Ok(SeekStart::Walk {
                arc,
                target_upto: 0,
            })
        }
    }

    /// Walk the index for the unmatched target suffix, pushing a frame at
    /// every final arc.
    fn walk_index(
        &mut self,
        target: &[u8],
        mut arc: IndexArc,
        mut target_upto: usize,
    ) -> Result<WalkEnd> {
        let reader = self.reader;
        let index = reader
            .index()
            .ok_or_else(|| VerbenaError::illegal_state("terms index was not loaded"))?;

        while target_upto < target.len() {
            let target_label = target[target_upto];
            match index.find_arc(&arc, target_label) {
                None => {
                    self.term.set(target_upto, target_label);
                    return Ok(WalkEnd::Exhausted {
                        fail_len: target_upto + 1,
                    });
                }
                Some(next_arc) => {
                    arc = next_arc;
                    self.term.set(target_upto, target_label);
                    store_arc(&mut self.arcs, 1 + target_upto, arc);
                    target_upto += 1;
                    if arc.is_final {
                        let ord = self.push_frame_output(Some(arc), arc.final_output, target_upto)?;
                        self.current = Some(ord);
                    }
                }
            }
        }
        Ok(WalkEnd::Consumed { len: target_upto })
    }

    /// Terminal handling for an exact seek: fast-false answers from the
    /// index alone, otherwise load and scan the deepest frame.
    fn finish_seek_exact(
        &mut self,
        target: &[u8],
        min_version: u64,
        fail_len: usize,
    ) -> Result<bool> {
        let reader = self.reader;
        let cur = self
            .current
            .ok_or_else(|| VerbenaError::illegal_state("seek finished without a frame"))?;
        let frame = &mut self.stack[cur];

        self.valid_index_prefix = frame.prefix_len;
        frame.scan_to_floor_frame(target)?;

        if !frame.has_terms {
            // No term can live at this exact prefix.
            self.term_exists = false;
            self.term.set_len(fail_len);
            return Ok(false);
        }

        if frame.version_bound < min_version {
            // Every term under this prefix is older than the floor.
            self.term_exists = false;
            self.term.set_len(fail_len);
            return Ok(false);
        }

        let input = input_handle(&mut self.input, reader)?;
        frame.load_block(input)?;

        let status = frame.scan_to_term(&mut self.term, &mut self.term_exists, target, true)?;
        if status != SeekStatus::Found {
            return Ok(false);
        }
        frame.decode_metadata()?;
        if frame.state.version < min_version {
            return Ok(false);
        }
        Ok(true)
    }

    /// Terminal handling for a ceiling seek: always load and scan, then
    /// roll forward when the block ends before the target.
    fn finish_seek_ceil(&mut self, target: &[u8]) -> Result<SeekStatus> {
        let reader = self.reader;
        let cur = self
            .current
            .ok_or_else(|| VerbenaError::illegal_state("seek finished without a frame"))?;

        let status = {
            let frame = &mut self.stack[cur];
            self.valid_index_prefix = frame.prefix_len;
            frame.scan_to_floor_frame(target)?;
            let input = input_handle(&mut self.input, reader)?;
            frame.load_block(input)?;
            frame.scan_to_term(&mut self.term, &mut self.term_exists, target, false)?
        };

        match status {
            SeekStatus::End => {
                // Block exhausted before the target: remember the target
                // and roll into the following block.
                self.term.copy_from(target);
                self.term_exists = false;
                if self.next()?.is_some() {
                    Ok(SeekStatus::NotFound)
                } else {
                    Ok(SeekStatus::End)
                }
            }
            SeekStatus::NotFound if !self.term_exists => {
                // Parked on a sub-block entry; rest on its first term.
                self.descend_to_first_term()?;
                Ok(SeekStatus::NotFound)
            }
            other => Ok(other),
        }
    }

    /// Push into the sub-block the current frame is parked on, then keep
    /// descending until the cursor rests on a real term.
    fn descend_to_first_term(&mut self) -> Result<()> {
        let reader = self.reader;
        let cur = self
            .current
            .ok_or_else(|| VerbenaError::illegal_state("no current frame"))?;
        let mut sub_fp = self.stack[cur]
            .last_sub_fp
            .ok_or_else(|| VerbenaError::corrupt("sub-block entry without pointer"))?;

        loop {
            let prefix_len = self.term.len();
            let ord = self.push_frame_fp(None, sub_fp, prefix_len);
            self.current = Some(ord);
            let input = input_handle(&mut self.input, reader)?;
            let frame = &mut self.stack[ord];
            frame.load_block(input)?;
            let is_sub = frame.next_entry(&mut self.term)?;
            self.term_exists = !is_sub;
            if !is_sub {
                return Ok(());
            }
            sub_fp = frame
                .last_sub_fp
                .ok_or_else(|| VerbenaError::corrupt("sub-block entry without pointer"))?;
        }
    }

    /// Advance to the next term in sorted order; `None` at the end.
    ///
    /// Only the term bytes are decoded; metadata decoding is deferred to
    /// the accessors. Calling `next` after a seek that failed without
    /// loading a block (no-terms prefix or version pruning) is an illegal
    /// state; seek again or create a fresh enumerator.
    pub fn next(&mut self) -> Result<Option<&[u8]>> {
        let reader = self.reader;

        if self.current.is_none() && self.term_exists {
            // Parked by a cached TermState without traversal state;
            // re-seek the cached term to rebuild it.
            let pending = self.term.as_slice().to_vec();
            let found = self.seek_exact(&pending)?;
            debug_assert!(found);
            if !found {
                return Err(VerbenaError::illegal_state(
                    "cached term state does not match this dictionary",
                ));
            }
        } else if self.input.is_none() {
            // No block was ever loaded: start iteration at the root block,
            // discarding any index-only seek state. The index itself is
            // not required here; the root frame data is stored with it.
            self.current = None;
            self.target_before_current = None;
            let arc = reader.index().map(|index| index.first_arc());
            if let Some(arc) = arc {
                debug_assert!(arc.is_final);
                store_arc(&mut self.arcs, 0, arc);
            }
            let root = reader.root_frame_data()?;
            let ord = self.push_frame_decoded(arc, &root, 0)?;
            self.current = Some(ord);
            let input = input_handle(&mut self.input, reader)?;
            self.stack[ord].load_block(input)?;
            self.target_before_current = self.current;
        } else if self.eof {
            return Ok(None);
        } else {
            self.target_before_current = self.current;
        }

        // Pop frames whose block is exhausted.
        loop {
            let cur = self
                .current
                .ok_or_else(|| VerbenaError::illegal_state("no current frame"))?;
            let Some(next_ent) = self.stack[cur].next_ent else {
                return Err(VerbenaError::illegal_state(
                    "enumerator is not positioned; seek or restart iteration first",
                ));
            };
            if next_ent != self.stack[cur].ent_count {
                break;
            }

            if !self.stack[cur].is_last_in_floor {
                let input = input_handle(&mut self.input, reader)?;
                self.stack[cur].load_next_floor_block(input)?;
                continue;
            }

            if cur == 0 {
                // End of the root block: nothing left.
                self.eof = true;
                self.term.clear();
                self.valid_index_prefix = 0;
                self.stack[0].rewind();
                self.term_exists = false;
                return Ok(None);
            }

            let last_fp = self.stack[cur].fp_orig;
            let parent = cur - 1;
            self.current = Some(parent);

            if self.stack[parent].next_ent.is_none()
                || self.stack[parent].last_sub_fp != Some(last_fp)
            {
                // Parent is unloaded or parked on a different child;
                // re-sync it onto the entry owning the child we left.
                let frame = &mut self.stack[parent];
                frame.scan_to_floor_frame(self.term.as_slice())?;
                let input = input_handle(&mut self.input, reader)?;
                frame.load_block(input)?;
                frame.scan_to_sub_block(last_fp)?;
            }

            // The previous seek state is invalid beyond this depth.
            self.valid_index_prefix = self.valid_index_prefix.min(self.stack[parent].prefix_len);
        }

        // Advance one entry, pushing through sub-blocks to the next term.
        loop {
            let cur = self
                .current
                .ok_or_else(|| VerbenaError::illegal_state("no current frame"))?;
            let is_sub = self.stack[cur].next_entry(&mut self.term)?;
            self.term_exists = !is_sub;
            if !is_sub {
                return Ok(Some(self.term.as_slice()));
            }
            let sub_fp = self.stack[cur]
                .last_sub_fp
                .ok_or_else(|| VerbenaError::corrupt("sub-block entry without pointer"))?;
            let prefix_len = self.term.len();
            let ord = self.push_frame_fp(None, sub_fp, prefix_len);
            self.current = Some(ord);
            let input = input_handle(&mut self.input, reader)?;
            self.stack[ord].load_block(input)?;
        }
    }

    /// Number of documents containing the current term.
    pub fn doc_freq(&mut self) -> Result<u32> {
        Ok(self.positioned_state()?.doc_freq)
    }

    /// Total occurrences of the current term across all documents.
    pub fn total_term_freq(&mut self) -> Result<u64> {
        Ok(self.positioned_state()?.total_term_freq)
    }

    /// Version of the current term.
    pub fn version(&mut self) -> Result<u64> {
        Ok(self.positioned_state()?.version)
    }

    /// Cloneable snapshot of the current term's decoded state, usable with
    /// [`seek_exact_state`] to reposition without an index walk.
    ///
    /// [`seek_exact_state`]: TermsEnum::seek_exact_state
    pub fn term_state(&mut self) -> Result<TermState> {
        Ok(self.positioned_state()?.clone())
    }

    /// Reposition on `target` from a previously captured state, bypassing
    /// index traversal. The cached position is trusted only when the
    /// current term byte-equals the target *and* was positioned by a
    /// successful decode; otherwise the provided state is installed.
    pub fn seek_exact_state(&mut self, target: &[u8], state: &TermState) {
        self.eof = false;
        if self.term.as_slice() != target || !self.term_exists {
            debug_assert!(state.term_block_ord > 0);
            self.current = None;
            self.static_frame.state = state.clone();
            // The metadata ordinal lives in the state, not the scan cursor.
            self.static_frame.is_leaf = false;
            self.static_frame.metadata_upto = state.term_block_ord;
            self.term.copy_from(target);
            self.term_exists = true;
            self.valid_index_prefix = 0;
        }
    }

    /// Resolve the current term's postings through an external reader.
    pub fn postings<P: PostingsReader>(&mut self, reader: &P) -> Result<P::Postings> {
        let frame = frame_at(&mut self.stack, &mut self.static_frame, self.current);
        frame.decode_metadata()?;
        reader.postings(&frame.state)
    }

    fn positioned_state(&mut self) -> Result<&TermState> {
        debug_assert!(!self.eof);
        let frame = frame_at(&mut self.stack, &mut self.static_frame, self.current);
        frame.decode_metadata()?;
        Ok(&frame.state)
    }

    /// Push (or reuse) the frame for an index arc's accumulated output.
    fn push_frame_output(
        &mut self,
        arc: Option<IndexArc>,
        output: u64,
        prefix_len: usize,
    ) -> Result<usize> {
        let reader = self.reader;
        let index = reader
            .index()
            .ok_or_else(|| VerbenaError::illegal_state("terms index was not loaded"))?;
        let data = index.frame_data(output)?;
        self.push_frame_decoded(arc, &data, prefix_len)
    }

    /// Push (or reuse) a frame seeded from decoded index entry data.
    fn push_frame_decoded(
        &mut self,
        arc: Option<IndexArc>,
        data: &FrameData<'_>,
        prefix_len: usize,
    ) -> Result<usize> {
        let ord = self.current.map_or(0, |cur| cur + 1);
        let frame = get_frame(&mut self.stack, ord);
        frame.init_from_frame_data(data)?;
        Self::position_frame(frame, arc, data.fp, prefix_len, self.target_before_current);
        // Seek frames are only ever pushed at final arcs.
        debug_assert!(frame.arc.is_none_or(|a| a.is_final));
        Ok(ord)
    }

    /// Push (or reuse) a frame reached by file pointer alone, during
    /// iteration. Such a frame has no index data; a floor chain under it
    /// is walked physically, so floor selection is disabled.
    fn push_frame_fp(&mut self, arc: Option<IndexArc>, fp: u64, prefix_len: usize) -> usize {
        let ord = self.current.map_or(0, |cur| cur + 1);
        let frame = get_frame(&mut self.stack, ord);
        frame.is_floor = false;
        frame.version_bound = u64::MAX;
        Self::position_frame(frame, arc, fp, prefix_len, self.target_before_current);
        ord
    }

    fn position_frame(
        frame: &mut Frame,
        arc: Option<IndexArc>,
        fp: u64,
        prefix_len: usize,
        target_before_current: Option<usize>,
    ) {
        frame.arc = arc;
        if frame.fp_orig == fp && frame.next_ent.is_some() {
            // The frame already holds this block; rewind only when the
            // previous position overshoots the new target.
            if target_before_current.is_none_or(|limit| frame.prefix_len > limit) {
                frame.rewind();
            }
            debug_assert_eq!(prefix_len, frame.prefix_len);
        } else {
            frame.next_ent = None;
            frame.prefix_len = prefix_len;
            frame.state.term_block_ord = 0;
            frame.fp_orig = fp;
            frame.fp = fp;
            frame.last_sub_fp = None;
        }
    }
}
