//! End-to-end tests for the versioned term dictionary: write, open, seek,
//! iterate.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

use verbena::storage::file::FileStorage;
use verbena::storage::memory::MemoryStorage;
use verbena::{
    PostingsReader, Result, SeekStatus, Storage, StorageInput, StorageOutput, TermDictionary,
    TermDictionaryConfig, TermDictionaryWriter, TermMeta, TermState, VerbenaError,
};

fn vmeta(version: u64) -> TermMeta {
    TermMeta {
        doc_freq: 1,
        total_term_freq: 1,
        version,
        postings_offset: 0,
    }
}

fn small_config() -> TermDictionaryConfig {
    TermDictionaryConfig {
        min_block_size: 2,
        max_block_size: 3,
    }
}

fn build_dict(
    storage: Arc<dyn Storage>,
    name: &str,
    config: TermDictionaryConfig,
    terms: &[(&[u8], TermMeta)],
) -> TermDictionary {
    let mut writer = TermDictionaryWriter::new(storage.clone(), name, config).unwrap();
    for (term, meta) in terms {
        writer.add(term, *meta).unwrap();
    }
    writer.finish().unwrap();
    TermDictionary::open(storage, name).unwrap()
}

fn example_terms() -> Vec<(&'static [u8], TermMeta)> {
    vec![
        (
            b"app".as_slice(),
            TermMeta {
                doc_freq: 2,
                total_term_freq: 4,
                version: 5,
                postings_offset: 100,
            },
        ),
        (
            b"apple".as_slice(),
            TermMeta {
                doc_freq: 7,
                total_term_freq: 11,
                version: 9,
                postings_offset: 200,
            },
        ),
        (
            b"banana".as_slice(),
            TermMeta {
                doc_freq: 1,
                total_term_freq: 3,
                version: 3,
                postings_offset: 300,
            },
        ),
    ]
}

fn collect_all(dict: &TermDictionary) -> Vec<Vec<u8>> {
    let mut terms = dict.terms();
    let mut out = Vec::new();
    while let Some(term) = terms.next().unwrap() {
        out.push(term.to_vec());
    }
    out
}

#[test]
fn test_worked_example() {
    for config in [TermDictionaryConfig::default(), small_config()] {
        let storage = Arc::new(MemoryStorage::new());
        let dict = build_dict(storage, "f", config, &example_terms());

        let mut terms = dict.terms();
        assert!(terms.seek_exact_min_version(b"apple", 8).unwrap());
        assert_eq!(terms.term(), b"apple");
        assert!(!terms.seek_exact_min_version(b"apple", 10).unwrap());
        assert!(!terms.seek_exact_min_version(b"banana", 5).unwrap());

        assert_eq!(terms.seek_ceil(b"b").unwrap(), SeekStatus::NotFound);
        assert_eq!(terms.term(), b"banana");

        assert_eq!(
            collect_all(&dict),
            vec![b"app".to_vec(), b"apple".to_vec(), b"banana".to_vec()]
        );
    }
}

#[test]
fn test_metadata_accessors_are_lazy_but_correct() {
    let storage = Arc::new(MemoryStorage::new());
    let dict = build_dict(storage, "f", small_config(), &example_terms());

    let mut terms = dict.terms();
    assert!(terms.seek_exact(b"apple").unwrap());
    assert_eq!(terms.doc_freq().unwrap(), 7);
    assert_eq!(terms.total_term_freq().unwrap(), 11);
    assert_eq!(terms.version().unwrap(), 9);

    // Iteration defers metadata decode until asked.
    let mut terms = dict.terms();
    assert_eq!(terms.next().unwrap(), Some(b"app".as_slice()));
    assert_eq!(terms.doc_freq().unwrap(), 2);
    assert_eq!(terms.next().unwrap(), Some(b"apple".as_slice()));
    assert_eq!(terms.next().unwrap(), Some(b"banana".as_slice()));
    assert_eq!(terms.version().unwrap(), 3);
    assert_eq!(terms.total_term_freq().unwrap(), 3);
}

struct OffsetPostings;

impl PostingsReader for OffsetPostings {
    type Postings = u64;

    fn postings(&self, state: &TermState) -> Result<u64> {
        Ok(state.postings_offset)
    }
}

#[test]
fn test_postings_delegation() {
    let storage = Arc::new(MemoryStorage::new());
    let dict = build_dict(storage, "f", small_config(), &example_terms());

    let mut terms = dict.terms();
    assert!(terms.seek_exact(b"banana").unwrap());
    assert_eq!(terms.postings(&OffsetPostings).unwrap(), 300);

    assert!(terms.seek_exact(b"app").unwrap());
    assert_eq!(terms.postings(&OffsetPostings).unwrap(), 100);
}

#[test]
fn test_term_state_fast_path() {
    let storage = Arc::new(MemoryStorage::new());
    let dict = build_dict(storage, "f", small_config(), &example_terms());

    let state = {
        let mut terms = dict.terms();
        assert!(terms.seek_exact(b"apple").unwrap());
        terms.term_state().unwrap()
    };
    assert_eq!(state.version, 9);
    assert_eq!(state.doc_freq, 7);

    // A fresh enumerator repositions from the snapshot without a seek.
    let mut terms = dict.terms();
    terms.seek_exact_state(b"apple", &state);
    assert_eq!(terms.term(), b"apple");
    assert_eq!(terms.doc_freq().unwrap(), 7);
    assert_eq!(terms.postings(&OffsetPostings).unwrap(), 200);

    // Iteration after a state-install restores full traversal state.
    assert_eq!(terms.next().unwrap(), Some(b"banana".as_slice()));
    assert_eq!(terms.next().unwrap(), None);
}

fn random_dictionary(seed: u64, count: usize) -> BTreeMap<Vec<u8>, u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut terms = BTreeMap::new();
    while terms.len() < count {
        let len = rng.random_range(1..=8);
        let term: Vec<u8> = (0..len).map(|_| b'a' + rng.random_range(0..4u8)).collect();
        let version = rng.random_range(1..=50u64);
        terms.entry(term).or_insert(version);
    }
    terms
}

fn build_random(
    storage: Arc<dyn Storage>,
    name: &str,
    config: TermDictionaryConfig,
    reference: &BTreeMap<Vec<u8>, u64>,
) -> TermDictionary {
    let mut writer = TermDictionaryWriter::new(storage.clone(), name, config).unwrap();
    for (term, version) in reference {
        writer.add(term, vmeta(*version)).unwrap();
    }
    writer.finish().unwrap();
    TermDictionary::open(storage, name).unwrap()
}

#[test]
fn test_sorted_iteration_randomized() {
    let reference = random_dictionary(7, 400);
    for config in [TermDictionaryConfig::default(), small_config()] {
        let storage = Arc::new(MemoryStorage::new());
        let dict = build_random(storage, "r", config, &reference);

        let iterated = collect_all(&dict);
        let expected: Vec<Vec<u8>> = reference.keys().cloned().collect();
        assert_eq!(iterated, expected);

        // Strictly increasing by construction of the comparison above,
        // but assert the ordering property directly too.
        for pair in iterated.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}

#[test]
fn test_seek_exact_finds_every_term() {
    let reference = random_dictionary(11, 300);
    let storage = Arc::new(MemoryStorage::new());
    let dict = build_random(storage, "r", small_config(), &reference);

    // One shared enumerator in sorted order exercises prefix reuse.
    let mut terms = dict.terms();
    for (term, version) in &reference {
        assert!(terms.seek_exact(term).unwrap(), "missing {term:?}");
        assert_eq!(terms.term(), term.as_slice());
        assert_eq!(terms.version().unwrap(), *version);
    }

    // Probes for absent terms.
    let mut terms = dict.terms();
    for (term, _) in reference.iter().take(50) {
        let mut absent = term.clone();
        absent.push(b'z' + 1);
        assert!(!terms.seek_exact(&absent).unwrap());
        let mut absent = term.clone();
        absent[0] = b'z';
        assert!(!terms.seek_exact(&absent).unwrap());
    }
}

#[test]
fn test_seek_then_next_consistency() {
    let reference = random_dictionary(13, 250);
    let storage = Arc::new(MemoryStorage::new());
    let dict = build_random(storage, "r", small_config(), &reference);

    let sorted: Vec<Vec<u8>> = reference.keys().cloned().collect();
    let mut terms = dict.terms();
    for (i, term) in sorted.iter().enumerate() {
        assert!(terms.seek_exact(term).unwrap());
        let successor = terms.next().unwrap().map(|t| t.to_vec());
        if i + 1 < sorted.len() {
            assert_eq!(successor.as_deref(), Some(sorted[i + 1].as_slice()));
        } else {
            assert_eq!(successor, None);
        }
    }
}

#[test]
fn test_ceiling_correctness_randomized() {
    let reference = random_dictionary(17, 250);
    let storage = Arc::new(MemoryStorage::new());
    let dict = build_random(storage, "r", small_config(), &reference);

    let mut rng = StdRng::seed_from_u64(18);
    let mut terms = dict.terms();
    for _ in 0..300 {
        let len = rng.random_range(1..=8);
        let target: Vec<u8> = (0..len).map(|_| b'a' + rng.random_range(0..5u8)).collect();

        let status = terms.seek_ceil(&target).unwrap();
        match reference.range(target.clone()..).next() {
            Some((ceiling, _)) if *ceiling == target => {
                assert_eq!(status, SeekStatus::Found, "target {target:?}");
                assert_eq!(terms.term(), target.as_slice());
            }
            Some((ceiling, _)) => {
                assert_eq!(status, SeekStatus::NotFound, "target {target:?}");
                assert_eq!(terms.term(), ceiling.as_slice());
            }
            None => {
                assert_eq!(status, SeekStatus::End, "target {target:?}");
            }
        }
    }
}

#[test]
fn test_ceiling_fixed_cases() {
    let storage = Arc::new(MemoryStorage::new());
    let dict = build_dict(storage, "f", small_config(), &example_terms());

    let mut terms = dict.terms();
    assert_eq!(terms.seek_ceil(b"a").unwrap(), SeekStatus::NotFound);
    assert_eq!(terms.term(), b"app");

    assert_eq!(terms.seek_ceil(b"apple").unwrap(), SeekStatus::Found);
    assert_eq!(terms.term(), b"apple");

    assert_eq!(terms.seek_ceil(b"appleton").unwrap(), SeekStatus::NotFound);
    assert_eq!(terms.term(), b"banana");

    assert_eq!(terms.seek_ceil(b"zebra").unwrap(), SeekStatus::End);

    // The enumerator recovers after reporting the end.
    assert_eq!(terms.seek_ceil(b"app").unwrap(), SeekStatus::Found);
    assert_eq!(terms.term(), b"app");
}

#[test]
fn test_idempotent_reseek() {
    let storage = Arc::new(MemoryStorage::new());
    let dict = build_dict(storage, "f", small_config(), &example_terms());

    let mut terms = dict.terms();
    for _ in 0..2 {
        assert!(terms.seek_exact(b"apple").unwrap());
        assert_eq!(terms.term(), b"apple");
    }
    for _ in 0..2 {
        assert!(!terms.seek_exact_min_version(b"banana", 5).unwrap());
    }
    // Positioned state still answers once the version floor is dropped.
    assert!(terms.seek_exact_min_version(b"banana", 3).unwrap());
    for _ in 0..2 {
        assert!(!terms.seek_exact(b"grape").unwrap());
    }
}

/// Build a dictionary whose `aa` prefix collects its own indexed block, so
/// version pruning has a sub-tree to skip.
fn pruning_fixture(storage: Arc<dyn Storage>) -> TermDictionary {
    let config = TermDictionaryConfig {
        min_block_size: 2,
        max_block_size: 48,
    };
    let mut writer = TermDictionaryWriter::new(storage.clone(), "p", config).unwrap();
    for suffix in 0..8u8 {
        let term = [b'a', b'a', b'a' + suffix];
        writer.add(&term, vmeta(10 + suffix as u64)).unwrap();
    }
    writer.add(b"zz", vmeta(500)).unwrap();
    writer.finish().unwrap();
    TermDictionary::open(storage, "p").unwrap()
}

#[test]
fn test_version_pruning_correctness() {
    let storage = Arc::new(MemoryStorage::new());
    let dict = pruning_fixture(storage);

    let mut terms = dict.terms();
    // Max version under "aa" is 17: anything above prunes the sub-tree.
    assert!(!terms.seek_exact_min_version(b"aac", 100).unwrap());
    // No false negatives at or below each term's own version.
    assert!(terms.seek_exact_min_version(b"aac", 12).unwrap());
    assert!(!terms.seek_exact_min_version(b"aac", 13).unwrap());
    assert!(terms.seek_exact_min_version(b"aah", 17).unwrap());
    assert!(terms.seek_exact_min_version(b"zz", 500).unwrap());
    assert!(!terms.seek_exact_min_version(b"zz", 501).unwrap());
}

/// Storage wrapper counting `read_at` calls, to prove pruning skips I/O.
#[derive(Debug)]
struct CountingStorage {
    inner: MemoryStorage,
    reads: Arc<AtomicU64>,
}

#[derive(Debug)]
struct CountingInput {
    inner: Box<dyn StorageInput>,
    reads: Arc<AtomicU64>,
}

impl Storage for CountingStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        Ok(Box::new(CountingInput {
            inner: self.inner.open_input(name)?,
            reads: Arc::clone(&self.reads),
        }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.inner.create_output(name)
    }

    fn file_exists(&self, name: &str) -> bool {
        self.inner.file_exists(name)
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.inner.list_files()
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.inner.delete_file(name)
    }
}

impl StorageInput for CountingInput {
    fn len(&self) -> u64 {
        self.inner.len()
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.inner.read_at(offset, buf)
    }

    fn clone_input(&self) -> Box<dyn StorageInput> {
        Box::new(CountingInput {
            inner: self.inner.clone_input(),
            reads: Arc::clone(&self.reads),
        })
    }
}

#[test]
fn test_version_pruning_skips_block_reads() {
    let reads = Arc::new(AtomicU64::new(0));
    let storage = Arc::new(CountingStorage {
        inner: MemoryStorage::new(),
        reads: Arc::clone(&reads),
    });
    let dict = pruning_fixture(storage);

    let mut terms = dict.terms();
    let before = reads.load(Ordering::Relaxed);
    // Aggregated bound under "aa" is 17; the whole sub-tree is skipped
    // from the index alone.
    assert!(!terms.seek_exact_min_version(b"aac", 100).unwrap());
    assert_eq!(reads.load(Ordering::Relaxed), before);

    // Dropping the floor forces the block load.
    assert!(terms.seek_exact_min_version(b"aac", 1).unwrap());
    assert!(reads.load(Ordering::Relaxed) > before);
}

#[test]
fn test_routing_only_prefix_fast_not_found() {
    let reads = Arc::new(AtomicU64::new(0));
    let storage = Arc::new(CountingStorage {
        inner: MemoryStorage::new(),
        reads: Arc::clone(&reads),
    });

    // "aa" and "ab" become blocks; the "a" block routes without terms.
    let terms_list: Vec<Vec<u8>> = [b"aax", b"aay", b"aaz", b"abx", b"aby", b"abz"]
        .iter()
        .map(|t| t.to_vec())
        .collect();
    let mut writer = TermDictionaryWriter::new(storage.clone(), "f", small_config()).unwrap();
    for term in &terms_list {
        writer.add(term, vmeta(1)).unwrap();
    }
    writer.finish().unwrap();
    let dict = TermDictionary::open(storage, "f").unwrap();

    let mut terms = dict.terms();
    let before = reads.load(Ordering::Relaxed);
    // No term can live at a routing-only prefix; answered from the index.
    assert!(!terms.seek_exact(b"ac").unwrap());
    assert!(!terms.seek_exact(b"a").unwrap());
    assert_eq!(reads.load(Ordering::Relaxed), before);

    // Ceiling through a routing node descends to the first real term.
    assert_eq!(terms.seek_ceil(b"a").unwrap(), SeekStatus::NotFound);
    assert_eq!(terms.term(), b"aax");
    assert_eq!(terms.seek_ceil(b"ac").unwrap(), SeekStatus::End);

    assert_eq!(collect_all(&dict), terms_list);
}

#[test]
fn test_floor_block_reassembly() {
    // 26 terms under one prefix with tiny blocks forces floor splits.
    let storage = Arc::new(MemoryStorage::new());
    let mut writer = TermDictionaryWriter::new(storage.clone(), "f", small_config()).unwrap();
    let mut expected = Vec::new();
    for c in b'a'..=b'z' {
        let term = [b'p', b'r', b'e', c];
        writer.add(&term, vmeta(c as u64)).unwrap();
        expected.push(term.to_vec());
    }
    let info = writer.finish().unwrap();
    assert!(
        info.block_count > 2,
        "fixture should split into floor sub-blocks"
    );
    let dict = TermDictionary::open(storage, "f").unwrap();

    // Iteration stitches the floor chain back into one sorted sequence.
    assert_eq!(collect_all(&dict), expected);

    // Exact seeks land in the correct sub-block.
    let mut terms = dict.terms();
    for term in &expected {
        assert!(terms.seek_exact(term).unwrap());
        assert_eq!(terms.version().unwrap(), term[3] as u64);
    }

    // Ceiling across sub-block boundaries.
    let mut terms = dict.terms();
    assert_eq!(terms.seek_ceil(b"pre").unwrap(), SeekStatus::NotFound);
    assert_eq!(terms.term(), b"prea");
    assert_eq!(terms.seek_ceil(b"prem0").unwrap(), SeekStatus::NotFound);
    assert_eq!(terms.term(), b"pren");
    assert_eq!(terms.seek_ceil(b"prez1").unwrap(), SeekStatus::End);
}

#[test]
fn test_iteration_then_backward_seek() {
    let reference = random_dictionary(23, 150);
    let storage = Arc::new(MemoryStorage::new());
    let dict = build_random(storage, "r", small_config(), &reference);

    let sorted: Vec<Vec<u8>> = reference.keys().cloned().collect();
    let mut terms = dict.terms();
    for expected in sorted.iter().take(40) {
        assert_eq!(terms.next().unwrap(), Some(expected.as_slice()));
    }

    // Seek backwards to the start, then forwards again.
    assert!(terms.seek_exact(&sorted[0]).unwrap());
    assert_eq!(terms.next().unwrap(), Some(sorted[1].as_slice()));

    // Drain to the end and come back once more.
    while terms.next().unwrap().is_some() {}
    assert_eq!(terms.next().unwrap(), None);
    assert!(terms.seek_exact(&sorted[5]).unwrap());
    assert_eq!(terms.term(), sorted[5].as_slice());
}

#[test]
fn test_empty_dictionary() {
    let storage = Arc::new(MemoryStorage::new());
    let dict = build_dict(storage, "e", TermDictionaryConfig::default(), &[]);

    assert_eq!(dict.term_count(), 0);
    let mut terms = dict.terms();
    assert_eq!(terms.next().unwrap(), None);
    assert_eq!(terms.next().unwrap(), None);
    assert!(!terms.seek_exact(b"anything").unwrap());
    assert_eq!(terms.seek_ceil(b"anything").unwrap(), SeekStatus::End);
}

#[test]
fn test_open_without_index() {
    let storage = Arc::new(MemoryStorage::new());
    let mut writer =
        TermDictionaryWriter::new(storage.clone(), "f", small_config()).unwrap();
    for (term, meta) in example_terms() {
        writer.add(term, meta).unwrap();
    }
    writer.finish().unwrap();

    let dict = TermDictionary::open_with(storage, "f", false).unwrap();

    // Iteration works from the stored root block location.
    assert_eq!(
        collect_all(&dict),
        vec![b"app".to_vec(), b"apple".to_vec(), b"banana".to_vec()]
    );

    // Seeks require the index and fail distinctly from corruption.
    let mut terms = dict.terms();
    assert!(matches!(
        terms.seek_exact(b"apple"),
        Err(VerbenaError::IllegalState(_))
    ));
    assert!(matches!(
        terms.seek_ceil(b"apple"),
        Err(VerbenaError::IllegalState(_))
    ));
}

fn corrupt_file(storage: &MemoryStorage, name: &str, offset: usize) {
    let data = {
        let input = storage.open_input(name).unwrap();
        let mut data = input.read_all().unwrap();
        data[offset] ^= 0x40;
        data
    };
    let mut out = storage.create_output(name).unwrap();
    out.write_all(&data).unwrap();
    out.finish().unwrap();
}

#[test]
fn test_corruption_detection() {
    let make = || {
        let storage = Arc::new(MemoryStorage::new());
        let mut writer =
            TermDictionaryWriter::new(storage.clone(), "f", small_config()).unwrap();
        for (term, meta) in example_terms() {
            writer.add(term, meta).unwrap();
        }
        writer.finish().unwrap();
        storage
    };

    // Bit flip in the blocks file payload.
    let storage = make();
    corrupt_file(&storage, "f.blk", 20);
    assert!(matches!(
        TermDictionary::open(storage, "f"),
        Err(VerbenaError::Corrupt(_))
    ));

    // Bit flip in the index file payload.
    let storage = make();
    corrupt_file(&storage, "f.tix", 20);
    assert!(matches!(
        TermDictionary::open(storage, "f"),
        Err(VerbenaError::Corrupt(_))
    ));

    // Truncated index file.
    let storage = make();
    let data = storage.open_input("f.tix").unwrap().read_all().unwrap();
    let mut out = storage.create_output("f.tix").unwrap();
    out.write_all(&data[..data.len() / 2]).unwrap();
    out.finish().unwrap();
    assert!(matches!(
        TermDictionary::open(storage, "f"),
        Err(VerbenaError::Corrupt(_))
    ));

    // Unparseable metadata sidecar.
    let storage = make();
    let mut out = storage.create_output("f.meta").unwrap();
    out.write_all(b"{ not json").unwrap();
    out.finish().unwrap();
    assert!(matches!(
        TermDictionary::open(storage, "f"),
        Err(VerbenaError::Corrupt(_))
    ));
}

#[test]
fn test_file_storage_roundtrip() {
    let dir = TempDir::new().unwrap();
    let reference = random_dictionary(31, 200);

    {
        let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
        let mut writer =
            TermDictionaryWriter::new(storage.clone(), "seg0", small_config()).unwrap();
        for (term, version) in &reference {
            writer.add(term, vmeta(*version)).unwrap();
        }
        writer.finish().unwrap();
    }

    // Re-open from disk with a fresh storage handle.
    let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
    let dict = TermDictionary::open(storage, "seg0").unwrap();
    assert_eq!(dict.term_count(), reference.len() as u64);

    let expected: Vec<Vec<u8>> = reference.keys().cloned().collect();
    assert_eq!(collect_all(&dict), expected);

    let mut terms = dict.terms();
    for (term, version) in reference.iter().step_by(7) {
        assert!(terms.seek_exact_min_version(term, *version).unwrap());
        assert!(!terms.seek_exact_min_version(term, *version + 1).unwrap());
    }
}

#[test]
fn test_min_version_matrix_randomized() {
    let reference = random_dictionary(37, 200);
    let storage = Arc::new(MemoryStorage::new());
    let dict = build_random(storage, "r", small_config(), &reference);

    let mut rng = StdRng::seed_from_u64(38);
    let mut terms = dict.terms();
    for _ in 0..400 {
        let len = rng.random_range(1..=8);
        let target: Vec<u8> = (0..len).map(|_| b'a' + rng.random_range(0..5u8)).collect();
        let min_version = rng.random_range(0..=60u64);

        let expected = reference
            .get(&target)
            .is_some_and(|version| *version >= min_version);
        let found = terms.seek_exact_min_version(&target, min_version).unwrap();
        assert_eq!(found, expected, "target {target:?} min {min_version}");
    }
}

#[test]
fn test_dictionary_info_roundtrip() {
    let storage = Arc::new(MemoryStorage::new());
    let dict = build_dict(storage, "f", small_config(), &example_terms());

    let info = dict.info();
    assert_eq!(info.term_count, 3);
    assert_eq!(info.max_version, 9);
    assert_eq!(info.config, small_config());
    assert_eq!(dict.max_version(), 9);
    assert_eq!(dict.name(), "f");
}
