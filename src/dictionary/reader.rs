//! Opening and validating a written dictionary.

use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use log::debug;

use crate::dictionary::enumerator::TermsEnum;
use crate::dictionary::index::{FrameData, TermIndex, decode_frame_data};
use crate::dictionary::{
    BLOCKS_MAGIC, DictionaryInfo, FORMAT_VERSION, INDEX_MAGIC, blocks_file_name, index_file_name,
    meta_file_name,
};
use crate::error::{Result, VerbenaError};
use crate::storage::{Storage, StorageInput};
use crate::util::bytes::SliceReader;

/// Byte length of a file header: magic plus format version.
const HEADER_LEN: usize = 5;
/// Byte length of the checksum footer.
const FOOTER_LEN: usize = 4;

/// Validate header magic/version and the CRC32 footer over `data`.
fn check_file(data: &[u8], magic: u32, what: &str) -> Result<()> {
    if data.len() < HEADER_LEN + FOOTER_LEN {
        return Err(VerbenaError::corrupt(format!("{what} file is truncated")));
    }
    let found = BigEndian::read_u32(&data[..4]);
    if found != magic {
        return Err(VerbenaError::corrupt(format!(
            "{what} file has wrong magic: {found:#010x}"
        )));
    }
    if data[4] != FORMAT_VERSION {
        return Err(VerbenaError::corrupt(format!(
            "{what} file has unsupported format version {}",
            data[4]
        )));
    }
    let payload = &data[..data.len() - FOOTER_LEN];
    let expected = BigEndian::read_u32(&data[data.len() - FOOTER_LEN..]);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(payload);
    if hasher.finalize() != expected {
        return Err(VerbenaError::corrupt(format!("{what} file checksum mismatch")));
    }
    Ok(())
}

/// Read-side handle to one dictionary: validated files, the optional FST
/// index, and the root block location.
///
/// The reader is immutable after open and can be shared; each enumerator
/// clones its own input handle from it.
#[derive(Debug)]
pub struct TermDictionary {
    storage: Arc<dyn Storage>,
    name: String,
    info: DictionaryInfo,
    blocks: Box<dyn StorageInput>,
    index: Option<TermIndex>,
    root_data: Vec<u8>,
}

impl TermDictionary {
    /// Open a dictionary, loading its terms index.
    pub fn open(storage: Arc<dyn Storage>, name: &str) -> Result<Self> {
        Self::open_with(storage, name, true)
    }

    /// Open a dictionary, optionally skipping the terms index load.
    ///
    /// Without the index, forward iteration still works (the root block
    /// location is stored with the index header) but every seek fails with
    /// an illegal-state error.
    pub fn open_with(storage: Arc<dyn Storage>, name: &str, load_index: bool) -> Result<Self> {
        let info_bytes = storage.open_input(&meta_file_name(name))?.read_all()?;
        let info: DictionaryInfo = serde_json::from_slice(&info_bytes)
            .map_err(|e| VerbenaError::corrupt(format!("invalid dictionary metadata: {e}")))?;

        let blocks = storage.open_input(&blocks_file_name(name))?;
        let blocks_bytes = blocks.read_all()?;
        check_file(&blocks_bytes, BLOCKS_MAGIC, "blocks")?;

        let index_bytes = storage.open_input(&index_file_name(name))?.read_all()?;
        check_file(&index_bytes, INDEX_MAGIC, "index")?;

        let mut reader = SliceReader::at(&index_bytes, HEADER_LEN);
        let root_len = reader.read_varint()? as usize;
        let root_data = reader.read_bytes(root_len)?.to_vec();
        let fst_len = reader.read_varint()? as usize;
        let fst_bytes = reader.read_bytes(fst_len)?;
        let frames_len = reader.read_varint()? as usize;
        let frame_bytes = reader.read_bytes(frames_len)?;
        if reader.position() != index_bytes.len() - FOOTER_LEN {
            return Err(VerbenaError::corrupt("trailing bytes in index file"));
        }

        // The root entry must decode, index or not.
        decode_frame_data(&root_data, 0)?;

        let index = if load_index {
            Some(TermIndex::open(fst_bytes.to_vec(), frame_bytes.to_vec())?)
        } else {
            None
        };

        debug!(
            "opened dictionary {name}: {} terms, {} blocks, index={}",
            info.term_count, info.block_count, load_index
        );

        Ok(TermDictionary {
            storage,
            name: name.to_string(),
            info,
            blocks,
            index,
            root_data,
        })
    }

    /// Name the dictionary was written under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The storage backend the dictionary was opened from.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Summary written at build time.
    pub fn info(&self) -> &DictionaryInfo {
        &self.info
    }

    /// Number of terms in the dictionary.
    pub fn term_count(&self) -> u64 {
        self.info.term_count
    }

    /// Maximum version across all terms.
    pub fn max_version(&self) -> u64 {
        self.info.max_version
    }

    /// A fresh enumerator over this dictionary's terms.
    pub fn terms(&self) -> TermsEnum<'_> {
        TermsEnum::new(self)
    }

    pub(crate) fn index(&self) -> Option<&TermIndex> {
        self.index.as_ref()
    }

    pub(crate) fn root_frame_data(&self) -> Result<FrameData<'_>> {
        decode_frame_data(&self.root_data, 0)
    }

    pub(crate) fn blocks_input(&self) -> &dyn StorageInput {
        self.blocks.as_ref()
    }
}
