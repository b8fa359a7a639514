//! Pluggable storage backends for dictionary files.
//!
//! A [`Storage`] names files and hands out read and write handles. Read
//! handles ([`StorageInput`]) are random-access and cloneable: every
//! enumerator clones its own handle so position state is never shared.

pub mod file;
pub mod memory;

use crate::error::Result;

/// A named-file storage backend.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open an existing file for random-access reads.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create a file, replacing any existing content. The data becomes
    /// visible to `open_input` once the output is finished.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Whether a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// List all file names in this storage.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Delete a file.
    fn delete_file(&self, name: &str) -> Result<()>;
}

/// Random-access read handle over one file.
pub trait StorageInput: Send + Sync + std::fmt::Debug {
    /// Total length of the file in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` with the bytes at `offset`. Reading past the end of the
    /// file is an error.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Independent handle over the same file.
    fn clone_input(&self) -> Box<dyn StorageInput>;

    /// Read the whole file.
    fn read_all(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.len() as usize];
        if !buf.is_empty() {
            self.read_at(0, &mut buf)?;
        }
        Ok(buf)
    }
}

/// Write handle for one file.
pub trait StorageOutput: Send {
    /// Append bytes to the file.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Flush and publish the file.
    fn finish(&mut self) -> Result<()>;
}
