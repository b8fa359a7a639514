//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, VerbenaError};
use crate::storage::{Storage, StorageInput, StorageOutput};

type FileMap = Arc<RwLock<HashMap<String, Arc<Vec<u8>>>>>;

/// Storage backend that keeps every file in memory.
///
/// Useful for tests and for short-lived dictionaries that never need to
/// survive the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: FileMap,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let data = self
            .files
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| VerbenaError::corrupt(format!("no such file: {name}")))?;
        Ok(Box::new(MemoryInput { data }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(Box::new(MemoryOutput {
            files: Arc::clone(&self.files),
            name: name.to_string(),
            buf: Vec::new(),
            finished: false,
        }))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.read().contains_key(name)
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.files.write().remove(name);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MemoryInput {
    data: Arc<Vec<u8>>,
}

impl StorageInput for MemoryInput {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = offset as usize;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| VerbenaError::corrupt("read past end of file"))?;
        buf.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn clone_input(&self) -> Box<dyn StorageInput> {
        Box::new(self.clone())
    }
}

struct MemoryOutput {
    files: FileMap,
    name: String,
    buf: Vec<u8>,
    finished: bool,
}

impl StorageOutput for MemoryOutput {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        if self.finished {
            return Err(VerbenaError::illegal_state("output already finished"));
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(VerbenaError::illegal_state("output already finished"));
        }
        self.finished = true;
        let data = Arc::new(std::mem::take(&mut self.buf));
        self.files.write().insert(self.name.clone(), data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let storage = MemoryStorage::new();
        let mut out = storage.create_output("seg.blk").unwrap();
        out.write_all(b"block ").unwrap();
        out.write_all(b"data").unwrap();
        out.finish().unwrap();

        assert!(storage.file_exists("seg.blk"));
        let input = storage.open_input("seg.blk").unwrap();
        assert_eq!(input.read_all().unwrap(), b"block data");
    }

    #[test]
    fn test_unfinished_output_invisible() {
        let storage = MemoryStorage::new();
        let mut out = storage.create_output("f").unwrap();
        out.write_all(b"x").unwrap();
        assert!(!storage.file_exists("f"));
        out.finish().unwrap();
        assert!(storage.file_exists("f"));
    }

    #[test]
    fn test_list_and_delete() {
        let storage = MemoryStorage::new();
        for name in ["b", "a"] {
            let mut out = storage.create_output(name).unwrap();
            out.finish().unwrap();
        }
        assert_eq!(storage.list_files().unwrap(), vec!["a", "b"]);
        storage.delete_file("a").unwrap();
        assert_eq!(storage.list_files().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_missing_file() {
        let storage = MemoryStorage::new();
        assert!(storage.open_input("nope").is_err());
    }
}
