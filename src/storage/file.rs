//! Filesystem storage backend.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;

use crate::error::{Result, VerbenaError};
use crate::storage::{Storage, StorageInput, StorageOutput};

/// Storage backend rooted at one directory; each file name maps to a
/// regular file inside it. Reads are served from a shared memory map.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(FileStorage { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Storage for FileStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let file = File::open(self.path(name))?;
        // The dictionary files are written once and never mutated in
        // place, which is what makes the shared map sound.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Box::new(FileInput { map: Arc::new(map) }))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.path(name))?;
        Ok(Box::new(FileOutput {
            file: Some(file),
        }))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        fs::remove_file(self.path(name))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct FileInput {
    map: Arc<Mmap>,
}

impl StorageInput for FileInput {
    fn len(&self) -> u64 {
        self.map.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = offset as usize;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.map.len())
            .ok_or_else(|| VerbenaError::corrupt("read past end of file"))?;
        buf.copy_from_slice(&self.map[start..end]);
        Ok(())
    }

    fn clone_input(&self) -> Box<dyn StorageInput> {
        Box::new(self.clone())
    }
}

struct FileOutput {
    file: Option<File>,
}

impl StorageOutput for FileOutput {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| VerbenaError::illegal_state("output already finished"))?;
        file.write_all(data)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| VerbenaError::illegal_state("output already finished"))?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}
