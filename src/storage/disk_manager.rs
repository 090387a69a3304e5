//! Disk Manager - low-level file I/O for offset-addressed records.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing fixed-size records at byte offsets
//! - Truncating the store for a reset
//! - Managing the database file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::{Error, Result};

/// Manages disk I/O for a single store file.
///
/// # File Layout
/// Records of different sizes are packed back to back; the caller decides
/// where each one lives:
/// ```text
/// ┌──────────┬───────────────┬───────────────┬─────
/// │ Header   │ Internal node │ Leaf node     │ ...
/// │ (128 B)  │ 18 + M·(K+8)  │ 33 + L·(K+V)  │
/// └──────────┴───────────────┴───────────────┴─────
/// Offset: 0  128
/// ```
///
/// # Thread Safety
/// `DiskManager` is **single-threaded**. The tree keeps it behind a mutex.
///
/// # Durability
/// Writes go straight to the file without caching. With `sync_on_write`
/// every write is followed by `sync_data()`; otherwise durability is up to
/// [`DiskManager::sync`].
pub struct DiskManager {
    file: File,
    /// Current file length in bytes.
    len: u64,
    sync_on_write: bool,
}

impl DiskManager {
    /// Create a new store file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            len: 0,
            sync_on_write: false,
        })
    }

    /// Open an existing store file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            file,
            len,
            sync_on_write: false,
        })
    }

    /// Open an existing store file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    pub fn set_sync_on_write(&mut self, sync: bool) {
        self.sync_on_write = sync;
    }

    /// Read `buf.len()` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` if the range extends past the end of the
    /// file: every record that is referenced must have been written.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset + buf.len() as u64;
        if end > self.len {
            return Err(Error::corrupted(
                offset,
                format!("record ends at {} past end of store ({})", end, self.len),
            ));
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Write `buf` starting at `offset`, extending the file if needed.
    pub fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        if self.sync_on_write {
            self.file.sync_data()?;
        }

        self.len = self.len.max(offset + buf.len() as u64);
        Ok(())
    }

    /// Discard the whole contents of the file.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.len = 0;
        Ok(())
    }

    /// Flush file contents and metadata to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Get the size of the store file in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
