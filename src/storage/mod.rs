//! Memory-mapped file regions with deterministic release.
//!
//! [`MappedFile`] owns an open file and, once
//! [`acquire_mapping`](MappedFile::acquire_mapping) has been called, a
//! writable mapping of the whole file. [`release`](MappedFile::release)
//! flushes the mapping, unmaps it synchronously and closes the file, so a
//! rename or delete of the path right afterwards never races a lingering
//! mapping. Dropping a `MappedFile` releases it as well.
//!
//! The mutable view borrows the `MappedFile`, so touching it after
//! `release()` does not compile:
//!
//! ```compile_fail
//! # fn demo(mut file: griddle::storage::MappedFile) -> griddle::Result<()> {
//! let view = file.acquire_mapping()?;
//! file.release()?;
//! view[0] = 1;
//! # Ok(())
//! # }
//! ```
//!
//! # Examples
//!
//! ```
//! use griddle::storage::MappedFile;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("region.bin");
//!
//! let mut file = MappedFile::open(&path, 16)?;
//! file.acquire_mapping()?[..4].copy_from_slice(b"grid");
//! file.release()?;
//!
//! assert_eq!(&std::fs::read(&path).unwrap()[..4], b"grid");
//! # Ok::<(), griddle::GriddleError>(())
//! ```

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{GriddleError, Result};

/// A file plus an optional writable mapping of all of it.
#[derive(Debug)]
pub struct MappedFile {
    path: PathBuf,
    len: usize,
    file: Option<File>,
    mmap: Option<MmapMut>,
}

impl MappedFile {
    /// Open (creating if needed) `path` and size it to exactly `len` bytes.
    ///
    /// Existing content up to `len` is preserved.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty path or a zero length, and
    /// `MappingFailure` if the file cannot be created or resized.
    pub fn open(path: impl AsRef<Path>, len: usize) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(GriddleError::invalid_argument("mapped file path is empty"));
        }
        if len == 0 {
            return Err(GriddleError::invalid_argument(
                "mapped file size must be positive",
            ));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| GriddleError::mapping_failure(path, e))?;
        file.set_len(len as u64)
            .map_err(|e| GriddleError::mapping_failure(path, e))?;

        tracing::trace!(path = %path.display(), len, "opened mapped file");
        Ok(Self {
            path: path.to_path_buf(),
            len,
            file: Some(file),
            mmap: None,
        })
    }

    /// Open an existing, non-empty file at its current length.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty path and `MappingFailure` if
    /// the file is missing, unreadable or empty.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(GriddleError::invalid_argument("mapped file path is empty"));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| GriddleError::mapping_failure(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| GriddleError::mapping_failure(path, e))?
            .len();
        let len = usize::try_from(len).map_err(|_| {
            GriddleError::mapping_failure(
                path,
                io::Error::new(io::ErrorKind::InvalidData, "file too large to map"),
            )
        })?;
        if len == 0 {
            return Err(GriddleError::mapping_failure(
                path,
                io::Error::new(io::ErrorKind::UnexpectedEof, "file is empty"),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            len,
            file: Some(file),
            mmap: None,
        })
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the region in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; zero-length regions are rejected on open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether [`release`](Self::release) has run.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.file.is_none()
    }

    /// Writable view of the whole region, mapping it on first use.
    ///
    /// # Errors
    ///
    /// Returns `MappingFailure` if the file has been released or the mapping
    /// cannot be created.
    pub fn acquire_mapping(&mut self) -> Result<&mut [u8]> {
        let Some(file) = self.file.as_ref() else {
            return Err(GriddleError::mapping_failure(
                &self.path,
                io::Error::new(io::ErrorKind::Other, "mapping already released"),
            ));
        };

        if self.mmap.is_none() {
            // SAFETY: the file stays open for the lifetime of the mapping and
            // this process does not resize it while mapped. Concurrent writers
            // from other processes are outside the contract.
            let mmap = unsafe { MmapMut::map_mut(file) }
                .map_err(|e| GriddleError::mapping_failure(&self.path, e))?;
            if mmap.len() != self.len {
                return Err(GriddleError::mapping_failure(
                    &self.path,
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("mapped {} bytes, expected {}", mmap.len(), self.len),
                    ),
                ));
            }
            self.mmap = Some(mmap);
        }

        match self.mmap.as_mut() {
            Some(mmap) => Ok(&mut mmap[..]),
            None => Err(GriddleError::mapping_failure(
                &self.path,
                io::Error::new(io::ErrorKind::Other, "mapping unavailable"),
            )),
        }
    }

    /// Flush, unmap and close. Idempotent.
    ///
    /// The mapping and file handle are dropped even when flushing fails.
    ///
    /// # Errors
    ///
    /// Returns `MappingFailure` if flushing the mapping or syncing the file
    /// fails.
    pub fn release(&mut self) -> Result<()> {
        let flushed = match self.mmap.take() {
            Some(mmap) => mmap.flush(),
            None => Ok(()),
        };
        let synced = match self.file.take() {
            Some(file) if flushed.is_ok() => file.sync_all(),
            _ => Ok(()),
        };
        flushed
            .and(synced)
            .map_err(|e| GriddleError::mapping_failure(&self.path, e))
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(path = %self.path.display(), error = %e, "release on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_sizes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        let file = MappedFile::open(&path, 100).unwrap();
        assert_eq!(file.len(), 100);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 100);
    }

    #[test]
    fn test_open_resizes_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, vec![7u8; 300]).unwrap();
        let mut file = MappedFile::open(&path, 10).unwrap();
        assert_eq!(file.acquire_mapping().unwrap(), &[7u8; 10]);
        file.release().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 10);
    }

    #[test]
    fn test_open_rejects_bad_arguments() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            MappedFile::open(dir.path().join("z.bin"), 0),
            Err(GriddleError::InvalidArgument { .. })
        ));
        assert!(matches!(
            MappedFile::open("", 8),
            Err(GriddleError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("a.bin");
        assert!(matches!(
            MappedFile::open(path, 8),
            Err(GriddleError::MappingFailure { .. })
        ));
    }

    #[test]
    fn test_write_release_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        let mut file = MappedFile::open(&path, 8).unwrap();
        file.acquire_mapping()
            .unwrap()
            .copy_from_slice(&0x0102_0304_0506_0708u64.to_be_bytes());
        file.release().unwrap();
        assert!(file.is_released());
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_release_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut file = MappedFile::open(dir.path().join("a.bin"), 8).unwrap();
        file.acquire_mapping().unwrap();
        file.release().unwrap();
        file.release().unwrap();
    }

    #[test]
    fn test_acquire_after_release_fails() {
        let dir = tempdir().unwrap();
        let mut file = MappedFile::open(dir.path().join("a.bin"), 8).unwrap();
        file.release().unwrap();
        assert!(matches!(
            file.acquire_mapping(),
            Err(GriddleError::MappingFailure { .. })
        ));
    }

    #[test]
    fn test_open_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"hello").unwrap();
        let mut file = MappedFile::open_existing(&path).unwrap();
        assert_eq!(file.len(), 5);
        assert_eq!(file.acquire_mapping().unwrap(), b"hello");
    }

    #[test]
    fn test_open_existing_missing_or_empty() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("none.bin");
        assert!(matches!(
            MappedFile::open_existing(&missing),
            Err(GriddleError::MappingFailure { .. })
        ));
        let empty = dir.path().join("empty.bin");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(
            MappedFile::open_existing(&empty),
            Err(GriddleError::MappingFailure { .. })
        ));
    }

    #[test]
    fn test_drop_releases_for_rename() {
        let dir = tempdir().unwrap();
        let tmp = dir.path().join("a.tmp");
        let dst = dir.path().join("a.dat");
        {
            let mut file = MappedFile::open(&tmp, 4).unwrap();
            file.acquire_mapping().unwrap().copy_from_slice(b"done");
        }
        std::fs::rename(&tmp, &dst).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"done");
    }
}
