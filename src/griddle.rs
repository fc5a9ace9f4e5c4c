//! Durable, recyclable counting filter instance.
//!
//! A [`Griddle`] pairs a [`CountingFilter`] (inside a
//! [`ReclaimableSection`]) with a per-key insert ceiling and a dump file.
//!
//! # Lifecycle
//!
//! ```text
//! Active ──mark_to_recycle()──► EligibleForRecycle ──recycle()──► Recycled
//! ```
//!
//! `recycle()` only succeeds once no caller is inside the filter. After that
//! the filter memory is gone, the dump file is deleted, and every operation
//! fails with `AlreadyRecycled`.
//!
//! # Dumps
//!
//! [`Griddle::dump_to_disk`] writes the filter to `<dump>.tmp` through a
//! memory mapping, releases the mapping, then renames the temporary file over
//! the dump. A crash mid-dump leaves the previous dump intact.
//!
//! # Examples
//!
//! ```
//! use griddle::{FilterConfig, Griddle};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = FilterConfig::with_vector_size(1024)?;
//! let griddle = Griddle::construct("votes", 2, config, dir.path().join("votes.2.dat"))?;
//!
//! assert!(griddle.add("user-1")?);
//! assert!(griddle.add("user-1")?);
//! assert!(!griddle.add("user-1")?);
//! assert_eq!(griddle.remaining_inserts("user-1")?, 0);
//!
//! griddle.dump_to_disk()?;
//! let restored = Griddle::restore_or_construct("votes", 2, config, dir.path().join("votes.2.dat"))?;
//! assert_eq!(restored.inserted_count("user-1")?, 2);
//! # Ok::<(), griddle::GriddleError>(())
//! ```

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::core::{FilterConfig, Key};
use crate::error::{GriddleError, Result};
use crate::filters::CountingFilter;
use crate::storage::MappedFile;
use crate::sync::{ReclaimableSection, SectionGuard};

/// Attempts made to delete the dump file during recycling.
pub const RECYCLE_DELETE_ATTEMPTS: u32 = 3;

/// Suffix appended to the dump path for the in-progress file.
pub const TMP_SUFFIX: &str = ".tmp";

/// A named counting filter with an insert ceiling and a dump file.
#[derive(Debug)]
pub struct Griddle {
    name: String,
    config: FilterConfig,
    max_repeat_insert_count: AtomicU32,
    dump_path: RwLock<PathBuf>,
    section: ReclaimableSection,
    recycled: AtomicBool,
    dump_lock: Mutex<()>,
}

impl Griddle {
    /// Fresh instance with an empty filter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `name` or `dump_path` is empty or
    /// `max_repeat_insert_count` is 0.
    pub fn construct(
        name: impl Into<String>,
        max_repeat_insert_count: u32,
        config: FilterConfig,
        dump_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let name = name.into();
        let dump_path = dump_path.into();
        validate(&name, max_repeat_insert_count, &dump_path)?;
        Ok(Self::with_filter(
            name,
            max_repeat_insert_count,
            dump_path,
            CountingFilter::new(config),
        ))
    }

    /// Restore from `dump_path` if it holds a filter matching `config`,
    /// otherwise start fresh.
    ///
    /// A missing, unreadable, malformed or mismatched dump is logged and
    /// replaced by an empty filter; the file itself is left for the next dump
    /// to overwrite.
    ///
    /// # Errors
    ///
    /// Only the argument checks of [`construct`](Self::construct).
    pub fn restore_or_construct(
        name: impl Into<String>,
        max_repeat_insert_count: u32,
        config: FilterConfig,
        dump_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let name = name.into();
        let dump_path = dump_path.into();
        validate(&name, max_repeat_insert_count, &dump_path)?;

        if !dump_path.exists() {
            tracing::info!(griddle = %name, path = %dump_path.display(), "no dump file, constructing fresh");
            return Self::construct(name, max_repeat_insert_count, config, dump_path);
        }

        tracing::info!(griddle = %name, path = %dump_path.display(), "restoring from dump file");
        let filter = match load_filter(&dump_path) {
            Ok(filter) => match filter.config().ensure_compatible(&config) {
                Ok(()) => filter,
                Err(e) => {
                    tracing::warn!(
                        griddle = %name,
                        error = %e,
                        "dump configuration differs, constructing fresh"
                    );
                    CountingFilter::new(config)
                }
            },
            Err(e) => {
                tracing::error!(
                    griddle = %name,
                    path = %dump_path.display(),
                    error = %e,
                    recoverable = e.is_restore_recoverable(),
                    "restore failed, constructing fresh"
                );
                CountingFilter::new(config)
            }
        };
        Ok(Self::with_filter(name, max_repeat_insert_count, dump_path, filter))
    }

    fn with_filter(
        name: String,
        max_repeat_insert_count: u32,
        dump_path: PathBuf,
        filter: CountingFilter,
    ) -> Self {
        Self {
            config: filter.config(),
            section: ReclaimableSection::new(name.clone(), filter),
            name,
            max_repeat_insert_count: AtomicU32::new(max_repeat_insert_count),
            dump_path: RwLock::new(dump_path),
            recycled: AtomicBool::new(false),
            dump_lock: Mutex::new(()),
        }
    }

    /// Instance name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filter configuration.
    #[must_use]
    pub fn config(&self) -> FilterConfig {
        self.config
    }

    /// Current insert ceiling per key.
    #[must_use]
    pub fn max_repeat_insert_count(&self) -> u32 {
        self.max_repeat_insert_count.load(Ordering::Acquire)
    }

    /// Change the insert ceiling.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for 0 and `AlreadyRecycled` after recycling.
    pub fn set_max_repeat_insert_count(&self, max: u32) -> Result<()> {
        self.ensure_live()?;
        if max == 0 {
            return Err(GriddleError::invalid_argument(
                "max repeat insert count must be positive",
            ));
        }
        self.max_repeat_insert_count.store(max, Ordering::Release);
        Ok(())
    }

    /// Canonical dump file path.
    #[must_use]
    pub fn dump_path(&self) -> PathBuf {
        self.dump_path.read().clone()
    }

    /// Path of the in-progress dump file.
    #[must_use]
    pub fn tmp_dump_path(&self) -> PathBuf {
        tmp_path_for(&self.dump_path.read())
    }

    /// Size in bytes of a dump of this instance.
    #[must_use]
    pub fn dump_size(&self) -> usize {
        self.config.persisted_len()
    }

    /// Whether [`recycle`](Self::recycle) has completed.
    #[must_use]
    pub fn is_recycled(&self) -> bool {
        self.recycled.load(Ordering::Acquire)
    }

    /// Whether [`mark_to_recycle`](Self::mark_to_recycle) has been called.
    #[must_use]
    pub fn is_marked_to_recycle(&self) -> bool {
        self.section.is_eligible()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_recycled() {
            return Err(GriddleError::already_recycled(&self.name));
        }
        Ok(())
    }

    fn enter(&self) -> Result<SectionGuard<'_>> {
        self.ensure_live()?;
        self.section.enter()
    }

    /// Count one insert of `keyword` unless it already reached the ceiling.
    ///
    /// Returns `false` when refused. The ceiling is soft: concurrent inserts
    /// of one keyword may each pass the check before any of them lands.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty keyword, `AlreadyRecycled` after
    /// recycling.
    pub fn add<'k>(&self, keyword: impl Into<Key<'k>>) -> Result<bool> {
        let keyword = keyword.into();
        let filter = self.enter()?;
        if filter.approximate_count(keyword)? >= self.max_repeat_insert_count() {
            return Ok(false);
        }
        filter.add(keyword)?;
        Ok(true)
    }

    /// How many times `keyword` has been inserted (approximately).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty keyword, `AlreadyRecycled` after
    /// recycling.
    pub fn inserted_count<'k>(&self, keyword: impl Into<Key<'k>>) -> Result<u32> {
        self.enter()?.approximate_count(keyword)
    }

    /// Inserts left before `keyword` hits the ceiling, never negative.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty keyword, `AlreadyRecycled` after
    /// recycling.
    pub fn remaining_inserts<'k>(&self, keyword: impl Into<Key<'k>>) -> Result<u32> {
        let inserted = self.inserted_count(keyword)?;
        Ok(self.max_repeat_insert_count().saturating_sub(inserted))
    }

    /// Allow [`recycle`](Self::recycle) to free this instance once unused.
    ///
    /// # Errors
    ///
    /// `AlreadyRecycled` after recycling.
    pub fn mark_to_recycle(&self) -> Result<()> {
        self.ensure_live()?;
        tracing::info!(griddle = %self.name, "marked to recycle");
        self.section.mark_eligible();
        Ok(())
    }

    /// Free the filter and delete the dump file if marked and unused.
    ///
    /// Returns `Ok(false)` when the instance is not marked or still in use.
    /// A failed deletion leaves the instance unrecycled, and the next call
    /// retries it.
    ///
    /// # Errors
    ///
    /// `AlreadyRecycled` if recycling already completed, `RecycleFailed` if
    /// the dump file could not be deleted after
    /// [`RECYCLE_DELETE_ATTEMPTS`] attempts.
    pub fn recycle(&self) -> Result<bool> {
        self.ensure_live()?;
        let _dump = self.dump_lock.lock();
        self.ensure_live()?;

        if !self.section.try_reclaim() && !self.section.is_reclaimed() {
            return Ok(false);
        }

        let dump_path = self.dump_path();
        tracing::debug!(griddle = %self.name, path = %dump_path.display(), "recycling");
        delete_with_retry(&dump_path)?;
        remove_quietly(&tmp_path_for(&dump_path));

        self.recycled.store(true, Ordering::Release);
        tracing::info!(griddle = %self.name, "recycled");
        Ok(true)
    }

    /// Write the filter to the dump file, replacing any previous dump
    /// atomically.
    ///
    /// Concurrent dumps of one instance run one after another.
    ///
    /// # Errors
    ///
    /// `AlreadyRecycled` after recycling; `DumpFailed` wrapping the cause
    /// when writing or renaming fails.
    pub fn dump_to_disk(&self) -> Result<()> {
        let _dump = self.dump_lock.lock();
        let filter = self.enter()?;
        let dump_path = self.dump_path();
        let tmp_path = tmp_path_for(&dump_path);

        tracing::debug!(griddle = %self.name, path = %dump_path.display(), "dumping");
        let written = write_filter(&filter, &tmp_path);
        drop(filter);

        let result = written.and_then(|()| {
            fs::rename(&tmp_path, &dump_path).map_err(|e| GriddleError::mapping_failure(&dump_path, e))?;
            sync_parent_dir(&dump_path)
        });
        result.map_err(|e| {
            remove_quietly(&tmp_path);
            tracing::error!(griddle = %self.name, path = %dump_path.display(), error = %e, "dump failed");
            GriddleError::dump_failed(&dump_path, e)
        })
    }

    /// Point the instance at a new dump path, moving an existing dump file
    /// along.
    ///
    /// # Errors
    ///
    /// `AlreadyRecycled` after recycling, `InvalidArgument` for an empty
    /// path, `MappingFailure` if the rename fails.
    pub fn relocate_dump(&self, new_path: impl Into<PathBuf>) -> Result<()> {
        let new_path = new_path.into();
        if new_path.as_os_str().is_empty() {
            return Err(GriddleError::invalid_argument("dump path is empty"));
        }
        let _dump = self.dump_lock.lock();
        self.ensure_live()?;
        self.move_dump(new_path)
    }

    /// Change the insert ceiling and move the dump file to `new_path` as one
    /// step.
    ///
    /// The file is renamed first. If that fails, the ceiling and the dump
    /// path stay as they were, so memory and disk never disagree about which
    /// ceiling a restart restores.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for 0 or an empty path, `AlreadyRecycled` after
    /// recycling, `MappingFailure` if the rename fails.
    pub fn update_max_repeat_insert_count(&self, max: u32, new_path: impl Into<PathBuf>) -> Result<()> {
        let new_path = new_path.into();
        if max == 0 {
            return Err(GriddleError::invalid_argument(
                "max repeat insert count must be positive",
            ));
        }
        if new_path.as_os_str().is_empty() {
            return Err(GriddleError::invalid_argument("dump path is empty"));
        }
        let _dump = self.dump_lock.lock();
        self.ensure_live()?;
        self.move_dump(new_path)?;
        self.max_repeat_insert_count.store(max, Ordering::Release);
        tracing::info!(griddle = %self.name, max_repeat_insert_count = max, "ceiling updated");
        Ok(())
    }

    // Caller holds `dump_lock`.
    fn move_dump(&self, new_path: PathBuf) -> Result<()> {
        let mut current = self.dump_path.write();
        if *current == new_path {
            return Ok(());
        }
        match fs::rename(&*current, &new_path) {
            Ok(()) => sync_parent_dir(&new_path)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(GriddleError::mapping_failure(&current, e)),
        }
        tracing::info!(
            griddle = %self.name,
            from = %current.display(),
            to = %new_path.display(),
            "dump relocated"
        );
        *current = new_path;
        Ok(())
    }
}

fn validate(name: &str, max_repeat_insert_count: u32, dump_path: &Path) -> Result<()> {
    if name.is_empty() {
        return Err(GriddleError::invalid_argument("griddle name is empty"));
    }
    if max_repeat_insert_count == 0 {
        return Err(GriddleError::invalid_argument(
            "max repeat insert count must be positive",
        ));
    }
    if dump_path.as_os_str().is_empty() {
        return Err(GriddleError::invalid_argument("dump path is empty"));
    }
    Ok(())
}

fn tmp_path_for(dump_path: &Path) -> PathBuf {
    let mut tmp = OsString::from(dump_path.as_os_str());
    tmp.push(TMP_SUFFIX);
    PathBuf::from(tmp)
}

fn load_filter(path: &Path) -> Result<CountingFilter> {
    let mut file = MappedFile::open_existing(path)?;
    let filter = CountingFilter::deserialize(file.acquire_mapping()?)?;
    file.release()?;
    Ok(filter)
}

fn write_filter(filter: &CountingFilter, path: &Path) -> Result<()> {
    let mut file = MappedFile::open(path, filter.serialized_len())?;
    filter.write_to(file.acquire_mapping()?)?;
    file.release()
}

/// Make a completed rename in `path`'s directory durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| GriddleError::mapping_failure(dir, e))
}

// Directory handles cannot be synced here; the rename is as durable as the
// platform makes it.
#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}

fn delete_with_retry(path: &Path) -> Result<()> {
    let mut last_error = None;
    for attempt in 1..=RECYCLE_DELETE_ATTEMPTS {
        match fs::remove_file(path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                tracing::warn!(path = %path.display(), attempt, error = %e, "deleting dump file failed");
                last_error = Some(e);
            }
        }
    }
    let source = last_error
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "dump file deletion failed"));
    Err(GriddleError::recycle_failed(path, RECYCLE_DELETE_ATTEMPTS, source))
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), error = %e, "leftover file not removed");
        }
    }
}
