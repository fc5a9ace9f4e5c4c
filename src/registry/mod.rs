//! Named collection of griddles backed by one dump directory.
//!
//! A [`GriddleRegistry`] owns the name → [`Griddle`] map, derives dump file
//! names from its [`GriddleConfig`], and restores every instance found in the
//! dump directory when opened. Share it behind an `Arc`; all methods take
//! `&self`.
//!
//! # Locking
//!
//! The map sits behind a `parking_lot::RwLock` that is held only long enough
//! to look up, insert or remove entries; no file I/O happens under it.
//! Restores and bulk dumps are serialized by a separate registry dump mutex.
//!
//! # Examples
//!
//! ```
//! use griddle::{GriddleConfig, GriddleRegistry};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = GriddleConfig::builder().dump_dir(dir.path()).vector_size(1024).build()?;
//!
//! let registry = GriddleRegistry::open(config.clone())?;
//! registry.add_griddle("votes", 2)?;
//! assert!(registry.increase_insert_count_by_one("votes", "user-1")?);
//! assert_eq!(registry.remaining_inserts("votes", "user-1")?, 1);
//! registry.dump_all();
//! drop(registry);
//!
//! let reopened = GriddleRegistry::open(config)?;
//! assert_eq!(reopened.inserted_count("votes", "user-1")?, 1);
//! # Ok::<(), griddle::GriddleError>(())
//! ```

pub mod maintenance;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::{is_plain_segment, GriddleConfig};
use crate::core::Key;
use crate::error::{GriddleError, Result};
use crate::griddle::{Griddle, TMP_SUFFIX};

pub use maintenance::MaintenanceHandle;

/// Outcome of [`GriddleRegistry::dump_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    /// Instances written successfully.
    pub dumped: usize,
    /// Names of instances whose dump failed.
    pub failed: Vec<String>,
}

impl DumpSummary {
    /// Whether every dump succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of [`GriddleRegistry::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Instances recycled by the final recycle pass.
    pub recycled: usize,
    /// Result of the final dump pass.
    pub dump: DumpSummary,
}

/// Name → griddle map with a shared configuration and dump directory.
#[derive(Debug)]
pub struct GriddleRegistry {
    config: GriddleConfig,
    griddles: RwLock<HashMap<String, Arc<Griddle>>>,
    dump_lock: Mutex<()>,
    shut_down: AtomicBool,
}

impl GriddleRegistry {
    /// Create the dump directory if needed and restore every instance found
    /// in it.
    ///
    /// Files not named `<name>.<max>.<ext>` (with this configuration's
    /// extension and a positive max) are skipped. Leftover `<dump>.tmp` files
    /// from an interrupted dump are deleted. A file whose content cannot
    /// be restored yields a fresh, empty instance under that name.
    ///
    /// # Errors
    ///
    /// Returns `MappingFailure` if the directory cannot be created or listed.
    pub fn open(config: GriddleConfig) -> Result<Self> {
        let dir = config.dump_dir().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| GriddleError::mapping_failure(&dir, e))?;

        let mut file_names = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| GriddleError::mapping_failure(&dir, e))? {
            let entry = entry.map_err(|e| GriddleError::mapping_failure(&dir, e))?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => file_names.push(name),
                Err(raw) => tracing::debug!(file = ?raw, "skipping non UTF-8 file name"),
            }
        }
        file_names.sort();

        let registry = Self {
            config,
            griddles: RwLock::new(HashMap::new()),
            dump_lock: Mutex::new(()),
            shut_down: AtomicBool::new(false),
        };

        {
            let _dump = registry.dump_lock.lock();
            for file_name in file_names {
                if let Some(stem) = file_name.strip_suffix(TMP_SUFFIX) {
                    if registry.config.parse_dump_file_name(stem).is_some() {
                        remove_stale_tmp(&dir.join(&file_name));
                    }
                    continue;
                }
                let Some((name, max)) = registry.config.parse_dump_file_name(&file_name) else {
                    tracing::debug!(file = %file_name, "skipping file that is not a dump");
                    continue;
                };
                if registry.griddles.read().contains_key(&name) {
                    tracing::warn!(griddle = %name, file = %file_name, "duplicate dump file ignored");
                    continue;
                }
                let griddle = Griddle::restore_or_construct(
                    name.clone(),
                    max,
                    registry.config.filter_config(),
                    dir.join(&file_name),
                )?;
                registry.griddles.write().insert(name, Arc::new(griddle));
            }
        }

        tracing::info!(
            dir = %dir.display(),
            griddles = registry.len(),
            "griddle registry opened"
        );
        Ok(registry)
    }

    /// Registry configuration.
    #[must_use]
    pub fn config(&self) -> &GriddleConfig {
        &self.config
    }

    /// Number of registered instances, recycled or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.griddles.read().len()
    }

    /// Whether no instance is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.griddles.read().is_empty()
    }

    /// Register a fresh instance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `name` is empty or contains `.` or a path
    /// separator, `max_repeat_insert_count` is 0, or the name is taken.
    pub fn add_griddle(&self, name: &str, max_repeat_insert_count: u32) -> Result<Arc<Griddle>> {
        if !is_plain_segment(name) {
            return Err(GriddleError::invalid_argument(format!(
                "griddle name '{name}' must be non-empty without '.' or path separators"
            )));
        }
        if max_repeat_insert_count == 0 {
            return Err(GriddleError::invalid_argument(
                "max repeat insert count must be positive",
            ));
        }

        let mut griddles = self.griddles.write();
        if griddles.contains_key(name) {
            return Err(GriddleError::invalid_argument(format!(
                "griddle '{name}' is already registered"
            )));
        }
        let griddle = Arc::new(Griddle::construct(
            name,
            max_repeat_insert_count,
            self.config.filter_config(),
            self.config.dump_path(name, max_repeat_insert_count),
        )?);
        griddles.insert(name.to_string(), Arc::clone(&griddle));
        drop(griddles);

        tracing::info!(griddle = %name, max_repeat_insert_count, "griddle added");
        Ok(griddle)
    }

    /// Look up an instance.
    ///
    /// # Errors
    ///
    /// Returns `UnknownGriddle` if no instance has this name.
    pub fn get(&self, name: &str) -> Result<Arc<Griddle>> {
        self.griddles
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| GriddleError::unknown_griddle(name))
    }

    /// Change an instance's insert ceiling and move its dump file to the
    /// matching name. A failed rename leaves the old ceiling in place.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for 0, `UnknownGriddle`, `AlreadyRecycled`, or
    /// `MappingFailure` if the dump file cannot be renamed.
    pub fn update_max_repeat_insert_count(&self, name: &str, max_repeat_insert_count: u32) -> Result<()> {
        self.get(name)?.update_max_repeat_insert_count(
            max_repeat_insert_count,
            self.config.dump_path(name, max_repeat_insert_count),
        )
    }

    /// Count one insert of `keyword` into `name`; `false` if refused by the
    /// ceiling.
    ///
    /// # Errors
    ///
    /// `UnknownGriddle`, `AlreadyRecycled`, or `InvalidArgument` for an
    /// empty keyword.
    pub fn increase_insert_count_by_one<'k>(&self, name: &str, keyword: impl Into<Key<'k>>) -> Result<bool> {
        self.get(name)?.add(keyword)
    }

    /// Approximate inserts of `keyword` into `name`.
    ///
    /// # Errors
    ///
    /// As for [`increase_insert_count_by_one`](Self::increase_insert_count_by_one).
    pub fn inserted_count<'k>(&self, name: &str, keyword: impl Into<Key<'k>>) -> Result<u32> {
        self.get(name)?.inserted_count(keyword)
    }

    /// Inserts of `keyword` left before `name`'s ceiling.
    ///
    /// # Errors
    ///
    /// As for [`increase_insert_count_by_one`](Self::increase_insert_count_by_one).
    pub fn remaining_inserts<'k>(&self, name: &str, keyword: impl Into<Key<'k>>) -> Result<u32> {
        self.get(name)?.remaining_inserts(keyword)
    }

    /// Mark `name` for recycling by the next recycle pass.
    ///
    /// # Errors
    ///
    /// `UnknownGriddle` or `AlreadyRecycled`.
    pub fn mark_to_recycle(&self, name: &str) -> Result<()> {
        self.get(name)?.mark_to_recycle()
    }

    /// Sorted names of instances not yet recycled.
    #[must_use]
    pub fn active_griddle_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .griddles
            .read()
            .iter()
            .filter(|(_, g)| !g.is_recycled())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn snapshot(&self) -> Vec<Arc<Griddle>> {
        self.griddles.read().values().cloned().collect()
    }

    /// Recycle every marked, unused instance and drop it from the map.
    ///
    /// Failures are logged; those instances stay registered and are retried
    /// next pass. Returns the number of instances removed.
    pub fn recycle_griddles(&self) -> usize {
        for griddle in self.snapshot() {
            if griddle.is_recycled() {
                continue;
            }
            match griddle.recycle() {
                Ok(_) => {}
                Err(GriddleError::AlreadyRecycled { .. }) => {}
                Err(e) => tracing::error!(griddle = %griddle.name(), error = %e, "recycle failed"),
            }
        }

        let mut griddles = self.griddles.write();
        let before = griddles.len();
        griddles.retain(|_, g| !g.is_recycled());
        let removed = before - griddles.len();
        drop(griddles);

        if removed > 0 {
            tracing::info!(removed, "recycled griddles removed");
        }
        removed
    }

    /// Dump every live instance. Failures are logged and reported, never
    /// propagated.
    pub fn dump_all(&self) -> DumpSummary {
        let _dump = self.dump_lock.lock();
        let mut summary = DumpSummary::default();
        for griddle in self.snapshot() {
            match griddle.dump_to_disk() {
                Ok(()) => summary.dumped += 1,
                Err(GriddleError::AlreadyRecycled { .. }) => {}
                Err(e) => {
                    tracing::error!(griddle = %griddle.name(), error = %e, "dump failed");
                    summary.failed.push(griddle.name().to_string());
                }
            }
        }
        summary.failed.sort();
        tracing::debug!(dumped = summary.dumped, failed = summary.failed.len(), "dump pass finished");
        summary
    }

    /// Final recycle pass followed by a final dump pass. Later calls do
    /// nothing and return an empty report.
    pub fn shutdown(&self) -> ShutdownReport {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return ShutdownReport::default();
        }
        tracing::info!("griddle registry shutting down");
        let recycled = self.recycle_griddles();
        let dump = self.dump_all();
        ShutdownReport { recycled, dump }
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

fn remove_stale_tmp(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::warn!(path = %path.display(), "removed leftover dump temp file"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "leftover dump temp file not removed"),
    }
}
