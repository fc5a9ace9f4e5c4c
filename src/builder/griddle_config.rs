//! Type-state builder for [`GriddleConfig`].

use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    GriddleConfig, DEFAULT_DUMP_FILE_EXTENSION, DEFAULT_DUMP_INTERVAL,
    DEFAULT_RECYCLE_CHECK_INTERVAL,
};
use crate::core::{FilterConfig, DEFAULT_HASH_COUNT};
use crate::error::Result;
use crate::hash::HashKind;

/// Type-state marker: nothing required has been set.
#[derive(Debug)]
pub struct Initial;

/// Type-state marker: dump directory is set.
#[derive(Debug)]
pub struct WithDir;

/// Type-state marker: all required parameters set.
#[derive(Debug)]
pub struct Complete;

/// Builder for [`GriddleConfig`].
///
/// Required: dump directory, then vector size. Optional (any state):
///
/// | Setter | Default |
/// |--------|---------|
/// | `hash_count` | 20 |
/// | `hash_kind` | `HashKind::Murmur` |
/// | `dump_interval` | 60 s |
/// | `recycle_check_interval` | 30 s |
/// | `dump_file_extension` | `"dat"` |
#[derive(Debug)]
pub struct GriddleConfigBuilder<State> {
    dump_dir: PathBuf,
    vector_size: u32,
    hash_count: u32,
    hash_kind: HashKind,
    dump_interval: Duration,
    recycle_check_interval: Duration,
    dump_file_extension: String,
    _state: PhantomData<State>,
}

impl GriddleConfigBuilder<Initial> {
    /// Builder with every optional parameter at its default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dump_dir: PathBuf::new(),
            vector_size: 0,
            hash_count: DEFAULT_HASH_COUNT,
            hash_kind: HashKind::default(),
            dump_interval: DEFAULT_DUMP_INTERVAL,
            recycle_check_interval: DEFAULT_RECYCLE_CHECK_INTERVAL,
            dump_file_extension: DEFAULT_DUMP_FILE_EXTENSION.to_string(),
            _state: PhantomData,
        }
    }

    /// Directory holding dump files. Created by the registry on open.
    #[must_use]
    pub fn dump_dir(self, dir: impl Into<PathBuf>) -> GriddleConfigBuilder<WithDir> {
        GriddleConfigBuilder {
            dump_dir: dir.into(),
            ..self.transition()
        }
    }
}

impl Default for GriddleConfigBuilder<Initial> {
    fn default() -> Self {
        Self::new()
    }
}

impl GriddleConfigBuilder<WithDir> {
    /// Number of buckets per filter.
    #[must_use]
    pub fn vector_size(self, vector_size: u32) -> GriddleConfigBuilder<Complete> {
        GriddleConfigBuilder {
            vector_size,
            ..self.transition()
        }
    }
}

impl<State> GriddleConfigBuilder<State> {
    fn transition<Next>(self) -> GriddleConfigBuilder<Next> {
        GriddleConfigBuilder {
            dump_dir: self.dump_dir,
            vector_size: self.vector_size,
            hash_count: self.hash_count,
            hash_kind: self.hash_kind,
            dump_interval: self.dump_interval,
            recycle_check_interval: self.recycle_check_interval,
            dump_file_extension: self.dump_file_extension,
            _state: PhantomData,
        }
    }

    /// Hash functions per key.
    #[must_use]
    pub fn hash_count(mut self, hash_count: u32) -> Self {
        self.hash_count = hash_count;
        self
    }

    /// Hash family.
    #[must_use]
    pub fn hash_kind(mut self, hash_kind: HashKind) -> Self {
        self.hash_kind = hash_kind;
        self
    }

    /// Period between dumps.
    #[must_use]
    pub fn dump_interval(mut self, interval: Duration) -> Self {
        self.dump_interval = interval;
        self
    }

    /// Period between recycle passes.
    #[must_use]
    pub fn recycle_check_interval(mut self, interval: Duration) -> Self {
        self.recycle_check_interval = interval;
        self
    }

    /// Dump file extension, without the dot.
    #[must_use]
    pub fn dump_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.dump_file_extension = extension.into();
        self
    }
}

impl GriddleConfigBuilder<Complete> {
    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the vector size or hash count is outside
    /// `1..=i32::MAX`, an interval is zero, or the extension is not a plain
    /// file name segment.
    pub fn build(self) -> Result<GriddleConfig> {
        let filter = FilterConfig::new(self.vector_size, self.hash_count, self.hash_kind)?;
        GriddleConfig::new(
            self.dump_dir,
            self.dump_interval,
            self.recycle_check_interval,
            filter,
            self.dump_file_extension,
        )
    }
}
