//! Registry configuration.
//!
//! [`GriddleConfig`] carries everything a [`GriddleRegistry`] needs: where
//! dumps live, how often the maintenance worker runs, and the filter
//! parameters shared by every instance. Build one with
//! [`GriddleConfig::builder`]; with the `serde` feature it can also be
//! deserialized, which runs the same validation.
//!
//! # Dump File Names
//!
//! Each instance dumps to `<name>.<max_repeat_insert_count>.<extension>` in
//! the dump directory, e.g. `votes.3.dat`. The registry parses these names
//! back on open, so names and extensions may not contain `.`.
//!
//! [`GriddleRegistry`]: crate::registry::GriddleRegistry
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use griddle::{GriddleConfig, HashKind};
//!
//! let config = GriddleConfig::builder()
//!     .dump_dir("/var/lib/griddle")
//!     .vector_size(1 << 20)
//!     .hash_kind(HashKind::Jenkins)
//!     .dump_interval(Duration::from_secs(30))
//!     .build()?;
//!
//! assert_eq!(config.filter_config().hash_count(), 20);
//! assert_eq!(config.dump_file_name("votes", 3), "votes.3.dat");
//! assert_eq!(config.parse_dump_file_name("votes.3.dat"), Some(("votes".to_string(), 3)));
//! # Ok::<(), griddle::GriddleError>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::builder::{GriddleConfigBuilder, Initial};
use crate::core::FilterConfig;
use crate::error::{GriddleError, Result};
use crate::hash::HashKind;

/// Default period between dumps of every instance.
pub const DEFAULT_DUMP_INTERVAL: Duration = Duration::from_secs(60);

/// Default period between recycle passes.
pub const DEFAULT_RECYCLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Default dump file extension.
pub const DEFAULT_DUMP_FILE_EXTENSION: &str = "dat";

/// Validated registry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "RawGriddleConfig", into = "RawGriddleConfig")
)]
pub struct GriddleConfig {
    dump_dir: PathBuf,
    dump_interval: Duration,
    recycle_check_interval: Duration,
    filter: FilterConfig,
    dump_file_extension: String,
}

impl GriddleConfig {
    /// Start building a configuration.
    #[must_use]
    pub fn builder() -> GriddleConfigBuilder<Initial> {
        GriddleConfigBuilder::new()
    }

    /// Validate and assemble a configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty dump directory, a zero
    /// interval, or an extension that is empty or contains `.` or a path
    /// separator.
    pub fn new(
        dump_dir: impl Into<PathBuf>,
        dump_interval: Duration,
        recycle_check_interval: Duration,
        filter: FilterConfig,
        dump_file_extension: impl Into<String>,
    ) -> Result<Self> {
        let dump_dir = dump_dir.into();
        let dump_file_extension = dump_file_extension.into();

        if dump_dir.as_os_str().is_empty() {
            return Err(GriddleError::invalid_argument("dump_dir must not be empty"));
        }
        if dump_interval.is_zero() {
            return Err(GriddleError::invalid_argument("dump_interval must be positive"));
        }
        if recycle_check_interval.is_zero() {
            return Err(GriddleError::invalid_argument(
                "recycle_check_interval must be positive",
            ));
        }
        if !is_plain_segment(&dump_file_extension) {
            return Err(GriddleError::invalid_argument(format!(
                "dump_file_extension '{dump_file_extension}' must be non-empty without '.' or path separators"
            )));
        }

        Ok(Self {
            dump_dir,
            dump_interval,
            recycle_check_interval,
            filter,
            dump_file_extension,
        })
    }

    /// Directory holding dump files.
    #[must_use]
    pub fn dump_dir(&self) -> &Path {
        &self.dump_dir
    }

    /// Period between dumps.
    #[must_use]
    pub fn dump_interval(&self) -> Duration {
        self.dump_interval
    }

    /// Period between recycle passes.
    #[must_use]
    pub fn recycle_check_interval(&self) -> Duration {
        self.recycle_check_interval
    }

    /// Filter parameters shared by every instance.
    #[must_use]
    pub fn filter_config(&self) -> FilterConfig {
        self.filter
    }

    /// Dump file extension, without the dot.
    #[must_use]
    pub fn dump_file_extension(&self) -> &str {
        &self.dump_file_extension
    }

    /// `<name>.<max>.<ext>`
    #[must_use]
    pub fn dump_file_name(&self, name: &str, max_repeat_insert_count: u32) -> String {
        format!("{name}.{max_repeat_insert_count}.{}", self.dump_file_extension)
    }

    /// Full path of an instance's dump file.
    #[must_use]
    pub fn dump_path(&self, name: &str, max_repeat_insert_count: u32) -> PathBuf {
        self.dump_dir
            .join(self.dump_file_name(name, max_repeat_insert_count))
    }

    /// Split a dump file name into instance name and insert ceiling.
    ///
    /// Returns `None` unless the name has exactly three `.`-separated
    /// segments, a non-empty name, a positive count and this configuration's
    /// extension.
    #[must_use]
    pub fn parse_dump_file_name(&self, file_name: &str) -> Option<(String, u32)> {
        let mut segments = file_name.split('.');
        let (name, count, ext) = (segments.next()?, segments.next()?, segments.next()?);
        if segments.next().is_some() || name.is_empty() || ext != self.dump_file_extension {
            return None;
        }
        let count: u32 = count.parse().ok()?;
        (count > 0).then(|| (name.to_string(), count))
    }
}

/// Whether `segment` can sit between dots in a dump file name.
pub(crate) fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains(['.', '/', '\\'])
}

/// Wire form used by the `serde` feature.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawGriddleConfig {
    dump_dir: PathBuf,
    #[serde(default = "default_dump_interval_ms")]
    dump_interval_ms: u64,
    #[serde(default = "default_recycle_check_interval_ms")]
    recycle_check_interval_ms: u64,
    vector_size: u32,
    #[serde(default = "default_hash_count")]
    hash_count: u32,
    #[serde(default)]
    hash_kind: HashKind,
    #[serde(default = "default_dump_file_extension")]
    dump_file_extension: String,
}

#[cfg(feature = "serde")]
fn default_dump_interval_ms() -> u64 {
    DEFAULT_DUMP_INTERVAL.as_millis() as u64
}

#[cfg(feature = "serde")]
fn default_recycle_check_interval_ms() -> u64 {
    DEFAULT_RECYCLE_CHECK_INTERVAL.as_millis() as u64
}

#[cfg(feature = "serde")]
fn default_hash_count() -> u32 {
    crate::core::DEFAULT_HASH_COUNT
}

#[cfg(feature = "serde")]
fn default_dump_file_extension() -> String {
    DEFAULT_DUMP_FILE_EXTENSION.to_string()
}

#[cfg(feature = "serde")]
impl TryFrom<RawGriddleConfig> for GriddleConfig {
    type Error = GriddleError;

    fn try_from(raw: RawGriddleConfig) -> Result<Self> {
        Self::new(
            raw.dump_dir,
            Duration::from_millis(raw.dump_interval_ms),
            Duration::from_millis(raw.recycle_check_interval_ms),
            FilterConfig::new(raw.vector_size, raw.hash_count, raw.hash_kind)?,
            raw.dump_file_extension,
        )
    }
}

#[cfg(feature = "serde")]
impl From<GriddleConfig> for RawGriddleConfig {
    fn from(config: GriddleConfig) -> Self {
        Self {
            dump_dir: config.dump_dir,
            dump_interval_ms: config.dump_interval.as_millis() as u64,
            recycle_check_interval_ms: config.recycle_check_interval.as_millis() as u64,
            vector_size: config.filter.vector_size(),
            hash_count: config.filter.hash_count(),
            hash_kind: config.filter.hash_kind(),
            dump_file_extension: config.dump_file_extension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GriddleConfig {
        GriddleConfig::builder()
            .dump_dir("/tmp/griddle")
            .vector_size(1024)
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let c = config();
        assert_eq!(c.dump_interval(), DEFAULT_DUMP_INTERVAL);
        assert_eq!(c.recycle_check_interval(), DEFAULT_RECYCLE_CHECK_INTERVAL);
        assert_eq!(c.dump_file_extension(), "dat");
        assert_eq!(c.filter_config().hash_kind(), HashKind::Murmur);
        assert_eq!(c.filter_config().hash_count(), 20);
    }

    #[test]
    fn test_dump_file_names() {
        let c = config();
        assert_eq!(c.dump_file_name("votes", 3), "votes.3.dat");
        assert_eq!(c.dump_path("votes", 3), PathBuf::from("/tmp/griddle/votes.3.dat"));
    }

    #[test]
    fn test_parse_dump_file_name() {
        let c = config();
        assert_eq!(c.parse_dump_file_name("1.3.dat"), Some(("1".to_string(), 3)));
        assert_eq!(c.parse_dump_file_name("votes.3.dat.tmp"), None);
        assert_eq!(c.parse_dump_file_name("votes.3.bin"), None);
        assert_eq!(c.parse_dump_file_name("votes.0.dat"), None);
        assert_eq!(c.parse_dump_file_name("votes.-1.dat"), None);
        assert_eq!(c.parse_dump_file_name("votes.x.dat"), None);
        assert_eq!(c.parse_dump_file_name(".3.dat"), None);
        assert_eq!(c.parse_dump_file_name("votes.dat"), None);
    }

    #[test]
    fn test_new_validates() {
        let filter = FilterConfig::with_vector_size(64).unwrap();
        let secs = Duration::from_secs(1);
        assert!(GriddleConfig::new("", secs, secs, filter, "dat").is_err());
        assert!(GriddleConfig::new("/d", Duration::ZERO, secs, filter, "dat").is_err());
        assert!(GriddleConfig::new("/d", secs, Duration::ZERO, filter, "dat").is_err());
        assert!(GriddleConfig::new("/d", secs, secs, filter, "").is_err());
        assert!(GriddleConfig::new("/d", secs, secs, filter, "d.at").is_err());
        assert!(GriddleConfig::new("/d", secs, secs, filter, "a/b").is_err());
        assert!(GriddleConfig::new("/d", secs, secs, filter, "bin").is_ok());
    }

    #[test]
    fn test_plain_segment() {
        assert!(is_plain_segment("votes"));
        assert!(!is_plain_segment(""));
        assert!(!is_plain_segment("a.b"));
        assert!(!is_plain_segment("a/b"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let c = config();
        let bytes = bincode::serialize(&c).unwrap();
        let back: GriddleConfig = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, c);
    }
}
