//! Error types for griddle operations.
//!
//! Every fallible operation in the crate returns [`Result<T>`], whose error
//! type is [`GriddleError`]. Lost updates caused by CAS contention are *not*
//! errors; they are counted in the filter's contention statistics instead.
//!
//! # Error Propagation
//!
//! ```
//! use griddle::{FilterConfig, HashKind, Result};
//!
//! fn build(vector_size: u32) -> Result<FilterConfig> {
//!     let config = FilterConfig::new(vector_size, 20, HashKind::Murmur)?;
//!     Ok(config)
//! }
//! # assert!(build(1024).is_ok());
//! # assert!(build(0).is_err());
//! ```

#![allow(clippy::module_name_repetitions)]

use std::io;
use std::path::{Path, PathBuf};

/// Result type alias for griddle operations.
pub type Result<T> = std::result::Result<T, GriddleError>;

/// Errors that can occur while using counting filters and their durable
/// wrappers.
#[derive(Debug, thiserror::Error)]
pub enum GriddleError {
    /// A key, name, size or configuration value was rejected.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of what was rejected.
        message: String,
    },

    /// Two filters (or a filter and an expected configuration) differ.
    #[error("Incompatible filter: {reason}")]
    IncompatibleFilter {
        /// Description of the mismatch.
        reason: String,
    },

    /// The operation has no meaning for a counting filter.
    #[error("Operation '{operation}' is not supported by a counting filter")]
    UnsupportedOperation {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// Opening, sizing, mapping or unmapping a backing file failed.
    #[error("Mapping failure for {}: {source}", path.display())]
    MappingFailure {
        /// File being mapped.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A persisted buffer does not follow the on-disk layout.
    #[error("Format error: {message}")]
    FormatError {
        /// Description of the malformed field.
        message: String,
    },

    /// The instance (or its section) has already been retired.
    #[error("Griddle '{name}' has already been recycled")]
    AlreadyRecycled {
        /// Name of the retired instance.
        name: String,
    },

    /// Deleting the dump file kept failing after every retry.
    #[error("Recycle failed for {} after {attempts} attempts: {source}", path.display())]
    RecycleFailed {
        /// Dump file that could not be removed.
        path: PathBuf,
        /// Number of deletion attempts made.
        attempts: u32,
        /// Last I/O error observed.
        #[source]
        source: io::Error,
    },

    /// Writing the dump or swapping it into place failed.
    #[error("Dump to {} failed: {source}", path.display())]
    DumpFailed {
        /// Canonical dump file path.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: Box<GriddleError>,
    },

    /// No instance is registered under this name.
    #[error("No griddle registered under name '{name}'")]
    UnknownGriddle {
        /// Requested name.
        name: String,
    },
}

impl GriddleError {
    /// Create an `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an `IncompatibleFilter` error.
    #[must_use]
    pub fn incompatible_filter(reason: impl Into<String>) -> Self {
        Self::IncompatibleFilter {
            reason: reason.into(),
        }
    }

    /// Create an `UnsupportedOperation` error.
    #[must_use]
    pub fn unsupported_operation(operation: &'static str) -> Self {
        Self::UnsupportedOperation { operation }
    }

    /// Create a `MappingFailure` error.
    #[must_use]
    pub fn mapping_failure(path: &Path, source: io::Error) -> Self {
        Self::MappingFailure {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create a `FormatError`.
    #[must_use]
    pub fn format_error(message: impl Into<String>) -> Self {
        Self::FormatError {
            message: message.into(),
        }
    }

    /// Create an `AlreadyRecycled` error.
    #[must_use]
    pub fn already_recycled(name: impl Into<String>) -> Self {
        Self::AlreadyRecycled { name: name.into() }
    }

    /// Create a `RecycleFailed` error.
    #[must_use]
    pub fn recycle_failed(path: &Path, attempts: u32, source: io::Error) -> Self {
        Self::RecycleFailed {
            path: path.to_path_buf(),
            attempts,
            source,
        }
    }

    /// Create a `DumpFailed` error wrapping the underlying cause.
    #[must_use]
    pub fn dump_failed(path: &Path, source: GriddleError) -> Self {
        Self::DumpFailed {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    /// Create an `UnknownGriddle` error.
    #[must_use]
    pub fn unknown_griddle(name: impl Into<String>) -> Self {
        Self::UnknownGriddle { name: name.into() }
    }

    /// Whether `restore_or_construct` should fall back to a fresh filter
    /// instead of propagating this error.
    #[must_use]
    pub fn is_restore_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FormatError { .. } | Self::IncompatibleFilter { .. } | Self::MappingFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_display() {
        let err = GriddleError::invalid_argument("key must not be empty");
        assert_eq!(err.to_string(), "Invalid argument: key must not be empty");
    }

    #[test]
    fn test_unsupported_operation_display() {
        let err = GriddleError::unsupported_operation("xor");
        assert!(err.to_string().contains("'xor'"));
    }

    #[test]
    fn test_mapping_failure_keeps_source() {
        use std::error::Error;

        let io = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = GriddleError::mapping_failure(Path::new("/tmp/x.dat"), io);
        assert!(err.to_string().contains("/tmp/x.dat"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_dump_failed_wraps_cause() {
        use std::error::Error;

        let inner = GriddleError::format_error("short buffer");
        let err = GriddleError::dump_failed(Path::new("a.1.dat"), inner);
        let source = err.source().expect("dump error has a source");
        assert!(source.to_string().contains("short buffer"));
    }

    #[test]
    fn test_restore_recoverable_kinds() {
        assert!(GriddleError::format_error("x").is_restore_recoverable());
        assert!(GriddleError::incompatible_filter("x").is_restore_recoverable());
        assert!(GriddleError::mapping_failure(
            Path::new("x"),
            io::Error::new(io::ErrorKind::Other, "x")
        )
        .is_restore_recoverable());
        assert!(!GriddleError::invalid_argument("x").is_restore_recoverable());
        assert!(!GriddleError::already_recycled("x").is_restore_recoverable());
    }
}
