//! Filter configuration.
//!
//! A [`FilterConfig`] fixes the three parameters that determine bucket
//! placement: vector size, hash count and hash family. It never changes after
//! creation, and two filters can only be merged (or a dump accepted) when
//! their configurations are equal.
//!
//! Both numeric fields are persisted as signed 32-bit integers, so they are
//! limited to `1..=i32::MAX`.

use crate::core::buckets::words_for;
use crate::error::{GriddleError, Result};
use crate::hash::{HashKind, HashSetGenerator};

/// Size in bytes of the persisted header.
///
/// `version:i32, hash_count:i32, hash_kind:u8, vector_size:i32`
pub const HEADER_LEN: usize = 13;

/// Hash count used when none is configured.
pub const DEFAULT_HASH_COUNT: u32 = 20;

/// Immutable `(vector_size, hash_count, hash_kind)` triple.
///
/// # Examples
///
/// ```
/// use griddle::{FilterConfig, HashKind};
///
/// let config = FilterConfig::new(1024, 20, HashKind::Murmur).unwrap();
/// assert_eq!(config.words(), 64);
/// assert_eq!(config.persisted_len(), 64 * 8 + 13);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawFilterConfig"))]
pub struct FilterConfig {
    vector_size: u32,
    hash_count: u32,
    hash_kind: HashKind,
}

impl FilterConfig {
    /// Validate and create a configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `vector_size` or `hash_count` is zero or
    /// larger than `i32::MAX`.
    pub fn new(vector_size: u32, hash_count: u32, hash_kind: HashKind) -> Result<Self> {
        validate_positive_i32("vector_size", vector_size)?;
        validate_positive_i32("hash_count", hash_count)?;
        Ok(Self {
            vector_size,
            hash_count,
            hash_kind,
        })
    }

    /// Configuration with [`DEFAULT_HASH_COUNT`] murmur hashes.
    ///
    /// # Errors
    ///
    /// Same as [`FilterConfig::new`].
    pub fn with_vector_size(vector_size: u32) -> Result<Self> {
        Self::new(vector_size, DEFAULT_HASH_COUNT, HashKind::default())
    }

    /// Number of buckets.
    #[inline]
    #[must_use]
    pub fn vector_size(&self) -> u32 {
        self.vector_size
    }

    /// Number of hash functions (k).
    #[inline]
    #[must_use]
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Hash family.
    #[inline]
    #[must_use]
    pub fn hash_kind(&self) -> HashKind {
        self.hash_kind
    }

    /// Number of 64-bit bucket words.
    #[inline]
    #[must_use]
    pub fn words(&self) -> usize {
        words_for(self.vector_size)
    }

    /// Exact size of the persisted form in bytes.
    #[inline]
    #[must_use]
    pub fn persisted_len(&self) -> usize {
        self.words() * 8 + HEADER_LEN
    }

    /// Index generator for this configuration.
    #[must_use]
    pub fn generator(&self) -> HashSetGenerator {
        HashSetGenerator::from_checked(self.hash_kind, self.hash_count, self.vector_size)
    }

    /// Fail with `IncompatibleFilter` unless `other` is identical.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleFilter` naming the first differing field.
    pub fn ensure_compatible(&self, other: &FilterConfig) -> Result<()> {
        if self.vector_size != other.vector_size {
            return Err(GriddleError::incompatible_filter(format!(
                "vector size {} != {}",
                self.vector_size, other.vector_size
            )));
        }
        if self.hash_count != other.hash_count {
            return Err(GriddleError::incompatible_filter(format!(
                "hash count {} != {}",
                self.hash_count, other.hash_count
            )));
        }
        if self.hash_kind != other.hash_kind {
            return Err(GriddleError::incompatible_filter(format!(
                "hash kind {} != {}",
                self.hash_kind, other.hash_kind
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for FilterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "vector_size={} hash_count={} hash_kind={}",
            self.vector_size, self.hash_count, self.hash_kind
        )
    }
}

fn validate_positive_i32(field: &str, value: u32) -> Result<()> {
    if value == 0 || value > i32::MAX as u32 {
        return Err(GriddleError::invalid_argument(format!(
            "{field} must be in 1..={}, got {value}",
            i32::MAX
        )));
    }
    Ok(())
}

/// Unvalidated serde mirror of [`FilterConfig`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawFilterConfig {
    vector_size: u32,
    #[serde(default = "default_hash_count")]
    hash_count: u32,
    #[serde(default)]
    hash_kind: HashKind,
}

#[cfg(feature = "serde")]
fn default_hash_count() -> u32 {
    DEFAULT_HASH_COUNT
}

#[cfg(feature = "serde")]
impl TryFrom<RawFilterConfig> for FilterConfig {
    type Error = GriddleError;

    fn try_from(raw: RawFilterConfig) -> Result<Self> {
        Self::new(raw.vector_size, raw.hash_count, raw.hash_kind)
    }
}
