//! Hash functions and bucket index generation.
//!
//! A filter hashes each key `k` times and maps every hash onto a bucket in
//! `[0, vector_size)`. The derivation must be deterministic across process
//! restarts, otherwise a restored dump would answer for the wrong buckets.
//!
//! # Module Structure
//!
//! ```text
//! hash/
//! ├── jenkins.rs  - lookup3 32-bit hash (HashKind::Jenkins, id 0)
//! ├── murmur.rs   - MurmurHash2 32-bit   (HashKind::Murmur,  id 1)
//! └── mod.rs      - HashKind and the BucketIndices generator
//! ```
//!
//! # Index Derivation
//!
//! Indices are produced by chaining the seed through the selected hash:
//!
//! ```text
//! seed_0 = 0
//! seed_i = hash(key, seed_{i-1})
//! idx_i  = |seed_i rem vector_size|        (signed 32-bit remainder)
//! ```
//!
//! # Examples
//!
//! ```
//! use griddle::hash::{HashKind, HashSetGenerator};
//!
//! let generator = HashSetGenerator::new(HashKind::Murmur, 20, 1024).unwrap();
//! let indices: Vec<u32> = generator.indices(b"jxq").unwrap().collect();
//! assert_eq!(indices.len(), 20);
//! assert!(indices.iter().all(|&i| i < 1024));
//! ```

pub mod jenkins;
pub mod murmur;

use crate::error::{GriddleError, Result};

/// The hash family used to derive bucket indices.
///
/// The discriminant is the byte stored in the persisted header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum HashKind {
    /// Bob Jenkins' lookup3.
    Jenkins = 0,
    /// MurmurHash2 (32-bit).
    #[default]
    Murmur = 1,
}

impl HashKind {
    /// Identifier written to the persisted header.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Parse a persisted identifier.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` for unknown identifiers.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::Jenkins),
            1 => Ok(Self::Murmur),
            other => Err(GriddleError::format_error(format!(
                "unknown hash kind id {other}"
            ))),
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Jenkins => "jenkins",
            Self::Murmur => "murmur",
        }
    }

    /// Hash `bytes` with the given seed.
    #[inline]
    #[must_use]
    pub fn hash(self, bytes: &[u8], seed: i32) -> i32 {
        match self {
            Self::Jenkins => jenkins::hash(bytes, seed),
            Self::Murmur => murmur::hash(bytes, seed),
        }
    }
}

impl std::fmt::Display for HashKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Produces the `hash_count` bucket indices of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashSetGenerator {
    kind: HashKind,
    hash_count: u32,
    vector_size: i32,
}

impl HashSetGenerator {
    /// Create a generator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `vector_size` is 0 or exceeds `i32::MAX`.
    pub fn new(kind: HashKind, hash_count: u32, vector_size: u32) -> Result<Self> {
        if vector_size == 0 || vector_size > i32::MAX as u32 {
            return Err(GriddleError::invalid_argument(format!(
                "vector_size must be in 1..=i32::MAX, got {vector_size}"
            )));
        }
        Ok(Self::from_checked(kind, hash_count, vector_size))
    }

    // `vector_size` already checked by `FilterConfig`.
    pub(crate) fn from_checked(kind: HashKind, hash_count: u32, vector_size: u32) -> Self {
        debug_assert!(vector_size > 0 && vector_size <= i32::MAX as u32);
        Self {
            kind,
            hash_count,
            vector_size: vector_size as i32,
        }
    }

    /// Hash family in use.
    #[must_use]
    pub fn kind(&self) -> HashKind {
        self.kind
    }

    /// Number of indices produced per key.
    #[must_use]
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Iterate the bucket indices of `key`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `key` is empty.
    pub fn indices<'a>(&self, key: &'a [u8]) -> Result<BucketIndices<'a>> {
        if key.is_empty() {
            return Err(GriddleError::invalid_argument("key length must be > 0"));
        }
        Ok(BucketIndices {
            key,
            kind: self.kind,
            vector_size: self.vector_size,
            remaining: self.hash_count,
            seed: 0,
        })
    }
}

/// Iterator over the bucket indices of one key.
#[derive(Debug, Clone)]
pub struct BucketIndices<'a> {
    key: &'a [u8],
    kind: HashKind,
    vector_size: i32,
    remaining: u32,
    seed: i32,
}

impl Iterator for BucketIndices<'_> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.seed = self.kind.hash(self.key, self.seed);
        Some((self.seed % self.vector_size).unsigned_abs())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for BucketIndices<'_> {}
