//! Concurrent counting filter with 4-bit saturating buckets.
//!
//! A counting filter replaces the bits of a Bloom filter with small counters,
//! which makes deletion possible and lets the smallest of a key's counters
//! serve as an upper-bound estimate of how often the key was added.
//!
//! # Concurrency
//!
//! Every operation takes `&self`. Bucket updates are bounded compare-and-swap
//! loops on the enclosing 64-bit word; an update that loses
//! [`MAX_UPDATE_ATTEMPTS`] races in a row is dropped, counted in
//! [`ContentionStats`] and logged. Such a lost update is never reported as an
//! error, so counts are approximate under heavy contention.
//!
//! # Saturation
//!
//! Buckets stop at 15. A saturated bucket is never incremented and never
//! decremented again, so a key whose buckets all saturated stays a member.
//!
//! # Persisted Form
//!
//! ```text
//! offset  size  field
//! 0       4     version      i32 BE, always -1
//! 4       4     hash_count   i32 BE
//! 8       1     hash_kind    u8  (0 = jenkins, 1 = murmur)
//! 9       4     vector_size  i32 BE
//! 13      8*w   buckets      i64 BE, w = ((vector_size - 1) >> 4) + 1
//! ```
//!
//! # Examples
//!
//! ```
//! use griddle::{CountingFilter, FilterConfig, HashKind};
//!
//! let filter = CountingFilter::new(FilterConfig::new(1024, 20, HashKind::Murmur)?);
//! filter.add("jxq")?;
//! filter.add("jxq")?;
//! assert!(filter.membership_test("jxq")?);
//! assert_eq!(filter.approximate_count("jxq")?, 2);
//!
//! let restored = CountingFilter::deserialize(&filter.serialize())?;
//! assert_eq!(restored.approximate_count("jxq")?, 2);
//! # Ok::<(), griddle::GriddleError>(())
//! ```
//!
//! # References
//!
//! - Fan, L., Cao, P., Almeida, J., & Broder, A. Z. (2000). "Summary cache: a scalable
//!   wide-area web cache sharing protocol". IEEE/ACM Transactions on Networking.

#![allow(clippy::module_name_repetitions)]

use crate::core::buckets::{BucketArray, BucketSlot, UpdateOutcome, BUCKET_MAX, MAX_UPDATE_ATTEMPTS};
use crate::core::key::Key;
use crate::core::params::{FilterConfig, HEADER_LEN};
use crate::error::{GriddleError, Result};
use crate::hash::{BucketIndices, HashKind, HashSetGenerator};
use crate::util::AtomicCounter;

/// Version marker written at the start of every persisted filter.
pub const PERSISTED_VERSION: i32 = -1;

/// Counters of updates that did not take effect.
///
/// Lost updates lost all their CAS attempts. Saturated adds found a bucket
/// already at 15.
#[derive(Debug, Default)]
pub struct ContentionStats {
    lost_adds: AtomicCounter,
    lost_deletes: AtomicCounter,
    lost_merges: AtomicCounter,
    saturated_adds: AtomicCounter,
}

impl ContentionStats {
    /// Point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> ContentionSnapshot {
        ContentionSnapshot {
            lost_adds: self.lost_adds.get(),
            lost_deletes: self.lost_deletes.get(),
            lost_merges: self.lost_merges.get(),
            saturated_adds: self.saturated_adds.get(),
        }
    }
}

/// Values of [`ContentionStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentionSnapshot {
    /// Bucket increments abandoned after losing every CAS race.
    pub lost_adds: u64,
    /// Bucket decrements abandoned after losing every CAS race.
    pub lost_deletes: u64,
    /// Word merges abandoned after losing every CAS race.
    pub lost_merges: u64,
    /// Increments skipped because the bucket was already at 15.
    pub saturated_adds: u64,
}

impl ContentionSnapshot {
    /// Total updates dropped because of contention.
    #[must_use]
    pub fn lost_updates(&self) -> u64 {
        self.lost_adds + self.lost_deletes + self.lost_merges
    }
}

/// Lock-free counting filter.
///
/// See the [module documentation](self) for the update and persistence
/// model.
pub struct CountingFilter {
    config: FilterConfig,
    generator: HashSetGenerator,
    buckets: BucketArray,
    contention: ContentionStats,
}

impl CountingFilter {
    /// Empty filter for `config`.
    #[must_use]
    pub fn new(config: FilterConfig) -> Self {
        Self::with_buckets(config, BucketArray::new(config.words()))
    }

    fn with_buckets(config: FilterConfig, buckets: BucketArray) -> Self {
        debug_assert_eq!(buckets.len(), config.words());
        Self {
            generator: config.generator(),
            config,
            buckets,
            contention: ContentionStats::default(),
        }
    }

    /// Configuration the filter was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> FilterConfig {
        self.config
    }

    fn indices<'k>(&self, key: &Key<'k>) -> Result<BucketIndices<'k>> {
        self.generator.indices(key.bytes())
    }

    /// Add one occurrence of `key`.
    ///
    /// Each of the key's buckets is incremented unless it is already at 15.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `key` is empty.
    pub fn add<'k>(&self, key: impl Into<Key<'k>>) -> Result<()> {
        let key = key.into();
        for index in self.indices(&key)? {
            let outcome = self
                .buckets
                .update_bucket(BucketSlot::of(index), |v| (v < BUCKET_MAX).then_some(v + 1));
            match outcome {
                UpdateOutcome::Applied => {}
                UpdateOutcome::Skipped => self.contention.saturated_adds.increment(),
                UpdateOutcome::Contended => {
                    self.contention.lost_adds.increment();
                    tracing::warn!(
                        bucket = index,
                        attempts = MAX_UPDATE_ATTEMPTS,
                        "bucket increment abandoned under contention"
                    );
                }
            }
        }
        Ok(())
    }

    /// Remove one occurrence of `key`.
    ///
    /// Buckets at 0 or saturated at 15 are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `key` is empty or does not currently test
    /// as a member.
    pub fn delete<'k>(&self, key: impl Into<Key<'k>>) -> Result<()> {
        let key = key.into();
        if !self.membership_test(key)? {
            return Err(GriddleError::invalid_argument(
                "key is not a member of the filter",
            ));
        }
        for index in self.indices(&key)? {
            let outcome = self
                .buckets
                .update_bucket(BucketSlot::of(index), |v| {
                    (v >= 1 && v < BUCKET_MAX).then(|| v - 1)
                });
            if outcome == UpdateOutcome::Contended {
                self.contention.lost_deletes.increment();
                tracing::warn!(
                    bucket = index,
                    attempts = MAX_UPDATE_ATTEMPTS,
                    "bucket decrement abandoned under contention"
                );
            }
        }
        Ok(())
    }

    /// Whether every bucket of `key` is non-zero.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `key` is empty.
    pub fn membership_test<'k>(&self, key: impl Into<Key<'k>>) -> Result<bool> {
        let key = key.into();
        let mut indices = self.indices(&key)?;
        Ok(indices.all(|index| self.buckets.get(BucketSlot::of(index)) > 0))
    }

    /// Smallest bucket value of `key`; 0 if it was never added.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `key` is empty.
    pub fn approximate_count<'k>(&self, key: impl Into<Key<'k>>) -> Result<u32> {
        let key = key.into();
        let min = self
            .indices(&key)?
            .map(|index| self.buckets.get(BucketSlot::of(index)))
            .min()
            .unwrap_or(0);
        Ok(min as u32)
    }

    /// Word-wise AND with `other`.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleFilter` if the configurations differ.
    pub fn merge_and(&self, other: &CountingFilter) -> Result<()> {
        self.merge_words(other, "and", |mine, theirs| mine & theirs)
    }

    /// Word-wise OR with `other`.
    ///
    /// OR-ing packed counters is not addition; it only guarantees that every
    /// bucket non-zero in either filter is non-zero afterwards.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleFilter` if the configurations differ.
    pub fn merge_or(&self, other: &CountingFilter) -> Result<()> {
        self.merge_words(other, "or", |mine, theirs| mine | theirs)
    }

    /// Always fails: negating counters has no meaning.
    ///
    /// # Errors
    ///
    /// Always returns `UnsupportedOperation`.
    pub fn merge_not(&self) -> Result<()> {
        Err(GriddleError::unsupported_operation("not"))
    }

    /// Always fails: XOR of counters has no meaning.
    ///
    /// # Errors
    ///
    /// Always returns `UnsupportedOperation`.
    pub fn merge_xor(&self, _other: &CountingFilter) -> Result<()> {
        Err(GriddleError::unsupported_operation("xor"))
    }

    fn merge_words<F>(&self, other: &CountingFilter, op: &'static str, combine: F) -> Result<()>
    where
        F: Fn(u64, u64) -> u64,
    {
        self.config.ensure_compatible(&other.config)?;
        for word in 0..self.buckets.len() {
            let outcome = self
                .buckets
                .update_word(word, |mine| combine(mine, other.buckets.load_word(word)));
            if outcome == UpdateOutcome::Contended {
                self.contention.lost_merges.increment();
                tracing::warn!(
                    word,
                    op,
                    attempts = MAX_UPDATE_ATTEMPTS,
                    "word merge abandoned under contention"
                );
            }
        }
        Ok(())
    }

    /// Value of bucket `index`, or `None` if out of range.
    #[must_use]
    pub fn bucket(&self, index: u32) -> Option<u8> {
        (index < self.config.vector_size()).then(|| self.buckets.get(BucketSlot::of(index)) as u8)
    }

    /// Snapshot of the contention counters.
    #[must_use]
    pub fn contention(&self) -> ContentionSnapshot {
        self.contention.snapshot()
    }

    /// Whether every bucket is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter_words().all(|w| w == 0)
    }

    /// Number of non-zero buckets.
    #[must_use]
    pub fn count_nonzero(&self) -> usize {
        (0..self.config.vector_size())
            .filter(|&i| self.buckets.get(BucketSlot::of(i)) > 0)
            .count()
    }

    /// Heap plus inline size in bytes.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.buckets.len() * std::mem::size_of::<u64>() + std::mem::size_of::<Self>()
    }

    /// Size of [`serialize`](Self::serialize)'s output.
    #[inline]
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        self.config.persisted_len()
    }

    /// Encode into a freshly allocated buffer.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.serialized_len()];
        self.encode(&mut bytes);
        bytes
    }

    /// Encode into the front of `buf`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `buf` is shorter than
    /// [`serialized_len`](Self::serialized_len).
    pub fn write_to(&self, buf: &mut [u8]) -> Result<usize> {
        let len = self.serialized_len();
        if buf.len() < len {
            return Err(GriddleError::invalid_argument(format!(
                "buffer of {} bytes cannot hold a {len}-byte filter",
                buf.len()
            )));
        }
        self.encode(&mut buf[..len]);
        Ok(len)
    }

    fn encode(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&PERSISTED_VERSION.to_be_bytes());
        out[4..8].copy_from_slice(&(self.config.hash_count() as i32).to_be_bytes());
        out[8] = self.config.hash_kind().id();
        out[9..13].copy_from_slice(&(self.config.vector_size() as i32).to_be_bytes());
        for (chunk, word) in out[HEADER_LEN..]
            .chunks_exact_mut(8)
            .zip(self.buckets.iter_words())
        {
            chunk.copy_from_slice(&(word as i64).to_be_bytes());
        }
    }

    /// Decode a filter written by [`serialize`](Self::serialize) or
    /// [`write_to`](Self::write_to).
    ///
    /// `bytes` must be exactly the persisted length for its declared vector
    /// size.
    ///
    /// # Errors
    ///
    /// Returns `FormatError` if the buffer is shorter than the header, the
    /// version is not -1, the hash count or vector size is not positive, the
    /// hash kind is unknown, or the length disagrees with the vector size.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(GriddleError::format_error(format!(
                "buffer of {} bytes is shorter than the {HEADER_LEN}-byte header",
                bytes.len()
            )));
        }

        let version = read_i32(&bytes[0..4]);
        if version != PERSISTED_VERSION {
            return Err(GriddleError::format_error(format!(
                "unsupported version {version}"
            )));
        }
        let hash_count = read_i32(&bytes[4..8]);
        if hash_count <= 0 {
            return Err(GriddleError::format_error(format!(
                "hash count must be positive, got {hash_count}"
            )));
        }
        let hash_kind = HashKind::from_id(bytes[8])?;
        let vector_size = read_i32(&bytes[9..13]);
        if vector_size <= 0 {
            return Err(GriddleError::format_error(format!(
                "vector size must be positive, got {vector_size}"
            )));
        }

        let config = FilterConfig::new(vector_size as u32, hash_count as u32, hash_kind)
            .map_err(|e| GriddleError::format_error(e.to_string()))?;
        if bytes.len() != config.persisted_len() {
            return Err(GriddleError::format_error(format!(
                "vector size {vector_size} needs {} bytes, buffer has {}",
                config.persisted_len(),
                bytes.len()
            )));
        }

        let words = bytes[HEADER_LEN..].chunks_exact(8).map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            i64::from_be_bytes(raw) as u64
        });
        Ok(Self::with_buckets(config, BucketArray::from_words(words)))
    }
}

fn read_i32(bytes: &[u8]) -> i32 {
    i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

impl std::fmt::Debug for CountingFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingFilter")
            .field("config", &self.config)
            .field("words", &self.buckets.len())
            .field("contention", &self.contention.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn filter(vector_size: u32, hash_count: u32) -> CountingFilter {
        CountingFilter::new(FilterConfig::new(vector_size, hash_count, HashKind::Murmur).unwrap())
    }

    #[test]
    fn test_new_is_empty() {
        let f = filter(1024, 20);
        assert!(f.is_empty());
        assert_eq!(f.count_nonzero(), 0);
        assert!(!f.membership_test("jxq").unwrap());
        assert_eq!(f.approximate_count("jxq").unwrap(), 0);
    }

    #[test]
    fn test_add_and_count() {
        let f = filter(1024, 20);
        for n in 1..=14 {
            f.add("jxq").unwrap();
            assert_eq!(f.approximate_count("jxq").unwrap(), n);
        }
        assert!(f.membership_test("jxq").unwrap());
        assert_eq!(f.contention().lost_updates(), 0);
    }

    #[test]
    fn test_saturation() {
        let f = filter(64, 1);
        for _ in 0..20 {
            f.add("x").unwrap();
        }
        assert_eq!(f.approximate_count("x").unwrap(), 15);
        assert_eq!(f.contention().saturated_adds, 5);
        assert_eq!(f.contention().lost_updates(), 0);
    }

    #[test]
    fn test_delete() {
        let f = filter(1024, 8);
        f.add("a").unwrap();
        f.add("a").unwrap();
        f.delete("a").unwrap();
        assert_eq!(f.approximate_count("a").unwrap(), 1);
        f.delete("a").unwrap();
        assert!(!f.membership_test("a").unwrap());
        assert!(f.is_empty());
    }

    #[test]
    fn test_delete_absent_key_rejected() {
        let f = filter(1024, 8);
        let err = f.delete("missing").unwrap_err();
        assert!(matches!(err, GriddleError::InvalidArgument { .. }));
    }

    #[test]
    fn test_delete_leaves_saturated_buckets() {
        let f = filter(64, 1);
        for _ in 0..15 {
            f.add("x").unwrap();
        }
        f.delete("x").unwrap();
        assert_eq!(f.approximate_count("x").unwrap(), 15);
    }

    #[test]
    fn test_empty_key_rejected() {
        let f = filter(64, 3);
        assert!(f.add("").is_err());
        assert!(f.delete("").is_err());
        assert!(f.membership_test("").is_err());
        assert!(f.approximate_count(b"").is_err());
    }

    #[test]
    fn test_weighted_key_hashes_bytes_only() {
        let f = filter(1024, 8);
        f.add(Key::with_weight(b"w", 9.0)).unwrap();
        assert_eq!(f.approximate_count("w").unwrap(), 1);
    }

    #[test]
    fn test_merge_or() {
        let a = filter(1 << 16, 8);
        let b = filter(1 << 16, 8);
        a.add("left").unwrap();
        b.add("right").unwrap();
        a.merge_or(&b).unwrap();
        assert!(a.membership_test("left").unwrap());
        assert!(a.membership_test("right").unwrap());
    }

    #[test]
    fn test_merge_and() {
        let a = filter(1 << 16, 8);
        let b = filter(1 << 16, 8);
        a.add("both").unwrap();
        a.add("only-a").unwrap();
        b.add("both").unwrap();
        a.merge_and(&b).unwrap();
        assert!(a.membership_test("both").unwrap());
        assert!(!a.membership_test("only-a").unwrap());
    }

    #[test]
    fn test_merge_incompatible() {
        let a = filter(1024, 8);
        let b = filter(2048, 8);
        assert!(matches!(
            a.merge_or(&b),
            Err(GriddleError::IncompatibleFilter { .. })
        ));
        assert!(matches!(
            a.merge_and(&b),
            Err(GriddleError::IncompatibleFilter { .. })
        ));
    }

    #[test]
    fn test_merge_not_and_xor_unsupported() {
        let a = filter(64, 2);
        let b = filter(64, 2);
        assert!(matches!(
            a.merge_not(),
            Err(GriddleError::UnsupportedOperation { operation: "not" })
        ));
        assert!(matches!(
            a.merge_xor(&b),
            Err(GriddleError::UnsupportedOperation { operation: "xor" })
        ));
    }

    #[test]
    fn test_bucket_access() {
        let f = filter(20, 1);
        assert_eq!(f.bucket(19), Some(0));
        assert_eq!(f.bucket(20), None);
        f.add("k").unwrap();
        assert_eq!(f.count_nonzero(), 1);
        let ones = (0..20).filter(|&i| f.bucket(i) == Some(1)).count();
        assert_eq!(ones, 1);
    }

    #[test]
    fn test_serialize_layout() {
        let f = CountingFilter::new(FilterConfig::new(17, 3, HashKind::Jenkins).unwrap());
        let bytes = f.serialize();
        assert_eq!(bytes.len(), 2 * 8 + HEADER_LEN);
        assert_eq!(&bytes[0..4], &[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 3]);
        assert_eq!(bytes[8], 0);
        assert_eq!(&bytes[9..13], &[0, 0, 0, 17]);
        assert!(bytes[13..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_serialize_round_trip() {
        let f = filter(1024, 20);
        for _ in 0..3 {
            f.add("jxq").unwrap();
        }
        f.add("other").unwrap();
        let restored = CountingFilter::deserialize(&f.serialize()).unwrap();
        assert_eq!(restored.config(), f.config());
        assert_eq!(restored.approximate_count("jxq").unwrap(), 3);
        assert!(restored.membership_test("other").unwrap());
        assert_eq!(restored.buckets.snapshot(), f.buckets.snapshot());
    }

    #[test]
    fn test_write_to() {
        let f = filter(64, 4);
        f.add("k").unwrap();
        let mut buf = vec![0xaa; f.serialized_len() + 5];
        assert_eq!(f.write_to(&mut buf).unwrap(), f.serialized_len());
        assert_eq!(&buf[..f.serialized_len()], f.serialize().as_slice());
        assert_eq!(buf[f.serialized_len()], 0xaa);

        let mut short = vec![0; f.serialized_len() - 1];
        assert!(matches!(
            f.write_to(&mut short),
            Err(GriddleError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_deserialize_rejects_malformed() {
        let good = filter(64, 4).serialize();

        let format_err = |bytes: &[u8]| {
            matches!(
                CountingFilter::deserialize(bytes),
                Err(GriddleError::FormatError { .. })
            )
        };

        assert!(format_err(&good[..HEADER_LEN - 1]));
        assert!(format_err(&good[..good.len() - 1]));

        let mut longer = good.clone();
        longer.extend_from_slice(&[0; 8]);
        assert!(format_err(&longer));

        let mut bad_version = good.clone();
        bad_version[0..4].copy_from_slice(&1i32.to_be_bytes());
        assert!(format_err(&bad_version));

        let mut bad_hash_count = good.clone();
        bad_hash_count[4..8].copy_from_slice(&0i32.to_be_bytes());
        assert!(format_err(&bad_hash_count));

        let mut bad_kind = good.clone();
        bad_kind[8] = 9;
        assert!(format_err(&bad_kind));

        let mut bad_size = good.clone();
        bad_size[9..13].copy_from_slice(&(-64i32).to_be_bytes());
        assert!(format_err(&bad_size));

        let mut mismatched = good;
        mismatched[9..13].copy_from_slice(&2048i32.to_be_bytes());
        assert!(format_err(&mismatched));
    }

    #[test]
    fn test_concurrent_adds_stay_bounded() {
        let f = Arc::new(filter(64, 1));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let f = Arc::clone(&f);
                thread::spawn(move || {
                    for _ in 0..4 {
                        f.add("hot").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let count = f.approximate_count("hot").unwrap();
        assert!(count <= 15);
        assert!(count >= 1);
    }

    #[test]
    fn test_concurrent_distinct_keys() {
        let f = Arc::new(filter(1 << 16, 4));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let f = Arc::clone(&f);
                thread::spawn(move || {
                    for i in 0..200 {
                        f.add(format!("t{t}-k{i}").as_str()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let lost = f.contention().lost_adds;
        if lost == 0 {
            for t in 0..4 {
                for i in 0..200 {
                    assert!(f.membership_test(format!("t{t}-k{i}").as_str()).unwrap());
                }
            }
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn uncontended_count_is_exact(key in "[a-z0-9:]{1,24}", n in 1u32..=14) {
                let f = filter(4096, 20);
                for _ in 0..n {
                    f.add(key.as_str()).unwrap();
                }
                prop_assert_eq!(f.approximate_count(key.as_str()).unwrap(), n);
            }

            #[test]
            fn no_false_negatives(keys in proptest::collection::vec("[a-z]{1,12}", 1..50)) {
                let f = filter(8192, 7);
                for key in &keys {
                    f.add(key).unwrap();
                }
                for key in &keys {
                    prop_assert!(f.membership_test(key).unwrap());
                }
            }

            #[test]
            fn persisted_form_preserves_counts(
                keys in proptest::collection::vec("[a-z]{1,8}", 1..20),
                vector_size in 1u32..2048,
            ) {
                let f = filter(vector_size, 5);
                for key in &keys {
                    f.add(key).unwrap();
                }
                let restored = CountingFilter::deserialize(&f.serialize()).unwrap();
                for key in &keys {
                    prop_assert_eq!(
                        restored.approximate_count(key).unwrap(),
                        f.approximate_count(key).unwrap()
                    );
                }
            }
        }
    }
}
