//! Packed 4-bit saturating counters over atomic 64-bit words.
//!
//! Every word holds 16 buckets. Bucket `i` lives in word `i >> 4` at bit offset
//! `(i & 0x0f) << 2`:
//!
//! ```text
//! Word 0: [b0 bits 0-3][b1 bits 4-7] ... [b15 bits 60-63]
//! Word 1: [b16]        [b17]         ... [b31]
//! ```
//!
//! All shift/mask arithmetic is confined to [`BucketSlot`]. Writers update a
//! bucket through a bounded compare-and-swap loop on the enclosing word
//! ([`BucketArray::update_bucket`]); after [`MAX_UPDATE_ATTEMPTS`] failed
//! exchanges the update is abandoned and reported as
//! [`UpdateOutcome::Contended`] for the caller to account for.
//!
//! # Memory Ordering
//!
//! Successful exchanges use `AcqRel`, loads use `Acquire`, so a reader that
//! observes a bucket value also observes every update that preceded it on the
//! same word.

use std::sync::atomic::{AtomicU64, Ordering};

/// Bits per bucket.
pub const BUCKET_BITS: u32 = 4;

/// Buckets packed into one 64-bit word.
pub const BUCKETS_PER_WORD: u32 = 64 / BUCKET_BITS;

/// Largest value a bucket can hold; buckets saturate here.
pub const BUCKET_MAX: u64 = (1 << BUCKET_BITS) - 1;

/// Compare-and-swap attempts made before an update is abandoned.
pub const MAX_UPDATE_ATTEMPTS: u32 = 6;

/// Number of 64-bit words needed for `vector_size` buckets.
///
/// `vector_size` must be positive.
#[inline]
#[must_use]
pub const fn words_for(vector_size: u32) -> usize {
    (((vector_size - 1) >> 4) + 1) as usize
}

/// Location of one bucket inside the word array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSlot {
    word: usize,
    shift: u32,
}

impl BucketSlot {
    /// Slot of bucket `index`.
    #[inline]
    #[must_use]
    pub const fn of(index: u32) -> Self {
        Self {
            word: (index >> 4) as usize,
            shift: (index & 0x0f) << 2,
        }
    }

    /// Index of the enclosing word.
    #[inline]
    #[must_use]
    pub const fn word(self) -> usize {
        self.word
    }

    /// Bit offset of the bucket inside its word.
    #[inline]
    #[must_use]
    pub const fn shift(self) -> u32 {
        self.shift
    }

    /// Mask selecting this bucket's four bits.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> u64 {
        BUCKET_MAX << self.shift
    }

    /// Read this bucket out of `word`.
    #[inline]
    #[must_use]
    pub const fn extract(self, word: u64) -> u64 {
        (word & self.mask()) >> self.shift
    }

    /// Return `word` with this bucket replaced by `value` (truncated to 4 bits).
    #[inline]
    #[must_use]
    pub const fn with_value(self, word: u64, value: u64) -> u64 {
        (word & !self.mask()) | ((value & BUCKET_MAX) << self.shift)
    }
}

/// Result of a bounded read-modify-write on the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The new value was published.
    Applied,
    /// The transition rejected the current value; nothing was written.
    Skipped,
    /// Every attempt lost its compare-and-swap race.
    Contended,
}

/// Fixed-length array of atomically updated bucket words.
#[derive(Debug)]
pub struct BucketArray {
    words: Box<[AtomicU64]>,
}

impl BucketArray {
    /// Zeroed array of `words` words.
    #[must_use]
    pub fn new(words: usize) -> Self {
        Self::from_words(std::iter::repeat(0).take(words))
    }

    /// Array initialised from raw word values.
    #[must_use]
    pub fn from_words(words: impl IntoIterator<Item = u64>) -> Self {
        Self {
            words: words
                .into_iter()
                .map(AtomicU64::new)
                .collect::<Vec<_>>()
                .into_boxed_slice(),
        }
    }

    /// Number of words.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the array has no words.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Load word `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    #[must_use]
    pub fn load_word(&self, index: usize) -> u64 {
        self.words[index].load(Ordering::Acquire)
    }

    /// Current value of the bucket at `slot`.
    #[inline]
    #[must_use]
    pub fn get(&self, slot: BucketSlot) -> u64 {
        slot.extract(self.load_word(slot.word()))
    }

    /// Apply `transition` to the bucket at `slot`.
    ///
    /// `transition` maps the current bucket value to the new one, or `None`
    /// to leave it untouched. It is re-evaluated on every attempt.
    pub fn update_bucket<F>(&self, slot: BucketSlot, transition: F) -> UpdateOutcome
    where
        F: Fn(u64) -> Option<u64>,
    {
        let cell = &self.words[slot.word()];
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let current = cell.load(Ordering::Acquire);
            let Some(next) = transition(slot.extract(current)) else {
                return UpdateOutcome::Skipped;
            };
            let updated = slot.with_value(current, next);
            if cell
                .compare_exchange(current, updated, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return UpdateOutcome::Applied;
            }
        }
        UpdateOutcome::Contended
    }

    /// Replace word `index` with `combine(current)`.
    ///
    /// Never returns [`UpdateOutcome::Skipped`].
    pub fn update_word<F>(&self, index: usize, combine: F) -> UpdateOutcome
    where
        F: Fn(u64) -> u64,
    {
        let cell = &self.words[index];
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let current = cell.load(Ordering::Acquire);
            if cell
                .compare_exchange(current, combine(current), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return UpdateOutcome::Applied;
            }
        }
        UpdateOutcome::Contended
    }

    /// Iterate current word values.
    pub fn iter_words(&self) -> impl Iterator<Item = u64> + '_ {
        self.words.iter().map(|w| w.load(Ordering::Acquire))
    }

    /// Copy of the current word values.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u64> {
        self.iter_words().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_words_for() {
        assert_eq!(words_for(1), 1);
        assert_eq!(words_for(16), 1);
        assert_eq!(words_for(17), 2);
        assert_eq!(words_for(1024), 64);
        assert_eq!(words_for(1025), 65);
        assert_eq!(words_for(i32::MAX as u32), 134_217_728);
    }

    #[test]
    fn test_slot_layout() {
        assert_eq!(BucketSlot::of(0), BucketSlot { word: 0, shift: 0 });
        assert_eq!(BucketSlot::of(15), BucketSlot { word: 0, shift: 60 });
        assert_eq!(BucketSlot::of(16), BucketSlot { word: 1, shift: 0 });
        assert_eq!(BucketSlot::of(35), BucketSlot { word: 2, shift: 12 });
    }

    #[test]
    fn test_every_slot_every_value() {
        for index in 0..BUCKETS_PER_WORD {
            let slot = BucketSlot::of(index);
            for value in 0..=BUCKET_MAX {
                let word = slot.with_value(0, value);
                assert_eq!(slot.extract(word), value);
                assert_eq!(word & !slot.mask(), 0, "slot {index} leaked bits");

                let full = slot.with_value(u64::MAX, value);
                assert_eq!(slot.extract(full), value);
                assert_eq!(full | slot.mask(), u64::MAX, "slot {index} clobbered neighbours");
            }
        }
    }

    #[test]
    fn test_with_value_truncates() {
        let slot = BucketSlot::of(3);
        assert_eq!(slot.extract(slot.with_value(0, 0x1f)), 0x0f);
    }

    #[test]
    fn test_masks_partition_word() {
        let combined = (0..BUCKETS_PER_WORD)
            .map(|i| BucketSlot::of(i).mask())
            .fold(0u64, |acc, m| {
                assert_eq!(acc & m, 0);
                acc | m
            });
        assert_eq!(combined, u64::MAX);
    }

    #[test]
    fn test_update_bucket_applied_and_skipped() {
        let array = BucketArray::new(2);
        let slot = BucketSlot::of(20);
        let increment = |v: u64| (v < BUCKET_MAX).then_some(v + 1);

        for expected in 1..=BUCKET_MAX {
            assert_eq!(array.update_bucket(slot, increment), UpdateOutcome::Applied);
            assert_eq!(array.get(slot), expected);
        }
        assert_eq!(array.update_bucket(slot, increment), UpdateOutcome::Skipped);
        assert_eq!(array.get(slot), BUCKET_MAX);
        assert_eq!(array.load_word(0), 0);
    }

    #[test]
    fn test_update_word() {
        let array = BucketArray::from_words([0b1100]);
        assert_eq!(array.update_word(0, |w| w | 0b0011), UpdateOutcome::Applied);
        assert_eq!(array.load_word(0), 0b1111);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let words = vec![1, u64::MAX, 0xdead_beef];
        let array = BucketArray::from_words(words.clone());
        assert_eq!(array.len(), 3);
        assert_eq!(array.snapshot(), words);
    }

    #[test]
    fn test_concurrent_increments_never_exceed_max() {
        let array = Arc::new(BucketArray::new(1));
        let slot = BucketSlot::of(7);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let array = Arc::clone(&array);
                thread::spawn(move || {
                    for _ in 0..10 {
                        array.update_bucket(slot, |v| (v < BUCKET_MAX).then_some(v + 1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(array.get(slot) <= BUCKET_MAX);
        // Neighbouring buckets are untouched.
        assert_eq!(array.load_word(0) & !slot.mask(), 0);
    }
}
