//! Cache-padded atomic counters.
//!
//! Statistics counters are bumped from many threads at once (every lost CAS
//! race increments one). Each counter gets its own cache line so that
//! bumping one never invalidates the line holding another.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cache line size assumed for padding.
pub const CACHE_LINE_SIZE: usize = 64;

/// Atomic counter occupying a full cache line.
///
/// All operations use `Relaxed` ordering: the counters are diagnostics and
/// never synchronize other memory.
///
/// # Memory Layout
///
/// ```text
/// | padding | AtomicU64 | padding |
/// |---------|-----------|---------|
/// | 28 B    | 8 B       | 28 B    | = 64 bytes total
/// ```
///
/// # Examples
///
/// ```
/// use griddle::util::AtomicCounter;
///
/// let counter = AtomicCounter::new(0);
/// counter.increment();
/// counter.increment();
/// assert_eq!(counter.get(), 2);
/// ```
#[repr(align(64))]
#[derive(Debug)]
pub struct AtomicCounter {
    _pad0: [u8; 28],
    value: AtomicU64,
    _pad1: [u8; 28],
}

impl AtomicCounter {
    /// Create a counter holding `initial`.
    #[must_use]
    pub const fn new(initial: u64) -> Self {
        Self {
            _pad0: [0; 28],
            value: AtomicU64::new(initial),
            _pad1: [0; 28],
        }
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Add one.
    #[inline]
    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new(0)
    }
}
