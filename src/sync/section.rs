//! Reference-counted reclamation of a counting filter.
//!
//! A [`ReclaimableSection`] owns one [`CountingFilter`] that many threads
//! read and update while another thread may decide to retire it. Users
//! bracket every access with [`ReclaimableSection::enter`], which hands out a
//! [`SectionGuard`]; the filter is dropped only once the section has been
//! marked eligible *and* no guard is alive.
//!
//! # State Word
//!
//! Use count and both flags share one `AtomicU64`, so the "eligible and
//! unused" check and the transition to reclaimed are a single
//! compare-and-swap:
//!
//! ```text
//! bit 63       bit 62      bits 0-61
//! [RECLAIMED] [ELIGIBLE]  [use count]
//! ```
//!
//! - `enter` increments the count unless `RECLAIMED` is set.
//! - `try_reclaim` swaps exactly `ELIGIBLE` (count 0) for
//!   `ELIGIBLE | RECLAIMED`; at most one caller ever wins.
//!
//! # Examples
//!
//! ```
//! use griddle::sync::ReclaimableSection;
//! use griddle::{CountingFilter, FilterConfig};
//!
//! let section = ReclaimableSection::new(
//!     "votes",
//!     CountingFilter::new(FilterConfig::with_vector_size(1024)?),
//! );
//!
//! {
//!     let filter = section.enter()?;
//!     filter.add("jxq")?;
//!     section.mark_eligible();
//!     // A live guard blocks reclamation.
//!     assert!(!section.try_reclaim());
//! }
//!
//! assert!(section.try_reclaim());
//! assert!(section.enter().is_err());
//! # Ok::<(), griddle::GriddleError>(())
//! ```

use std::cell::UnsafeCell;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{GriddleError, Result};
use crate::filters::CountingFilter;

const RECLAIMED: u64 = 1 << 63;
const ELIGIBLE: u64 = 1 << 62;
const COUNT_MASK: u64 = ELIGIBLE - 1;

/// One counting filter plus the usage state that governs when it may be
/// dropped.
pub struct ReclaimableSection {
    label: String,
    state: AtomicU64,
    filter: UnsafeCell<Option<CountingFilter>>,
}

// SAFETY: the filter is only mutated (taken) by the single winner of the
// reclaim CAS, which proves no guard exists and none can be created
// afterwards. Every other access is a shared borrow through a guard.
unsafe impl Sync for ReclaimableSection {}

impl ReclaimableSection {
    /// Wrap `filter`. `label` names the section in errors.
    pub fn new(label: impl Into<String>, filter: CountingFilter) -> Self {
        Self {
            label: label.into(),
            state: AtomicU64::new(0),
            filter: UnsafeCell::new(Some(filter)),
        }
    }

    /// Label used in errors.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Register a user and borrow the filter.
    ///
    /// Dropping the guard unregisters the user.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRecycled` once the section has been reclaimed.
    pub fn enter(&self) -> Result<SectionGuard<'_>> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & RECLAIMED != 0 {
                return Err(GriddleError::already_recycled(&self.label));
            }
            debug_assert!(current & COUNT_MASK < COUNT_MASK, "use count overflow");
            match self.state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        // SAFETY: our registered use keeps the count non-zero, so the reclaim
        // CAS cannot succeed and nobody takes the filter while we hold it.
        match unsafe { (*self.filter.get()).as_ref() } {
            Some(filter) => Ok(SectionGuard {
                section: self,
                filter,
            }),
            None => {
                self.leave();
                Err(GriddleError::already_recycled(&self.label))
            }
        }
    }

    fn leave(&self) {
        let previous = self.state.fetch_sub(1, Ordering::Release);
        debug_assert!(previous & COUNT_MASK > 0, "leave without enter");
    }

    /// Allow reclamation once the section is unused. Idempotent and
    /// irreversible.
    pub fn mark_eligible(&self) {
        self.state.fetch_or(ELIGIBLE, Ordering::AcqRel);
    }

    /// Drop the filter if the section is eligible and unused.
    ///
    /// Returns `true` only for the one caller that performed the
    /// reclamation; later calls return `false`.
    pub fn try_reclaim(&self) -> bool {
        if self
            .state
            .compare_exchange(ELIGIBLE, ELIGIBLE | RECLAIMED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        // SAFETY: the exchange saw a zero use count with RECLAIMED clear and
        // set RECLAIMED, so no guard exists and `enter` can no longer create
        // one. This thread has exclusive access to the cell.
        let filter = unsafe { (*self.filter.get()).take() };
        drop(filter);
        tracing::debug!(section = %self.label, "section reclaimed");
        true
    }

    /// Number of live guards.
    #[must_use]
    pub fn use_count(&self) -> u64 {
        self.state.load(Ordering::Acquire) & COUNT_MASK
    }

    /// Whether [`mark_eligible`](Self::mark_eligible) has been called.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.state.load(Ordering::Acquire) & ELIGIBLE != 0
    }

    /// Whether the filter has been dropped.
    #[must_use]
    pub fn is_reclaimed(&self) -> bool {
        self.state.load(Ordering::Acquire) & RECLAIMED != 0
    }
}

impl std::fmt::Debug for ReclaimableSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReclaimableSection")
            .field("label", &self.label)
            .field("use_count", &self.use_count())
            .field("eligible", &self.is_eligible())
            .field("reclaimed", &self.is_reclaimed())
            .finish()
    }
}

/// Scoped access to a section's filter.
///
/// Dereferences to the [`CountingFilter`]. While any guard is alive the
/// section cannot be reclaimed.
#[must_use = "dropping the guard immediately releases the section"]
pub struct SectionGuard<'a> {
    section: &'a ReclaimableSection,
    filter: &'a CountingFilter,
}

impl Deref for SectionGuard<'_> {
    type Target = CountingFilter;

    fn deref(&self) -> &CountingFilter {
        self.filter
    }
}

impl Drop for SectionGuard<'_> {
    fn drop(&mut self) {
        self.section.leave();
    }
}

impl std::fmt::Debug for SectionGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionGuard")
            .field("section", &self.section.label)
            .finish()
    }
}
