//! Griddle: durable, concurrently updatable counting Bloom filters.
//!
//! A griddle answers "how many times has this key been submitted?" for an
//! unbounded key space in fixed memory, and refuses submissions past a
//! per-instance ceiling. Typical uses are vote or coupon limits where a few
//! false refusals are acceptable but unbounded repeats are not.
//!
//! # Layers
//!
//! ```text
//! GriddleRegistry          name -> Griddle, dump directory, maintenance worker
//!   └─ Griddle             ceiling, dump file, recycle lifecycle
//!        └─ ReclaimableSection   use counting, safe retirement
//!             └─ CountingFilter  4-bit buckets packed into AtomicU64 words
//! ```
//!
//! Every layer is `Sync` and takes `&self`; no external `Mutex` is needed.
//!
//! # Quick Start
//!
//! ```
//! use griddle::{CountingFilter, FilterConfig, HashKind};
//!
//! let filter = CountingFilter::new(FilterConfig::new(1024, 20, HashKind::Murmur)?);
//!
//! filter.add("jxq")?;
//! filter.add("jxq")?;
//! assert!(filter.membership_test("jxq")?);
//! assert_eq!(filter.approximate_count("jxq")?, 2);
//!
//! filter.delete("jxq")?;
//! assert_eq!(filter.approximate_count("jxq")?, 1);
//! # Ok::<(), griddle::GriddleError>(())
//! ```
//!
//! # Durable Instances
//!
//! ```
//! use griddle::{FilterConfig, Griddle};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("votes.3.dat");
//! let config = FilterConfig::with_vector_size(1024)?;
//!
//! let votes = Griddle::construct("votes", 3, config, &path)?;
//! for _ in 0..3 {
//!     assert!(votes.add("jxq")?);
//! }
//! assert!(!votes.add("jxq")?);
//! votes.dump_to_disk()?;
//!
//! let restored = Griddle::restore_or_construct("votes", 3, config, &path)?;
//! assert_eq!(restored.inserted_count("jxq")?, 3);
//! # Ok::<(), griddle::GriddleError>(())
//! ```
//!
//! # Features
//!
//! - `serde` - `Serialize`/`Deserialize` for [`FilterConfig`],
//!   [`GriddleConfig`] and [`HashKind`], validated on the way in.
//!
//! # Unsafe Code Policy
//!
//! Unsafe code is confined to two places, each with a `// SAFETY:` comment:
//! - `sync::section`: the `UnsafeCell` holding a reclaimable filter.
//! - `storage`: creating the memory map.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::len_zero)]
#![allow(clippy::bool_assert_comparison)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc(html_root_url = "https://docs.rs/griddle/0.1.0")]

/// Bucket storage, keys and filter parameters
pub mod core;

/// Error types and result aliases
pub mod error;

/// Counting filter engine
pub mod filters;

/// Hash families and bucket index generation
pub mod hash;

/// Utility types
pub mod util;

/// Reclaimable filter sections
#[allow(unsafe_code)]
pub mod sync;

/// Memory-mapped dump files
#[allow(unsafe_code)]
pub mod storage;

/// Type-state configuration builder
pub mod builder;

/// Registry configuration
pub mod config;

/// Durable named instances
pub mod griddle;

/// Named instance registry and maintenance worker
pub mod registry;

pub use crate::config::GriddleConfig;
pub use crate::core::{FilterConfig, Key};
pub use crate::error::{GriddleError, Result};
pub use crate::filters::CountingFilter;
pub use crate::griddle::Griddle;
pub use crate::hash::HashKind;
pub use crate::registry::{DumpSummary, GriddleRegistry, MaintenanceHandle, ShutdownReport};

/// Prelude module for convenient imports.
///
/// # Examples
///
/// ```
/// use griddle::prelude::*;
///
/// let filter = CountingFilter::new(FilterConfig::with_vector_size(256)?);
/// filter.add(Key::new(b"hello"))?;
/// assert!(filter.membership_test("hello")?);
/// # Ok::<(), GriddleError>(())
/// ```
pub mod prelude {
    pub use crate::builder::GriddleConfigBuilder;
    pub use crate::config::GriddleConfig;
    pub use crate::core::{FilterConfig, Key};
    pub use crate::error::{GriddleError, Result};
    pub use crate::filters::{ContentionSnapshot, CountingFilter};
    pub use crate::griddle::Griddle;
    pub use crate::hash::HashKind;
    pub use crate::registry::{GriddleRegistry, MaintenanceHandle};
    pub use crate::sync::{ReclaimableSection, SectionGuard};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let filter = CountingFilter::new(FilterConfig::with_vector_size(128).unwrap());
        filter.add("test").unwrap();
        assert!(filter.membership_test("test").unwrap());
    }

    #[test]
    fn test_types_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CountingFilter>();
        assert_send_sync::<ReclaimableSection>();
        assert_send_sync::<Griddle>();
        assert_send_sync::<GriddleRegistry>();
    }

    #[test]
    fn test_shared_across_threads() {
        use std::sync::Arc;

        let filter = Arc::new(CountingFilter::new(FilterConfig::with_vector_size(1024).unwrap()));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let filter = Arc::clone(&filter);
                std::thread::spawn(move || filter.add(format!("thread-{t}").as_str()).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        for t in 0..4 {
            assert!(filter.membership_test(format!("thread-{t}").as_str()).unwrap());
        }
    }
}
