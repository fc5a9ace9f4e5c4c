//! Filter implementations.
//!
//! - [`CountingFilter`] - lock-free counting filter with 4-bit saturating
//!   buckets, bounded CAS updates and a fixed big-endian persisted form

pub mod counting;

pub use counting::{ContentionSnapshot, ContentionStats, CountingFilter, PERSISTED_VERSION};
