//! Core building blocks shared by the counting filter and its durable wrapper.
//!
//! # Module Organization
//!
//! ```text
//! core/
//! ├── buckets.rs  - 4-bit packed counters and the bounded CAS update loop
//! ├── key.rs      - Key type
//! ├── params.rs   - FilterConfig and the persisted header size
//! └── mod.rs      - This file
//! ```

pub mod buckets;
pub mod key;
pub mod params;

pub use buckets::{BucketArray, BucketSlot, UpdateOutcome, BUCKET_MAX, MAX_UPDATE_ATTEMPTS};
pub use key::Key;
pub use params::{FilterConfig, DEFAULT_HASH_COUNT, HEADER_LEN};
