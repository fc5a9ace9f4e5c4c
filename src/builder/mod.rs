//! Builder pattern for configuration.
//!
//! Builders use the type-state pattern: required parameters move the builder
//! to its next state, and `build()` only exists once every required parameter
//! has been given. Forgetting one is a compile error; out-of-range values are
//! runtime errors from `build()`.
//!
//! ```text
//! Initial ──.dump_dir()──► WithDir ──.vector_size()──► Complete ──.build()──► GriddleConfig
//! ```
//!
//! # Examples
//!
//! ```
//! use griddle::builder::GriddleConfigBuilder;
//!
//! let config = GriddleConfigBuilder::new()
//!     .dump_dir("/data/griddle")
//!     .vector_size(4096)
//!     .hash_count(8)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.filter_config().hash_count(), 8);
//! ```
//!
//! ```compile_fail
//! use griddle::builder::GriddleConfigBuilder;
//!
//! // No vector size: `build` does not exist in this state.
//! let config = GriddleConfigBuilder::new().dump_dir("/data/griddle").build();
//! ```

pub mod griddle_config;

pub use griddle_config::{Complete, GriddleConfigBuilder, Initial, WithDir};
