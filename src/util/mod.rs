//! Internal utility functions and helpers.
//!
//! # Modules
//!
//! - [`atomic`] - Cache-padded statistics counters

pub mod atomic;

pub use atomic::AtomicCounter;
