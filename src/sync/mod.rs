//! Concurrency primitives for sharing filters across threads.
//!
//! # Module Organization
//!
//! - [`ReclaimableSection`] - a counting filter that can be retired and freed
//!   while other threads may still be using it
//! - [`SectionGuard`] - scoped access handed out by
//!   [`ReclaimableSection::enter`]
//!
//! # Safety
//!
//! The section relies on one `unsafe impl Sync` and two `unsafe` cell
//! accesses, all justified by the packed state word described in
//! [`section`].

pub mod section;

pub use section::{ReclaimableSection, SectionGuard};
