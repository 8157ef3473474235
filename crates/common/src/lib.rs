//! Common utilities for palisade crates.
//!
//! This crate provides shared infrastructure used across the palisade
//! workspace:
//!
//! - [`trace`] - Per-channel trace output controlled via `PALISADE_TRACE`
//! - [`intern`] - String interning using arena allocation
//! - [`argv`] - Quote-aware tokenizing of command lines into argument vectors

pub mod argv;
pub mod intern;
pub mod trace;

pub use argv::{quoted_len, split_args, ArgvError};
pub use intern::StringInterner;
pub use trace::Tracer;
