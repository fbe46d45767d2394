//! Shared utilities for splitchain crates.

pub mod time;

pub use time::format_duration;
