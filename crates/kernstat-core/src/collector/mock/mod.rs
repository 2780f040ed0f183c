//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and pre-built kernel tree scenarios for
//! testing parsers without a live `/proc`, `/sys` or configfs.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
