//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and pre-built scenarios for exercising the
//! collectors without a Raspberry Pi's `/proc` and `/sys` trees.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
