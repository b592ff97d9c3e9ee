//! Shared utilities for the phenotype pooling crates.
//!
//! This crate provides the missing-value conventions used across the
//! workspace and Polars `AnyValue` helpers for output generation.

pub mod missing;
pub mod polars;

// Re-export commonly used functions at crate root for convenience
pub use missing::{DEFAULT_MISSING_TOKENS, MISSING_MARKER, is_missing_token, is_missing_with};
pub use polars::{any_to_output, any_to_string, format_numeric, parse_f64, parse_i64, round_to};
