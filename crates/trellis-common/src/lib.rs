//! Shared types for the trellis formatter crates.

pub mod span;

pub use span::{Span, MAX_SOURCE_LEN};
