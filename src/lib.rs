//! Itembank - conflict-aware merging for question item banks
//!
//! Detects collisions between an existing collection of question records
//! and an incoming one, then applies a merge strategy to produce a new
//! collection. Inputs are never mutated.

pub mod config;
pub mod error;
pub mod merge;
pub mod types;

pub use config::MergeConfig;
pub use error::{MergeError, Result};
pub use merge::{
    Conflict, ConflictType, MergeEngine, MergePreview, MergeResult, MergeStrategy, Severity,
};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
