//! Conflict-aware merge of item collections
//!
//! Provides:
//! - Text similarity scoring between records
//! - Three-pass conflict detection (identity, content, metadata)
//! - Strategy-driven conflict resolution
//! - Side-effect-free preview and all-or-nothing execution
//! - Auto-renumbering of trivially sequential incoming ids

mod detector;
mod engine;
mod renumber;
mod resolver;
mod similarity;

pub use detector::ConflictDetector;
pub use engine::{ConflictSummary, MergeEngine, MergePreview, MergeResult, ResolvedConflict};
pub use renumber::{auto_renumber, is_trivially_sequential};
pub use resolver::{
    ClockSuffix, ConflictResolver, ResolutionAction, ResolvedIncoming, SequentialSuffix,
    SuffixSource,
};
pub use similarity::{sequence_ratio, SimilarityScorer};

use crate::error::MergeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of collision between an existing and an incoming record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Both records resolve to the same identifier
    IdentityCollision,
    /// Different identifiers but highly similar text
    ContentDuplicate,
    /// Similar records whose descriptive attributes differ
    MetadataDivergence,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictType::IdentityCollision => write!(f, "identity_collision"),
            ConflictType::ContentDuplicate => write!(f, "content_duplicate"),
            ConflictType::MetadataDivergence => write!(f, "metadata_divergence"),
        }
    }
}

/// Conflict severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Policy governing how conflicts shape the merged collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Keep every incoming record regardless of conflicts
    #[default]
    AppendAll,
    /// Drop incoming records that duplicate an existing one
    SkipDuplicates,
    /// Overwrite existing records that collide by identifier
    ReplaceDuplicates,
    /// Give colliding incoming records a fresh identifier
    RenameDuplicates,
}

impl MergeStrategy {
    pub const ALL: [MergeStrategy; 4] = [
        MergeStrategy::AppendAll,
        MergeStrategy::SkipDuplicates,
        MergeStrategy::ReplaceDuplicates,
        MergeStrategy::RenameDuplicates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::AppendAll => "append_all",
            MergeStrategy::SkipDuplicates => "skip_duplicates",
            MergeStrategy::ReplaceDuplicates => "replace_duplicates",
            MergeStrategy::RenameDuplicates => "rename_duplicates",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "append_all" => Ok(MergeStrategy::AppendAll),
            "skip_duplicates" => Ok(MergeStrategy::SkipDuplicates),
            "replace_duplicates" => Ok(MergeStrategy::ReplaceDuplicates),
            "rename_duplicates" => Ok(MergeStrategy::RenameDuplicates),
            _ => Err(MergeError::UnknownStrategy(s.to_string())),
        }
    }
}

/// A detected collision between an existing and an incoming record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Type of conflict
    pub conflict_type: ConflictType,
    pub severity: Severity,
    /// Position of the record in the existing collection
    pub existing_index: usize,
    /// Position of the record in the incoming collection
    pub incoming_index: usize,
    /// Text similarity of the pair (0.0 - 1.0)
    pub similarity: f32,
    /// Human-readable description
    pub description: String,
    /// Strategy that best fits this conflict
    pub suggested_resolution: MergeStrategy,
}

impl Conflict {
    /// Whether this conflict marks the incoming record as a duplicate
    /// of an existing one at the given similarity threshold
    pub fn is_duplicate(&self, threshold: f32) -> bool {
        matches!(
            self.conflict_type,
            ConflictType::IdentityCollision | ConflictType::ContentDuplicate
        ) && self.similarity > threshold
    }
}
