//! Merge tunables
//!
//! Every threshold is independent. The identity-collision severity bands
//! and the content-duplicate threshold are not assumed to line up.

use serde::{Deserialize, Serialize};

/// Configuration for conflict detection and resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Similarity above which two records count as content duplicates
    pub duplicate_threshold: f32,
    /// Identity collisions above this similarity are low severity
    pub identity_low_threshold: f32,
    /// Identity collisions above this (and up to the low band) are medium
    pub identity_medium_threshold: f32,
    /// Content duplicates above this similarity are medium severity
    pub content_medium_threshold: f32,
    /// Similarity above which attribute differences are reported
    pub metadata_threshold: f32,
    /// Weight of the question text when answers are present on both sides
    pub primary_weight: f32,
    /// Weight of the answer text when present on both sides
    pub secondary_weight: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: 0.8,
            identity_low_threshold: 0.9,
            identity_medium_threshold: 0.7,
            content_medium_threshold: 0.9,
            metadata_threshold: 0.8,
            primary_weight: 0.7,
            secondary_weight: 0.3,
        }
    }
}

impl MergeConfig {
    /// Set the content-duplicate threshold
    pub fn with_duplicate_threshold(mut self, threshold: f32) -> Self {
        self.duplicate_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the identity-collision severity bands
    pub fn with_identity_thresholds(mut self, medium: f32, low: f32) -> Self {
        self.identity_medium_threshold = medium.clamp(0.0, 1.0);
        self.identity_low_threshold = low.clamp(0.0, 1.0);
        self
    }

    /// Set the similarity above which content duplicates are medium severity
    pub fn with_content_medium_threshold(mut self, threshold: f32) -> Self {
        self.content_medium_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the metadata-divergence threshold
    pub fn with_metadata_threshold(mut self, threshold: f32) -> Self {
        self.metadata_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the text/answer blend weights
    pub fn with_weights(mut self, primary: f32, secondary: f32) -> Self {
        self.primary_weight = primary.clamp(0.0, 1.0);
        self.secondary_weight = secondary.clamp(0.0, 1.0);
        self
    }

    /// Defaults overlaid with `ITEMBANK_*` environment variables
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fields: [(&str, &mut f32); 7] = [
            ("ITEMBANK_DUPLICATE_THRESHOLD", &mut self.duplicate_threshold),
            ("ITEMBANK_IDENTITY_LOW_THRESHOLD", &mut self.identity_low_threshold),
            (
                "ITEMBANK_IDENTITY_MEDIUM_THRESHOLD",
                &mut self.identity_medium_threshold,
            ),
            (
                "ITEMBANK_CONTENT_MEDIUM_THRESHOLD",
                &mut self.content_medium_threshold,
            ),
            ("ITEMBANK_METADATA_THRESHOLD", &mut self.metadata_threshold),
            ("ITEMBANK_PRIMARY_WEIGHT", &mut self.primary_weight),
            ("ITEMBANK_SECONDARY_WEIGHT", &mut self.secondary_weight),
        ];

        for (key, slot) in fields {
            let Some(raw) = lookup(key) else { continue };
            match raw.trim().parse::<f32>() {
                Ok(value) if value.is_finite() => *slot = value.clamp(0.0, 1.0),
                _ => tracing::warn!(key, value = %raw, "Ignoring unparsable merge setting"),
            }
        }
        self
    }
}
