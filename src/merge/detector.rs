//! Conflict detection logic

use super::{Conflict, ConflictType, MergeStrategy, Severity, SimilarityScorer};
use crate::config::MergeConfig;
use crate::types::Item;

/// Similarity of one (existing, incoming) pair
#[derive(Debug, Clone, Copy)]
struct ScoredPair {
    existing_index: usize,
    incoming_index: usize,
    similarity: f32,
    same_id: bool,
}

/// Conflict detector
///
/// Runs three passes over existing × incoming and reports conflicts
/// pass by pass, each pass walking incoming records in caller order.
/// Detection is total: missing fields compare as empty.
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    scorer: SimilarityScorer,
    config: MergeConfig,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(MergeConfig::default())
    }
}

impl ConflictDetector {
    /// Create a new conflict detector
    pub fn new(config: MergeConfig) -> Self {
        Self {
            scorer: SimilarityScorer::new(&config),
            config,
        }
    }

    /// Set the content-duplicate threshold
    pub fn with_duplicate_threshold(mut self, threshold: f32) -> Self {
        self.config = self.config.with_duplicate_threshold(threshold);
        self
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Detect every conflict between `existing` and `incoming`
    pub fn detect(&self, existing: &[Item], incoming: &[Item]) -> Vec<Conflict> {
        let existing_ids: Vec<String> = existing
            .iter()
            .enumerate()
            .map(|(i, item)| item.resolved_id(i))
            .collect();
        let incoming_ids: Vec<String> = incoming
            .iter()
            .enumerate()
            .map(|(i, item)| item.resolved_id(i))
            .collect();

        // Every pair is scored exactly once; all three passes read from here.
        let mut pairs = Vec::with_capacity(existing.len() * incoming.len());
        for (incoming_index, item) in incoming.iter().enumerate() {
            for (existing_index, current) in existing.iter().enumerate() {
                pairs.push(ScoredPair {
                    existing_index,
                    incoming_index,
                    similarity: self.scorer.score(current, item),
                    same_id: existing_ids[existing_index] == incoming_ids[incoming_index],
                });
            }
        }

        let mut conflicts = Vec::new();
        self.identity_pass(&pairs, &incoming_ids, &mut conflicts);
        let identity = conflicts.len();
        self.content_pass(&pairs, &existing_ids, &incoming_ids, &mut conflicts);
        let content = conflicts.len() - identity;
        self.metadata_pass(
            &pairs,
            existing,
            incoming,
            &existing_ids,
            &incoming_ids,
            &mut conflicts,
        );
        let metadata = conflicts.len() - identity - content;

        tracing::debug!(
            existing = existing.len(),
            incoming = incoming.len(),
            identity,
            content,
            metadata,
            "Conflict detection complete"
        );

        conflicts
    }

    fn identity_pass(
        &self,
        pairs: &[ScoredPair],
        incoming_ids: &[String],
        out: &mut Vec<Conflict>,
    ) {
        for pair in pairs.iter().filter(|p| p.same_id) {
            let severity = self.identity_severity(pair.similarity);
            let suggested_resolution = match severity {
                Severity::Low => MergeStrategy::SkipDuplicates,
                Severity::Medium => MergeStrategy::ReplaceDuplicates,
                _ => MergeStrategy::RenameDuplicates,
            };
            out.push(Conflict {
                conflict_type: ConflictType::IdentityCollision,
                severity,
                existing_index: pair.existing_index,
                incoming_index: pair.incoming_index,
                similarity: pair.similarity,
                description: format!(
                    "Item ID '{}' already exists ({:.0}% similar)",
                    incoming_ids[pair.incoming_index],
                    pair.similarity * 100.0
                ),
                suggested_resolution,
            });
        }
    }

    fn content_pass(
        &self,
        pairs: &[ScoredPair],
        existing_ids: &[String],
        incoming_ids: &[String],
        out: &mut Vec<Conflict>,
    ) {
        let threshold = self.config.duplicate_threshold;
        for pair in pairs.iter().filter(|p| !p.same_id && p.similarity > threshold) {
            let severity = if pair.similarity > self.config.content_medium_threshold {
                Severity::Medium
            } else {
                Severity::Low
            };
            out.push(Conflict {
                conflict_type: ConflictType::ContentDuplicate,
                severity,
                existing_index: pair.existing_index,
                incoming_index: pair.incoming_index,
                similarity: pair.similarity,
                description: format!(
                    "Incoming item '{}' is {:.0}% similar to existing item '{}'",
                    incoming_ids[pair.incoming_index],
                    pair.similarity * 100.0,
                    existing_ids[pair.existing_index]
                ),
                suggested_resolution: MergeStrategy::SkipDuplicates,
            });
        }
    }

    fn metadata_pass(
        &self,
        pairs: &[ScoredPair],
        existing: &[Item],
        incoming: &[Item],
        existing_ids: &[String],
        incoming_ids: &[String],
        out: &mut Vec<Conflict>,
    ) {
        let threshold = self.config.metadata_threshold;
        for pair in pairs.iter().filter(|p| p.similarity > threshold) {
            let fields = existing[pair.existing_index]
                .attributes()
                .differing_fields(&incoming[pair.incoming_index].attributes());
            if fields.is_empty() {
                continue;
            }
            out.push(Conflict {
                conflict_type: ConflictType::MetadataDivergence,
                severity: Severity::Low,
                existing_index: pair.existing_index,
                incoming_index: pair.incoming_index,
                similarity: pair.similarity,
                description: format!(
                    "Items '{}' and '{}' differ in: {}",
                    existing_ids[pair.existing_index],
                    incoming_ids[pair.incoming_index],
                    fields.join(", ")
                ),
                suggested_resolution: if pair.same_id {
                    MergeStrategy::ReplaceDuplicates
                } else {
                    MergeStrategy::AppendAll
                },
            });
        }
    }

    fn identity_severity(&self, similarity: f32) -> Severity {
        if similarity > self.config.identity_low_threshold {
            Severity::Low
        } else if similarity > self.config.identity_medium_threshold {
            Severity::Medium
        } else {
            Severity::High
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identical_id_and_text() {
        let detector = ConflictDetector::default();
        let existing = vec![Item::new("q1", "What is 2+2?").with_answer("4")];
        let incoming = existing.clone();

        let conflicts = detector.detect(&existing, &incoming);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::IdentityCollision);
        assert_eq!(conflicts[0].severity, Severity::Low);
        assert_eq!(conflicts[0].suggested_resolution, MergeStrategy::SkipDuplicates);
    }

    #[test]
    fn test_identity_collision_different_text_is_high() {
        let detector = ConflictDetector::default();
        let existing = vec![Item::new("q1", "Calculate voltage").with_answer("5V")];
        let incoming = vec![Item::new("q1", "Calculate current").with_answer("2A")];

        let conflicts = detector.detect(&existing, &incoming);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::High);
    }

    fn identity_severity_of(
        detector: &ConflictDetector,
        existing: &str,
        incoming: &str,
    ) -> Severity {
        let conflicts =
            detector.detect(&[Item::new("q1", existing)], &[Item::new("q1", incoming)]);
        assert_eq!(conflicts[0].conflict_type, ConflictType::IdentityCollision);
        conflicts[0].severity
    }

    #[test]
    fn test_identity_severity_bands() {
        let detector = ConflictDetector::default();
        // 0.8
        assert_eq!(
            identity_severity_of(&detector, "abcdefghij", "abcdefghxy"),
            Severity::Medium
        );
        // exactly 0.9 stays below the low band
        assert_eq!(
            identity_severity_of(&detector, "abcdefghijklmnopqrst", "abcdefghij12mnopqrst"),
            Severity::Medium
        );
        // exactly 0.7 stays below the medium band
        assert_eq!(
            identity_severity_of(&detector, "abcdefghijklmnopqrst", "abcdefghijklmn123456"),
            Severity::High
        );
    }

    #[test]
    fn test_identity_bands_follow_config() {
        let detector =
            ConflictDetector::new(MergeConfig::default().with_identity_thresholds(0.5, 0.75));
        assert_eq!(
            identity_severity_of(&detector, "abcdefghij", "abcdefghxy"),
            Severity::Low
        );
        assert_eq!(
            identity_severity_of(&detector, "abcdefghijklmnopqrst", "abcdefghijklmn123456"),
            Severity::Medium
        );
    }

    #[test]
    fn test_content_medium_band_follows_config() {
        let existing = vec![Item::new("a", "abcdefghijklmnopqrst")];
        let incoming = vec![Item::new("b", "abc1efghij2lmnopq3st")];

        let detector =
            ConflictDetector::new(MergeConfig::default().with_content_medium_threshold(0.8));
        let conflicts = detector.detect(&existing, &incoming);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::ContentDuplicate);
        assert_eq!(conflicts[0].severity, Severity::Medium);
    }

    #[test]
    fn test_content_duplicate_low() {
        let detector = ConflictDetector::default();
        let existing = vec![Item::new("a", "abcdefghijklmnopqrst")];
        let incoming = vec![Item::new("b", "abc1efghij2lmnopq3st")];

        let conflicts = detector.detect(&existing, &incoming);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::ContentDuplicate);
        assert_eq!(conflicts[0].severity, Severity::Low);
    }

    #[test]
    fn test_content_duplicate_threshold_is_tunable() {
        let existing = vec![Item::new("a", "abcdefghijklmnopqrst")];
        let incoming = vec![Item::new("b", "abc1efghij2lmnopq3st")];

        let strict = ConflictDetector::default().with_duplicate_threshold(0.9);
        assert!(strict
            .detect(&existing, &incoming)
            .iter()
            .all(|c| c.conflict_type != ConflictType::ContentDuplicate));
    }

    #[test]
    fn test_metadata_divergence() {
        let detector = ConflictDetector::default();
        let existing = vec![Item::new("q1", "Define Ohm's law").with_topic("circuits")];
        let incoming = vec![Item::new("q1", "Define Ohm's law")
            .with_topic("electronics")
            .with_points(2.0)];

        let conflicts = detector.detect(&existing, &incoming);
        let kinds: Vec<_> = conflicts.iter().map(|c| c.conflict_type).collect();
        assert_eq!(
            kinds,
            vec![ConflictType::IdentityCollision, ConflictType::MetadataDivergence]
        );
        assert_eq!(conflicts[1].severity, Severity::Low);
        assert!(conflicts[1].description.ends_with("topic, points"));
    }

    #[test]
    fn test_passes_ordered_and_incoming_order_kept() {
        let detector = ConflictDetector::default();
        let existing = vec![
            Item::new("q1", "Name the capital of France"),
            Item::new("q2", "Explain Kirchhoff's current law"),
        ];
        let incoming = vec![
            Item::new("n1", "Explain Kirchhoff's current law"),
            Item::new("q1", "Name the capital of France"),
        ];

        let conflicts = detector.detect(&existing, &incoming);
        let summary: Vec<_> = conflicts
            .iter()
            .map(|c| (c.conflict_type, c.existing_index, c.incoming_index))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ConflictType::IdentityCollision, 0, 1),
                (ConflictType::ContentDuplicate, 1, 0),
            ]
        );
    }

    #[test]
    fn test_empty_inputs() {
        let detector = ConflictDetector::default();
        assert!(detector.detect(&[], &[]).is_empty());
        assert!(detector
            .detect(&[], &[Item::new("a", "x"), Item::new("b", "y")])
            .is_empty());
    }

    #[test]
    fn test_positional_ids_collide() {
        let detector = ConflictDetector::default();
        let existing = vec![Item {
            text: Some("Old question".to_string()),
            ..Default::default()
        }];
        let incoming = vec![Item {
            text: Some("Brand new prompt".to_string()),
            ..Default::default()
        }];

        let conflicts = detector.detect(&existing, &incoming);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::IdentityCollision);
    }
}
