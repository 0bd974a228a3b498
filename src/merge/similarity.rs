//! Text similarity between records

use crate::config::MergeConfig;
use crate::types::Item;
use similar::TextDiff;

/// Sequence-matching ratio of two strings after trimming and lowercasing.
///
/// Twice the matched character count over the combined length, in
/// [0.0, 1.0]. Empty input on either side scores 0.0. Whole strings are
/// compared, so cost grows with the product of their lengths.
pub fn sequence_ratio(a: &str, b: &str) -> f32 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    TextDiff::from_chars(a.as_str(), b.as_str())
        .ratio()
        .clamp(0.0, 1.0)
}

/// Scores how alike two items are
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    primary_weight: f32,
    secondary_weight: f32,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(&MergeConfig::default())
    }
}

impl SimilarityScorer {
    pub fn new(config: &MergeConfig) -> Self {
        Self {
            primary_weight: config.primary_weight,
            secondary_weight: config.secondary_weight,
        }
    }

    /// Similarity of two items (0.0 - 1.0)
    ///
    /// Question text drives the score. When both sides carry an answer the
    /// answer similarity is blended in by weight.
    pub fn score(&self, a: &Item, b: &Item) -> f32 {
        if a.primary_text().trim().is_empty() || b.primary_text().trim().is_empty() {
            return 0.0;
        }
        let primary = sequence_ratio(a.primary_text(), b.primary_text());

        match (a.secondary_text(), b.secondary_text()) {
            (Some(sa), Some(sb)) => {
                let secondary = sequence_ratio(sa, sb);
                (self.primary_weight * primary + self.secondary_weight * secondary).clamp(0.0, 1.0)
            }
            _ => primary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text() {
        assert_eq!(sequence_ratio("What is 2+2?", "  what is 2+2?  "), 1.0);
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(sequence_ratio("", "anything"), 0.0);
        assert_eq!(sequence_ratio("   ", "   "), 0.0);

        let scorer = SimilarityScorer::default();
        let a = Item::default().with_answer("4");
        let b = Item::default().with_answer("4");
        assert_eq!(scorer.score(&a, &b), 0.0);
    }

    #[test]
    fn test_ratio_counts_matched_characters() {
        // 17 of 20 characters survive in order: 2 * 17 / 40
        let ratio = sequence_ratio("abcdefghijklmnopqrst", "abc1efghij2lmnopq3st");
        assert!((ratio - 0.85).abs() < 1e-6, "ratio was {ratio}");
    }

    #[test]
    fn test_answer_blend() {
        let scorer = SimilarityScorer::default();
        let a = Item::new("a", "What is 2+2?").with_answer("4");
        let b = Item::new("b", "What is 2+2?").with_answer("5");
        let score = scorer.score(&a, &b);
        assert!((score - 0.7).abs() < 1e-6, "score was {score}");

        // Answer on one side only: primary text alone
        let c = Item::new("c", "What is 2+2?");
        assert_eq!(scorer.score(&a, &c), 1.0);
    }

    #[test]
    fn test_symmetric() {
        let scorer = SimilarityScorer::default();
        let a = Item::new("a", "Calculate voltage").with_answer("5V");
        let b = Item::new("b", "Calculate current").with_answer("2A");
        assert_eq!(scorer.score(&a, &b), scorer.score(&b, &a));
        assert!(scorer.score(&a, &b) < 0.7);
    }
}
