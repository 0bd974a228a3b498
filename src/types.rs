//! Core types for the item bank

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A question record in the item bank
///
/// Records arrive already parsed and validated from upstream. Every field
/// except the pass-through map is optional; anything missing compares as
/// empty and never fails a merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Explicit identifier (positional fallback applies when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Question type (e.g., "multiple_choice", "numerical")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Primary question text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Ordered answer choices
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    /// Correct answer text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtopic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    /// Accepted numeric tolerance for numerical answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incorrect_feedback: Option<String>,
    /// Unrecognized fields, carried through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Item {
    /// Create an item with an explicit identifier and question text
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Set the answer text
    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(answer.into());
        self
    }

    /// Set the display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the topic
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Set the difficulty
    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    /// Set the point value
    pub fn with_points(mut self, points: f64) -> Self {
        self.points = Some(points);
        self
    }

    /// Identifier of this item at `index` within its collection.
    ///
    /// A blank or missing explicit id falls back to the positional index.
    pub fn resolved_id(&self, index: usize) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => index.to_string(),
        }
    }

    /// Primary text, empty when missing
    pub fn primary_text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Answer text, if any non-blank answer is present
    pub fn secondary_text(&self) -> Option<&str> {
        self.answer.as_deref().filter(|a| !a.trim().is_empty())
    }

    /// Descriptive attributes compared during metadata divergence checks
    pub fn attributes(&self) -> ItemAttributes {
        ItemAttributes {
            item_type: self.item_type.clone().unwrap_or_default(),
            topic: self.topic.clone().unwrap_or_default(),
            subtopic: self.subtopic.clone().unwrap_or_default(),
            difficulty: self.difficulty.clone().unwrap_or_default(),
            points: self.points,
        }
    }
}

/// Descriptive attributes of an item with missing values defaulted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemAttributes {
    pub item_type: String,
    pub topic: String,
    pub subtopic: String,
    pub difficulty: String,
    pub points: Option<f64>,
}

impl ItemAttributes {
    /// Names of the attributes that differ between `self` and `other`,
    /// in a fixed order: topic, subtopic, difficulty, points, type.
    pub fn differing_fields(&self, other: &ItemAttributes) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.topic != other.topic {
            fields.push("topic");
        }
        if self.subtopic != other.subtopic {
            fields.push("subtopic");
        }
        if self.difficulty != other.difficulty {
            fields.push("difficulty");
        }
        if !points_equal(self.points, other.points) {
            fields.push("points");
        }
        if self.item_type != other.item_type {
            fields.push("type");
        }
        fields
    }
}

fn points_equal(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_id_explicit() {
        let item = Item::new("q7", "text");
        assert_eq!(item.resolved_id(3), "q7");
    }

    #[test]
    fn test_resolved_id_positional_fallback() {
        let item = Item::default();
        assert_eq!(item.resolved_id(3), "3");

        let blank = Item {
            id: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.resolved_id(5), "5");
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let json = r#"{"id":"q1","text":"What is 2+2?","type":"numerical",
            "image_ref":"img/1.png","weight":3}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.item_type.as_deref(), Some("numerical"));
        assert_eq!(item.extra.get("image_ref"), Some(&serde_json::json!("img/1.png")));

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["weight"], serde_json::json!(3));
        assert_eq!(back["type"], serde_json::json!("numerical"));
    }

    #[test]
    fn test_differing_fields_defaults_missing() {
        let a = Item::new("a", "x").with_topic("circuits").attributes();
        let b = Item::new("b", "x").attributes();
        assert_eq!(a.differing_fields(&b), vec!["topic"]);

        let c = Item::new("c", "x").with_points(2.0).with_difficulty("hard");
        let d = Item::new("d", "x").with_points(3.0).with_difficulty("hard");
        assert_eq!(c.attributes().differing_fields(&d.attributes()), vec!["points"]);
    }
}
