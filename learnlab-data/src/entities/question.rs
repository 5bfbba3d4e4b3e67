//! Question entity, DTOs, filters, and statistics
//!
//! Questions are the quiz content unit: a prompt, optional answer choices,
//! and grading metadata. Records are flat; category, topic, and author are
//! referenced by id only. Serialized keys are camelCase; columns are
//! snake_case (handled by serde renames and `FromRow` respectively).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Point value stamped onto new questions when the caller omits one.
pub const DEFAULT_QUESTION_POINTS: i32 = 10;

/// Difficulty tier of a question or learning card.
///
/// Stored as lowercase text in the `difficulty` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum QuestionDifficulty {
    #[default]
    Easy,
    Medium,
    Hard,
    Expert,
}

impl QuestionDifficulty {
    /// Every difficulty tier, in ascending order. Statistics fan out one
    /// count query per member.
    pub const ALL: [Self; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Expert];

    /// Lowercase storage and wire form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Expert => "expert",
        }
    }
}

impl fmt::Display for QuestionDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation format of a question.
///
/// Stored as snake_case text in the `question_type` column; serialized under
/// the `type` key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    MultipleChoice,
    Code,
    TrueFalse,
    FillInBlank,
    Matching,
}

impl QuestionType {
    /// Every question type. Statistics fan out one count query per member.
    pub const ALL: [Self; 5] = [
        Self::MultipleChoice,
        Self::Code,
        Self::TrueFalse,
        Self::FillInBlank,
        Self::Matching,
    ];

    /// snake_case storage and wire form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::Code => "code",
            Self::TrueFalse => "true_false",
            Self::FillInBlank => "fill_in_blank",
            Self::Matching => "matching",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quiz question as persisted in the `questions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub title: String,
    /// Prompt body; markdown is opaque to this layer.
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub difficulty: QuestionDifficulty,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Answer choices for choice-based types; empty otherwise.
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    /// Score awarded for a correct answer.
    pub points: i32,
    pub tags: Vec<String>,
    pub author_id: Option<Uuid>,
    /// Soft-delete flag: unpublished questions stay in the table.
    pub is_published: bool,
    pub view_count: i64,
    /// Percentage of correct attempts, 0–100, when tracked.
    pub success_rate: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a question. The store assigns the id; the adapter
/// stamps timestamps, `view_count = 0`, and the documented field defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateQuestion {
    pub title: String,
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub difficulty: QuestionDifficulty,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    /// Defaults to [`DEFAULT_QUESTION_POINTS`] when omitted.
    pub points: Option<i32>,
    pub tags: Vec<String>,
    pub author_id: Option<Uuid>,
    pub is_published: bool,
}

/// Partial update for a question. Absent fields are left unchanged; there is
/// no way to null out an already-set optional field through this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateQuestion {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub difficulty: Option<QuestionDifficulty>,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub points: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

/// Typed filters for question list queries. All present fields are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionFilters {
    pub category_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub difficulty: Option<QuestionDifficulty>,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    pub is_published: Option<bool>,
    pub author_id: Option<Uuid>,
    /// Matches questions whose tag array contains this tag.
    pub tag: Option<String>,
    /// Case-insensitive substring match over title or content.
    pub search: Option<String>,
}

impl QuestionFilters {
    /// Filters matching every row.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether no filter field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Aggregate counts over the question corpus.
///
/// `by_category`, `average_success_rate`, and `total_views` are part of the
/// contract but not yet computed; they always carry empty/zero values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStatistics {
    pub total: u64,
    /// One entry per [`QuestionDifficulty`] member.
    pub by_difficulty: BTreeMap<String, u64>,
    /// One entry per [`QuestionType`] member.
    pub by_type: BTreeMap<String, u64>,
    /// Not yet computed: empty (or a single scoped entry for
    /// category-scoped statistics).
    pub by_category: BTreeMap<String, u64>,
    pub published: u64,
    pub unpublished: u64,
    /// Not yet computed: always 0.
    pub average_success_rate: f64,
    /// Not yet computed: always 0.
    pub total_views: u64,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&QuestionDifficulty::Easy).unwrap(),
            "\"easy\""
        );
        assert_eq!(
            serde_json::to_string(&QuestionDifficulty::Expert).unwrap(),
            "\"expert\""
        );
        let parsed: QuestionDifficulty = serde_json::from_str("\"hard\"").unwrap();
        assert_eq!(parsed, QuestionDifficulty::Hard);
    }

    #[test]
    fn question_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&QuestionType::MultipleChoice).unwrap(),
            "\"multiple_choice\""
        );
        assert_eq!(
            serde_json::to_string(&QuestionType::FillInBlank).unwrap(),
            "\"fill_in_blank\""
        );
    }

    #[test]
    fn enum_string_forms_match_display() {
        for difficulty in QuestionDifficulty::ALL {
            let json = serde_json::to_string(&difficulty).unwrap();
            assert_eq!(json, format!("\"{difficulty}\""));
        }
        for question_type in QuestionType::ALL {
            let json = serde_json::to_string(&question_type).unwrap();
            assert_eq!(json, format!("\"{question_type}\""));
        }
    }

    #[test]
    fn question_serializes_with_camel_case_keys() {
        let question = Question {
            id: Uuid::nil(),
            title: "What is ownership?".to_string(),
            content: None,
            category_id: None,
            topic_id: None,
            difficulty: QuestionDifficulty::Medium,
            question_type: QuestionType::MultipleChoice,
            options: vec![],
            correct_answer: None,
            explanation: None,
            points: DEFAULT_QUESTION_POINTS,
            tags: vec![],
            author_id: None,
            is_published: false,
            view_count: 0,
            success_rate: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&question).unwrap();
        assert!(value.get("isPublished").is_some());
        assert!(value.get("viewCount").is_some());
        assert!(value.get("createdAt").is_some());
        // The question type serializes under the legacy `type` key.
        assert_eq!(value["type"], serde_json::json!("multiple_choice"));
        assert!(value.get("questionType").is_none());
    }

    #[test]
    fn create_defaults_are_inert() {
        let create = CreateQuestion {
            title: "T".to_string(),
            ..Default::default()
        };
        assert_eq!(create.difficulty, QuestionDifficulty::Easy);
        assert_eq!(create.question_type, QuestionType::MultipleChoice);
        assert_eq!(create.points, None);
        assert!(!create.is_published);
    }

    #[test]
    fn filters_report_emptiness() {
        assert!(QuestionFilters::none().is_empty());
        let filters = QuestionFilters {
            difficulty: Some(QuestionDifficulty::Easy),
            ..Default::default()
        };
        assert!(!filters.is_empty());
    }
}
