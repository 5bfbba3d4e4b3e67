//! Learning card entity, per-user interactions, and DTOs
//!
//! Cards are bite-sized reference content. Per-user state (mastery,
//! bookmarks, notes, review counts) lives in a separate interaction row with
//! composite identity `(card_id, user_id)` maintained through get-or-create
//! upserts.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::question::QuestionDifficulty;

/// Highest mastery level a user can record for a card.
pub const MAX_MASTERY_LEVEL: i16 = 5;

/// Presentation style of a learning card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum CardType {
    #[default]
    Concept,
    Example,
    Tip,
    Warning,
    BestPractice,
}

impl CardType {
    /// Every card type. Statistics fan out one count query per member.
    pub const ALL: [Self; 5] = [
        Self::Concept,
        Self::Example,
        Self::Tip,
        Self::Warning,
        Self::BestPractice,
    ];

    /// snake_case storage and wire form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Example => "example",
            Self::Tip => "tip",
            Self::Warning => "warning",
            Self::BestPractice => "best_practice",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A learning card as persisted in the `learning_cards` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LearningCard {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub card_type: CardType,
    pub difficulty: Option<QuestionDifficulty>,
    pub tags: Vec<String>,
    /// Explicitly curated related-card ids; when empty, relatedness falls
    /// back to same-topic lookup.
    pub related_cards: Vec<Uuid>,
    /// Position within its topic or category listing.
    pub display_order: i32,
    pub is_published: bool,
    pub view_count: i64,
    pub like_count: i64,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a learning card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateLearningCard {
    pub title: String,
    pub content: String,
    pub category_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub card_type: CardType,
    pub difficulty: Option<QuestionDifficulty>,
    pub tags: Vec<String>,
    pub related_cards: Vec<Uuid>,
    pub display_order: i32,
    pub is_published: bool,
    pub author_id: Option<Uuid>,
}

/// Partial update for a learning card. View and like counters are maintained
/// by the dedicated atomic operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateLearningCard {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub card_type: Option<CardType>,
    pub difficulty: Option<QuestionDifficulty>,
    pub tags: Option<Vec<String>>,
    pub related_cards: Option<Vec<Uuid>>,
    pub display_order: Option<i32>,
    pub is_published: Option<bool>,
}

/// Per-user state for one card (`user_card_interactions` table), at most one
/// row per `(card_id, user_id)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserCardInteraction {
    pub id: Uuid,
    pub card_id: Uuid,
    pub user_id: Uuid,
    /// Self-assessed mastery, 0–[`MAX_MASTERY_LEVEL`].
    pub mastery_level: i16,
    /// Number of recorded views for this pair.
    pub review_count: i32,
    pub is_bookmarked: bool,
    pub notes: Option<String>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counts over the card corpus.
///
/// `by_category`, `by_difficulty`, `total_views`, `total_likes`, and
/// `average_mastery_level` are part of the contract but not yet computed;
/// they always carry empty/zero values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningCardStatistics {
    pub total: u64,
    /// One entry per [`CardType`] member.
    pub by_type: BTreeMap<String, u64>,
    /// Not yet computed: empty (or a single scoped entry for
    /// category-scoped statistics).
    pub by_category: BTreeMap<String, u64>,
    /// Not yet computed: always empty.
    pub by_difficulty: BTreeMap<String, u64>,
    pub published: u64,
    pub unpublished: u64,
    /// Not yet computed: always 0.
    pub total_views: u64,
    /// Not yet computed: always 0.
    pub total_likes: u64,
    /// Not yet computed: always 0.
    pub average_mastery_level: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CardType::BestPractice).unwrap(),
            "\"best_practice\""
        );
        assert_eq!(serde_json::to_string(&CardType::Tip).unwrap(), "\"tip\"");
        let parsed: CardType = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(parsed, CardType::Warning);
    }

    #[test]
    fn card_type_string_forms_match_display() {
        for card_type in CardType::ALL {
            let json = serde_json::to_string(&card_type).unwrap();
            assert_eq!(json, format!("\"{card_type}\""));
        }
    }

    #[test]
    fn interaction_serializes_with_camel_case_keys() {
        let now = Utc::now();
        let interaction = UserCardInteraction {
            id: Uuid::nil(),
            card_id: Uuid::nil(),
            user_id: Uuid::nil(),
            mastery_level: 3,
            review_count: 7,
            is_bookmarked: true,
            notes: Some("revisit the borrow checker section".to_string()),
            viewed_at: Some(now),
            last_reviewed_at: None,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&interaction).unwrap();
        assert!(value.get("masteryLevel").is_some());
        assert!(value.get("reviewCount").is_some());
        assert!(value.get("isBookmarked").is_some());
        assert!(value.get("mastery_level").is_none());
    }

    #[test]
    fn create_defaults_to_concept() {
        let create = CreateLearningCard {
            title: "Slices".to_string(),
            content: "A view into a contiguous sequence.".to_string(),
            ..Default::default()
        };
        assert_eq!(create.card_type, CardType::Concept);
        assert!(!create.is_published);
        assert_eq!(create.display_order, 0);
    }
}
