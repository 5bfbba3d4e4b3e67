//! Catalog entities: categories, topics, sections, flashcards, and
//! per-topic progress records
//!
//! These follow the plain CRUD contract (`CrudRepository`) without
//! entity-specific operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Top-level content grouping (`categories` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub icon: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateCategory {
    pub name: String,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub icon: Option<String>,
    pub display_order: i32,
    /// Defaults to `true` when omitted.
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub icon: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Subject area within a category (`topics` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateTopic {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub display_order: i32,
    /// Defaults to `true` when omitted.
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTopic {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Ordered page grouping inside a category (`sections` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSection {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub display_order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateSection {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub display_order: Option<i32>,
}

/// Two-sided memorization card (`flashcards` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub front_text: String,
    pub back_text: String,
    pub tags: Vec<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateFlashcard {
    pub category_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub front_text: String,
    pub back_text: String,
    pub tags: Vec<String>,
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateFlashcard {
    pub category_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub front_text: Option<String>,
    pub back_text: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

/// Per-user, per-scope attempt tally (`progress_records` table). Unlike
/// [`crate::entities::UserProgress`] this is not unique per user; a user
/// accumulates one record per category/topic scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub questions_attempted: i32,
    pub questions_correct: i32,
    pub completion_percentage: f64,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateProgressRecord {
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub topic_id: Option<Uuid>,
    pub questions_attempted: i32,
    pub questions_correct: i32,
    pub completion_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProgressRecord {
    pub questions_attempted: Option<i32>,
    pub questions_correct: Option<i32>,
    pub completion_percentage: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_serializes_with_camel_case_keys() {
        let now = Utc::now();
        let category = Category {
            id: Uuid::nil(),
            name: "Rust".to_string(),
            description: None,
            slug: Some("rust".to_string()),
            icon: None,
            display_order: 1,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&category).unwrap();
        assert!(value.get("displayOrder").is_some());
        assert!(value.get("isActive").is_some());
        assert!(value.get("display_order").is_none());
    }

    #[test]
    fn create_dtos_deserialize_from_partial_json() {
        let create: CreateCategory =
            serde_json::from_str(r#"{"name": "Databases"}"#).unwrap();
        assert_eq!(create.name, "Databases");
        assert_eq!(create.display_order, 0);
        assert_eq!(create.is_active, None);

        let create: CreateFlashcard = serde_json::from_str(
            r#"{"frontText": "Owner?", "backText": "One at a time."}"#,
        )
        .unwrap();
        assert_eq!(create.front_text, "Owner?");
        assert!(!create.is_published);
    }
}
