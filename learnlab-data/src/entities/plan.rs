//! Learning plan entity, enrollments, and DTOs
//!
//! A plan is a guided sequence of learning content users enroll in. The
//! enrollment is a sub-resource with composite identity `(plan_id, user_id)`:
//! at most one row per pair, enforced by a unique index and surfaced as a
//! `Duplicate` error on double enrollment.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Publication state of a plan. Transitions are forward-only:
/// draft → published → archived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PlanStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A guided learning plan as persisted in the `plans` table.
///
/// `enrollment_count` and `completion_count` are denormalized counters
/// maintained atomically by the enrollment operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub status: PlanStatus,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub author_id: Option<Uuid>,
    pub estimated_duration_minutes: Option<i32>,
    pub enrollment_count: i64,
    pub completion_count: i64,
    /// Mean user rating when rated, 0–5 scale.
    pub average_rating: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a plan. New plans start as drafts with zeroed
/// counters; visibility defaults to public.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePlan {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub status: PlanStatus,
    /// Defaults to `true` when omitted.
    pub is_public: Option<bool>,
    pub tags: Vec<String>,
    pub author_id: Option<Uuid>,
    pub estimated_duration_minutes: Option<i32>,
}

/// Partial update for a plan. Counters and `average_rating` are maintained by
/// dedicated operations and cannot be patched here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePlan {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub status: Option<PlanStatus>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub estimated_duration_minutes: Option<i32>,
}

/// A user's enrollment in a plan (`plan_enrollments` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlanEnrollment {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub user_id: Uuid,
    /// Completion percentage, 0–100.
    pub progress: f64,
    pub current_step: i32,
    /// Not yet populated on enrollment: always 0 until step tracking lands.
    pub total_steps: i32,
    pub is_active: bool,
    pub last_accessed_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate enrollment figures for one plan.
///
/// `average_completion_time`, `total_ratings`, `view_count`, and
/// `last_enrollment_at` are part of the contract but not yet computed; they
/// always carry 0/None.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStatistics {
    pub plan_id: Uuid,
    pub total_enrollments: i64,
    pub active_enrollments: u64,
    pub completions: i64,
    /// Percentage of enrollments that completed, 0 when nobody enrolled.
    pub completion_rate: f64,
    /// Not yet computed: always 0.
    pub average_completion_time: f64,
    /// Mirrors the plan row's rating; 0 when unrated.
    pub average_rating: f64,
    /// Not yet computed: always 0.
    pub total_ratings: u64,
    /// Not yet computed: always 0.
    pub view_count: u64,
    /// Not yet computed: always `None`.
    pub last_enrollment_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlanStatus::Draft).unwrap(), "\"draft\"");
        assert_eq!(
            serde_json::to_string(&PlanStatus::Archived).unwrap(),
            "\"archived\""
        );
        assert_eq!(PlanStatus::Published.to_string(), "published");
    }

    #[test]
    fn new_plans_default_to_draft() {
        let create = CreatePlan {
            title: "Rust in four weeks".to_string(),
            ..Default::default()
        };
        assert_eq!(create.status, PlanStatus::Draft);
        assert_eq!(create.is_public, None);
    }

    #[test]
    fn enrollment_serializes_with_camel_case_keys() {
        let now = Utc::now();
        let enrollment = PlanEnrollment {
            id: Uuid::nil(),
            plan_id: Uuid::nil(),
            user_id: Uuid::nil(),
            progress: 42.5,
            current_step: 3,
            total_steps: 0,
            is_active: true,
            last_accessed_at: now,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&enrollment).unwrap();
        assert!(value.get("planId").is_some());
        assert!(value.get("lastAccessedAt").is_some());
        assert!(value.get("completedAt").is_some());
        assert!(value.get("plan_id").is_none());
    }
}
