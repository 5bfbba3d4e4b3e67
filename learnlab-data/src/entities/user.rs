//! User entity, per-user progress and preferences, and DTOs
//!
//! Progress and preferences are single-row-per-user sub-resources keyed by
//! `user_id` and maintained through upserts: reading a missing row yields a
//! default record, never an error.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Authorization role stored on the user row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A platform account as persisted in the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub email_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a user. New accounts start active with an unverified
/// email and the `user` role unless another role is given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUser {
    pub email: String,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: UserRole,
}

/// Partial profile update. Changing `email` can collide with another account
/// and surfaces as a `Duplicate` error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<UserRole>,
}

/// Cumulative learning progress, one row per user (`user_progress` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: Uuid,
    pub total_questions_attempted: i64,
    pub total_questions_correct: i64,
    pub total_points: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub completed_plans: Vec<Uuid>,
    pub in_progress_plans: Vec<Uuid>,
    pub mastered_topics: Vec<Uuid>,
    pub weak_topics: Vec<Uuid>,
    pub last_activity_at: DateTime<Utc>,
}

impl UserProgress {
    /// The record reported for a user with no persisted progress yet.
    pub fn default_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            total_questions_attempted: 0,
            total_questions_correct: 0,
            total_points: 0,
            current_streak: 0,
            longest_streak: 0,
            completed_plans: Vec::new(),
            in_progress_plans: Vec::new(),
            mastered_topics: Vec::new(),
            weak_topics: Vec::new(),
            last_activity_at: Utc::now(),
        }
    }
}

/// Partial progress update applied via upsert; absent fields keep their
/// persisted (or default) values. `last_activity_at` always refreshes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserProgress {
    pub total_questions_attempted: Option<i64>,
    pub total_questions_correct: Option<i64>,
    pub total_points: Option<i64>,
    pub current_streak: Option<i32>,
    pub longest_streak: Option<i32>,
    pub completed_plans: Option<Vec<Uuid>>,
    pub in_progress_plans: Option<Vec<Uuid>>,
    pub mastered_topics: Option<Vec<Uuid>>,
    pub weak_topics: Option<Vec<Uuid>>,
}

/// Display and notification settings, one row per user
/// (`user_preferences` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub user_id: Uuid,
    pub theme: String,
    pub language: String,
    pub email_notifications: bool,
    pub push_notifications: bool,
    /// Preferred question difficulty; free-form ("mixed" by default, so not
    /// a [`crate::entities::QuestionDifficulty`]).
    pub difficulty: String,
}

impl UserPreferences {
    /// The record reported for a user with no persisted preferences yet.
    pub fn default_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            theme: "system".to_string(),
            language: "en".to_string(),
            email_notifications: true,
            push_notifications: false,
            difficulty: "mixed".to_string(),
        }
    }
}

/// Partial preferences update applied via upsert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserPreferences {
    pub theme: Option<String>,
    pub language: Option<String>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
    pub difficulty: Option<String>,
}

/// Snapshot derived from [`UserProgress`] for dashboards.
///
/// `average_session_duration` and `total_time_spent` are part of the contract
/// but not yet computed; they always carry 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistics {
    pub user_id: Uuid,
    pub total_questions_attempted: i64,
    pub total_questions_correct: i64,
    /// Percentage of correct attempts, 0 when nothing was attempted.
    pub success_rate: f64,
    pub total_points: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub plans_completed: u64,
    pub plans_in_progress: u64,
    pub topics_explored: u64,
    pub topics_mastered: u64,
    /// Not yet computed: always 0.
    pub average_session_duration: f64,
    /// Not yet computed: always 0.
    pub total_time_spent: f64,
    pub last_activity_at: DateTime<Utc>,
}

impl UserStatistics {
    /// Derives the dashboard snapshot from a progress record.
    pub fn from_progress(progress: &UserProgress) -> Self {
        let success_rate = if progress.total_questions_attempted > 0 {
            progress.total_questions_correct as f64 / progress.total_questions_attempted as f64
                * 100.0
        } else {
            0.0
        };
        Self {
            user_id: progress.user_id,
            total_questions_attempted: progress.total_questions_attempted,
            total_questions_correct: progress.total_questions_correct,
            success_rate,
            total_points: progress.total_points,
            current_streak: progress.current_streak,
            longest_streak: progress.longest_streak,
            plans_completed: progress.completed_plans.len() as u64,
            plans_in_progress: progress.in_progress_plans.len() as u64,
            topics_explored: (progress.mastered_topics.len() + progress.weak_topics.len()) as u64,
            topics_mastered: progress.mastered_topics.len() as u64,
            average_session_duration: 0.0,
            total_time_spent: 0.0,
            last_activity_at: progress.last_activity_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_progress_is_all_zeros() {
        let user_id = Uuid::new_v4();
        let progress = UserProgress::default_for(user_id);
        assert_eq!(progress.user_id, user_id);
        assert_eq!(progress.total_questions_attempted, 0);
        assert_eq!(progress.current_streak, 0);
        assert!(progress.completed_plans.is_empty());
        assert!(progress.weak_topics.is_empty());
    }

    #[test]
    fn default_preferences_match_the_documented_values() {
        let prefs = UserPreferences::default_for(Uuid::new_v4());
        assert_eq!(prefs.theme, "system");
        assert_eq!(prefs.language, "en");
        assert!(prefs.email_notifications);
        assert!(!prefs.push_notifications);
        assert_eq!(prefs.difficulty, "mixed");
    }

    #[test]
    fn statistics_derive_success_rate_from_progress() {
        let mut progress = UserProgress::default_for(Uuid::new_v4());
        progress.total_questions_attempted = 40;
        progress.total_questions_correct = 30;
        progress.completed_plans = vec![Uuid::new_v4(), Uuid::new_v4()];
        progress.mastered_topics = vec![Uuid::new_v4()];
        progress.weak_topics = vec![Uuid::new_v4(), Uuid::new_v4()];

        let stats = UserStatistics::from_progress(&progress);
        assert!((stats.success_rate - 75.0).abs() < f64::EPSILON);
        assert_eq!(stats.plans_completed, 2);
        assert_eq!(stats.topics_explored, 3);
        assert_eq!(stats.topics_mastered, 1);
        assert_eq!(stats.average_session_duration, 0.0);
    }

    #[test]
    fn statistics_success_rate_is_zero_without_attempts() {
        let progress = UserProgress::default_for(Uuid::new_v4());
        let stats = UserStatistics::from_progress(&progress);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn role_string_forms_are_lowercase() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
        assert_eq!(UserRole::User.to_string(), "user");
        assert_eq!(UserRole::default(), UserRole::User);
    }
}
