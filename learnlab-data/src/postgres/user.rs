//! PostgreSQL user repository
//!
//! Besides the `users` table this adapter owns the two per-user singleton
//! tables keyed by `user_id`: `user_progress` and `user_preferences`. Both
//! are maintained through `ON CONFLICT (user_id)` upserts with
//! `COALESCE`-patched columns, so a partial update never clobbers fields the
//! caller left out, and reads of missing rows fall back to the documented
//! defaults instead of erroring.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::base::{
    count_all, delete_by_id, exists_by_id, fetch_by_id, fetch_count, fetch_eq_page, fetch_page,
    fetch_search_page, require_row, wrap_err, PgClients,
};
use crate::entities::{
    CreateUser, UpdateUser, UpdateUserPreferences, UpdateUserProgress, User, UserPreferences,
    UserProgress, UserRole, UserStatistics,
};
use crate::error::{RepositoryOperation, RepositoryResult};
use crate::query::{PaginatedResult, QueryOptions};
use crate::repository::UserRepository;

const ENTITY: &str = "user";
const TABLE: &str = "users";
const PROGRESS_ENTITY: &str = "user_progress";
const PREFERENCES_ENTITY: &str = "user_preferences";

/// User adapter over the shared pool pair.
#[derive(Debug)]
pub struct PgUserRepository {
    clients: Arc<PgClients>,
}

impl PgUserRepository {
    pub(crate) fn new(clients: Arc<PgClients>) -> Self {
        Self { clients }
    }

    async fn update_returning(&self, sql: &'static str, id: Uuid) -> RepositoryResult<User> {
        let updated = sqlx::query_as::<_, User>(sql)
            .bind(id)
            .bind(Utc::now())
            .fetch_optional(self.clients.write())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::Update))?;
        require_row(updated, ENTITY, RepositoryOperation::Update, id)
    }
}

/// `UPDATE` statement patching only the provided fields.
fn update_query(id: Uuid, data: UpdateUser, now: DateTime<Utc>) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("UPDATE {TABLE} SET updated_at = "));
    builder.push_bind(now);
    if let Some(email) = data.email {
        builder.push(", email = ");
        builder.push_bind(email);
    }
    if let Some(display_name) = data.display_name {
        builder.push(", display_name = ");
        builder.push_bind(display_name);
    }
    if let Some(first_name) = data.first_name {
        builder.push(", first_name = ");
        builder.push_bind(first_name);
    }
    if let Some(last_name) = data.last_name {
        builder.push(", last_name = ");
        builder.push_bind(last_name);
    }
    if let Some(avatar_url) = data.avatar_url {
        builder.push(", avatar_url = ");
        builder.push_bind(avatar_url);
    }
    if let Some(role) = data.role {
        builder.push(", role = ");
        builder.push_bind(role);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    builder
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, data: CreateUser) -> RepositoryResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, display_name, first_name, last_name, avatar_url, role, \
             is_active, email_verified, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, TRUE, FALSE, $7, $7) \
             RETURNING *",
        )
        .bind(data.email)
        .bind(data.display_name)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.avatar_url)
        .bind(data.role)
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err(ENTITY, RepositoryOperation::Create))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        fetch_by_id(self.clients.read(), TABLE, ENTITY, id).await
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.clients.read())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::FindById))
    }

    async fn find_admin_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND role = $2")
            .bind(email)
            .bind(UserRole::Admin)
            .fetch_optional(self.clients.read())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::FindById))
    }

    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<User>> {
        fetch_page(self.clients.read(), TABLE, ENTITY, options).await
    }

    async fn find_by_role(
        &self,
        role: UserRole,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<User>> {
        fetch_eq_page(self.clients.read(), TABLE, ENTITY, "role", role, options).await
    }

    async fn search(
        &self,
        query: &str,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<User>> {
        fetch_search_page(
            self.clients.read(),
            TABLE,
            ENTITY,
            &["email", "display_name", "first_name", "last_name"],
            query,
            options,
        )
        .await
    }

    async fn update(&self, id: Uuid, data: UpdateUser) -> RepositoryResult<User> {
        let mut builder = update_query(id, data, Utc::now());
        let updated = builder
            .build_query_as::<User>()
            .fetch_optional(self.clients.write())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::Update))?;
        require_row(updated, ENTITY, RepositoryOperation::Update, id)
    }

    async fn update_last_login(&self, id: Uuid) -> RepositoryResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(self.clients.write())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::Update))?;
        Ok(())
    }

    async fn verify_email(&self, id: Uuid) -> RepositoryResult<User> {
        self.update_returning(
            "UPDATE users SET email_verified = TRUE, updated_at = $2 WHERE id = $1 RETURNING *",
            id,
        )
        .await
    }

    async fn deactivate(&self, id: Uuid) -> RepositoryResult<User> {
        self.update_returning(
            "UPDATE users SET is_active = FALSE, updated_at = $2 WHERE id = $1 RETURNING *",
            id,
        )
        .await
    }

    async fn activate(&self, id: Uuid) -> RepositoryResult<User> {
        self.update_returning(
            "UPDATE users SET is_active = TRUE, updated_at = $2 WHERE id = $1 RETURNING *",
            id,
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        delete_by_id(self.clients.write(), TABLE, ENTITY, id).await
    }

    async fn get_progress(&self, user_id: Uuid) -> RepositoryResult<UserProgress> {
        let progress =
            sqlx::query_as::<_, UserProgress>("SELECT * FROM user_progress WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(self.clients.read())
                .await
                .map_err(wrap_err(PROGRESS_ENTITY, RepositoryOperation::FindById))?;
        Ok(progress.unwrap_or_else(|| UserProgress::default_for(user_id)))
    }

    async fn update_progress(
        &self,
        user_id: Uuid,
        data: UpdateUserProgress,
    ) -> RepositoryResult<UserProgress> {
        sqlx::query_as::<_, UserProgress>(
            "INSERT INTO user_progress (user_id, total_questions_attempted, \
             total_questions_correct, total_points, current_streak, longest_streak, \
             completed_plans, in_progress_plans, mastered_topics, weak_topics, last_activity_at) \
             VALUES ($1, COALESCE($2, 0), COALESCE($3, 0), COALESCE($4, 0), COALESCE($5, 0), \
             COALESCE($6, 0), COALESCE($7, '{}'), COALESCE($8, '{}'), COALESCE($9, '{}'), \
             COALESCE($10, '{}'), $11) \
             ON CONFLICT (user_id) DO UPDATE SET \
             total_questions_attempted = COALESCE($2, user_progress.total_questions_attempted), \
             total_questions_correct = COALESCE($3, user_progress.total_questions_correct), \
             total_points = COALESCE($4, user_progress.total_points), \
             current_streak = COALESCE($5, user_progress.current_streak), \
             longest_streak = COALESCE($6, user_progress.longest_streak), \
             completed_plans = COALESCE($7, user_progress.completed_plans), \
             in_progress_plans = COALESCE($8, user_progress.in_progress_plans), \
             mastered_topics = COALESCE($9, user_progress.mastered_topics), \
             weak_topics = COALESCE($10, user_progress.weak_topics), \
             last_activity_at = $11 \
             RETURNING *",
        )
        .bind(user_id)
        .bind(data.total_questions_attempted)
        .bind(data.total_questions_correct)
        .bind(data.total_points)
        .bind(data.current_streak)
        .bind(data.longest_streak)
        .bind(data.completed_plans)
        .bind(data.in_progress_plans)
        .bind(data.mastered_topics)
        .bind(data.weak_topics)
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err(PROGRESS_ENTITY, RepositoryOperation::Upsert))
    }

    async fn get_preferences(&self, user_id: Uuid) -> RepositoryResult<UserPreferences> {
        let preferences = sqlx::query_as::<_, UserPreferences>(
            "SELECT * FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.clients.read())
        .await
        .map_err(wrap_err(PREFERENCES_ENTITY, RepositoryOperation::FindById))?;
        Ok(preferences.unwrap_or_else(|| UserPreferences::default_for(user_id)))
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        data: UpdateUserPreferences,
    ) -> RepositoryResult<UserPreferences> {
        sqlx::query_as::<_, UserPreferences>(
            "INSERT INTO user_preferences (user_id, theme, language, email_notifications, \
             push_notifications, difficulty) \
             VALUES ($1, COALESCE($2, 'system'), COALESCE($3, 'en'), COALESCE($4, TRUE), \
             COALESCE($5, FALSE), COALESCE($6, 'mixed')) \
             ON CONFLICT (user_id) DO UPDATE SET \
             theme = COALESCE($2, user_preferences.theme), \
             language = COALESCE($3, user_preferences.language), \
             email_notifications = COALESCE($4, user_preferences.email_notifications), \
             push_notifications = COALESCE($5, user_preferences.push_notifications), \
             difficulty = COALESCE($6, user_preferences.difficulty) \
             RETURNING *",
        )
        .bind(user_id)
        .bind(data.theme)
        .bind(data.language)
        .bind(data.email_notifications)
        .bind(data.push_notifications)
        .bind(data.difficulty)
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err(PREFERENCES_ENTITY, RepositoryOperation::Upsert))
    }

    async fn get_user_statistics(&self, user_id: Uuid) -> RepositoryResult<UserStatistics> {
        let progress = self.get_progress(user_id).await?;
        Ok(UserStatistics::from_progress(&progress))
    }

    async fn count(&self) -> RepositoryResult<u64> {
        count_all(self.clients.read(), TABLE, ENTITY).await
    }

    async fn count_active(&self) -> RepositoryResult<u64> {
        let builder = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE is_active = TRUE");
        fetch_count(
            self.clients.read(),
            builder,
            ENTITY,
            RepositoryOperation::Count,
        )
        .await
    }

    async fn exists(&self, id: Uuid) -> RepositoryResult<bool> {
        exists_by_id(self.clients.read(), TABLE, ENTITY, id).await
    }

    async fn email_exists(&self, email: &str) -> RepositoryResult<bool> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(self.clients.read())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::Exists))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_patches_only_provided_fields() {
        let data = UpdateUser {
            display_name: Some("Ada".to_string()),
            role: Some(UserRole::Admin),
            ..UpdateUser::default()
        };
        let builder = update_query(Uuid::nil(), data, Utc::now());
        assert_eq!(
            builder.sql(),
            "UPDATE users SET updated_at = $1, display_name = $2, role = $3 \
             WHERE id = $4 RETURNING *"
        );
    }

    #[test]
    fn empty_update_still_refreshes_updated_at() {
        let builder = update_query(Uuid::nil(), UpdateUser::default(), Utc::now());
        assert_eq!(
            builder.sql(),
            "UPDATE users SET updated_at = $1 WHERE id = $2 RETURNING *"
        );
    }
}
