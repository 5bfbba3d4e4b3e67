//! PostgreSQL plan repository
//!
//! Enrollments live in `plan_enrollments` with a unique `(plan_id, user_id)`
//! pair. Mutations that touch a plan's denormalized counters
//! (`enrollment_count`, `completion_count`) run the pair-row change and the
//! counter change inside one transaction, so the counters never drift from
//! the rows they summarize.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::base::{
    count_all, delete_by_id, exists_by_id, fetch_by_id, fetch_count, fetch_eq_page, fetch_page,
    fetch_search_page, require_row, wrap_err, PgClients,
};
use crate::entities::{CreatePlan, Plan, PlanEnrollment, PlanStatistics, PlanStatus, UpdatePlan};
use crate::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use crate::query::{PaginatedResult, QueryOptions};
use crate::repository::PlanRepository;

const ENTITY: &str = "plan";
const TABLE: &str = "plans";
const ENROLLMENT_ENTITY: &str = "plan_enrollment";
const ENROLLMENT_TABLE: &str = "plan_enrollments";

/// Plan adapter over the shared pool pair.
#[derive(Debug)]
pub struct PgPlanRepository {
    clients: Arc<PgClients>,
}

impl PgPlanRepository {
    pub(crate) fn new(clients: Arc<PgClients>) -> Self {
        Self { clients }
    }

    async fn set_status(&self, id: Uuid, status: PlanStatus) -> RepositoryResult<Plan> {
        let updated = sqlx::query_as::<_, Plan>(
            "UPDATE plans SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(self.clients.write())
        .await
        .map_err(wrap_err(ENTITY, RepositoryOperation::Update))?;
        require_row(updated, ENTITY, RepositoryOperation::Update, id)
    }
}

/// `UPDATE` statement patching only the provided fields. Counters and rating
/// are excluded on purpose; they move through their own operations.
fn update_query(id: Uuid, data: UpdatePlan, now: DateTime<Utc>) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("UPDATE {TABLE} SET updated_at = "));
    builder.push_bind(now);
    if let Some(title) = data.title {
        builder.push(", title = ");
        builder.push_bind(title);
    }
    if let Some(description) = data.description {
        builder.push(", description = ");
        builder.push_bind(description);
    }
    if let Some(category_id) = data.category_id {
        builder.push(", category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(status) = data.status {
        builder.push(", status = ");
        builder.push_bind(status);
    }
    if let Some(is_public) = data.is_public {
        builder.push(", is_public = ");
        builder.push_bind(is_public);
    }
    if let Some(tags) = data.tags {
        builder.push(", tags = ");
        builder.push_bind(tags);
    }
    if let Some(minutes) = data.estimated_duration_minutes {
        builder.push(", estimated_duration_minutes = ");
        builder.push_bind(minutes);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    builder
}

#[async_trait]
impl PlanRepository for PgPlanRepository {
    async fn create(&self, data: CreatePlan) -> RepositoryResult<Plan> {
        sqlx::query_as::<_, Plan>(
            "INSERT INTO plans (title, description, category_id, status, is_public, tags, \
             author_id, estimated_duration_minutes, enrollment_count, completion_count, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, 0, $9, $9) \
             RETURNING *",
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.category_id)
        .bind(data.status)
        .bind(data.is_public.unwrap_or(true))
        .bind(data.tags)
        .bind(data.author_id)
        .bind(data.estimated_duration_minutes)
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err(ENTITY, RepositoryOperation::Create))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Plan>> {
        fetch_by_id(self.clients.read(), TABLE, ENTITY, id).await
    }

    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Plan>> {
        fetch_page(self.clients.read(), TABLE, ENTITY, options).await
    }

    async fn find_published(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Plan>> {
        fetch_eq_page(
            self.clients.read(),
            TABLE,
            ENTITY,
            "status",
            PlanStatus::Published,
            options,
        )
        .await
    }

    async fn find_by_category(
        &self,
        category_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Plan>> {
        fetch_eq_page(
            self.clients.read(),
            TABLE,
            ENTITY,
            "category_id",
            category_id,
            options,
        )
        .await
    }

    async fn search(
        &self,
        query: &str,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Plan>> {
        fetch_search_page(
            self.clients.read(),
            TABLE,
            ENTITY,
            &["title", "description"],
            query,
            options,
        )
        .await
    }

    async fn update(&self, id: Uuid, data: UpdatePlan) -> RepositoryResult<Plan> {
        let mut builder = update_query(id, data, Utc::now());
        let updated = builder
            .build_query_as::<Plan>()
            .fetch_optional(self.clients.write())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::Update))?;
        require_row(updated, ENTITY, RepositoryOperation::Update, id)
    }

    async fn publish(&self, id: Uuid) -> RepositoryResult<Plan> {
        self.set_status(id, PlanStatus::Published).await
    }

    async fn archive(&self, id: Uuid) -> RepositoryResult<Plan> {
        self.set_status(id, PlanStatus::Archived).await
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        delete_by_id(self.clients.write(), TABLE, ENTITY, id).await
    }

    async fn enroll_user(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<PlanEnrollment> {
        let now = Utc::now();
        let mut tx = self
            .clients
            .write()
            .begin()
            .await
            .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Enroll))?;

        let enrollment = sqlx::query_as::<_, PlanEnrollment>(
            "INSERT INTO plan_enrollments (plan_id, user_id, progress, current_step, \
             total_steps, is_active, last_accessed_at, created_at, updated_at) \
             VALUES ($1, $2, 0, 0, 0, TRUE, $3, $3, $3) \
             RETURNING *",
        )
        .bind(plan_id)
        .bind(user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Enroll))?;

        sqlx::query(
            "UPDATE plans SET enrollment_count = enrollment_count + 1, updated_at = $2 \
             WHERE id = $1",
        )
        .bind(plan_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(wrap_err(ENTITY, RepositoryOperation::Enroll))?;

        tx.commit()
            .await
            .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Enroll))?;
        Ok(enrollment)
    }

    async fn unenroll_user(&self, plan_id: Uuid, user_id: Uuid) -> RepositoryResult<()> {
        let mut tx = self
            .clients
            .write()
            .begin()
            .await
            .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Unenroll))?;

        let deleted = sqlx::query(
            "DELETE FROM plan_enrollments WHERE plan_id = $1 AND user_id = $2",
        )
        .bind(plan_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Unenroll))?;

        // The counter only moves when a row was actually removed.
        if deleted.rows_affected() > 0 {
            sqlx::query(
                "UPDATE plans SET enrollment_count = GREATEST(enrollment_count - 1, 0), \
                 updated_at = $2 WHERE id = $1",
            )
            .bind(plan_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::Unenroll))?;
        }

        tx.commit()
            .await
            .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Unenroll))?;
        Ok(())
    }

    async fn get_user_enrollment(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<Option<PlanEnrollment>> {
        sqlx::query_as::<_, PlanEnrollment>(
            "SELECT * FROM plan_enrollments WHERE plan_id = $1 AND user_id = $2",
        )
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(self.clients.read())
        .await
        .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::FindById))
    }

    async fn get_user_enrollments(
        &self,
        user_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<PlanEnrollment>> {
        fetch_eq_page(
            self.clients.read(),
            ENROLLMENT_TABLE,
            ENROLLMENT_ENTITY,
            "user_id",
            user_id,
            options,
        )
        .await
    }

    async fn get_plan_enrollments(
        &self,
        plan_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<PlanEnrollment>> {
        fetch_eq_page(
            self.clients.read(),
            ENROLLMENT_TABLE,
            ENROLLMENT_ENTITY,
            "plan_id",
            plan_id,
            options,
        )
        .await
    }

    async fn update_enrollment_progress(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
        progress: f64,
        current_step: Option<i32>,
    ) -> RepositoryResult<PlanEnrollment> {
        if !(0.0..=100.0).contains(&progress) {
            return Err(RepositoryError::validation(
                RepositoryOperation::Update,
                format!("progress must be within 0..=100, got {progress}"),
            )
            .with_entity(ENROLLMENT_ENTITY));
        }
        let updated = sqlx::query_as::<_, PlanEnrollment>(
            "UPDATE plan_enrollments SET progress = $3, \
             current_step = COALESCE($4, current_step), last_accessed_at = $5, updated_at = $5 \
             WHERE plan_id = $1 AND user_id = $2 \
             RETURNING *",
        )
        .bind(plan_id)
        .bind(user_id)
        .bind(progress)
        .bind(current_step)
        .bind(Utc::now())
        .fetch_optional(self.clients.write())
        .await
        .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Update))?;
        require_row(
            updated,
            ENROLLMENT_ENTITY,
            RepositoryOperation::Update,
            format_args!("{plan_id}/{user_id}"),
        )
    }

    async fn complete_enrollment(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<PlanEnrollment> {
        let now = Utc::now();
        let mut tx = self
            .clients
            .write()
            .begin()
            .await
            .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Update))?;

        // Only the transition from incomplete to complete moves the counter;
        // repeating the call returns the already-completed row unchanged.
        let completed = sqlx::query_as::<_, PlanEnrollment>(
            "UPDATE plan_enrollments SET progress = 100, completed_at = $3, \
             last_accessed_at = $3, updated_at = $3 \
             WHERE plan_id = $1 AND user_id = $2 AND completed_at IS NULL \
             RETURNING *",
        )
        .bind(plan_id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Update))?;

        let enrollment = match completed {
            Some(enrollment) => {
                sqlx::query(
                    "UPDATE plans SET completion_count = completion_count + 1, updated_at = $2 \
                     WHERE id = $1",
                )
                .bind(plan_id)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(wrap_err(ENTITY, RepositoryOperation::Update))?;
                enrollment
            }
            None => {
                let existing = sqlx::query_as::<_, PlanEnrollment>(
                    "SELECT * FROM plan_enrollments WHERE plan_id = $1 AND user_id = $2",
                )
                .bind(plan_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Update))?;
                require_row(
                    existing,
                    ENROLLMENT_ENTITY,
                    RepositoryOperation::Update,
                    format_args!("{plan_id}/{user_id}"),
                )?
            }
        };

        tx.commit()
            .await
            .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Update))?;
        Ok(enrollment)
    }

    async fn is_user_enrolled(&self, plan_id: Uuid, user_id: Uuid) -> RepositoryResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM plan_enrollments \
             WHERE plan_id = $1 AND user_id = $2 AND is_active = TRUE)",
        )
        .bind(plan_id)
        .bind(user_id)
        .fetch_one(self.clients.read())
        .await
        .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Exists))
    }

    async fn get_plan_statistics(&self, plan_id: Uuid) -> RepositoryResult<PlanStatistics> {
        let plan: Option<Plan> = fetch_by_id(self.clients.read(), TABLE, ENTITY, plan_id).await?;
        let plan = require_row(plan, ENTITY, RepositoryOperation::Statistics, plan_id)?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM plan_enrollments WHERE plan_id = $1 AND is_active = TRUE",
        )
        .bind(plan_id)
        .fetch_one(self.clients.read())
        .await
        .map_err(wrap_err(ENROLLMENT_ENTITY, RepositoryOperation::Statistics))?;

        let completion_rate = if plan.enrollment_count > 0 {
            plan.completion_count as f64 / plan.enrollment_count as f64 * 100.0
        } else {
            0.0
        };

        Ok(PlanStatistics {
            plan_id,
            total_enrollments: plan.enrollment_count,
            active_enrollments: active.max(0) as u64,
            completions: plan.completion_count,
            completion_rate,
            average_completion_time: 0.0,
            average_rating: plan.average_rating.unwrap_or(0.0),
            total_ratings: 0,
            view_count: 0,
            last_enrollment_at: None,
        })
    }

    async fn count(&self) -> RepositoryResult<u64> {
        count_all(self.clients.read(), TABLE, ENTITY).await
    }

    async fn count_published(&self) -> RepositoryResult<u64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM plans WHERE status = ");
        builder.push_bind(PlanStatus::Published);
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_patches_only_provided_fields() {
        let data = UpdatePlan {
            title: Some("Rust in a week".to_string()),
            status: Some(PlanStatus::Published),
            ..UpdatePlan::default()
        };
        let builder = update_query(Uuid::nil(), data, Utc::now());
        assert_eq!(
            builder.sql(),
            "UPDATE plans SET updated_at = $1, title = $2, status = $3 \
             WHERE id = $4 RETURNING *"
        );
    }

    #[test]
    fn counters_are_not_patchable_through_update() {
        let builder = update_query(Uuid::nil(), UpdatePlan::default(), Utc::now());
        let sql = builder.sql();
        assert!(!sql.contains("enrollment_count"));
        assert!(!sql.contains("completion_count"));
        assert!(!sql.contains("average_rating"));
    }
}
