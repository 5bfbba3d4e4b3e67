//! Plan repository contract

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{CreatePlan, Plan, PlanEnrollment, PlanStatistics, UpdatePlan};
use crate::error::RepositoryResult;
use crate::query::{PaginatedResult, QueryOptions};

/// Data-access contract for learning plans and their enrollments.
///
/// Enrollments have composite identity `(plan_id, user_id)`: at most one row
/// per pair, and every enrollment mutation keeps the plan's denormalized
/// counters in step with single atomic statements.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Inserts a plan, stamping draft status, public visibility, and zeroed
    /// counters for omitted fields.
    async fn create(&self, data: CreatePlan) -> RepositoryResult<Plan>;

    /// Looks up one plan. A missing id is `Ok(None)`, never an error.
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Plan>>;

    /// Lists plans with pagination and ordering.
    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Plan>>;

    /// Lists plans in `published` status.
    async fn find_published(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Plan>>;

    /// Lists plans in one category.
    async fn find_by_category(
        &self,
        category_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Plan>>;

    /// Case-insensitive substring search over title and description.
    async fn search(
        &self,
        query: &str,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Plan>>;

    /// Patches the provided fields and returns the post-update plan.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not exist.
    async fn update(&self, id: Uuid, data: UpdatePlan) -> RepositoryResult<Plan>;

    /// Moves the plan to `published`. The state machine is forward-only;
    /// there is no way back to draft.
    async fn publish(&self, id: Uuid) -> RepositoryResult<Plan>;

    /// Moves the plan to `archived`.
    async fn archive(&self, id: Uuid) -> RepositoryResult<Plan>;

    /// Hard-deletes the plan. Succeeds whether or not the row existed.
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;

    /// Enrolls a user: inserts the pair row with fresh defaults and
    /// atomically increments the plan's `enrollment_count`.
    ///
    /// # Errors
    ///
    /// `Duplicate` when the pair is already enrolled.
    async fn enroll_user(&self, plan_id: Uuid, user_id: Uuid)
        -> RepositoryResult<PlanEnrollment>;

    /// Removes the pair's enrollment row and atomically decrements the
    /// plan's `enrollment_count` (floored at zero). A missing enrollment is
    /// a silent no-op that leaves the counter untouched.
    async fn unenroll_user(&self, plan_id: Uuid, user_id: Uuid) -> RepositoryResult<()>;

    /// The pair's enrollment, if any.
    async fn get_user_enrollment(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<Option<PlanEnrollment>>;

    /// Lists one user's enrollments across plans.
    async fn get_user_enrollments(
        &self,
        user_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<PlanEnrollment>>;

    /// Lists one plan's enrollments across users.
    async fn get_plan_enrollments(
        &self,
        plan_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<PlanEnrollment>>;

    /// Updates the pair's progress (and step when given), refreshing
    /// `last_accessed_at`.
    ///
    /// # Errors
    ///
    /// `Validation` when `progress` is outside `0..=100`; `NotFound` when
    /// the pair is not enrolled.
    async fn update_enrollment_progress(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
        progress: f64,
        current_step: Option<i32>,
    ) -> RepositoryResult<PlanEnrollment>;

    /// Marks the enrollment complete (progress 100, `completed_at = now`)
    /// and atomically increments the plan's `completion_count`.
    async fn complete_enrollment(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<PlanEnrollment>;

    /// Whether the pair has an active enrollment.
    async fn is_user_enrolled(&self, plan_id: Uuid, user_id: Uuid) -> RepositoryResult<bool>;

    /// Enrollment figures for one plan.
    ///
    /// # Errors
    ///
    /// `NotFound` when the plan does not exist.
    async fn get_plan_statistics(&self, plan_id: Uuid) -> RepositoryResult<PlanStatistics>;

    /// Exact number of plans.
    async fn count(&self) -> RepositoryResult<u64>;

    /// Exact number of published plans.
    async fn count_published(&self) -> RepositoryResult<u64>;

    /// Whether a plan with this id exists.
    async fn exists(&self, id: Uuid) -> RepositoryResult<bool>;
}
