//! Question repository contract

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{
    CreateQuestion, Question, QuestionDifficulty, QuestionFilters, QuestionStatistics,
    QuestionType, UpdateQuestion,
};
use crate::error::RepositoryResult;
use crate::query::{BatchUpdateOutcome, PaginatedResult, QueryOptions};

/// Data-access contract for quiz questions.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Inserts a question, stamping `view_count = 0` and the documented
    /// defaults (`points = 10`, unpublished) for omitted fields.
    async fn create(&self, data: CreateQuestion) -> RepositoryResult<Question>;

    /// Inserts many questions in one statement. Empty input returns an empty
    /// vector without touching the store.
    async fn create_batch(&self, data: Vec<CreateQuestion>) -> RepositoryResult<Vec<Question>>;

    /// Looks up one question. A missing id is `Ok(None)`, never an error.
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Question>>;

    /// Lists questions with pagination and ordering.
    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>>;

    /// Lists questions in one category.
    async fn find_by_category(
        &self,
        category_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>>;

    /// Lists questions in one topic.
    async fn find_by_topic(
        &self,
        topic_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>>;

    /// Lists questions of one difficulty tier.
    async fn find_by_difficulty(
        &self,
        difficulty: QuestionDifficulty,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>>;

    /// Lists questions of one type.
    async fn find_by_type(
        &self,
        question_type: QuestionType,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>>;

    /// Lists questions matching every set field of `filters` (ANDed).
    async fn find_by_filters(
        &self,
        filters: &QuestionFilters,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>>;

    /// Case-insensitive substring search over title and content.
    async fn search(
        &self,
        query: &str,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>>;

    /// Exact count of questions matching the filters (all questions when
    /// `None`).
    async fn count(&self, filters: Option<&QuestionFilters>) -> RepositoryResult<u64>;

    /// Patches the provided fields, refreshes `updated_at`, and returns the
    /// post-update question.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not exist.
    async fn update(&self, id: Uuid, data: UpdateQuestion) -> RepositoryResult<Question>;

    /// Applies updates sequentially, accumulating per-item outcomes. A
    /// failing item never aborts the batch and never rolls back earlier
    /// items.
    async fn update_batch(
        &self,
        updates: Vec<(Uuid, UpdateQuestion)>,
    ) -> RepositoryResult<BatchUpdateOutcome<Question>>;

    /// Atomically adds one to `view_count` in the store and returns the
    /// updated question.
    async fn increment_view_count(&self, id: Uuid) -> RepositoryResult<Question>;

    /// Sets the question's success rate.
    ///
    /// # Errors
    ///
    /// `Validation` when `success_rate` is outside `0..=100`; `NotFound`
    /// when the id does not exist.
    async fn update_success_rate(&self, id: Uuid, success_rate: f64)
        -> RepositoryResult<Question>;

    /// Hard-deletes the question. Succeeds whether or not the row existed.
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;

    /// Hard-deletes every id in one statement.
    async fn delete_batch(&self, ids: &[Uuid]) -> RepositoryResult<()>;

    /// Soft delete: flips `is_published` to false and keeps the record.
    /// Idempotent; repeating it is a no-op that still returns the question.
    async fn soft_delete(&self, id: Uuid) -> RepositoryResult<Question>;

    /// Corpus-wide counts (total, per difficulty, per type,
    /// published/unpublished).
    async fn get_statistics(&self) -> RepositoryResult<QuestionStatistics>;

    /// Category-scoped counts: the scoped total plus a `by_category`
    /// singleton entry; the corpus fan-out fields carry zeroes.
    async fn get_category_statistics(
        &self,
        category_id: Uuid,
    ) -> RepositoryResult<QuestionStatistics>;

    /// Whether a question with this id exists.
    async fn exists(&self, id: Uuid) -> RepositoryResult<bool>;

    /// Up to `count` questions sampled in store-defined random order. No
    /// determinism or seeding is promised.
    async fn get_random(
        &self,
        count: u32,
        filters: Option<&QuestionFilters>,
    ) -> RepositoryResult<Vec<Question>>;
}
