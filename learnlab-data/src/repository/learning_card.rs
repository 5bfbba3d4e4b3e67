//! Learning-card repository contract

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{
    CardType, CreateLearningCard, LearningCard, LearningCardStatistics, UpdateLearningCard,
    UserCardInteraction,
};
use crate::error::RepositoryResult;
use crate::query::{PaginatedResult, QueryOptions};

/// Data-access contract for learning cards and per-user interactions.
///
/// Interaction rows have composite identity `(card_id, user_id)` and are
/// maintained through get-or-create upserts: the first touch creates the
/// row, later touches mutate it, and no sequence of calls can produce two
/// rows for one pair.
#[async_trait]
pub trait LearningCardRepository: Send + Sync {
    /// Inserts a card, stamping zeroed counters and the documented defaults.
    async fn create(&self, data: CreateLearningCard) -> RepositoryResult<LearningCard>;

    /// Inserts many cards in one statement. Empty input returns an empty
    /// vector without touching the store.
    async fn create_batch(
        &self,
        data: Vec<CreateLearningCard>,
    ) -> RepositoryResult<Vec<LearningCard>>;

    /// Looks up one card. A missing id is `Ok(None)`, never an error.
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<LearningCard>>;

    /// Lists cards with pagination and ordering.
    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>>;

    /// Lists cards in one category.
    async fn find_by_category(
        &self,
        category_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>>;

    /// Lists cards in one topic.
    async fn find_by_topic(
        &self,
        topic_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>>;

    /// Lists cards of one type.
    async fn find_by_type(
        &self,
        card_type: CardType,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>>;

    /// Case-insensitive substring search over title and content.
    async fn search(
        &self,
        query: &str,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>>;

    /// Cards related to this one: the curated `related_cards` ids when
    /// non-empty, otherwise other cards in the same topic. `limit` defaults
    /// to 5.
    ///
    /// # Errors
    ///
    /// `NotFound` when the card itself does not exist.
    async fn find_related_cards(
        &self,
        card_id: Uuid,
        limit: Option<u32>,
    ) -> RepositoryResult<Vec<LearningCard>>;

    /// Patches the provided fields and returns the post-update card.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not exist.
    async fn update(&self, id: Uuid, data: UpdateLearningCard) -> RepositoryResult<LearningCard>;

    /// Atomically adds one to `view_count` and returns the updated card.
    async fn increment_view_count(&self, id: Uuid) -> RepositoryResult<LearningCard>;

    /// Atomically adds one to `like_count` and returns the updated card.
    async fn increment_like_count(&self, id: Uuid) -> RepositoryResult<LearningCard>;

    /// Atomically subtracts one from `like_count`, floored at zero.
    async fn decrement_like_count(&self, id: Uuid) -> RepositoryResult<LearningCard>;

    /// Records a view: atomically increments the card's `view_count` and
    /// upserts the pair's interaction (`review_count + 1`,
    /// `viewed_at = now`). N calls for one pair leave exactly one row with
    /// `review_count == N`.
    async fn record_view(
        &self,
        card_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<UserCardInteraction>;

    /// Upserts the pair's interaction with the given mastery level and
    /// `last_reviewed_at = now`.
    ///
    /// # Errors
    ///
    /// `Validation` when `level` is outside `0..=5`.
    async fn record_mastery(
        &self,
        card_id: Uuid,
        user_id: Uuid,
        level: i16,
    ) -> RepositoryResult<UserCardInteraction>;

    /// Flips the pair's bookmark flag; a first touch creates the interaction
    /// already bookmarked.
    async fn toggle_bookmark(
        &self,
        card_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<UserCardInteraction>;

    /// Upserts the pair's free-form notes.
    async fn update_notes(
        &self,
        card_id: Uuid,
        user_id: Uuid,
        notes: &str,
    ) -> RepositoryResult<UserCardInteraction>;

    /// The pair's interaction, if any.
    async fn get_user_interaction(
        &self,
        card_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<Option<UserCardInteraction>>;

    /// Lists one user's interactions across cards.
    async fn get_user_interactions(
        &self,
        user_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<UserCardInteraction>>;

    /// Lists the cards one user has bookmarked: bookmarked ids first, then
    /// the cards by id membership.
    async fn get_user_bookmarks(
        &self,
        user_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>>;

    /// Hard-deletes the card. Succeeds whether or not the row existed.
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;

    /// Hard-deletes every id in one statement.
    async fn delete_batch(&self, ids: &[Uuid]) -> RepositoryResult<()>;

    /// Corpus-wide counts (total, per type, published/unpublished).
    async fn get_statistics(&self) -> RepositoryResult<LearningCardStatistics>;

    /// Category-scoped counts: the scoped total plus a `by_category`
    /// singleton entry; the corpus fan-out fields carry zeroes.
    async fn get_category_statistics(
        &self,
        category_id: Uuid,
    ) -> RepositoryResult<LearningCardStatistics>;

    /// Exact number of cards.
    async fn count(&self) -> RepositoryResult<u64>;

    /// Whether a card with this id exists.
    async fn exists(&self, id: Uuid) -> RepositoryResult<bool>;
}
