//! PostgreSQL learning-card repository
//!
//! Per-user interaction rows live in `user_card_interactions` with a unique
//! `(card_id, user_id)` pair and are maintained exclusively through
//! `ON CONFLICT` upserts: the first touch creates the row with the touch
//! already applied, later touches mutate it, and no interleaving of calls
//! can produce a second row for the pair.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::base::{
    count_all, delete_by_id, delete_by_ids, exists_by_id, fetch_by_id, fetch_count,
    fetch_eq_page, fetch_page, fetch_scoped_page, fetch_search_page, push_eq, require_row,
    wrap_err, PgClients, WhereClause,
};
use crate::entities::{
    CardType, CreateLearningCard, LearningCard, LearningCardStatistics, UpdateLearningCard,
    UserCardInteraction, MAX_MASTERY_LEVEL,
};
use crate::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use crate::query::{PaginatedResult, QueryOptions};
use crate::repository::LearningCardRepository;

const ENTITY: &str = "learning_card";
const TABLE: &str = "learning_cards";
const INTERACTION_ENTITY: &str = "user_card_interaction";
const INTERACTION_TABLE: &str = "user_card_interactions";

/// Related-card lookups return at most this many rows unless told otherwise.
const DEFAULT_RELATED_LIMIT: u32 = 5;

/// Learning-card adapter over the shared pool pair.
#[derive(Debug)]
pub struct PgLearningCardRepository {
    clients: Arc<PgClients>,
}

impl PgLearningCardRepository {
    pub(crate) fn new(clients: Arc<PgClients>) -> Self {
        Self { clients }
    }

    async fn counter_update(
        &self,
        id: Uuid,
        sql: &'static str,
        operation: RepositoryOperation,
    ) -> RepositoryResult<LearningCard> {
        let updated = sqlx::query_as::<_, LearningCard>(sql)
            .bind(id)
            .bind(Utc::now())
            .fetch_optional(self.clients.write())
            .await
            .map_err(wrap_err(ENTITY, operation))?;
        require_row(updated, ENTITY, operation, id)
    }

    async fn count_where<V>(&self, column: &str, value: V) -> RepositoryResult<u64>
    where
        V: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    {
        let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {TABLE}"));
        let mut clause = WhereClause::new();
        push_eq(&mut builder, &mut clause, column, value);
        fetch_count(
            self.clients.read(),
            builder,
            ENTITY,
            RepositoryOperation::Count,
        )
        .await
    }
}

/// `UPDATE` statement patching only the provided fields.
fn update_query(
    id: Uuid,
    data: UpdateLearningCard,
    now: DateTime<Utc>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("UPDATE {TABLE} SET updated_at = "));
    builder.push_bind(now);
    if let Some(title) = data.title {
        builder.push(", title = ");
        builder.push_bind(title);
    }
    if let Some(content) = data.content {
        builder.push(", content = ");
        builder.push_bind(content);
    }
    if let Some(category_id) = data.category_id {
        builder.push(", category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(topic_id) = data.topic_id {
        builder.push(", topic_id = ");
        builder.push_bind(topic_id);
    }
    if let Some(card_type) = data.card_type {
        builder.push(", card_type = ");
        builder.push_bind(card_type);
    }
    if let Some(difficulty) = data.difficulty {
        builder.push(", difficulty = ");
        builder.push_bind(difficulty);
    }
    if let Some(tags) = data.tags {
        builder.push(", tags = ");
        builder.push_bind(tags);
    }
    if let Some(related_cards) = data.related_cards {
        builder.push(", related_cards = ");
        builder.push_bind(related_cards);
    }
    if let Some(display_order) = data.display_order {
        builder.push(", display_order = ");
        builder.push_bind(display_order);
    }
    if let Some(is_published) = data.is_published {
        builder.push(", is_published = ");
        builder.push_bind(is_published);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    builder
}

#[async_trait]
impl LearningCardRepository for PgLearningCardRepository {
    async fn create(&self, data: CreateLearningCard) -> RepositoryResult<LearningCard> {
        sqlx::query_as::<_, LearningCard>(
            "INSERT INTO learning_cards (title, content, category_id, topic_id, card_type, \
             difficulty, tags, related_cards, display_order, is_published, view_count, \
             like_count, author_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, 0, $11, $12, $12) \
             RETURNING *",
        )
        .bind(data.title)
        .bind(data.content)
        .bind(data.category_id)
        .bind(data.topic_id)
        .bind(data.card_type)
        .bind(data.difficulty)
        .bind(data.tags)
        .bind(data.related_cards)
        .bind(data.display_order)
        .bind(data.is_published)
        .bind(data.author_id)
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err(ENTITY, RepositoryOperation::Create))
    }

    async fn create_batch(
        &self,
        data: Vec<CreateLearningCard>,
    ) -> RepositoryResult<Vec<LearningCard>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        let mut builder = QueryBuilder::new(
            "INSERT INTO learning_cards (title, content, category_id, topic_id, card_type, \
             difficulty, tags, related_cards, display_order, is_published, view_count, \
             like_count, author_id, created_at, updated_at) ",
        );
        builder.push_values(data, |mut row, card| {
            row.push_bind(card.title)
                .push_bind(card.content)
                .push_bind(card.category_id)
                .push_bind(card.topic_id)
                .push_bind(card.card_type)
                .push_bind(card.difficulty)
                .push_bind(card.tags)
                .push_bind(card.related_cards)
                .push_bind(card.display_order)
                .push_bind(card.is_published)
                .push_bind(0_i64)
                .push_bind(0_i64)
                .push_bind(card.author_id)
                .push_bind(now)
                .push_bind(now);
        });
        builder.push(" RETURNING *");
        builder
            .build_query_as::<LearningCard>()
            .fetch_all(self.clients.write())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::CreateBatch))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<LearningCard>> {
        fetch_by_id(self.clients.read(), TABLE, ENTITY, id).await
    }

    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>> {
        fetch_page(self.clients.read(), TABLE, ENTITY, options).await
    }

    async fn find_by_category(
        &self,
        category_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>> {
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

    async fn find_by_topic(
        &self,
        topic_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>> {
        fetch_eq_page(
            self.clients.read(),
            TABLE,
            ENTITY,
            "topic_id",
            topic_id,
            options,
        )
        .await
    }

    async fn find_by_type(
        &self,
        card_type: CardType,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>> {
        fetch_eq_page(
            self.clients.read(),
            TABLE,
            ENTITY,
            "card_type",
            card_type,
            options,
        )
        .await
    }

    async fn search(
        &self,
        query: &str,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>> {
        fetch_search_page(
            self.clients.read(),
            TABLE,
            ENTITY,
            &["title", "content"],
            query,
            options,
        )
        .await
    }

    async fn find_related_cards(
        &self,
        card_id: Uuid,
        limit: Option<u32>,
    ) -> RepositoryResult<Vec<LearningCard>> {
        let card: Option<LearningCard> =
            fetch_by_id(self.clients.read(), TABLE, ENTITY, card_id).await?;
        let card = require_row(card, ENTITY, RepositoryOperation::FindById, card_id)?;
        let limit = i64::from(limit.unwrap_or(DEFAULT_RELATED_LIMIT));

        if !card.related_cards.is_empty() {
            sqlx::query_as::<_, LearningCard>(
                "SELECT * FROM learning_cards WHERE id = ANY($1) AND id <> $2 LIMIT $3",
            )
            .bind(card.related_cards)
            .bind(card_id)
            .bind(limit)
            .fetch_all(self.clients.read())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::FindAll))
        } else if let Some(topic_id) = card.topic_id {
            sqlx::query_as::<_, LearningCard>(
                "SELECT * FROM learning_cards WHERE topic_id = $1 AND id <> $2 LIMIT $3",
            )
            .bind(topic_id)
            .bind(card_id)
            .bind(limit)
            .fetch_all(self.clients.read())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::FindAll))
        } else {
            Ok(Vec::new())
        }
    }

    async fn update(&self, id: Uuid, data: UpdateLearningCard) -> RepositoryResult<LearningCard> {
        let mut builder = update_query(id, data, Utc::now());
        let updated = builder
            .build_query_as::<LearningCard>()
            .fetch_optional(self.clients.write())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::Update))?;
        require_row(updated, ENTITY, RepositoryOperation::Update, id)
    }

    async fn increment_view_count(&self, id: Uuid) -> RepositoryResult<LearningCard> {
        self.counter_update(
            id,
            "UPDATE learning_cards SET view_count = view_count + 1, updated_at = $2 \
             WHERE id = $1 RETURNING *",
            RepositoryOperation::Increment,
        )
        .await
    }

    async fn increment_like_count(&self, id: Uuid) -> RepositoryResult<LearningCard> {
        self.counter_update(
            id,
            "UPDATE learning_cards SET like_count = like_count + 1, updated_at = $2 \
             WHERE id = $1 RETURNING *",
            RepositoryOperation::Increment,
        )
        .await
    }

    async fn decrement_like_count(&self, id: Uuid) -> RepositoryResult<LearningCard> {
        self.counter_update(
            id,
            "UPDATE learning_cards SET like_count = GREATEST(like_count - 1, 0), \
             updated_at = $2 WHERE id = $1 RETURNING *",
            RepositoryOperation::Update,
        )
        .await
    }

    async fn record_view(
        &self,
        card_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<UserCardInteraction> {
        let now = Utc::now();
        let mut tx = self
            .clients
            .write()
            .begin()
            .await
            .map_err(wrap_err(INTERACTION_ENTITY, RepositoryOperation::Upsert))?;

        let touched = sqlx::query(
            "UPDATE learning_cards SET view_count = view_count + 1, updated_at = $2 \
             WHERE id = $1",
        )
        .bind(card_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(wrap_err(ENTITY, RepositoryOperation::Increment))?;
        if touched.rows_affected() == 0 {
            return require_row(None, ENTITY, RepositoryOperation::Upsert, card_id);
        }

        let interaction = sqlx::query_as::<_, UserCardInteraction>(
            "INSERT INTO user_card_interactions (card_id, user_id, mastery_level, review_count, \
             is_bookmarked, viewed_at, created_at, updated_at) \
             VALUES ($1, $2, 0, 1, FALSE, $3, $3, $3) \
             ON CONFLICT (card_id, user_id) DO UPDATE SET \
             review_count = user_card_interactions.review_count + 1, \
             viewed_at = $3, updated_at = $3 \
             RETURNING *",
        )
        .bind(card_id)
        .bind(user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(wrap_err(INTERACTION_ENTITY, RepositoryOperation::Upsert))?;

        tx.commit()
            .await
            .map_err(wrap_err(INTERACTION_ENTITY, RepositoryOperation::Upsert))?;
        Ok(interaction)
    }

    async fn record_mastery(
        &self,
        card_id: Uuid,
        user_id: Uuid,
        level: i16,
    ) -> RepositoryResult<UserCardInteraction> {
        if !(0..=MAX_MASTERY_LEVEL).contains(&level) {
            return Err(RepositoryError::validation(
                RepositoryOperation::Upsert,
                format!("mastery level must be within 0..={MAX_MASTERY_LEVEL}, got {level}"),
            )
            .with_entity(INTERACTION_ENTITY));
        }
        sqlx::query_as::<_, UserCardInteraction>(
            "INSERT INTO user_card_interactions (card_id, user_id, mastery_level, review_count, \
             is_bookmarked, last_reviewed_at, created_at, updated_at) \
             VALUES ($1, $2, $3, 0, FALSE, $4, $4, $4) \
             ON CONFLICT (card_id, user_id) DO UPDATE SET \
             mastery_level = $3, last_reviewed_at = $4, updated_at = $4 \
             RETURNING *",
        )
        .bind(card_id)
        .bind(user_id)
        .bind(level)
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err(INTERACTION_ENTITY, RepositoryOperation::Upsert))
    }

    async fn toggle_bookmark(
        &self,
        card_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<UserCardInteraction> {
        sqlx::query_as::<_, UserCardInteraction>(
            "INSERT INTO user_card_interactions (card_id, user_id, mastery_level, review_count, \
             is_bookmarked, created_at, updated_at) \
             VALUES ($1, $2, 0, 0, TRUE, $3, $3) \
             ON CONFLICT (card_id, user_id) DO UPDATE SET \
             is_bookmarked = NOT user_card_interactions.is_bookmarked, updated_at = $3 \
             RETURNING *",
        )
        .bind(card_id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err(INTERACTION_ENTITY, RepositoryOperation::Upsert))
    }

    async fn update_notes(
        &self,
        card_id: Uuid,
        user_id: Uuid,
        notes: &str,
    ) -> RepositoryResult<UserCardInteraction> {
        sqlx::query_as::<_, UserCardInteraction>(
            "INSERT INTO user_card_interactions (card_id, user_id, mastery_level, review_count, \
             is_bookmarked, notes, created_at, updated_at) \
             VALUES ($1, $2, 0, 0, FALSE, $3, $4, $4) \
             ON CONFLICT (card_id, user_id) DO UPDATE SET \
             notes = $3, updated_at = $4 \
             RETURNING *",
        )
        .bind(card_id)
        .bind(user_id)
        .bind(notes)
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err(INTERACTION_ENTITY, RepositoryOperation::Upsert))
    }

    async fn get_user_interaction(
        &self,
        card_id: Uuid,
        user_id: Uuid,
    ) -> RepositoryResult<Option<UserCardInteraction>> {
        sqlx::query_as::<_, UserCardInteraction>(
            "SELECT * FROM user_card_interactions WHERE card_id = $1 AND user_id = $2",
        )
        .bind(card_id)
        .bind(user_id)
        .fetch_optional(self.clients.read())
        .await
        .map_err(wrap_err(INTERACTION_ENTITY, RepositoryOperation::FindById))
    }

    async fn get_user_interactions(
        &self,
        user_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<UserCardInteraction>> {
        fetch_eq_page(
            self.clients.read(),
            INTERACTION_TABLE,
            INTERACTION_ENTITY,
            "user_id",
            user_id,
            options,
        )
        .await
    }

    async fn get_user_bookmarks(
        &self,
        user_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<LearningCard>> {
        let card_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT card_id FROM user_card_interactions \
             WHERE user_id = $1 AND is_bookmarked = TRUE",
        )
        .bind(user_id)
        .fetch_all(self.clients.read())
        .await
        .map_err(wrap_err(INTERACTION_ENTITY, RepositoryOperation::FindAll))?;

        if card_ids.is_empty() {
            return Ok(PaginatedResult::empty(options));
        }

        let mut count_builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {TABLE}"));
        let mut count_clause = WhereClause::new();
        count_clause.push_sep(&mut count_builder);
        count_builder.push("id = ANY(");
        count_builder.push_bind(card_ids.clone());
        count_builder.push(")");

        let mut builder = QueryBuilder::new(format!("SELECT * FROM {TABLE}"));
        let mut clause = WhereClause::new();
        clause.push_sep(&mut builder);
        builder.push("id = ANY(");
        builder.push_bind(card_ids);
        builder.push(")");

        fetch_scoped_page(
            self.clients.read(),
            ENTITY,
            count_builder,
            count_clause,
            builder,
            clause,
            options,
            RepositoryOperation::FindAll,
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        delete_by_id(self.clients.write(), TABLE, ENTITY, id).await
    }

    async fn delete_batch(&self, ids: &[Uuid]) -> RepositoryResult<()> {
        delete_by_ids(self.clients.write(), TABLE, ENTITY, ids).await
    }

    async fn get_statistics(&self) -> RepositoryResult<LearningCardStatistics> {
        let (total, published, unpublished) = futures::try_join!(
            count_all(self.clients.read(), TABLE, ENTITY),
            self.count_where("is_published", true),
            self.count_where("is_published", false),
        )?;

        let mut by_type = BTreeMap::new();
        for card_type in CardType::ALL {
            by_type.insert(
                card_type.to_string(),
                self.count_where("card_type", card_type).await?,
            );
        }

        Ok(LearningCardStatistics {
            total,
            by_type,
            by_category: BTreeMap::new(),
            by_difficulty: BTreeMap::new(),
            published,
            unpublished,
            total_views: 0,
            total_likes: 0,
            average_mastery_level: 0.0,
        })
    }

    async fn get_category_statistics(
        &self,
        category_id: Uuid,
    ) -> RepositoryResult<LearningCardStatistics> {
        let total = self.count_where("category_id", category_id).await?;

        let mut by_category = BTreeMap::new();
        by_category.insert(category_id.to_string(), total);
        let by_type = CardType::ALL.iter().map(|t| (t.to_string(), 0)).collect();

        Ok(LearningCardStatistics {
            total,
            by_type,
            by_category,
            by_difficulty: BTreeMap::new(),
            published: 0,
            unpublished: 0,
            total_views: 0,
            total_likes: 0,
            average_mastery_level: 0.0,
        })
    }

    async fn count(&self) -> RepositoryResult<u64> {
        count_all(self.clients.read(), TABLE, ENTITY).await
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
        let data = UpdateLearningCard {
            content: Some("Borrow before you clone.".to_string()),
            is_published: Some(true),
            ..UpdateLearningCard::default()
        };
        let builder = update_query(Uuid::nil(), data, Utc::now());
        assert_eq!(
            builder.sql(),
            "UPDATE learning_cards SET updated_at = $1, content = $2, is_published = $3 \
             WHERE id = $4 RETURNING *"
        );
    }

    #[test]
    fn counters_are_not_patchable_through_update() {
        let builder = update_query(Uuid::nil(), UpdateLearningCard::default(), Utc::now());
        let sql = builder.sql();
        assert!(!sql.contains("view_count"));
        assert!(!sql.contains("like_count"));
    }
}
