//! PostgreSQL question repository

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::base::{
    delete_by_id, delete_by_ids, exists_by_id, fetch_by_id, fetch_count, fetch_eq_page,
    fetch_page, fetch_scoped_page, fetch_search_page, push_eq, push_ilike, require_row, wrap_err,
    PgClients, WhereClause,
};
use crate::entities::{
    CreateQuestion, Question, QuestionDifficulty, QuestionFilters, QuestionStatistics,
    QuestionType, UpdateQuestion, DEFAULT_QUESTION_POINTS,
};
use crate::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use crate::query::{BatchUpdateOutcome, PaginatedResult, QueryOptions};
use crate::repository::QuestionRepository;

const ENTITY: &str = "question";
const TABLE: &str = "questions";

/// Question adapter over the shared pool pair.
#[derive(Debug)]
pub struct PgQuestionRepository {
    clients: Arc<PgClients>,
}

impl PgQuestionRepository {
    pub(crate) fn new(clients: Arc<PgClients>) -> Self {
        Self { clients }
    }

    async fn filtered_count(&self, filters: Option<&QuestionFilters>) -> RepositoryResult<u64> {
        let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {TABLE}"));
        let mut clause = WhereClause::new();
        if let Some(filters) = filters {
            push_question_filters(&mut builder, &mut clause, filters);
        }
        fetch_count(
            self.clients.read(),
            builder,
            ENTITY,
            RepositoryOperation::Count,
        )
        .await
    }
}

/// Appends one predicate per set field of the typed filters.
fn push_question_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    clause: &mut WhereClause,
    filters: &QuestionFilters,
) {
    if let Some(category_id) = filters.category_id {
        push_eq(builder, clause, "category_id", category_id);
    }
    if let Some(topic_id) = filters.topic_id {
        push_eq(builder, clause, "topic_id", topic_id);
    }
    if let Some(difficulty) = filters.difficulty {
        push_eq(builder, clause, "difficulty", difficulty);
    }
    if let Some(question_type) = filters.question_type {
        push_eq(builder, clause, "question_type", question_type);
    }
    if let Some(is_published) = filters.is_published {
        push_eq(builder, clause, "is_published", is_published);
    }
    if let Some(author_id) = filters.author_id {
        push_eq(builder, clause, "author_id", author_id);
    }
    if let Some(tag) = &filters.tag {
        clause.push_sep(builder);
        builder.push("tags @> ");
        builder.push_bind(vec![tag.clone()]);
    }
    if let Some(search) = &filters.search {
        push_ilike(builder, clause, &["title", "content"], &format!("%{search}%"));
    }
}

/// `UPDATE` statement patching only the provided fields. `updated_at` is
/// always refreshed, so an all-`None` payload still touches the row.
fn update_query(
    id: Uuid,
    data: UpdateQuestion,
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
    if let Some(difficulty) = data.difficulty {
        builder.push(", difficulty = ");
        builder.push_bind(difficulty);
    }
    if let Some(question_type) = data.question_type {
        builder.push(", question_type = ");
        builder.push_bind(question_type);
    }
    if let Some(options) = data.options {
        builder.push(", options = ");
        builder.push_bind(options);
    }
    if let Some(correct_answer) = data.correct_answer {
        builder.push(", correct_answer = ");
        builder.push_bind(correct_answer);
    }
    if let Some(explanation) = data.explanation {
        builder.push(", explanation = ");
        builder.push_bind(explanation);
    }
    if let Some(points) = data.points {
        builder.push(", points = ");
        builder.push_bind(points);
    }
    if let Some(tags) = data.tags {
        builder.push(", tags = ");
        builder.push_bind(tags);
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
impl QuestionRepository for PgQuestionRepository {
    async fn create(&self, data: CreateQuestion) -> RepositoryResult<Question> {
        sqlx::query_as::<_, Question>(
            "INSERT INTO questions (title, content, category_id, topic_id, difficulty, \
             question_type, options, correct_answer, explanation, points, tags, author_id, \
             is_published, view_count, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 0, $14, $14) \
             RETURNING *",
        )
        .bind(data.title)
        .bind(data.content)
        .bind(data.category_id)
        .bind(data.topic_id)
        .bind(data.difficulty)
        .bind(data.question_type)
        .bind(data.options)
        .bind(data.correct_answer)
        .bind(data.explanation)
        .bind(data.points.unwrap_or(DEFAULT_QUESTION_POINTS))
        .bind(data.tags)
        .bind(data.author_id)
        .bind(data.is_published)
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err(ENTITY, RepositoryOperation::Create))
    }

    async fn create_batch(&self, data: Vec<CreateQuestion>) -> RepositoryResult<Vec<Question>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        let mut builder = QueryBuilder::new(
            "INSERT INTO questions (title, content, category_id, topic_id, difficulty, \
             question_type, options, correct_answer, explanation, points, tags, author_id, \
             is_published, view_count, created_at, updated_at) ",
        );
        builder.push_values(data, |mut row, question| {
            row.push_bind(question.title)
                .push_bind(question.content)
                .push_bind(question.category_id)
                .push_bind(question.topic_id)
                .push_bind(question.difficulty)
                .push_bind(question.question_type)
                .push_bind(question.options)
                .push_bind(question.correct_answer)
                .push_bind(question.explanation)
                .push_bind(question.points.unwrap_or(DEFAULT_QUESTION_POINTS))
                .push_bind(question.tags)
                .push_bind(question.author_id)
                .push_bind(question.is_published)
                .push_bind(0_i64)
                .push_bind(now)
                .push_bind(now);
        });
        builder.push(" RETURNING *");
        builder
            .build_query_as::<Question>()
            .fetch_all(self.clients.write())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::CreateBatch))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Question>> {
        fetch_by_id(self.clients.read(), TABLE, ENTITY, id).await
    }

    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
        fetch_page(self.clients.read(), TABLE, ENTITY, options).await
    }

    async fn find_by_category(
        &self,
        category_id: Uuid,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
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
    ) -> RepositoryResult<PaginatedResult<Question>> {
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

    async fn find_by_difficulty(
        &self,
        difficulty: QuestionDifficulty,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
        fetch_eq_page(
            self.clients.read(),
            TABLE,
            ENTITY,
            "difficulty",
            difficulty,
            options,
        )
        .await
    }

    async fn find_by_type(
        &self,
        question_type: QuestionType,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
        fetch_eq_page(
            self.clients.read(),
            TABLE,
            ENTITY,
            "question_type",
            question_type,
            options,
        )
        .await
    }

    async fn find_by_filters(
        &self,
        filters: &QuestionFilters,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
        let mut count_builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {TABLE}"));
        let mut count_clause = WhereClause::new();
        push_question_filters(&mut count_builder, &mut count_clause, filters);

        let mut builder = QueryBuilder::new(format!("SELECT * FROM {TABLE}"));
        let mut clause = WhereClause::new();
        push_question_filters(&mut builder, &mut clause, filters);

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

    async fn search(
        &self,
        query: &str,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Question>> {
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

    async fn count(&self, filters: Option<&QuestionFilters>) -> RepositoryResult<u64> {
        self.filtered_count(filters).await
    }

    async fn update(&self, id: Uuid, data: UpdateQuestion) -> RepositoryResult<Question> {
        let mut builder = update_query(id, data, Utc::now());
        let updated = builder
            .build_query_as::<Question>()
            .fetch_optional(self.clients.write())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::Update))?;
        require_row(updated, ENTITY, RepositoryOperation::Update, id)
    }

    async fn update_batch(
        &self,
        updates: Vec<(Uuid, UpdateQuestion)>,
    ) -> RepositoryResult<BatchUpdateOutcome<Question>> {
        let mut outcome = BatchUpdateOutcome::default();
        for (id, data) in updates {
            match self.update(id, data).await {
                Ok(question) => outcome.push_updated(question),
                Err(error) => outcome.push_failed(id, error),
            }
        }
        Ok(outcome)
    }

    async fn increment_view_count(&self, id: Uuid) -> RepositoryResult<Question> {
        let updated = sqlx::query_as::<_, Question>(
            "UPDATE questions SET view_count = view_count + 1, updated_at = $2 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(self.clients.write())
        .await
        .map_err(wrap_err(ENTITY, RepositoryOperation::Increment))?;
        require_row(updated, ENTITY, RepositoryOperation::Increment, id)
    }

    async fn update_success_rate(
        &self,
        id: Uuid,
        success_rate: f64,
    ) -> RepositoryResult<Question> {
        if !(0.0..=100.0).contains(&success_rate) {
            return Err(RepositoryError::validation(
                RepositoryOperation::Update,
                format!("success_rate must be within 0..=100, got {success_rate}"),
            )
            .with_entity(ENTITY)
            .with_entity_id(id));
        }
        let updated = sqlx::query_as::<_, Question>(
            "UPDATE questions SET success_rate = $2, updated_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(success_rate)
        .bind(Utc::now())
        .fetch_optional(self.clients.write())
        .await
        .map_err(wrap_err(ENTITY, RepositoryOperation::Update))?;
        require_row(updated, ENTITY, RepositoryOperation::Update, id)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        delete_by_id(self.clients.write(), TABLE, ENTITY, id).await
    }

    async fn delete_batch(&self, ids: &[Uuid]) -> RepositoryResult<()> {
        delete_by_ids(self.clients.write(), TABLE, ENTITY, ids).await
    }

    async fn soft_delete(&self, id: Uuid) -> RepositoryResult<Question> {
        let updated = sqlx::query_as::<_, Question>(
            "UPDATE questions SET is_published = FALSE, updated_at = $2 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(self.clients.write())
        .await
        .map_err(wrap_err(ENTITY, RepositoryOperation::SoftDelete))?;
        require_row(updated, ENTITY, RepositoryOperation::SoftDelete, id)
    }

    async fn get_statistics(&self) -> RepositoryResult<QuestionStatistics> {
        let published_filters = QuestionFilters {
            is_published: Some(true),
            ..QuestionFilters::none()
        };
        let unpublished_filters = QuestionFilters {
            is_published: Some(false),
            ..QuestionFilters::none()
        };
        let (total, published, unpublished) = futures::try_join!(
            self.filtered_count(None),
            self.filtered_count(Some(&published_filters)),
            self.filtered_count(Some(&unpublished_filters)),
        )?;

        let mut by_difficulty = BTreeMap::new();
        for difficulty in QuestionDifficulty::ALL {
            let filters = QuestionFilters {
                difficulty: Some(difficulty),
                ..QuestionFilters::none()
            };
            by_difficulty.insert(
                difficulty.to_string(),
                self.filtered_count(Some(&filters)).await?,
            );
        }

        let mut by_type = BTreeMap::new();
        for question_type in QuestionType::ALL {
            let filters = QuestionFilters {
                question_type: Some(question_type),
                ..QuestionFilters::none()
            };
            by_type.insert(
                question_type.to_string(),
                self.filtered_count(Some(&filters)).await?,
            );
        }

        Ok(QuestionStatistics {
            total,
            by_difficulty,
            by_type,
            by_category: BTreeMap::new(),
            published,
            unpublished,
            average_success_rate: 0.0,
            total_views: 0,
            last_updated: Utc::now(),
        })
    }

    async fn get_category_statistics(
        &self,
        category_id: Uuid,
    ) -> RepositoryResult<QuestionStatistics> {
        let filters = QuestionFilters {
            category_id: Some(category_id),
            ..QuestionFilters::none()
        };
        let total = self.filtered_count(Some(&filters)).await?;

        let mut by_category = BTreeMap::new();
        by_category.insert(category_id.to_string(), total);
        let by_difficulty = QuestionDifficulty::ALL
            .iter()
            .map(|d| (d.to_string(), 0))
            .collect();
        let by_type = QuestionType::ALL.iter().map(|t| (t.to_string(), 0)).collect();

        Ok(QuestionStatistics {
            total,
            by_difficulty,
            by_type,
            by_category,
            published: 0,
            unpublished: 0,
            average_success_rate: 0.0,
            total_views: 0,
            last_updated: Utc::now(),
        })
    }

    async fn exists(&self, id: Uuid) -> RepositoryResult<bool> {
        exists_by_id(self.clients.read(), TABLE, ENTITY, id).await
    }

    async fn get_random(
        &self,
        count: u32,
        filters: Option<&QuestionFilters>,
    ) -> RepositoryResult<Vec<Question>> {
        let mut builder = QueryBuilder::new(format!("SELECT * FROM {TABLE}"));
        let mut clause = WhereClause::new();
        if let Some(filters) = filters {
            push_question_filters(&mut builder, &mut clause, filters);
        }
        builder.push(" ORDER BY random() LIMIT ");
        builder.push_bind(i64::from(count));
        builder
            .build_query_as::<Question>()
            .fetch_all(self.clients.read())
            .await
            .map_err(wrap_err(ENTITY, RepositoryOperation::Random))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_filters_compose_in_declaration_order() {
        let filters = QuestionFilters {
            category_id: Some(Uuid::nil()),
            difficulty: Some(QuestionDifficulty::Hard),
            question_type: Some(QuestionType::Code),
            is_published: Some(true),
            ..QuestionFilters::none()
        };
        let mut builder = QueryBuilder::new("SELECT * FROM questions");
        let mut clause = WhereClause::new();
        push_question_filters(&mut builder, &mut clause, &filters);
        assert_eq!(
            builder.sql(),
            "SELECT * FROM questions WHERE category_id = $1 AND difficulty = $2 \
             AND question_type = $3 AND is_published = $4"
        );
    }

    #[test]
    fn tag_filter_uses_array_containment() {
        let filters = QuestionFilters {
            tag: Some("ownership".to_string()),
            ..QuestionFilters::none()
        };
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM questions");
        let mut clause = WhereClause::new();
        push_question_filters(&mut builder, &mut clause, &filters);
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM questions WHERE tags @> $1"
        );
    }

    #[test]
    fn search_filter_matches_title_or_content() {
        let filters = QuestionFilters {
            search: Some("borrow".to_string()),
            ..QuestionFilters::none()
        };
        let mut builder = QueryBuilder::new("SELECT * FROM questions");
        let mut clause = WhereClause::new();
        push_question_filters(&mut builder, &mut clause, &filters);
        assert_eq!(
            builder.sql(),
            "SELECT * FROM questions WHERE (title ILIKE $1 OR content ILIKE $2)"
        );
    }

    #[test]
    fn update_patches_only_provided_fields() {
        let data = UpdateQuestion {
            title: Some("Borrowing".to_string()),
            points: Some(20),
            ..UpdateQuestion::default()
        };
        let builder = update_query(Uuid::nil(), data, Utc::now());
        assert_eq!(
            builder.sql(),
            "UPDATE questions SET updated_at = $1, title = $2, points = $3 \
             WHERE id = $4 RETURNING *"
        );

        let builder = update_query(Uuid::nil(), UpdateQuestion::default(), Utc::now());
        assert_eq!(
            builder.sql(),
            "UPDATE questions SET updated_at = $1 WHERE id = $2 RETURNING *"
        );
    }
}
