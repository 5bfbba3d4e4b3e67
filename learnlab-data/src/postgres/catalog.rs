//! PostgreSQL catalog adapters
//!
//! Categories, topics, sections, flashcards, and progress records share the
//! plain [`CrudRepository`] contract; each adapter here is the same shape
//! with its own table, insert defaults, and patchable columns.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::base::{
    count_all, delete_by_id, exists_by_id, fetch_by_id, fetch_page, require_row, wrap_err,
    PgClients,
};
use crate::entities::{
    Category, CreateCategory, CreateFlashcard, CreateProgressRecord, CreateSection, CreateTopic,
    Flashcard, ProgressRecord, Section, Topic, UpdateCategory, UpdateFlashcard,
    UpdateProgressRecord, UpdateSection, UpdateTopic,
};
use crate::error::{RepositoryOperation, RepositoryResult};
use crate::query::{PaginatedResult, QueryOptions};
use crate::repository::CrudRepository;

/// Category adapter.
#[derive(Debug)]
pub struct PgCategoryRepository {
    clients: Arc<PgClients>,
}

impl PgCategoryRepository {
    pub(crate) fn new(clients: Arc<PgClients>) -> Self {
        Self { clients }
    }
}

fn update_category_query(
    id: Uuid,
    data: UpdateCategory,
    now: DateTime<Utc>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("UPDATE categories SET updated_at = ");
    builder.push_bind(now);
    if let Some(name) = data.name {
        builder.push(", name = ");
        builder.push_bind(name);
    }
    if let Some(description) = data.description {
        builder.push(", description = ");
        builder.push_bind(description);
    }
    if let Some(slug) = data.slug {
        builder.push(", slug = ");
        builder.push_bind(slug);
    }
    if let Some(icon) = data.icon {
        builder.push(", icon = ");
        builder.push_bind(icon);
    }
    if let Some(display_order) = data.display_order {
        builder.push(", display_order = ");
        builder.push_bind(display_order);
    }
    if let Some(is_active) = data.is_active {
        builder.push(", is_active = ");
        builder.push_bind(is_active);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    builder
}

#[async_trait]
impl CrudRepository<Category, CreateCategory, UpdateCategory> for PgCategoryRepository {
    async fn create(&self, data: CreateCategory) -> RepositoryResult<Category> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description, slug, icon, display_order, is_active, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
             RETURNING *",
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.slug)
        .bind(data.icon)
        .bind(data.display_order)
        .bind(data.is_active.unwrap_or(true))
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err("category", RepositoryOperation::Create))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Category>> {
        fetch_by_id(self.clients.read(), "categories", "category", id).await
    }

    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Category>> {
        fetch_page(self.clients.read(), "categories", "category", options).await
    }

    async fn update(&self, id: Uuid, data: UpdateCategory) -> RepositoryResult<Category> {
        let mut builder = update_category_query(id, data, Utc::now());
        let updated = builder
            .build_query_as::<Category>()
            .fetch_optional(self.clients.write())
            .await
            .map_err(wrap_err("category", RepositoryOperation::Update))?;
        require_row(updated, "category", RepositoryOperation::Update, id)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        delete_by_id(self.clients.write(), "categories", "category", id).await
    }

    async fn count(&self) -> RepositoryResult<u64> {
        count_all(self.clients.read(), "categories", "category").await
    }

    async fn exists(&self, id: Uuid) -> RepositoryResult<bool> {
        exists_by_id(self.clients.read(), "categories", "category", id).await
    }
}

/// Topic adapter.
#[derive(Debug)]
pub struct PgTopicRepository {
    clients: Arc<PgClients>,
}

impl PgTopicRepository {
    pub(crate) fn new(clients: Arc<PgClients>) -> Self {
        Self { clients }
    }
}

fn update_topic_query(
    id: Uuid,
    data: UpdateTopic,
    now: DateTime<Utc>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("UPDATE topics SET updated_at = ");
    builder.push_bind(now);
    if let Some(category_id) = data.category_id {
        builder.push(", category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(name) = data.name {
        builder.push(", name = ");
        builder.push_bind(name);
    }
    if let Some(description) = data.description {
        builder.push(", description = ");
        builder.push_bind(description);
    }
    if let Some(display_order) = data.display_order {
        builder.push(", display_order = ");
        builder.push_bind(display_order);
    }
    if let Some(is_active) = data.is_active {
        builder.push(", is_active = ");
        builder.push_bind(is_active);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    builder
}

#[async_trait]
impl CrudRepository<Topic, CreateTopic, UpdateTopic> for PgTopicRepository {
    async fn create(&self, data: CreateTopic) -> RepositoryResult<Topic> {
        sqlx::query_as::<_, Topic>(
            "INSERT INTO topics (category_id, name, description, display_order, is_active, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING *",
        )
        .bind(data.category_id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.display_order)
        .bind(data.is_active.unwrap_or(true))
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err("topic", RepositoryOperation::Create))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Topic>> {
        fetch_by_id(self.clients.read(), "topics", "topic", id).await
    }

    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Topic>> {
        fetch_page(self.clients.read(), "topics", "topic", options).await
    }

    async fn update(&self, id: Uuid, data: UpdateTopic) -> RepositoryResult<Topic> {
        let mut builder = update_topic_query(id, data, Utc::now());
        let updated = builder
            .build_query_as::<Topic>()
            .fetch_optional(self.clients.write())
            .await
            .map_err(wrap_err("topic", RepositoryOperation::Update))?;
        require_row(updated, "topic", RepositoryOperation::Update, id)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        delete_by_id(self.clients.write(), "topics", "topic", id).await
    }

    async fn count(&self) -> RepositoryResult<u64> {
        count_all(self.clients.read(), "topics", "topic").await
    }

    async fn exists(&self, id: Uuid) -> RepositoryResult<bool> {
        exists_by_id(self.clients.read(), "topics", "topic", id).await
    }
}

/// Section adapter.
#[derive(Debug)]
pub struct PgSectionRepository {
    clients: Arc<PgClients>,
}

impl PgSectionRepository {
    pub(crate) fn new(clients: Arc<PgClients>) -> Self {
        Self { clients }
    }
}

fn update_section_query(
    id: Uuid,
    data: UpdateSection,
    now: DateTime<Utc>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("UPDATE sections SET updated_at = ");
    builder.push_bind(now);
    if let Some(category_id) = data.category_id {
        builder.push(", category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(name) = data.name {
        builder.push(", name = ");
        builder.push_bind(name);
    }
    if let Some(description) = data.description {
        builder.push(", description = ");
        builder.push_bind(description);
    }
    if let Some(display_order) = data.display_order {
        builder.push(", display_order = ");
        builder.push_bind(display_order);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    builder
}

#[async_trait]
impl CrudRepository<Section, CreateSection, UpdateSection> for PgSectionRepository {
    async fn create(&self, data: CreateSection) -> RepositoryResult<Section> {
        sqlx::query_as::<_, Section>(
            "INSERT INTO sections (category_id, name, description, display_order, created_at, \
             updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING *",
        )
        .bind(data.category_id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.display_order)
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err("section", RepositoryOperation::Create))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Section>> {
        fetch_by_id(self.clients.read(), "sections", "section", id).await
    }

    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Section>> {
        fetch_page(self.clients.read(), "sections", "section", options).await
    }

    async fn update(&self, id: Uuid, data: UpdateSection) -> RepositoryResult<Section> {
        let mut builder = update_section_query(id, data, Utc::now());
        let updated = builder
            .build_query_as::<Section>()
            .fetch_optional(self.clients.write())
            .await
            .map_err(wrap_err("section", RepositoryOperation::Update))?;
        require_row(updated, "section", RepositoryOperation::Update, id)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        delete_by_id(self.clients.write(), "sections", "section", id).await
    }

    async fn count(&self) -> RepositoryResult<u64> {
        count_all(self.clients.read(), "sections", "section").await
    }

    async fn exists(&self, id: Uuid) -> RepositoryResult<bool> {
        exists_by_id(self.clients.read(), "sections", "section", id).await
    }
}

/// Flashcard adapter.
#[derive(Debug)]
pub struct PgFlashcardRepository {
    clients: Arc<PgClients>,
}

impl PgFlashcardRepository {
    pub(crate) fn new(clients: Arc<PgClients>) -> Self {
        Self { clients }
    }
}

fn update_flashcard_query(
    id: Uuid,
    data: UpdateFlashcard,
    now: DateTime<Utc>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("UPDATE flashcards SET updated_at = ");
    builder.push_bind(now);
    if let Some(category_id) = data.category_id {
        builder.push(", category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(topic_id) = data.topic_id {
        builder.push(", topic_id = ");
        builder.push_bind(topic_id);
    }
    if let Some(front_text) = data.front_text {
        builder.push(", front_text = ");
        builder.push_bind(front_text);
    }
    if let Some(back_text) = data.back_text {
        builder.push(", back_text = ");
        builder.push_bind(back_text);
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
impl CrudRepository<Flashcard, CreateFlashcard, UpdateFlashcard> for PgFlashcardRepository {
    async fn create(&self, data: CreateFlashcard) -> RepositoryResult<Flashcard> {
        sqlx::query_as::<_, Flashcard>(
            "INSERT INTO flashcards (category_id, topic_id, front_text, back_text, tags, \
             is_published, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
             RETURNING *",
        )
        .bind(data.category_id)
        .bind(data.topic_id)
        .bind(data.front_text)
        .bind(data.back_text)
        .bind(data.tags)
        .bind(data.is_published)
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err("flashcard", RepositoryOperation::Create))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Flashcard>> {
        fetch_by_id(self.clients.read(), "flashcards", "flashcard", id).await
    }

    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<Flashcard>> {
        fetch_page(self.clients.read(), "flashcards", "flashcard", options).await
    }

    async fn update(&self, id: Uuid, data: UpdateFlashcard) -> RepositoryResult<Flashcard> {
        let mut builder = update_flashcard_query(id, data, Utc::now());
        let updated = builder
            .build_query_as::<Flashcard>()
            .fetch_optional(self.clients.write())
            .await
            .map_err(wrap_err("flashcard", RepositoryOperation::Update))?;
        require_row(updated, "flashcard", RepositoryOperation::Update, id)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        delete_by_id(self.clients.write(), "flashcards", "flashcard", id).await
    }

    async fn count(&self) -> RepositoryResult<u64> {
        count_all(self.clients.read(), "flashcards", "flashcard").await
    }

    async fn exists(&self, id: Uuid) -> RepositoryResult<bool> {
        exists_by_id(self.clients.read(), "flashcards", "flashcard", id).await
    }
}

/// Progress-record adapter.
#[derive(Debug)]
pub struct PgProgressRecordRepository {
    clients: Arc<PgClients>,
}

impl PgProgressRecordRepository {
    pub(crate) fn new(clients: Arc<PgClients>) -> Self {
        Self { clients }
    }
}

fn update_progress_record_query(
    id: Uuid,
    data: UpdateProgressRecord,
    now: DateTime<Utc>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("UPDATE progress_records SET updated_at = ");
    builder.push_bind(now);
    if let Some(questions_attempted) = data.questions_attempted {
        builder.push(", questions_attempted = ");
        builder.push_bind(questions_attempted);
    }
    if let Some(questions_correct) = data.questions_correct {
        builder.push(", questions_correct = ");
        builder.push_bind(questions_correct);
    }
    if let Some(completion_percentage) = data.completion_percentage {
        builder.push(", completion_percentage = ");
        builder.push_bind(completion_percentage);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    builder
}

#[async_trait]
impl CrudRepository<ProgressRecord, CreateProgressRecord, UpdateProgressRecord>
    for PgProgressRecordRepository
{
    async fn create(&self, data: CreateProgressRecord) -> RepositoryResult<ProgressRecord> {
        sqlx::query_as::<_, ProgressRecord>(
            "INSERT INTO progress_records (user_id, category_id, topic_id, questions_attempted, \
             questions_correct, completion_percentage, last_activity_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $7) \
             RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.category_id)
        .bind(data.topic_id)
        .bind(data.questions_attempted)
        .bind(data.questions_correct)
        .bind(data.completion_percentage)
        .bind(Utc::now())
        .fetch_one(self.clients.write())
        .await
        .map_err(wrap_err("progress_record", RepositoryOperation::Create))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<ProgressRecord>> {
        fetch_by_id(self.clients.read(), "progress_records", "progress_record", id).await
    }

    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<ProgressRecord>> {
        fetch_page(
            self.clients.read(),
            "progress_records",
            "progress_record",
            options,
        )
        .await
    }

    async fn update(&self, id: Uuid, data: UpdateProgressRecord) -> RepositoryResult<ProgressRecord> {
        let mut builder = update_progress_record_query(id, data, Utc::now());
        let updated = builder
            .build_query_as::<ProgressRecord>()
            .fetch_optional(self.clients.write())
            .await
            .map_err(wrap_err("progress_record", RepositoryOperation::Update))?;
        require_row(updated, "progress_record", RepositoryOperation::Update, id)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        delete_by_id(self.clients.write(), "progress_records", "progress_record", id).await
    }

    async fn count(&self) -> RepositoryResult<u64> {
        count_all(self.clients.read(), "progress_records", "progress_record").await
    }

    async fn exists(&self, id: Uuid) -> RepositoryResult<bool> {
        exists_by_id(self.clients.read(), "progress_records", "progress_record", id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_update_patches_only_provided_fields() {
        let data = UpdateCategory {
            name: Some("Ownership".to_string()),
            is_active: Some(false),
            ..UpdateCategory::default()
        };
        let builder = update_category_query(Uuid::nil(), data, Utc::now());
        assert_eq!(
            builder.sql(),
            "UPDATE categories SET updated_at = $1, name = $2, is_active = $3 \
             WHERE id = $4 RETURNING *"
        );
    }

    #[test]
    fn flashcard_update_covers_every_patchable_field() {
        let data = UpdateFlashcard {
            category_id: Some(Uuid::nil()),
            topic_id: Some(Uuid::nil()),
            front_text: Some("What moves?".to_string()),
            back_text: Some("Ownership.".to_string()),
            tags: Some(vec!["rust".to_string()]),
            is_published: Some(true),
        };
        let builder = update_flashcard_query(Uuid::nil(), data, Utc::now());
        assert_eq!(
            builder.sql(),
            "UPDATE flashcards SET updated_at = $1, category_id = $2, topic_id = $3, \
             front_text = $4, back_text = $5, tags = $6, is_published = $7 \
             WHERE id = $8 RETURNING *"
        );
    }
}
