//! Database-agnostic repository contracts
//!
//! One trait per rich entity (questions, users, plans, learning cards) plus a
//! generic [`CrudRepository`] implemented for the catalog entities. Traits
//! are `#[async_trait]` and object-safe: the factory hands out `Arc<dyn …>`
//! handles, so callers depend on contracts, never on a concrete store.
//!
//! Shared contract across every trait:
//!
//! - `find_by_id` returns `Ok(None)` for a missing row; absence is not an
//!   error.
//! - `update` returns the full authoritative post-update entity and fails
//!   with a `NotFound` error when the id does not exist.
//! - List operations take [`Option<&QueryOptions>`](crate::query::QueryOptions)
//!   and return a [`PaginatedResult`](crate::query::PaginatedResult) whose
//!   `meta.total` comes from an exact count.
//! - `delete` is a hard delete and succeeds whether or not the row existed.

mod crud;
mod learning_card;
mod plan;
mod question;
mod user;

use std::sync::Arc;

pub use crud::CrudRepository;
pub use learning_card::LearningCardRepository;
pub use plan::PlanRepository;
pub use question::QuestionRepository;
pub use user::UserRepository;

use crate::entities::{
    Category, CreateCategory, CreateFlashcard, CreateProgressRecord, CreateSection, CreateTopic,
    Flashcard, ProgressRecord, Section, Topic, UpdateCategory, UpdateFlashcard,
    UpdateProgressRecord, UpdateSection, UpdateTopic,
};

/// Shared handle to a question repository.
pub type DynQuestionRepository = Arc<dyn QuestionRepository>;
/// Shared handle to a user repository.
pub type DynUserRepository = Arc<dyn UserRepository>;
/// Shared handle to a plan repository.
pub type DynPlanRepository = Arc<dyn PlanRepository>;
/// Shared handle to a learning-card repository.
pub type DynLearningCardRepository = Arc<dyn LearningCardRepository>;
/// Shared handle to the category CRUD repository.
pub type DynCategoryRepository = Arc<dyn CrudRepository<Category, CreateCategory, UpdateCategory>>;
/// Shared handle to the topic CRUD repository.
pub type DynTopicRepository = Arc<dyn CrudRepository<Topic, CreateTopic, UpdateTopic>>;
/// Shared handle to the section CRUD repository.
pub type DynSectionRepository = Arc<dyn CrudRepository<Section, CreateSection, UpdateSection>>;
/// Shared handle to the flashcard CRUD repository.
pub type DynFlashcardRepository =
    Arc<dyn CrudRepository<Flashcard, CreateFlashcard, UpdateFlashcard>>;
/// Shared handle to the progress-record CRUD repository.
pub type DynProgressRecordRepository =
    Arc<dyn CrudRepository<ProgressRecord, CreateProgressRecord, UpdateProgressRecord>>;
