//! # learnlab-data
//!
//! Database-agnostic data-access layer for the LearnLab learning platform:
//! repository contracts for questions, users, plans, learning cards, and the
//! catalog entities, with PostgreSQL adapters behind a lazy factory.
//!
//! ## Features
//!
//! - **Database-agnostic contracts**: one `#[async_trait]` trait per rich
//!   entity plus a generic CRUD trait, handed out as `Arc<dyn …>` handles
//! - **PostgreSQL adapters**: sqlx runtime queries over a restricted /
//!   service-role pool pair (reads restricted, writes elevated)
//! - **Lazy factory**: one memoized adapter per entity; construction never
//!   dials, credentials are exercised by the first query
//! - **Typed errors**: a single taxonomy (not-found, validation, duplicate,
//!   database, permission) carried across every backend
//! - **Pagination protocol**: offset windows with exact totals and
//!   window-derived `has_more`
//! - **Layered configuration**: struct defaults, optional TOML file, then
//!   `LEARNLAB_DATABASE_*` environment variables via figment
//! - **Test doubles**: in-memory mock repositories behind the `test-utils`
//!   feature
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use learnlab_data::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration
//!     let config = RepositoryFactoryConfig::from_env()?;
//!
//!     // Build the factory and hand it out through a provider
//!     let factory = Arc::new(RepositoryFactory::new(config));
//!     let provider = RepositoryProvider::new(factory);
//!
//!     // Repositories are memoized per entity; nothing has dialed yet
//!     let questions = provider.questions()?;
//!     let filters = QuestionFilters {
//!         is_published: Some(true),
//!         ..QuestionFilters::none()
//!     };
//!     let page = questions
//!         .find_by_filters(&filters, Some(&QueryOptions::page(1, 25)))
//!         .await?;
//!     println!("{} of {} published questions", page.len(), page.meta.total);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod entities;
pub mod error;
pub mod factory;
pub mod mapping;
pub mod postgres;
pub mod provider;
pub mod query;
pub mod repository;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ConfigError, DatabaseKind, RepositoryFactoryConfig, ENV_PREFIX};

    pub use crate::error::{
        RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult,
    };

    pub use crate::entities::{
        CardType, Category, CreateCategory, CreateFlashcard, CreateLearningCard, CreatePlan,
        CreateProgressRecord, CreateQuestion, CreateSection, CreateTopic, CreateUser, Flashcard,
        LearningCard, LearningCardStatistics, Plan, PlanEnrollment, PlanStatistics, PlanStatus,
        ProgressRecord, Question, QuestionDifficulty, QuestionFilters, QuestionStatistics,
        QuestionType, Section, Topic, UpdateCategory, UpdateFlashcard, UpdateLearningCard,
        UpdatePlan, UpdateProgressRecord, UpdateQuestion, UpdateSection, UpdateTopic, UpdateUser,
        UpdateUserPreferences, UpdateUserProgress, User, UserCardInteraction, UserPreferences,
        UserProgress, UserRole, UserStatistics, DEFAULT_QUESTION_POINTS, MAX_MASTERY_LEVEL,
    };

    pub use crate::query::{
        BatchUpdateFailure, BatchUpdateOutcome, OrderDirection, PaginatedResult, PaginationMeta,
        QueryOptions, DEFAULT_PAGE_LIMIT,
    };

    pub use crate::repository::{
        CrudRepository, DynCategoryRepository, DynFlashcardRepository, DynLearningCardRepository,
        DynPlanRepository, DynProgressRecordRepository, DynQuestionRepository,
        DynSectionRepository, DynTopicRepository, DynUserRepository, LearningCardRepository,
        PlanRepository, QuestionRepository, UserRepository,
    };

    pub use crate::factory::RepositoryFactory;
    pub use crate::provider::RepositoryProvider;

    // In-memory doubles for consumers testing against the contracts
    #[cfg(any(test, feature = "test-utils"))]
    pub use crate::mock::{
        MockLearningCardRepository, MockPlanRepository, MockQuestionRepository,
    };

    // Re-export async-trait for implementing the contracts downstream
    pub use async_trait::async_trait;

    // Re-export the id and time types the entities are built from
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;
}
