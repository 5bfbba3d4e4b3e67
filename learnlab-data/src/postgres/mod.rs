//! PostgreSQL adapters
//!
//! One adapter per repository contract, all sharing a [`base::PgClients`]
//! pool pair created by the factory. Reads run on the restricted pool;
//! writes prefer the service-role pool when one is configured.
//!
//! Adapters are constructed by [`crate::factory::RepositoryFactory`] rather
//! than directly: the factory owns the pool pair and memoizes one adapter
//! per entity.

pub(crate) mod base;
mod catalog;
mod learning_card;
mod plan;
mod question;
mod user;

pub use catalog::{
    PgCategoryRepository, PgFlashcardRepository, PgProgressRecordRepository,
    PgSectionRepository, PgTopicRepository,
};
pub use learning_card::PgLearningCardRepository;
pub use plan::PgPlanRepository;
pub use question::PgQuestionRepository;
pub use user::PgUserRepository;
