//! Domain entities, DTOs, filters, and statistics shapes
//!
//! Every persisted entity is a flat record: relations are carried as id
//! references, never as embedded structs, so the shallow case-mapping
//! convention holds at every boundary. Entities derive `Serialize` /
//! `Deserialize` with camelCase keys and `sqlx::FromRow` over snake_case
//! columns.

mod catalog;
mod learning_card;
mod plan;
mod question;
mod user;

pub use catalog::{
    Category, CreateCategory, CreateFlashcard, CreateProgressRecord, CreateSection, CreateTopic,
    Flashcard, ProgressRecord, Section, Topic, UpdateCategory, UpdateFlashcard,
    UpdateProgressRecord, UpdateSection, UpdateTopic,
};
pub use learning_card::{
    CardType, CreateLearningCard, LearningCard, LearningCardStatistics, UpdateLearningCard,
    UserCardInteraction, MAX_MASTERY_LEVEL,
};
pub use plan::{CreatePlan, Plan, PlanEnrollment, PlanStatistics, PlanStatus, UpdatePlan};
pub use question::{
    CreateQuestion, Question, QuestionDifficulty, QuestionFilters, QuestionStatistics,
    QuestionType, UpdateQuestion, DEFAULT_QUESTION_POINTS,
};
pub use user::{
    CreateUser, UpdateUser, UpdateUserPreferences, UpdateUserProgress, User, UserPreferences,
    UserProgress, UserRole, UserStatistics,
};
