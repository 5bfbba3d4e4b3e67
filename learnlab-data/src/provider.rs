//! Distribution of one factory through application state
//!
//! [`RepositoryProvider`] is the sanctioned way to hand repositories to the
//! layers that consume them: construct a [`RepositoryFactory`] where the
//! application wires its dependencies, wrap it in a provider, and clone the
//! provider into handlers or views. Cloning is cheap: every clone shares the
//! same factory and therefore the same memoized adapters.
//!
//! A provider can also start life empty ([`RepositoryProvider::uninitialized`])
//! and be bound later; until then every accessor fails with an error naming
//! the accessor, instead of a panic deep inside a handler.

use std::sync::Arc;

use crate::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use crate::factory::RepositoryFactory;
use crate::repository::{
    DynCategoryRepository, DynFlashcardRepository, DynLearningCardRepository, DynPlanRepository,
    DynProgressRecordRepository, DynQuestionRepository, DynSectionRepository, DynTopicRepository,
    DynUserRepository,
};

/// Shared handle distributing one [`RepositoryFactory`] to consumers.
#[derive(Clone, Default)]
pub struct RepositoryProvider {
    factory: Option<Arc<RepositoryFactory>>,
}

impl RepositoryProvider {
    /// A provider bound to `factory`.
    pub fn new(factory: Arc<RepositoryFactory>) -> Self {
        Self {
            factory: Some(factory),
        }
    }

    /// A provider with no factory bound. Every accessor fails until
    /// [`bind`](Self::bind) is called; useful for late wiring and for tests
    /// exercising the unbound path.
    pub fn uninitialized() -> Self {
        Self::default()
    }

    /// Binds (or replaces) the factory this provider distributes.
    pub fn bind(&mut self, factory: Arc<RepositoryFactory>) {
        self.factory = Some(factory);
    }

    /// Whether a factory is bound.
    pub fn is_initialized(&self) -> bool {
        self.factory.is_some()
    }

    /// The bound factory, for callers that need `reset()` or the config.
    pub fn factory(&self) -> RepositoryResult<Arc<RepositoryFactory>> {
        self.require("factory").map(Arc::clone)
    }

    /// The question repository.
    pub fn questions(&self) -> RepositoryResult<DynQuestionRepository> {
        self.require("questions")?.question_repository()
    }

    /// The user repository.
    pub fn users(&self) -> RepositoryResult<DynUserRepository> {
        self.require("users")?.user_repository()
    }

    /// The plan repository.
    pub fn plans(&self) -> RepositoryResult<DynPlanRepository> {
        self.require("plans")?.plan_repository()
    }

    /// The learning-card repository.
    pub fn learning_cards(&self) -> RepositoryResult<DynLearningCardRepository> {
        self.require("learning_cards")?.learning_card_repository()
    }

    /// The category repository.
    pub fn categories(&self) -> RepositoryResult<DynCategoryRepository> {
        self.require("categories")?.category_repository()
    }

    /// The topic repository.
    pub fn topics(&self) -> RepositoryResult<DynTopicRepository> {
        self.require("topics")?.topic_repository()
    }

    /// The section repository.
    pub fn sections(&self) -> RepositoryResult<DynSectionRepository> {
        self.require("sections")?.section_repository()
    }

    /// The flashcard repository.
    pub fn flashcards(&self) -> RepositoryResult<DynFlashcardRepository> {
        self.require("flashcards")?.flashcard_repository()
    }

    /// The progress-record repository.
    pub fn progress_records(&self) -> RepositoryResult<DynProgressRecordRepository> {
        self.require("progress_records")?.progress_repository()
    }

    fn require(&self, accessor: &'static str) -> RepositoryResult<&Arc<RepositoryFactory>> {
        self.factory.as_ref().ok_or_else(|| {
            RepositoryError::database(
                RepositoryOperation::Configure,
                format!(
                    "RepositoryProvider::{accessor} called before a factory was bound; \
                     construct a RepositoryFactory and pass it to RepositoryProvider::new \
                     or bind"
                ),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepositoryFactoryConfig;

    fn factory() -> Arc<RepositoryFactory> {
        Arc::new(RepositoryFactory::new(RepositoryFactoryConfig::new(
            "postgres://db.internal:5432/learnlab",
            "anon-key",
        )))
    }

    #[test]
    fn uninitialized_accessors_name_themselves() {
        let provider = RepositoryProvider::uninitialized();
        assert!(!provider.is_initialized());

        let err = provider.questions().err().unwrap();
        assert!(err.message.contains("RepositoryProvider::questions"));
        assert!(err.message.contains("before a factory was bound"));

        let err = provider.plans().err().unwrap();
        assert!(err.message.contains("RepositoryProvider::plans"));
    }

    #[tokio::test]
    async fn bound_provider_shares_the_factory_memoization() {
        let factory = factory();
        let provider = RepositoryProvider::new(Arc::clone(&factory));
        assert!(provider.is_initialized());

        let from_provider = provider.questions().unwrap();
        let from_factory = factory.question_repository().unwrap();
        assert!(Arc::ptr_eq(&from_provider, &from_factory));
    }

    #[tokio::test]
    async fn clones_distribute_the_same_factory() {
        let provider = RepositoryProvider::new(factory());
        let clone = provider.clone();
        let a = provider.learning_cards().unwrap();
        let b = clone.learning_cards().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn bind_initializes_a_late_wired_provider() {
        let mut provider = RepositoryProvider::uninitialized();
        assert!(provider.users().is_err());

        provider.bind(factory());
        assert!(provider.users().is_ok());
        assert!(provider.factory().is_ok());
    }
}
