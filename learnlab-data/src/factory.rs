//! Repository construction and backing-store dispatch
//!
//! [`RepositoryFactory`] is the single place concrete adapters are built.
//! It holds one [`RepositoryFactoryConfig`] for its lifetime and hands out
//! `Arc<dyn …>` repository handles, memoized per entity per factory: repeated
//! calls to the same getter return a pointer-identical `Arc`, so consumers
//! can rely on object identity.
//!
//! There is deliberately no process-wide factory. Construct one where your
//! application wires its dependencies and distribute it through
//! [`RepositoryProvider`](crate::provider::RepositoryProvider) or your own
//! state type. Construction never dials the database; pools are lazy and
//! credentials are first exercised by the first query.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{ConfigError, DatabaseKind, RepositoryFactoryConfig};
use crate::error::{RepositoryError, RepositoryOperation, RepositoryResult};
use crate::postgres::base::PgClients;
use crate::postgres::{
    PgCategoryRepository, PgFlashcardRepository, PgLearningCardRepository, PgPlanRepository,
    PgProgressRecordRepository, PgQuestionRepository, PgSectionRepository, PgTopicRepository,
    PgUserRepository,
};
use crate::repository::{
    DynCategoryRepository, DynFlashcardRepository, DynLearningCardRepository, DynPlanRepository,
    DynProgressRecordRepository, DynQuestionRepository, DynSectionRepository, DynTopicRepository,
    DynUserRepository,
};

/// Memoized adapter handles plus the client pair they are built over.
///
/// Everything in here is reconstructable from the factory config, which is
/// what [`RepositoryFactory::reset`] relies on.
#[derive(Default)]
struct Caches {
    clients: Option<Arc<PgClients>>,
    questions: Option<DynQuestionRepository>,
    users: Option<DynUserRepository>,
    plans: Option<DynPlanRepository>,
    learning_cards: Option<DynLearningCardRepository>,
    categories: Option<DynCategoryRepository>,
    topics: Option<DynTopicRepository>,
    sections: Option<DynSectionRepository>,
    flashcards: Option<DynFlashcardRepository>,
    progress_records: Option<DynProgressRecordRepository>,
}

/// Builds and memoizes repository adapters for one configured backing store.
pub struct RepositoryFactory {
    config: RepositoryFactoryConfig,
    caches: Mutex<Caches>,
}

impl RepositoryFactory {
    /// Creates a factory over `config`. Never fails: the underlying client
    /// pair is built lazily and connection problems surface from the first
    /// operation instead.
    pub fn new(config: RepositoryFactoryConfig) -> Self {
        Self {
            config,
            caches: Mutex::new(Caches::default()),
        }
    }

    /// Creates a factory from `LEARNLAB_DATABASE_*` environment variables.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingValue`] when `LEARNLAB_DATABASE_URL` or
    /// `LEARNLAB_DATABASE_KEY` is absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(RepositoryFactoryConfig::from_env()?))
    }

    /// The configuration this factory was built with.
    pub fn config(&self) -> &RepositoryFactoryConfig {
        &self.config
    }

    /// Drops every memoized adapter and the shared client pair, leaving the
    /// config untouched. The next getter call reconstructs from scratch.
    /// Intended for test isolation.
    pub fn reset(&self) {
        *self.lock() = Caches::default();
        tracing::debug!("repository caches cleared");
    }

    /// The question repository for the configured store.
    pub fn question_repository(&self) -> RepositoryResult<DynQuestionRepository> {
        self.cached(
            "question",
            |caches| &mut caches.questions,
            |clients| Arc::new(PgQuestionRepository::new(clients)),
        )
    }

    /// The user repository for the configured store.
    pub fn user_repository(&self) -> RepositoryResult<DynUserRepository> {
        self.cached(
            "user",
            |caches| &mut caches.users,
            |clients| Arc::new(PgUserRepository::new(clients)),
        )
    }

    /// The plan repository for the configured store.
    pub fn plan_repository(&self) -> RepositoryResult<DynPlanRepository> {
        self.cached(
            "plan",
            |caches| &mut caches.plans,
            |clients| Arc::new(PgPlanRepository::new(clients)),
        )
    }

    /// The learning-card repository for the configured store.
    pub fn learning_card_repository(&self) -> RepositoryResult<DynLearningCardRepository> {
        self.cached(
            "learning_card",
            |caches| &mut caches.learning_cards,
            |clients| Arc::new(PgLearningCardRepository::new(clients)),
        )
    }

    /// The category repository for the configured store.
    pub fn category_repository(&self) -> RepositoryResult<DynCategoryRepository> {
        self.cached(
            "category",
            |caches| &mut caches.categories,
            |clients| Arc::new(PgCategoryRepository::new(clients)),
        )
    }

    /// The topic repository for the configured store.
    pub fn topic_repository(&self) -> RepositoryResult<DynTopicRepository> {
        self.cached(
            "topic",
            |caches| &mut caches.topics,
            |clients| Arc::new(PgTopicRepository::new(clients)),
        )
    }

    /// The section repository for the configured store.
    pub fn section_repository(&self) -> RepositoryResult<DynSectionRepository> {
        self.cached(
            "section",
            |caches| &mut caches.sections,
            |clients| Arc::new(PgSectionRepository::new(clients)),
        )
    }

    /// The flashcard repository for the configured store.
    pub fn flashcard_repository(&self) -> RepositoryResult<DynFlashcardRepository> {
        self.cached(
            "flashcard",
            |caches| &mut caches.flashcards,
            |clients| Arc::new(PgFlashcardRepository::new(clients)),
        )
    }

    /// The progress-record repository for the configured store.
    pub fn progress_repository(&self) -> RepositoryResult<DynProgressRecordRepository> {
        self.cached(
            "progress_record",
            |caches| &mut caches.progress_records,
            |clients| Arc::new(PgProgressRecordRepository::new(clients)),
        )
    }

    /// Returns the memoized adapter in `slot`, constructing it on first
    /// access.
    ///
    /// Dispatches on the configured kind before touching the cache: the
    /// `mongodb` and `mysql` branches are structural extension points that
    /// always fail, and nothing is cached on that path, so a partially built
    /// adapter is never handed out. The lock is only ever held across
    /// synchronous construction, never across an await point.
    fn cached<R: ?Sized>(
        &self,
        entity: &'static str,
        slot: fn(&mut Caches) -> &mut Option<Arc<R>>,
        build: fn(Arc<PgClients>) -> Arc<R>,
    ) -> RepositoryResult<Arc<R>> {
        match self.config.kind {
            DatabaseKind::PostgreSql => {}
            kind => {
                return Err(RepositoryError::database(
                    RepositoryOperation::Configure,
                    format!("{kind} repositories are not implemented; configure the postgresql store"),
                )
                .with_entity(entity));
            }
        }

        let mut caches = self.lock();
        if let Some(existing) = slot(&mut caches) {
            return Ok(Arc::clone(existing));
        }
        let clients = caches
            .clients
            .get_or_insert_with(|| Arc::new(PgClients::connect(&self.config)))
            .clone();
        let repository = build(clients);
        *slot(&mut caches) = Some(Arc::clone(&repository));
        tracing::debug!(entity, kind = %self.config.kind, "constructed repository adapter");
        Ok(repository)
    }

    fn lock(&self) -> MutexGuard<'_, Caches> {
        // A panic while holding the lock leaves only reconstructable caches
        // behind, so a poisoned guard is still usable.
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryErrorKind;

    fn postgres_config() -> RepositoryFactoryConfig {
        RepositoryFactoryConfig::new("postgres://db.internal:5432/learnlab", "anon-key")
    }

    fn factory_of_kind(kind: DatabaseKind) -> RepositoryFactory {
        let mut config = postgres_config();
        config.kind = kind;
        RepositoryFactory::new(config)
    }

    #[tokio::test]
    async fn getters_memoize_per_entity() {
        let factory = RepositoryFactory::new(postgres_config());
        let first = factory.question_repository().unwrap();
        let second = factory.question_repository().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn reset_forces_reconstruction() {
        let factory = RepositoryFactory::new(postgres_config());
        let before = factory.question_repository().unwrap();
        factory.reset();
        let after = factory.question_repository().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        // The config survives the reset.
        assert_eq!(factory.config().url, postgres_config().url);
    }

    #[tokio::test]
    async fn factories_do_not_share_caches() {
        let a = RepositoryFactory::new(postgres_config());
        let b = RepositoryFactory::new(postgres_config());
        let from_a = a.question_repository().unwrap();
        let from_b = b.question_repository().unwrap();
        assert!(!Arc::ptr_eq(&from_a, &from_b));
    }

    #[tokio::test]
    async fn every_getter_constructs_for_postgresql() {
        let factory = RepositoryFactory::new(postgres_config());
        assert!(factory.question_repository().is_ok());
        assert!(factory.user_repository().is_ok());
        assert!(factory.plan_repository().is_ok());
        assert!(factory.learning_card_repository().is_ok());
        assert!(factory.category_repository().is_ok());
        assert!(factory.topic_repository().is_ok());
        assert!(factory.section_repository().is_ok());
        assert!(factory.flashcard_repository().is_ok());
        assert!(factory.progress_repository().is_ok());
    }

    #[test]
    fn unimplemented_kinds_error_without_caching() {
        for kind in [DatabaseKind::MongoDb, DatabaseKind::MySql] {
            let factory = factory_of_kind(kind);
            let err = factory.question_repository().err().unwrap();
            assert_eq!(err.kind, RepositoryErrorKind::Database);
            assert_eq!(err.operation, RepositoryOperation::Configure);
            assert!(err.message.contains("not implemented"));
            assert!(err.message.contains(kind.as_str()));
            // The branch stays an extension point: later calls dispatch again
            // rather than replaying a cached failure or a partial adapter.
            assert!(factory.question_repository().is_err());
        }
    }

    #[tokio::test]
    async fn from_env_builds_a_factory() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LEARNLAB_DATABASE_URL", "postgres://db.internal:5432/learnlab");
            jail.set_env("LEARNLAB_DATABASE_KEY", "anon-key");

            let factory = RepositoryFactory::from_env().expect("factory should build");
            assert_eq!(factory.config().kind, DatabaseKind::PostgreSql);
            assert!(factory.question_repository().is_ok());
            Ok(())
        });
    }

    #[test]
    fn from_env_fails_without_credentials() {
        figment::Jail::expect_with(|_jail| {
            assert!(RepositoryFactory::from_env().is_err());
            Ok(())
        });
    }
}
