//! Generic CRUD contract for entities without bespoke operations

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RepositoryResult;
use crate::query::{PaginatedResult, QueryOptions};

/// Plain create/read/update/delete contract.
///
/// Implemented for the catalog entities (categories, topics, sections,
/// flashcards, progress records), which need no operations beyond the shared
/// repository contract.
///
/// # Type Parameters
///
/// - `E`: the persisted entity returned from reads
/// - `C`: the creation payload (no id, no timestamps)
/// - `U`: the partial-update payload (every field optional)
#[async_trait]
pub trait CrudRepository<E, C, U>: Send + Sync {
    /// Inserts a new entity. The store assigns the id; the adapter stamps
    /// both timestamps and the entity's documented field defaults.
    async fn create(&self, data: C) -> RepositoryResult<E>;

    /// Looks up one entity. A missing id is `Ok(None)`, never an error.
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<E>>;

    /// Lists entities with pagination, ordering, and the dynamic filter map
    /// from [`QueryOptions::filters`].
    async fn find_all(&self, options: Option<&QueryOptions>)
        -> RepositoryResult<PaginatedResult<E>>;

    /// Patches the provided fields, refreshes `updated_at`, and returns the
    /// full post-update entity.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not exist.
    async fn update(&self, id: Uuid, data: U) -> RepositoryResult<E>;

    /// Hard-deletes the entity. Succeeds whether or not the row existed.
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;

    /// Exact number of persisted entities.
    async fn count(&self) -> RepositoryResult<u64>;

    /// Whether an entity with this id exists.
    async fn exists(&self, id: Uuid) -> RepositoryResult<bool>;
}
