//! User repository contract

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{
    CreateUser, UpdateUser, UpdateUserPreferences, UpdateUserProgress, User, UserPreferences,
    UserProgress, UserRole, UserStatistics,
};
use crate::error::RepositoryResult;
use crate::query::{PaginatedResult, QueryOptions};

/// Data-access contract for accounts and their progress/preferences
/// sub-resources.
///
/// Progress and preferences are one-row-per-user records maintained through
/// upserts: reads of a missing row return the documented default record, and
/// updates never create a second row for the same user.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user. New accounts start active, unverified, and with the
    /// `user` role unless another is given.
    ///
    /// # Errors
    ///
    /// `Duplicate` when the email is already registered.
    async fn create(&self, data: CreateUser) -> RepositoryResult<User>;

    /// Looks up one user. A missing id is `Ok(None)`, never an error.
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>>;

    /// Looks up a user by exact email.
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// Looks up a user by exact email, matching only admin accounts.
    async fn find_admin_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// Lists users with pagination and ordering.
    async fn find_all(
        &self,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<User>>;

    /// Lists users holding one role.
    async fn find_by_role(
        &self,
        role: UserRole,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<User>>;

    /// Case-insensitive substring search over email and name fields.
    async fn search(
        &self,
        query: &str,
        options: Option<&QueryOptions>,
    ) -> RepositoryResult<PaginatedResult<User>>;

    /// Patches the provided fields and returns the post-update user.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not exist; `Duplicate` when an email
    /// change collides with another account.
    async fn update(&self, id: Uuid, data: UpdateUser) -> RepositoryResult<User>;

    /// Stamps `last_login_at = now`. A missing id is a silent no-op.
    async fn update_last_login(&self, id: Uuid) -> RepositoryResult<()>;

    /// Marks the email as verified and returns the post-update user.
    async fn verify_email(&self, id: Uuid) -> RepositoryResult<User>;

    /// Deactivates the account and returns the post-update user.
    async fn deactivate(&self, id: Uuid) -> RepositoryResult<User>;

    /// Reactivates the account and returns the post-update user.
    async fn activate(&self, id: Uuid) -> RepositoryResult<User>;

    /// Hard-deletes the user. Succeeds whether or not the row existed.
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;

    /// The user's cumulative progress; a user with no persisted progress
    /// reads as [`UserProgress::default_for`], never as an error.
    async fn get_progress(&self, user_id: Uuid) -> RepositoryResult<UserProgress>;

    /// Upserts the user's progress row on `user_id`, patching the provided
    /// fields and refreshing `last_activity_at`.
    async fn update_progress(
        &self,
        user_id: Uuid,
        data: UpdateUserProgress,
    ) -> RepositoryResult<UserProgress>;

    /// The user's preferences; missing rows read as
    /// [`UserPreferences::default_for`].
    async fn get_preferences(&self, user_id: Uuid) -> RepositoryResult<UserPreferences>;

    /// Upserts the user's preferences row on `user_id`.
    async fn update_preferences(
        &self,
        user_id: Uuid,
        data: UpdateUserPreferences,
    ) -> RepositoryResult<UserPreferences>;

    /// Dashboard statistics derived from the progress record.
    async fn get_user_statistics(&self, user_id: Uuid) -> RepositoryResult<UserStatistics>;

    /// Exact number of users.
    async fn count(&self) -> RepositoryResult<u64>;

    /// Exact number of active users.
    async fn count_active(&self) -> RepositoryResult<u64>;

    /// Whether a user with this id exists.
    async fn exists(&self, id: Uuid) -> RepositoryResult<bool>;

    /// Whether any account is registered under this exact email.
    async fn email_exists(&self, email: &str) -> RepositoryResult<bool>;
}
