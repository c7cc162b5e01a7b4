//! Storage seam. Services only ever see these traits; `AppState` picks the
//! backend at startup.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{session::Session, todo::Todo, user::User},
};

pub mod memory;
pub mod session;
pub mod todo;
pub mod user;

/// Persists accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Stores a new user. Fails with `AppError::DuplicateEmail` if the email is taken.
    async fn insert(&self, user: &User) -> Result<()>;

    /// Looks up the user a resolved session points at.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Looks up a user by email, compared exactly as submitted.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// Persists todo records. Ownership is enforced by the todo service, not here.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn insert(&self, todo: &Todo) -> Result<()>;

    /// All todos owned by `owner_id`, oldest first.
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Todo>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Todo>>;

    /// Overwrites the mutable fields of an existing todo. Returns `false` if
    /// the record was gone by the time of the write.
    async fn update(&self, todo: &Todo) -> Result<bool>;

    /// Returns `false` if there was nothing to delete.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Maps session keys (token digests) to sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, key: &str, session: &Session) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<Session>>;

    /// Removing a key that does not exist is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Drops expired sessions and returns how many went. Backends with native
    /// expiry return 0.
    async fn purge_expired(&self) -> Result<usize>;
}
