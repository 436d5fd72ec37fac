//! Persistence boundary.
//!
//! Handlers never talk to a database directly. They go through [`Store`], which
//! is implemented by an in-memory backend (development and tests) and a Postgres
//! backend. Every task operation takes the owner's id and only ever sees that
//! owner's rows.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::verify_password;
use crate::error::AppError;
use crate::models::{normalize_email, Task, TaskListQuery, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new user. Fails with `BadRequest` if the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    /// Overwrites an existing user, token list included.
    async fn save_user(&self, user: &User) -> Result<(), AppError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Looks a user up by normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Returns the user only if `token` is among its active tokens.
    async fn find_user_by_id_and_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<Option<User>, AppError>;

    /// Removes the user and every task it owns.
    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Resolves login credentials.
    ///
    /// Unknown email and wrong password both fail with `AuthFailed`.
    async fn find_by_credentials(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::AuthFailed)?;

        if verify_password(password, &user.password_hash)? {
            Ok(user)
        } else {
            Err(AppError::AuthFailed)
        }
    }
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: &Task) -> Result<(), AppError>;

    /// `None` both when the task is missing and when someone else owns it.
    async fn find_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, AppError>;

    async fn list_tasks(&self, owner: Uuid, query: &TaskListQuery) -> Result<Vec<Task>, AppError>;

    /// Writes back a task previously obtained through `find_task`.
    /// The write is scoped by `task.owner`.
    async fn save_task(&self, task: &Task) -> Result<(), AppError>;

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, AppError>;
}

pub trait Store: UserStore + TaskStore {
    /// Short backend name reported by the health endpoint.
    fn backend(&self) -> &'static str;
}
