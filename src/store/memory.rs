use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{Task, TaskListQuery, User};

/// Process-local store. Tasks are kept in insertion order, which is the
/// "natural order" of unsorted listings.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    tasks: RwLock<Vec<Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &HashMap<Uuid, User>, email: &str, except: Uuid) -> bool {
    users.values().any(|u| u.id != except && u.email == email)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if email_taken(&users, &user.email, user.id) {
            return Err(AppError::BadRequest("Email already registered".into()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn save_user(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(AppError::NotFound("User not found".into()));
        }
        if email_taken(&users, &user.email, user.id) {
            return Err(AppError::BadRequest("Email already registered".into()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id_and_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.get(&id).filter(|u| u.has_token(token)).cloned())
    }

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        // Lock order is always users, then tasks.
        let mut users = self.users.write().await;
        let removed = users.remove(&id);
        if removed.is_some() {
            self.tasks.write().await.retain(|t| t.owner != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: &Task) -> Result<(), AppError> {
        self.tasks.write().await.push(task.clone());
        Ok(())
    }

    async fn find_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .find(|t| t.id == id && t.owner == owner)
            .cloned())
    }

    async fn list_tasks(&self, owner: Uuid, query: &TaskListQuery) -> Result<Vec<Task>, AppError> {
        let tasks = self.tasks.read().await;
        Ok(query.apply(tasks.iter().filter(|t| t.owner == owner).cloned()))
    }

    async fn save_task(&self, task: &Task) -> Result<(), AppError> {
        let mut tasks = self.tasks.write().await;
        match tasks
            .iter_mut()
            .find(|t| t.id == task.id && t.owner == task.owner)
        {
            Some(slot) => {
                *slot = task.clone();
                Ok(())
            }
            None => Err(AppError::NotFound("Task not found".into())),
        }
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        let mut tasks = self.tasks.write().await;
        let position = tasks.iter().position(|t| t.id == id && t.owner == owner);
        Ok(position.map(|i| tasks.remove(i)))
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }
}
