use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{Store, TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{Task, TaskListQuery, User};

const USER_COLUMNS: &str =
    "users.id, users.name, users.email, users.password_hash, users.age, users.avatar, users.created_at, users.updated_at";
const TASK_COLUMNS: &str = "id, description, completed, owner, created_at, updated_at";

/// Postgres-backed store. Session tokens live in their own table and are
/// folded back into [`User::tokens`] on every load.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// `LIMIT`/`OFFSET` operand. Never negative.
fn sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: Option<String>,
    email: String,
    password_hash: String,
    age: Option<i32>,
    avatar: Option<Vec<u8>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, tokens: Vec<String>) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            age: self.age,
            tokens,
            avatar: self.avatar,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the schema in `migrations/`.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn hydrate(&self, row: Option<UserRow>) -> Result<Option<User>, AppError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let tokens = sqlx::query_scalar::<_, String>(
            "SELECT token FROM user_tokens WHERE user_id = $1 ORDER BY seq",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(row.into_user(tokens)))
    }

    async fn write_tokens(
        tx: &mut Transaction<'_, Postgres>,
        user: &User,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_tokens WHERE user_id = $1")
            .bind(user.id)
            .execute(&mut **tx)
            .await?;
        for token in &user.tokens {
            sqlx::query("INSERT INTO user_tokens (user_id, token) VALUES ($1, $2)")
                .bind(user.id)
                .bind(token)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, age, avatar, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.age)
        .bind(&user.avatar)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await?;
        Self::write_tokens(&mut tx, user).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_user(&self, user: &User) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE users
             SET name = $2, email = $3, password_hash = $4, age = $5, avatar = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.age)
        .bind(&user.avatar)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }

        Self::write_tokens(&mut tx, user).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE users.id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        self.hydrate(row).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE users.email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        self.hydrate(row).await
    }

    async fn find_user_by_id_and_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users
             JOIN user_tokens ON user_tokens.user_id = users.id
             WHERE users.id = $1 AND user_tokens.token = $2
             LIMIT 1",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        self.hydrate(row).await
    }

    async fn delete_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let Some(user) = self.find_user_by_id(id).await? else {
            return Ok(None);
        };
        // Tokens and tasks go with the row through ON DELETE CASCADE.
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(Some(user))
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, task: &Task) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO tasks (id, description, completed, owner, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(task.id)
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.owner)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND owner = $2",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn list_tasks(&self, owner: Uuid, query: &TaskListQuery) -> Result<Vec<Task>, AppError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM tasks WHERE owner = ", TASK_COLUMNS));
        builder.push_bind(owner);

        if let Some(completed) = query.completed {
            builder.push(" AND completed = ").push_bind(completed);
        }

        match query.sort {
            // Column and keyword come from closed enums, never from user text.
            Some(sort) => builder.push(format!(
                " ORDER BY {} {}, seq",
                sort.field.column(),
                sort.direction.keyword()
            )),
            None => builder.push(" ORDER BY seq"),
        };

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(sql_count(limit));
        }
        if query.skip > 0 {
            builder.push(" OFFSET ").push_bind(sql_count(query.skip));
        }

        let tasks = builder
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn save_task(&self, task: &Task) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE tasks SET description = $3, completed = $4, updated_at = $5
             WHERE id = $1 AND owner = $2",
        )
        .bind(task.id)
        .bind(task.owner)
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Task not found".into()));
        }
        Ok(())
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "DELETE FROM tasks WHERE id = $1 AND owner = $2 RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }
}

impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }
}
