use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Keys a client may send to `PATCH /tasks/{id}`.
pub const ALLOWED_TASK_UPDATES: [&str; 2] = ["description", "completed"];

/// Represents a task entity as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    pub description: String,
    pub completed: bool,
    /// The user who created the task. Fixed for the task's lifetime.
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input structure for creating a task.
///
/// Unknown keys (including any `owner`) are ignored; the owner always comes
/// from the authenticated session.
#[derive(Debug, Deserialize, Validate)]
pub struct TaskInput {
    #[validate(custom = "crate::models::not_blank")]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

/// Fields accepted by `PATCH /tasks/{id}`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(custom = "crate::models::not_blank")]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl Task {
    /// Creates a new `Task` owned by `owner`.
    pub fn new(input: TaskInput, owner: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: input.description.trim().to_string(),
            completed: input.completed,
            owner,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: TaskUpdate) {
        if let Some(description) = update.description {
            self.description = description.trim().to_string();
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        self.updated_at = Utc::now();
    }
}

/// Raw query string of `GET /tasks`.
///
/// Everything arrives as text; [`TaskListQuery`] holds the interpreted form.
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub completed: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Description,
    Completed,
}

impl SortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "createdAt" | "created_at" => Some(SortField::CreatedAt),
            "updatedAt" | "updated_at" => Some(SortField::UpdatedAt),
            "description" => Some(SortField::Description),
            "completed" => Some(SortField::Completed),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Description => "description",
            SortField::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl TaskSort {
    /// Parses `field:dir`. Anything other than `desc` sorts ascending.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(2, ':');
        let field = SortField::parse(parts.next()?.trim())?;
        let direction = match parts.next().map(str::trim) {
            Some("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        Some(Self { field, direction })
    }

    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let ordering = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Description => a.description.cmp(&b.description),
            SortField::Completed => a.completed.cmp(&b.completed),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Paging values are capped here so every backend can bind them as a
/// signed 64-bit integer.
const MAX_PAGE_COUNT: usize = i64::MAX as usize;

/// Reads a `limit`/`skip` value. Digit strings too large for `usize`
/// saturate; anything else is ignored.
fn parse_count(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(raw.parse::<usize>().unwrap_or(usize::MAX).min(MAX_PAGE_COUNT))
}

/// Filter, sort and paging applied when listing a user's tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub completed: Option<bool>,
    pub sort: Option<TaskSort>,
    /// `None` means no cap.
    pub limit: Option<usize>,
    pub skip: usize,
}

impl From<TaskQuery> for TaskListQuery {
    fn from(query: TaskQuery) -> Self {
        Self {
            completed: query
                .completed
                .filter(|c| !c.is_empty())
                .map(|c| c == "true"),
            sort: query.sort_by.as_deref().and_then(TaskSort::parse),
            limit: query
                .limit
                .as_deref()
                .and_then(parse_count)
                .filter(|&l| l > 0),
            skip: query.skip.as_deref().and_then(parse_count).unwrap_or(0),
        }
    }
}

impl TaskListQuery {
    /// Applies this query to an owner's tasks held in natural order.
    pub fn apply(&self, tasks: impl Iterator<Item = Task>) -> Vec<Task> {
        let mut matched: Vec<Task> = tasks
            .filter(|t| self.completed.map_or(true, |c| t.completed == c))
            .collect();
        if let Some(sort) = &self.sort {
            matched.sort_by(|a, b| sort.compare(a, b));
        }
        let page = matched.into_iter().skip(self.skip);
        match self.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }
}
