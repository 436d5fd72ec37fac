pub mod task;
pub mod user;

pub use task::{SortDirection, SortField, Task, TaskInput, TaskListQuery, TaskQuery, TaskSort, TaskUpdate};
pub use user::{normalize_email, User, UserUpdate};

use serde_json::{Map, Value};
use validator::ValidationError;

use crate::error::AppError;

/// Rejects a patch body if any key falls outside `allowed`.
///
/// Runs before any store access, so a partly-valid patch changes nothing.
pub fn ensure_allowed_fields(body: &Map<String, Value>, allowed: &[&str]) -> Result<(), AppError> {
    if body.keys().all(|key| allowed.contains(&key.as_str())) {
        Ok(())
    } else {
        Err(AppError::InvalidFields("Invalid updates!".into()))
    }
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
