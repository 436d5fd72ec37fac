use actix_web::{web, HttpResponse, Responder};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthSession,
    error::AppError,
    models::{
        ensure_allowed_fields, task::ALLOWED_TASK_UPDATES, Task, TaskInput, TaskListQuery,
        TaskQuery, TaskUpdate,
    },
    state::AppState,
};

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

/// Path ids that are not UUIDs cannot name any task.
fn parse_task_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| task_not_found())
}

/// Retrieves the authenticated user's tasks.
///
/// ## Query Parameters:
/// - `completed` (optional): `true` for completed tasks, any other value for open ones.
/// - `sortBy` (optional): `field:dir`, e.g. `createdAt:desc`.
/// - `limit`, `skip` (optional): Paging. Non-numeric values are ignored.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Task` objects.
/// - `401 Unauthorized`: If the request lacks a valid session.
pub async fn get_tasks(
    state: web::Data<AppState>,
    session: AuthSession,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let query = TaskListQuery::from(query_params.into_inner());
    let tasks = state.store.list_tasks(session.user.id, &query).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task for the authenticated user.
///
/// The owner is always the caller; an `owner` key in the body is ignored.
///
/// ## Responses:
/// - `201 Created`: The new `Task`.
/// - `400 Bad Request`: Missing or blank description.
pub async fn create_task(
    state: web::Data<AppState>,
    session: AuthSession,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = Task::new(task_data.into_inner(), session.user.id);
    state.store.insert_task(&task).await?;

    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: The `Task`.
/// - `404 Not Found`: Unknown id, or the task belongs to another user.
pub async fn get_task(
    state: web::Data<AppState>,
    session: AuthSession,
    task_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let id = parse_task_id(&task_id)?;
    let task = state
        .store
        .find_task(session.user.id, id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(HttpResponse::Ok().json(task))
}

/// Updates `description` and/or `completed` of an owned task.
///
/// Keys outside that pair reject the whole patch before the store is touched.
///
/// ## Responses:
/// - `200 OK`: The updated `Task`.
/// - `400 Bad Request`: Disallowed keys or invalid values.
/// - `404 Not Found`: Unknown id, or the task belongs to another user.
pub async fn update_task(
    state: web::Data<AppState>,
    session: AuthSession,
    task_id: web::Path<String>,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let body = body.into_inner();
    ensure_allowed_fields(&body, &ALLOWED_TASK_UPDATES)?;

    let update: TaskUpdate = serde_json::from_value(Value::Object(body))
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    update.validate()?;

    let id = parse_task_id(&task_id)?;
    let mut task = state
        .store
        .find_task(session.user.id, id)
        .await?
        .ok_or_else(task_not_found)?;

    task.apply(update);
    state.store.save_task(&task).await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Deletes an owned task and returns it.
///
/// ## Responses:
/// - `200 OK`: The deleted `Task`.
/// - `404 Not Found`: Unknown id, or the task belongs to another user.
pub async fn delete_task(
    state: web::Data<AppState>,
    session: AuthSession,
    task_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let id = parse_task_id(&task_id)?;
    let task = state
        .store
        .delete_task(session.user.id, id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(HttpResponse::Ok().json(task))
}
