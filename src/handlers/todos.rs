use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::Response,
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    handlers::common::{json_response, JsonOrForm, MessageResponse},
    models::{todo::TodoPatch, user::Identity},
    services::todos as todo_service,
    state::AppState,
};

/// The request payload for creating a todo.
#[derive(Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
}

/// Turns a malformed `{id}` segment into a 400 instead of axum's plain-text rejection.
fn todo_id(path: std::result::Result<Path<Uuid>, PathRejection>) -> Result<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::Validation("Invalid todo id".to_string()))
}

/// Lists the caller's todos.
#[axum::debug_handler]
pub async fn list_todos(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
) -> Result<Response> {
    let todos = todo_service::list(&state, &caller).await?;
    tracing::debug!("📋 Listed {} todos for user {}", todos.len(), caller.id);
    json_response(StatusCode::OK, &todos)
}

/// Creates a todo for the caller.
#[axum::debug_handler]
pub async fn create_todo(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    JsonOrForm(payload): JsonOrForm<CreateTodoRequest>,
) -> Result<Response> {
    let todo = todo_service::create(&state, &caller, &payload.title).await?;
    json_response(StatusCode::CREATED, &todo)
}

#[axum::debug_handler]
pub async fn get_todo(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Response> {
    let todo = todo_service::get(&state, &caller, todo_id(path)?).await?;
    json_response(StatusCode::OK, &todo)
}

/// Applies a partial update. Omitted fields are left alone.
#[axum::debug_handler]
pub async fn update_todo(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    JsonOrForm(patch): JsonOrForm<TodoPatch>,
) -> Result<Response> {
    let todo = todo_service::update(&state, &caller, todo_id(path)?, patch).await?;
    json_response(StatusCode::OK, &todo)
}

#[axum::debug_handler]
pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(caller): Extension<Identity>,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Response> {
    todo_service::delete(&state, &caller, todo_id(path)?).await?;
    json_response(StatusCode::OK, &MessageResponse::ok("Todo deleted"))
}
