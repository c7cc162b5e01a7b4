use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        todo::{Todo, TodoPatch},
        user::Identity,
    },
    state::AppState,
    validation::todo::normalize_title,
};

/// Looks a todo up and checks that `caller` owns it.
///
/// Missing ids are `NotFound`; someone else's todo is `Unauthorized`.
async fn find_owned(state: &AppState, caller: &Identity, todo_id: Uuid) -> Result<Todo> {
    let todo = state
        .todos
        .find_by_id(todo_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if todo.owner_id != caller.id {
        tracing::warn!(
            "❌ User {} tried to touch todo {} owned by someone else",
            caller.id,
            todo_id
        );
        return Err(AppError::Unauthorized);
    }

    Ok(todo)
}

/// Lists the caller's todos, oldest first.
pub async fn list(state: &AppState, caller: &Identity) -> Result<Vec<Todo>> {
    state.todos.find_by_owner(caller.id).await
}

/// Creates a todo owned by the caller.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `caller` - The resolved identity of the requester.
/// * `title` - The title as submitted; blank titles are rejected.
///
/// # Returns
///
/// A `Result` containing the created `Todo`.
pub async fn create(state: &AppState, caller: &Identity, title: &str) -> Result<Todo> {
    let title = normalize_title(title)?;
    let todo = Todo::new(title, caller.id);

    state.todos.insert(&todo).await?;

    tracing::info!("✅ Todo {} created for user {}", todo.id, caller.id);
    Ok(todo)
}

/// Fetches one of the caller's todos.
pub async fn get(state: &AppState, caller: &Identity, todo_id: Uuid) -> Result<Todo> {
    find_owned(state, caller, todo_id).await
}

/// Applies a merge-patch to one of the caller's todos.
///
/// Fields missing from `patch` keep their current values.
pub async fn update(
    state: &AppState,
    caller: &Identity,
    todo_id: Uuid,
    patch: TodoPatch,
) -> Result<Todo> {
    let patch = TodoPatch {
        title: patch.title.as_deref().map(normalize_title).transpose()?,
        completed: patch.completed,
    };

    let mut todo = find_owned(state, caller, todo_id).await?;
    todo.apply(patch);
    if !state.todos.update(&todo).await? {
        tracing::warn!("❌ Todo {} vanished before it could be updated", todo_id);
        return Err(AppError::NotFound);
    }

    tracing::debug!("Todo {} updated", todo.id);
    Ok(todo)
}

/// Deletes one of the caller's todos. A second delete of the same id is `NotFound`.
pub async fn delete(state: &AppState, caller: &Identity, todo_id: Uuid) -> Result<()> {
    let todo = find_owned(state, caller, todo_id).await?;

    if !state.todos.delete(todo.id).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!("✅ Todo {} deleted by user {}", todo_id, caller.id);
    Ok(())
}
