use axum::extract::{Path, State};
use axum::{http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::WithRejection;
use tracing::info;

use crate::error::AppError;
use crate::id::TodoId;
use crate::middleware::Auth;
use crate::models::{NewTodo, Todo, TodoPatch};
use crate::AppState;

pub async fn list_all_todos(
    _auth: Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Todo>>, AppError> {
    let todos = state.todos.list()?;
    info!(count = todos.len(), "Listed todos");
    Ok(Json(todos))
}

pub async fn create_new_todo(
    _auth: Auth,
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<NewTodo>, AppError>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name cannot be empty"));
    }

    let todo = state.todos.insert(req)?;
    info!(id = %todo.id, name = %todo.name, "Created todo");
    Ok((StatusCode::CREATED, Json(todo)))
}

pub async fn get_single_todo(
    _auth: Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, AppError> {
    let id: TodoId = id.parse()?;
    Ok(Json(state.todos.get(id)?))
}

pub async fn update_existing_todo(
    _auth: Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(patch), _): WithRejection<Json<TodoPatch>, AppError>,
) -> Result<Json<Todo>, AppError> {
    let id: TodoId = id.parse()?;
    if let Some(ref name) = patch.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty"));
        }
    }

    let todo = state.todos.update(id, patch)?;
    info!(id = %todo.id, status = ?todo.status, "Updated todo");
    Ok(Json(todo))
}

pub async fn delete_existing_todo(
    _auth: Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id: TodoId = id.parse()?;
    state.todos.delete(id)?;
    info!(%id, "Deleted todo");
    Ok(StatusCode::NO_CONTENT)
}
