use super::path_id;
use crate::dispatcher::Reply;
use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use uuid::Uuid;

/// `GET /tasks/{id}`
pub async fn check_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Reply, AppError> {
    let task_id: Uuid = path_id("task", &task_id)?;
    Ok(state.dispatcher.check(task_id).await)
}
