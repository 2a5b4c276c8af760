pub mod account;
pub mod order;
pub mod task;

use crate::dispatcher::{Reply, to_json};
use crate::error::AppError;
use crate::state::AppState;
use axum::http::StatusCode;
use matching_engine::Exchange;
use serde::Serialize;
use std::str::FromStr;
use types::errors::ExchangeError;

/// Parse a path segment, answering 404 for ids that can't exist
fn path_id<T: FromStr>(kind: &str, raw: &str) -> Result<T, AppError> {
    T::from_str(raw).map_err(|_| AppError::NotFound(format!("{kind} '{raw}'")))
}

/// Run a mutating exchange call through the task dispatcher
async fn submit<T, F>(state: &AppState, operation: &'static str, success: StatusCode, call: F) -> Reply
where
    T: Serialize,
    F: FnOnce(&Exchange) -> Result<T, ExchangeError> + Send + 'static,
{
    let exchange = state.exchange.clone();
    state
        .dispatcher
        .submit(operation, success, move || call(&exchange).and_then(|value| to_json(&value)))
        .await
}

/// Run a read off the async workers; row reads may wait on a row lock
async fn read<T, F>(state: &AppState, call: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&Exchange) -> T + Send + 'static,
{
    let exchange = state.exchange.clone();
    tokio::task::spawn_blocking(move || call(&exchange))
        .await
        .map_err(|e| AppError::InternalError(e.into()))
}
