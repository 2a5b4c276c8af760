//! Task dispatcher
//!
//! Every mutating call runs as a task on the blocking pool. `submit` waits a
//! bounded time for the outcome: a finished task answers directly, a slow
//! one answers 204 with its task id so the client can poll `check`.
//! Finished results nobody collects are dropped after the result TTL.

use std::time::{Duration, Instant};

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, error, warn};
use types::errors::ExchangeError;
use uuid::Uuid;

use crate::error::error_body;

/// Result of a finished task
pub type TaskOutcome = Result<Value, ExchangeError>;

/// Outcome plus the moment the worker produced it
#[derive(Debug, Clone)]
struct Finished {
    outcome: TaskOutcome,
    at: Instant,
}

type OutcomeReceiver = watch::Receiver<Option<Finished>>;

/// HTTP-shaped answer of `submit` and `check`
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
    /// Set while the task is still running
    pub task_id: Option<Uuid>,
}

impl Reply {
    fn running(task_id: Uuid) -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: json!({ "id": task_id, "status": "pending" }),
            task_id: Some(task_id),
        }
    }

    fn finished(outcome: TaskOutcome, success: StatusCode) -> Self {
        match outcome {
            Ok(body) => Self {
                status: success,
                body,
                task_id: None,
            },
            Err(err) => Self {
                status: StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body: exchange_error_body(&err),
                task_id: None,
            },
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(task_id) = self.task_id {
            if let Ok(value) = HeaderValue::from_str(&task_id.to_string()) {
                response.headers_mut().insert("x-task-id", value);
            }
        }
        response
    }
}

/// Error payload of a failed task; `AlreadyExists` carries the existing entity
pub fn exchange_error_body(err: &ExchangeError) -> Value {
    let mut body = error_body(err.code(), &err.to_string());
    if let ExchangeError::AlreadyExists(account) = err {
        body["data"] = json!(account);
    }
    body
}

/// Serialize a task result
pub fn to_json<T: Serialize>(value: &T) -> TaskOutcome {
    serde_json::to_value(value).map_err(|err| ExchangeError::Internal(format!("unserializable result: {err}")))
}

pub struct TaskDispatcher {
    tasks: DashMap<Uuid, OutcomeReceiver>,
    wait_timeout: Duration,
    poll_timeout: Duration,
    result_ttl: Duration,
}

impl TaskDispatcher {
    pub fn new(wait_timeout: Duration, poll_timeout: Duration, result_ttl: Duration) -> Self {
        Self {
            tasks: DashMap::new(),
            wait_timeout,
            poll_timeout,
            result_ttl,
        }
    }

    /// Tasks started but not yet collected
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn result_ttl(&self) -> Duration {
        self.result_ttl
    }

    /// Drop finished results older than the result TTL; returns how many went
    pub fn sweep(&self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, receiver| match &*receiver.borrow() {
            Some(finished) => finished.at.elapsed() < self.result_ttl,
            None => true,
        });
        let evicted = before.saturating_sub(self.tasks.len());
        if evicted > 0 {
            debug!(evicted, in_flight = self.tasks.len(), "Expired task results dropped");
        }
        evicted
    }

    /// Run `job` on a worker and wait up to the submit timeout for it.
    ///
    /// `success` is the status of a successful answer (200 or 201).
    pub async fn submit<F>(&self, operation: &'static str, success: StatusCode, job: F) -> Reply
    where
        F: FnOnce() -> TaskOutcome + Send + 'static,
    {
        self.sweep();
        let task_id = Uuid::now_v7();
        let (sender, receiver) = watch::channel(None);
        self.tasks.insert(task_id, receiver.clone());
        debug!(%task_id, operation, in_flight = self.in_flight(), "Task submitted");

        tokio::spawn(async move {
            let outcome = match tokio::task::spawn_blocking(job).await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    error!(%task_id, operation, error = %join_err, "Task aborted");
                    Err(ExchangeError::Internal(format!("task {task_id} aborted")))
                }
            };
            if let Err(err) = &outcome {
                warn!(%task_id, operation, code = err.code(), error = %err, "Task failed");
            }
            sender.send_replace(Some(Finished {
                outcome,
                at: Instant::now(),
            }));
        });

        match wait_outcome(receiver, self.wait_timeout).await {
            Some(outcome) => {
                self.tasks.remove(&task_id);
                Reply::finished(outcome, success)
            }
            None => Reply::running(task_id),
        }
    }

    /// Poll a task started by `submit`.
    ///
    /// 200 with the result once finished (failures included, as an error
    /// body), 204 while running, 404 for an unknown or already collected id.
    pub async fn check(&self, task_id: Uuid) -> Reply {
        self.sweep();
        let Some(receiver) = self.tasks.get(&task_id).map(|entry| entry.value().clone()) else {
            return Reply {
                status: StatusCode::NOT_FOUND,
                body: error_body("NOT_FOUND", &format!("no task {task_id}")),
                task_id: None,
            };
        };

        match wait_outcome(receiver, self.poll_timeout).await {
            Some(outcome) => {
                self.tasks.remove(&task_id);
                let body = match outcome {
                    Ok(result) => json!({ "id": task_id, "status": "success", "result": result }),
                    Err(err) => {
                        let mut body = exchange_error_body(&err);
                        body["id"] = json!(task_id);
                        body["status"] = json!("failure");
                        body
                    }
                };
                Reply {
                    status: StatusCode::OK,
                    body,
                    task_id: None,
                }
            }
            None => Reply::running(task_id),
        }
    }
}

async fn wait_outcome(mut receiver: OutcomeReceiver, timeout: Duration) -> Option<TaskOutcome> {
    match tokio::time::timeout(timeout, receiver.wait_for(Option::is_some)).await {
        Ok(Ok(finished)) => finished.as_ref().map(|finished| finished.outcome.clone()),
        _ => None,
    }
}
