use crate::error::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::str::FromStr;
use types::ids::UserId;

/// Header carrying the already-authenticated caller, set by the edge proxy
pub const USER_HEADER: &str = "x-user-id";

/// The user a request acts for
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {USER_HEADER} header")))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid header string".into()))?;

        let user_id = UserId::from_str(raw.trim())
            .map_err(|e| AppError::Unauthorized(format!("Invalid user id: {e}")))?;

        Ok(Caller { user_id })
    }
}
