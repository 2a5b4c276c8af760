use super::{path_id, read, submit};
use crate::auth::Caller;
use crate::dispatcher::Reply;
use crate::error::AppError;
use crate::models::{CreateAccountPayload, DepositPayload, WithdrawalPayload};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use types::account::Account;
use types::currency::Currency;

/// `POST /accounts`
pub async fn create_account(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<CreateAccountPayload>,
) -> Reply {
    let owner = caller.user_id;
    submit(&state, "create_account", StatusCode::CREATED, move |exchange| {
        exchange.create_account(owner, payload.currency)
    })
    .await
}

/// `GET /accounts`
pub async fn list_accounts(State(state): State<AppState>, caller: Caller) -> Result<Json<Vec<Account>>, AppError> {
    let owner = caller.user_id;
    Ok(Json(read(&state, move |exchange| exchange.accounts(owner)).await?))
}

/// `GET /accounts/{currency}`
pub async fn get_account(
    State(state): State<AppState>,
    caller: Caller,
    Path(currency): Path<String>,
) -> Result<Json<Account>, AppError> {
    let currency: Currency = path_id("currency", &currency)?;
    let owner = caller.user_id;
    read(&state, move |exchange| exchange.account(owner, currency))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{currency} account")))
}

/// `POST /accounts/{currency}/deposits`
pub async fn deposit(
    State(state): State<AppState>,
    caller: Caller,
    Path(currency): Path<String>,
    Json(payload): Json<DepositPayload>,
) -> Result<Reply, AppError> {
    let currency: Currency = path_id("currency", &currency)?;
    let request = payload.into_request(currency)?;
    let owner = caller.user_id;
    Ok(submit(&state, "deposit", StatusCode::CREATED, move |exchange| exchange.deposit(owner, request)).await)
}

/// `POST /accounts/{currency}/withdrawals`
pub async fn withdraw(
    State(state): State<AppState>,
    caller: Caller,
    Path(currency): Path<String>,
    Json(payload): Json<WithdrawalPayload>,
) -> Result<Reply, AppError> {
    let currency: Currency = path_id("currency", &currency)?;
    let request = payload.into_request(currency)?;
    let owner = caller.user_id;
    Ok(submit(&state, "withdraw", StatusCode::CREATED, move |exchange| exchange.withdraw(owner, request)).await)
}
