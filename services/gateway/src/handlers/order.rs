use super::{path_id, read, submit};
use crate::auth::Caller;
use crate::dispatcher::Reply;
use crate::error::AppError;
use crate::models::{CreateOrderPayload, OffersQuery, OrdersQuery, UpdateOrderPayload};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use matching_engine::Offer;
use types::currency::Pair;
use types::ids::OrderId;
use types::order::{Order, Side};

/// `POST /orders`; answers with the completed fragments followed by the
/// order's final state
pub async fn create_order(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<Reply, AppError> {
    let request = payload.into_request()?;
    let owner = caller.user_id;
    Ok(submit(&state, "create_order", StatusCode::CREATED, move |exchange| {
        exchange.create_order(owner, request)
    })
    .await)
}

/// `GET /orders?pair=&type=`
pub async fn list_orders(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let owner = caller.user_id;
    let orders = read(&state, move |exchange| exchange.orders(owner, query.pair, query.side)).await?;
    Ok(Json(orders))
}

/// `GET /orders/{id}`
pub async fn get_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let order_id: OrderId = path_id("order", &order_id)?;
    let owner = caller.user_id;
    read(&state, move |exchange| exchange.order(owner, order_id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))
}

/// `PUT /orders/{id}`
pub async fn update_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<String>,
    Json(payload): Json<UpdateOrderPayload>,
) -> Result<Reply, AppError> {
    let order_id: OrderId = path_id("order", &order_id)?;
    let request = payload.into_request()?;
    let owner = caller.user_id;
    Ok(submit(&state, "update_order", StatusCode::OK, move |exchange| {
        exchange.update_order(owner, order_id, request)
    })
    .await)
}

/// `DELETE /orders/{id}`; a vanished order answers `null`
pub async fn cancel_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<String>,
) -> Result<Reply, AppError> {
    let order_id: OrderId = path_id("order", &order_id)?;
    let owner = caller.user_id;
    Ok(submit(&state, "cancel_order", StatusCode::OK, move |exchange| {
        exchange.cancel_order(owner, order_id)
    })
    .await)
}

/// `POST /orders/{id}/approve`
pub async fn approve_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<String>,
) -> Result<Reply, AppError> {
    let order_id: OrderId = path_id("order", &order_id)?;
    let owner = caller.user_id;
    Ok(submit(&state, "approve_order", StatusCode::OK, move |exchange| {
        exchange.approve_order(owner, order_id)
    })
    .await)
}

/// `POST /orders/{id}/lock`
pub async fn lock_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<String>,
) -> Result<Reply, AppError> {
    let order_id: OrderId = path_id("order", &order_id)?;
    let owner = caller.user_id;
    Ok(submit(&state, "lock_order", StatusCode::OK, move |exchange| {
        exchange.lock_order(owner, order_id)
    })
    .await)
}

/// `POST /orders/{id}/unlock`
pub async fn unlock_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<String>,
) -> Result<Reply, AppError> {
    let order_id: OrderId = path_id("order", &order_id)?;
    let owner = caller.user_id;
    Ok(submit(&state, "unlock_order", StatusCode::OK, move |exchange| {
        exchange.unlock_order(owner, order_id)
    })
    .await)
}

/// `GET /offers/{pair}/{side}?depth=`
pub async fn offers(
    State(state): State<AppState>,
    Path((pair, side)): Path<(String, String)>,
    Query(query): Query<OffersQuery>,
) -> Result<Json<Vec<Offer>>, AppError> {
    let pair: Pair = path_id("pair", &pair)?;
    let side = match side.to_ascii_lowercase().as_str() {
        "buy" => Side::BUY,
        "sell" => Side::SELL,
        _ => return Err(AppError::NotFound(format!("side '{side}'"))),
    };
    let offers = read(&state, move |exchange| exchange.offers(pair, side, query.depth)).await?;
    Ok(Json(offers))
}
