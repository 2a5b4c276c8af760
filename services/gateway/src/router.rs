use crate::handlers::{account, order, task};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/accounts", get(account::list_accounts).post(account::create_account))
        .route("/accounts/{currency}", get(account::get_account))
        .route("/accounts/{currency}/deposits", post(account::deposit))
        .route("/accounts/{currency}/withdrawals", post(account::withdraw))
        .route("/orders", get(order::list_orders).post(order::create_order))
        .route(
            "/orders/{id}",
            get(order::get_order).put(order::update_order).delete(order::cancel_order),
        )
        .route("/orders/{id}/approve", post(order::approve_order))
        .route("/orders/{id}/lock", post(order::lock_order))
        .route("/orders/{id}/unlock", post(order::unlock_order))
        .route("/offers/{pair}/{side}", get(order::offers))
        .route("/tasks/{id}", get(task::check_task));

    Router::new()
        .nest("/v1", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::USER_HEADER;
    use crate::config::GatewayConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use types::ids::UserId;

    fn app() -> Router {
        create_router(AppState::new(&GatewayConfig::default()))
    }

    async fn call(app: &Router, method: Method, uri: &str, user: UserId, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_HEADER, user.to_string());
        let body = match body {
            Some(body) => {
                request = request.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn funded_user(app: &Router, currency: &str, amount: &str) -> UserId {
        let user = UserId::new();
        for code in ["btc", "eth"] {
            let (status, _) = call(app, Method::POST, "/v1/accounts", user, Some(json!({ "currency": code }))).await;
            assert_eq!(status, StatusCode::CREATED);
        }
        let uri = format!("/v1/accounts/{currency}/deposits");
        let (status, _) = call(app, Method::POST, &uri, user, Some(json!({ "amount": amount }))).await;
        assert_eq!(status, StatusCode::CREATED);
        user
    }

    #[tokio::test]
    async fn test_orders_match_over_http() {
        let app = app();
        let buyer = funded_user(&app, "btc", "10").await;
        let seller = funded_user(&app, "eth", "20").await;

        let (status, placed) = call(
            &app,
            Method::POST,
            "/v1/orders",
            buyer,
            Some(json!({ "pair": "btc_eth", "type": "buy", "price": "0.5", "amount": "20" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(placed[0]["status"], "pending");

        let (_, offers) = call(&app, Method::GET, "/v1/offers/btc_eth/buy", seller, None).await;
        assert_eq!(offers.as_array().unwrap().len(), 1);

        let (status, history) = call(
            &app,
            Method::POST,
            "/v1/orders",
            seller,
            Some(json!({ "pair": "btc_eth", "type": "sell", "price": "0.5", "amount": "20" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(history.as_array().unwrap().last().unwrap()["status"], "completed");

        let (status, account) = call(&app, Method::GET, "/v1/accounts/eth", buyer, None).await;
        assert_eq!(status, StatusCode::OK);
        let balance = Decimal::from_str_exact(account["balance"].as_str().unwrap()).unwrap();
        assert_eq!(balance, Decimal::from(20));
    }

    #[tokio::test]
    async fn test_duplicate_account_conflicts_with_existing_attached() {
        let app = app();
        let user = UserId::new();
        call(&app, Method::POST, "/v1/accounts", user, Some(json!({ "currency": "btc" }))).await;

        let (status, body) = call(&app, Method::POST, "/v1/accounts", user, Some(json!({ "currency": "btc" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "ALREADY_EXISTS");
        assert_eq!(body["data"]["currency"], "btc");
    }

    #[tokio::test]
    async fn test_below_minimum_order_is_rejected() {
        let app = app();
        let user = funded_user(&app, "btc", "1").await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/v1/orders",
            user,
            Some(json!({ "pair": "btc_eth", "type": "buy", "price": "0.001", "amount": "1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_foreign_order_is_not_found() {
        let app = app();
        let owner = funded_user(&app, "btc", "10").await;
        let (_, placed) = call(
            &app,
            Method::POST,
            "/v1/orders",
            owner,
            Some(json!({ "pair": "btc_eth", "type": "buy", "price": "0.5", "amount": "2" })),
        )
        .await;
        let order_id = placed[0]["order_id"].as_str().unwrap().to_string();

        let (status, _) = call(&app, Method::GET, &format!("/v1/orders/{order_id}"), UserId::new(), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, canceled) = call(&app, Method::DELETE, &format!("/v1/orders/{order_id}"), owner, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(canceled["status"], "canceled");
    }

    #[tokio::test]
    async fn test_missing_caller_is_unauthorized() {
        let request = Request::builder().uri("/v1/accounts").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
