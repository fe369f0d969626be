//! The command API: a minimal `axum` HTTP router over the [`crate::engine::Engine`].

pub mod dto;
pub mod error;
pub mod extract;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::engine::Engine;
use crate::repository::{OrderFilter, TradeFilter};
use crate::snapshot::SnapshotService;
use crate::ws::ws_handler;

use dto::{
    order_id, trade_id, CancelOrderResponse, ListOrdersQuery, ModifyOrderRequest, ModifyOrderResponse,
    OrderResponse, PageResponse, PaginationQuery, PlaceOrderRequest, PlaceOrderResponse, SnapshotQuery,
    TradeResponse,
};
use error::ApiError;
use extract::ValidatedJson;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The serializing command coordinator.
    pub engine: Engine,
    /// Depth-N views and the push fan-out.
    pub snapshot: Arc<SnapshotService>,
}

/// Builds the full HTTP/WebSocket router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(place_order).get(list_orders))
        .route("/orders/{id}", get(get_order).patch(modify_order).delete(cancel_order))
        .route("/trades", get(list_trades))
        .route("/trades/{id}/settle", post(settle_trade))
        .route("/snapshot", get(get_snapshot))
        .route("/stream", get(ws_handler))
        .with_state(state)
}

async fn place_order(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<PlaceOrderRequest>,
) -> Result<Json<PlaceOrderResponse>, ApiError> {
    let (user_id, side, price, quantity) = request.parse()?;
    let result = state.engine.place(user_id, side, price, quantity).await?;
    Ok(Json(result.into()))
}

async fn modify_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ModifyOrderRequest>,
) -> Result<Json<ModifyOrderResponse>, ApiError> {
    let new_price = crate::price::Price::parse_decimal(&request.new_price)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let result = state.engine.modify(order_id(id), new_price).await?;
    Ok(Json(result.into()))
}

async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelOrderResponse>, ApiError> {
    let result = state.engine.cancel(order_id(id)).await?;
    Ok(Json(result.into()))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.engine.get_order(order_id(id))?;
    Ok(Json(order.into()))
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<PageResponse<OrderResponse>>, ApiError> {
    let pagination = query.pagination.into_pagination()?;
    let filter = OrderFilter {
        status: query.status,
        side: query.side,
        user_id: query.user_id.map(crate::order::UserId),
    };
    let page = state.engine.list_orders(filter, pagination);
    Ok(Json(page.into()))
}

async fn list_trades(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PageResponse<TradeResponse>>, ApiError> {
    let pagination = query.into_pagination()?;
    let page = state.engine.list_trades(TradeFilter::default(), pagination);
    Ok(Json(page.into()))
}

async fn settle_trade(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TradeResponse>, ApiError> {
    let trade = state.engine.settle_trade(trade_id(id))?;
    Ok(Json(trade.into()))
}

async fn get_snapshot(
    State(state): State<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<crate::snapshot::Snapshot>, ApiError> {
    let depth = query.depth.unwrap_or(5);
    if !(crate::snapshot::MIN_DEPTH..=crate::snapshot::MAX_DEPTH).contains(&depth) {
        return Err(ApiError::Validation(format!(
            "depth must be in {}..={}",
            crate::snapshot::MIN_DEPTH,
            crate::snapshot::MAX_DEPTH
        )));
    }
    Ok(Json(state.snapshot.snapshot(depth)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        let repo: Arc<dyn crate::repository::Repository> = Arc::new(InMemoryRepository::new());
        let engine = Engine::spawn(Arc::clone(&repo), 16);
        let snapshot = Arc::new(SnapshotService::new(repo, 5, 5));
        router(AppState { engine, snapshot })
    }

    #[tokio::test]
    async fn place_order_returns_201_equivalent_ok_body() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/orders")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "user_id": Uuid::new_v4(),
                            "side": "buy",
                            "price": "100.00",
                            "quantity": 5
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_side_is_bad_request() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/orders")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "user_id": Uuid::new_v4(),
                            "side": "both",
                            "price": "100.00",
                            "quantity": 5
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_json_body_is_bad_request_with_error_envelope() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/orders")
                    .header("content-type", "application/json")
                    .body(Body::from("{ not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed.get("error").is_some());
    }

    #[tokio::test]
    async fn missing_field_json_body_is_bad_request_with_error_envelope() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/orders")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "user_id": Uuid::new_v4(),
                            "side": "buy",
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed.get("error").is_some());
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri(format!("/orders/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
