use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::middleware::Principal;
use crate::error::{AppError, AppResult};
use crate::models::{Money, NewOrder, OrderResponse, OrderStatus};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Order id must be 1-100 characters"))]
    pub id: Option<String>,
    pub total_amount: Money,
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub customer_email: Option<String>,
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<OrderResponse>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

    if !request.total_amount.is_positive() {
        return Err(AppError::Validation("Amount must be positive".to_string()));
    }

    let id = request
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    let order = state
        .orders
        .create(NewOrder {
            id,
            total: request.total_amount,
            customer_email: request.customer_email,
        })
        .await?;

    tracing::info!(order_id = %order.id, total = %order.total(), "Order created");

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// Order status for the checkout return pages, which may load before or
/// after the gateway's notification has arrived.
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<OrderResponse>> {
    let order = state
        .orders
        .find(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

    Ok(Json(order.into()))
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub count: usize,
}

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<OrderListResponse>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let orders: Vec<OrderResponse> = state
        .orders
        .list(status, limit)
        .await?
        .into_iter()
        .map(OrderResponse::from)
        .collect();

    tracing::debug!(admin = %principal.email, count = orders.len(), "Admin order listing");

    Ok(Json(OrderListResponse {
        count: orders.len(),
        orders,
    }))
}
