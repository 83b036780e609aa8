use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::OrderStatus;
use crate::services::payfast::{client_ip, CheckoutForm, CheckoutRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct NotifyAck {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct NotifyReady {
    pub status: &'static str,
}

/// Reachability probe used by PayFast during merchant onboarding.
pub async fn payfast_notify_ready() -> Json<NotifyReady> {
    Json(NotifyReady { status: "ready" })
}

/// PayFast ITN endpoint.
///
/// Anything other than 200 makes the gateway retry, so only store failures
/// are allowed to surface as 5xx.
pub async fn payfast_notify(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<NotifyAck>> {
    let source_ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr.ip()));

    state.reconciler.process(source_ip, &body).await?;

    Ok(Json(NotifyAck { success: true }))
}

/// Build the signed form the browser posts to PayFast.
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<CheckoutForm>> {
    let order = state
        .orders
        .find(request.order_id.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", request.order_id)))?;

    if order.status != OrderStatus::Pending {
        return Err(AppError::Validation(format!(
            "Order {} is already {}",
            order.id, order.status
        )));
    }

    if order.total() != request.amount {
        return Err(AppError::Validation(format!(
            "Amount {} does not match order total {}",
            request.amount,
            order.total()
        )));
    }

    let form = state.checkout.generate(&request)?;

    Ok(Json(form))
}
