use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use std::time::Duration;

use crate::api::handlers;
use crate::api::middleware::{admin_guard, rate_limit_by_ip, request_logging};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(handlers::health_check));

    // Gateway callbacks are authenticated by source address and signature,
    // and never rate limited.
    let webhook_routes = Router::new().route(
        "/api/payfast/notify",
        get(handlers::payfast_notify_ready).post(handlers::payfast_notify),
    );

    // Storefront routes
    let storefront_routes = Router::new()
        .route("/api/payfast/checkout", post(handlers::create_checkout))
        .route("/api/orders", post(handlers::create_order))
        .route("/api/orders/:order_id", get(handlers::get_order))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit_by_ip));

    // Back-office routes
    let admin_routes = Router::new()
        .route("/api/admin/orders", get(handlers::list_orders))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_guard));

    Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        .merge(storefront_routes)
        .merge(admin_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(middleware::from_fn(request_logging))
        .with_state(state)
}
