use std::net::SocketAddr;
use std::sync::Arc;

use storefront_payments::{
    api::create_router,
    api::middleware::logging::init_tracing,
    config::Config,
    db::{create_pool, run_migrations, InMemoryOrderStore, OrderStore, PgOrderStore},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_tracing(config.environment.is_production());

    tracing::info!(
        environment = ?config.environment,
        sandbox = config.payfast.sandbox,
        "Starting storefront payments v{}",
        env!("CARGO_PKG_VERSION")
    );

    let orders: Arc<dyn OrderStore> = if config.database.url.is_some() {
        let db_pool = create_pool(&config.database).await?;
        run_migrations(&db_pool).await?;
        Arc::new(PgOrderStore::new((*db_pool).clone()))
    } else {
        tracing::warn!("DATABASE_URL not set, orders are kept in memory and lost on restart");
        Arc::new(InMemoryOrderStore::new())
    };

    if config.payfast.merchant_id.is_none() || config.payfast.merchant_key.is_none() {
        tracing::warn!("PayFast merchant credentials missing, checkout will fail until configured");
    }

    let state = AppState::new(config.clone(), orders)?;

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("PayFast notify URL: {}/api/payfast/notify", config.server.public_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
