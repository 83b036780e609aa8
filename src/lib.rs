pub mod api;
pub mod config;
pub mod crypto_utils;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

use std::sync::Arc;

use api::middleware::{AuthorizationPolicy, EmailAllowList, IpRateLimiter};
use config::Config;
use db::OrderStore;
use error::AppResult;
use services::{ItnReconciler, PayFastCheckout};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orders: Arc<dyn OrderStore>,
    pub checkout: Arc<PayFastCheckout>,
    pub reconciler: Arc<ItnReconciler>,
    pub policy: Arc<dyn AuthorizationPolicy>,
    pub rate_limiter: Arc<IpRateLimiter>,
}

impl AppState {
    pub fn new(config: Config, orders: Arc<dyn OrderStore>) -> AppResult<Self> {
        let checkout = PayFastCheckout::new(&config);
        let reconciler = ItnReconciler::new(&config, orders.clone())?;
        let policy = EmailAllowList::new(&config.security.admin_emails);
        let rate_limiter = IpRateLimiter::new(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst_size,
        );

        Ok(Self {
            config: Arc::new(config),
            orders,
            checkout: Arc::new(checkout),
            reconciler: Arc::new(reconciler),
            policy: Arc::new(policy),
            rate_limiter: Arc::new(rate_limiter),
        })
    }

    /// Swap the admin policy, e.g. for one backed by an identity store.
    pub fn with_policy(mut self, policy: Arc<dyn AuthorizationPolicy>) -> Self {
        self.policy = policy;
        self
    }
}
