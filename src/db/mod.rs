pub mod memory;
pub mod pool;
pub mod repositories;

pub use memory::InMemoryOrderStore;
pub use pool::{create_pool, run_migrations, DbPool};
pub use repositories::PgOrderStore;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{NewOrder, Order, OrderStatus, StatusUpdate};

/// Persistence port for orders.
///
/// Exactly one adapter is live per deployment.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: NewOrder) -> AppResult<Order>;

    async fn find(&self, id: &str) -> AppResult<Option<Order>>;

    /// Most recent first.
    async fn list(&self, status: Option<OrderStatus>, limit: i64) -> AppResult<Vec<Order>>;

    /// Move an order towards `target`, following [`OrderStatus::accepts`].
    ///
    /// Idempotent: repeating the same call leaves the order as it was after
    /// the first one and reports `changed == false`. `reference` is only
    /// recorded on the transition into `paid`.
    async fn apply_payment_status(
        &self,
        id: &str,
        target: OrderStatus,
        reference: Option<&str>,
    ) -> AppResult<StatusUpdate>;

    async fn ping(&self) -> bool;
}
