use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::db::OrderStore;
use crate::error::{AppError, AppResult};
use crate::models::{NewOrder, Order, OrderStatus, StatusUpdate};

/// Process-local order store for tests and local development.
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<String, Order>>,
    unavailable: AtomicBool,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the backing database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> AppResult<Order> {
        self.check_available()?;

        let mut orders = self.orders.write();
        if orders.contains_key(&order.id) {
            return Err(AppError::Validation(format!(
                "Order {} already exists",
                order.id
            )));
        }

        let now = Utc::now();
        let created = Order {
            id: order.id.clone(),
            status: OrderStatus::Pending,
            total_cents: order.total.cents(),
            customer_email: order.customer_email,
            payment_reference: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        orders.insert(order.id, created.clone());

        Ok(created)
    }

    async fn find(&self, id: &str) -> AppResult<Option<Order>> {
        self.check_available()?;
        Ok(self.orders.read().get(id).cloned())
    }

    async fn list(&self, status: Option<OrderStatus>, limit: i64) -> AppResult<Vec<Order>> {
        self.check_available()?;

        let mut orders: Vec<Order> = self
            .orders
            .read()
            .values()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(limit.max(0) as usize);

        Ok(orders)
    }

    async fn apply_payment_status(
        &self,
        id: &str,
        target: OrderStatus,
        reference: Option<&str>,
    ) -> AppResult<StatusUpdate> {
        self.check_available()?;

        let mut orders = self.orders.write();
        let order = orders
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))?;

        if !order.status.accepts(target) {
            return Ok(StatusUpdate {
                order: order.clone(),
                changed: false,
            });
        }

        let now = Utc::now();
        order.status = target;
        order.updated_at = now;
        if target == OrderStatus::Paid {
            if let Some(reference) = reference {
                order.payment_reference = Some(reference.to_string());
            }
            order.paid_at = Some(now);
        }

        Ok(StatusUpdate {
            order: order.clone(),
            changed: true,
        })
    }

    async fn ping(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;

    async fn store_with(id: &str) -> InMemoryOrderStore {
        let store = InMemoryOrderStore::new();
        store
            .create(NewOrder {
                id: id.to_string(),
                total: Money::from_cents(10000),
                customer_email: Some("a@b.com".to_string()),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_paid_transition_records_reference() {
        let store = store_with("abc123").await;

        let update = store
            .apply_payment_status("abc123", OrderStatus::Paid, Some("pf-1"))
            .await
            .unwrap();

        assert!(update.changed);
        assert_eq!(update.order.status, OrderStatus::Paid);
        assert_eq!(update.order.payment_reference.as_deref(), Some("pf-1"));
        assert!(update.order.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_repeated_update_is_idempotent() {
        let store = store_with("abc123").await;

        let first = store
            .apply_payment_status("abc123", OrderStatus::Paid, Some("pf-1"))
            .await
            .unwrap();
        let second = store
            .apply_payment_status("abc123", OrderStatus::Paid, Some("pf-1"))
            .await
            .unwrap();

        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(first.order, second.order);
    }

    #[tokio::test]
    async fn test_paid_order_is_not_cancelled() {
        let store = store_with("abc123").await;
        store
            .apply_payment_status("abc123", OrderStatus::Paid, Some("pf-1"))
            .await
            .unwrap();

        let update = store
            .apply_payment_status("abc123", OrderStatus::Cancelled, None)
            .await
            .unwrap();

        assert!(!update.changed);
        assert_eq!(update.order.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_cancelled_order_still_accepts_payment() {
        let store = store_with("abc123").await;
        store
            .apply_payment_status("abc123", OrderStatus::Cancelled, Some("pf-0"))
            .await
            .unwrap();

        let update = store
            .apply_payment_status("abc123", OrderStatus::Paid, Some("pf-1"))
            .await
            .unwrap();

        assert!(update.changed);
        assert_eq!(update.order.status, OrderStatus::Paid);
        assert_eq!(update.order.payment_reference.as_deref(), Some("pf-1"));
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let store = InMemoryOrderStore::new();
        let result = store
            .apply_payment_status("missing", OrderStatus::Paid, None)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_create_is_rejected() {
        let store = store_with("abc123").await;
        let result = store
            .create(NewOrder {
                id: "abc123".to_string(),
                total: Money::from_cents(1),
                customer_email: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = store_with("abc123").await;
        store.set_unavailable(true);

        assert!(store.find("abc123").await.is_err());
        assert!(!store.ping().await);
    }
}
