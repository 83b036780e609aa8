use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::db::OrderStore;
use crate::error::{AppError, AppResult};
use crate::models::{NewOrder, Order, OrderStatus, StatusUpdate};

const ORDER_COLUMNS: &str = "id, status, total_cents, customer_email, payment_reference, \
                             paid_at, created_at, updated_at";

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, order: NewOrder) -> AppResult<Order> {
        let now = Utc::now();

        let sql = format!(
            r#"
            INSERT INTO orders (id, status, total_cents, customer_email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (id) DO NOTHING
            RETURNING {ORDER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Order>(&sql)
            .bind(&order.id)
            .bind(OrderStatus::Pending)
            .bind(order.total.cents())
            .bind(&order.customer_email)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Order {} already exists", order.id)))
    }

    async fn find(&self, id: &str) -> AppResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");

        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    async fn list(&self, status: Option<OrderStatus>, limit: i64) -> AppResult<Vec<Order>> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE ($1::order_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#
        );

        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(status)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    async fn apply_payment_status(
        &self,
        id: &str,
        target: OrderStatus,
        reference: Option<&str>,
    ) -> AppResult<StatusUpdate> {
        // The WHERE clause mirrors OrderStatus::accepts so two concurrent
        // deliveries cannot both apply.
        let sql = format!(
            r#"
            UPDATE orders
            SET status = $2,
                payment_reference = CASE WHEN $2 = 'paid'::order_status
                    THEN COALESCE($3, payment_reference) ELSE payment_reference END,
                paid_at = CASE WHEN $2 = 'paid'::order_status THEN $4 ELSE paid_at END,
                updated_at = $4
            WHERE id = $1
                AND status <> $2
                AND (status = 'pending' OR (status = 'cancelled' AND $2 = 'paid'::order_status))
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(target)
            .bind(reference)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        if let Some(order) = updated {
            return Ok(StatusUpdate {
                order,
                changed: true,
            });
        }

        let order = self
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))?;

        Ok(StatusUpdate {
            order,
            changed: false,
        })
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
