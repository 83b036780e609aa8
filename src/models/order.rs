use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Money;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Whether moving from `self` to `target` changes anything.
    ///
    /// `paid` is absorbing, a repeat of the current status is a no-op, and a
    /// confirmed payment still lands on an order that was cancelled first.
    pub fn accepts(&self, target: OrderStatus) -> bool {
        match (self, target) {
            (current, target) if *current == target => false,
            (OrderStatus::Pending, _) => true,
            (OrderStatus::Cancelled, OrderStatus::Paid) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub customer_email: Option<String>,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: String,
    pub total: Money,
    pub customer_email: Option<String>,
}

/// Result of an idempotent status update.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub order: Order,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            total_amount: order.total(),
            id: order.id,
            status: order.status,
            payment_reference: order.payment_reference,
            paid_at: order.paid_at,
            created_at: order.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_moves_to_either_terminal_state() {
        assert!(OrderStatus::Pending.accepts(OrderStatus::Paid));
        assert!(OrderStatus::Pending.accepts(OrderStatus::Cancelled));
    }

    #[test]
    fn test_repeats_are_no_ops() {
        for status in [OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Cancelled] {
            assert!(!status.accepts(status));
        }
    }

    #[test]
    fn test_paid_is_absorbing() {
        assert!(!OrderStatus::Paid.accepts(OrderStatus::Cancelled));
        assert!(!OrderStatus::Paid.accepts(OrderStatus::Pending));
    }

    #[test]
    fn test_late_payment_overrides_cancellation() {
        assert!(OrderStatus::Cancelled.accepts(OrderStatus::Paid));
        assert!(!OrderStatus::Cancelled.accepts(OrderStatus::Pending));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("PAID".parse::<OrderStatus>().unwrap(), OrderStatus::Paid);
        assert!("refunded".parse::<OrderStatus>().is_err());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }
}
