use serde::Serialize;

use crate::crypto_utils::{PayFastFields, SIGNATURE_FIELD};

use super::{Money, OrderStatus, ParseMoneyError};

pub const FIELD_PAYMENT_STATUS: &str = "payment_status";
pub const FIELD_M_PAYMENT_ID: &str = "m_payment_id";
pub const FIELD_PF_PAYMENT_ID: &str = "pf_payment_id";
pub const FIELD_AMOUNT_GROSS: &str = "amount_gross";
pub const FIELD_CUSTOM_STR1: &str = "custom_str1";

/// Payment status as reported by PayFast on an ITN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayFastPaymentStatus {
    Complete,
    Failed,
    Cancelled,
    Pending,
    Other(String),
}

impl From<&str> for PayFastPaymentStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "COMPLETE" => Self::Complete,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            "PENDING" => Self::Pending,
            _ => Self::Other(s.trim().to_string()),
        }
    }
}

impl PayFastPaymentStatus {
    /// Internal order status this gateway status drives the order to, if any.
    pub fn target_status(&self) -> Option<OrderStatus> {
        match self {
            Self::Complete => Some(OrderStatus::Paid),
            Self::Failed | Self::Cancelled => Some(OrderStatus::Cancelled),
            Self::Pending | Self::Other(_) => None,
        }
    }
}

impl std::fmt::Display for PayFastPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => f.write_str("COMPLETE"),
            Self::Failed => f.write_str("FAILED"),
            Self::Cancelled => f.write_str("CANCELLED"),
            Self::Pending => f.write_str("PENDING"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Instant Transaction Notification as posted by PayFast.
///
/// Untrusted until the source address and the signature have been checked.
#[derive(Debug, Clone)]
pub struct ItnPayload {
    fields: PayFastFields,
    signature: Option<String>,
}

impl ItnPayload {
    /// Parse a form-encoded body, splitting off the `signature` field.
    pub fn from_form(body: &[u8]) -> Result<Self, serde_urlencoded::de::Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;
        let mut fields: PayFastFields = pairs.into_iter().collect();
        let signature = fields.remove(SIGNATURE_FIELD);

        Ok(Self { fields, signature })
    }

    pub fn fields(&self) -> &PayFastFields {
        &self.fields
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Internal order id: the pass-through field first, then `m_payment_id`.
    pub fn order_reference(&self) -> Option<&str> {
        self.get(FIELD_CUSTOM_STR1)
            .or_else(|| self.get(FIELD_M_PAYMENT_ID))
    }

    pub fn payment_status(&self) -> PayFastPaymentStatus {
        self.get(FIELD_PAYMENT_STATUS)
            .map(PayFastPaymentStatus::from)
            .unwrap_or_else(|| PayFastPaymentStatus::Other(String::new()))
    }

    pub fn gateway_reference(&self) -> Option<&str> {
        self.get(FIELD_PF_PAYMENT_ID)
    }

    /// `amount_gross`, if present. A present value that is not a valid
    /// amount is an error, never treated as absent.
    pub fn amount_gross(&self) -> Option<Result<Money, ParseMoneyError>> {
        self.get(FIELD_AMOUNT_GROSS).map(str::parse)
    }
}

/// What processing a notification did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItnOutcome {
    pub order_id: String,
    pub applied: Option<OrderStatus>,
    pub changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            PayFastPaymentStatus::from("COMPLETE").target_status(),
            Some(OrderStatus::Paid)
        );
        assert_eq!(
            PayFastPaymentStatus::from("FAILED").target_status(),
            Some(OrderStatus::Cancelled)
        );
        assert_eq!(
            PayFastPaymentStatus::from("cancelled").target_status(),
            Some(OrderStatus::Cancelled)
        );
        assert_eq!(PayFastPaymentStatus::from("PENDING").target_status(), None);
        assert_eq!(
            PayFastPaymentStatus::from("REFUNDED"),
            PayFastPaymentStatus::Other("REFUNDED".to_string())
        );
    }

    #[test]
    fn test_from_form_splits_signature() {
        let payload = ItnPayload::from_form(
            b"m_payment_id=abc123&payment_status=COMPLETE&item_name=Midnight+Oud&signature=deadbeef",
        )
        .unwrap();

        assert_eq!(payload.signature(), Some("deadbeef"));
        assert!(!payload.fields().contains_key(SIGNATURE_FIELD));
        assert_eq!(payload.fields()["item_name"], "Midnight Oud");
    }

    #[test]
    fn test_order_reference_prefers_custom_field() {
        let both = ItnPayload::from_form(b"m_payment_id=gateway&custom_str1=internal").unwrap();
        let fallback = ItnPayload::from_form(b"m_payment_id=gateway&custom_str1=").unwrap();
        let neither = ItnPayload::from_form(b"payment_status=COMPLETE").unwrap();

        assert_eq!(both.order_reference(), Some("internal"));
        assert_eq!(fallback.order_reference(), Some("gateway"));
        assert_eq!(neither.order_reference(), None);
    }

    #[test]
    fn test_amount_gross() {
        let payload = ItnPayload::from_form(b"amount_gross=129.99").unwrap();
        assert_eq!(payload.amount_gross(), Some(Ok(Money::from_cents(12999))));

        let absent = ItnPayload::from_form(b"payment_status=COMPLETE").unwrap();
        assert_eq!(absent.amount_gross(), None);

        let junk = ItnPayload::from_form(b"amount_gross=lots").unwrap();
        assert!(matches!(junk.amount_gross(), Some(Err(_))));

        let sub_cent = ItnPayload::from_form(b"amount_gross=1.005").unwrap();
        assert!(matches!(sub_cent.amount_gross(), Some(Err(_))));
    }
}
