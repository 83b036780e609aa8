use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::{Config, PayFastConfig};
use crate::crypto_utils::{encode_value, PayFastFields, PayFastSignature, SIGNATURE_FIELD};
use crate::error::{AppError, AppResult};
use crate::models::{Money, FIELD_CUSTOM_STR1, FIELD_M_PAYMENT_ID};

const ITEM_NAME_MAX: usize = 100;
const ITEM_DESCRIPTION_MAX: usize = 255;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 100, message = "Order id must be 1-100 characters"))]
    pub order_id: String,
    pub amount: Money,
    #[validate(email(message = "Invalid email format"))]
    pub customer_email: String,
    #[validate(length(max = 200, message = "Customer name too long"))]
    pub customer_name: String,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<CheckoutItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub name: String,
    pub quantity: u32,
}

/// Signed payload the browser must submit to the gateway as a real form post.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    pub action_url: String,
    pub form_data: PayFastFields,
}

/// Builds signed PayFast checkout forms.
#[derive(Debug, Clone)]
pub struct PayFastCheckout {
    payfast: PayFastConfig,
    public_url: String,
}

impl PayFastCheckout {
    pub fn new(config: &Config) -> Self {
        Self {
            payfast: config.payfast.clone(),
            public_url: config.server.public_url.clone(),
        }
    }

    pub fn generate(&self, request: &CheckoutRequest) -> AppResult<CheckoutForm> {
        let merchant_id = self
            .payfast
            .merchant_id
            .as_deref()
            .ok_or_else(|| AppError::Config("PAYFAST_MERCHANT_ID is not configured".to_string()))?;
        let merchant_key = self
            .payfast
            .merchant_key
            .as_deref()
            .ok_or_else(|| AppError::Config("PAYFAST_MERCHANT_KEY is not configured".to_string()))?;

        validate_request(request)?;

        let order_id = request.order_id.trim();
        let encoded_id = encode_value(order_id);
        let (name_first, name_last) = split_name(&request.customer_name);

        let mut form_data = PayFastFields::new();
        let mut put = |key: &str, value: String| {
            if !value.trim().is_empty() {
                form_data.insert(key.to_string(), value);
            }
        };

        put("merchant_id", merchant_id.to_string());
        put("merchant_key", merchant_key.to_string());
        put(
            "return_url",
            format!("{}/checkout/success?order_id={}", self.public_url, encoded_id),
        );
        put(
            "cancel_url",
            format!("{}/checkout/cancel?order_id={}", self.public_url, encoded_id),
        );
        put("notify_url", format!("{}/api/payfast/notify", self.public_url));
        put("name_first", name_first.to_string());
        put("name_last", name_last.to_string());
        put("email_address", request.customer_email.trim().to_string());
        put(FIELD_M_PAYMENT_ID, order_id.to_string());
        put("amount", request.amount.to_string());
        put(
            "item_name",
            truncate_chars(&format!("Order #{}", order_id), ITEM_NAME_MAX),
        );
        put("item_description", describe_items(&request.items));
        put(FIELD_CUSTOM_STR1, order_id.to_string());

        let signature = PayFastSignature::sign(&form_data, self.payfast.passphrase());
        form_data.insert(SIGNATURE_FIELD.to_string(), signature);

        tracing::info!(
            order_id = %order_id,
            amount = %request.amount,
            sandbox = self.payfast.sandbox,
            "PayFast checkout form generated"
        );

        Ok(CheckoutForm {
            action_url: self.payfast.process_url(),
            form_data,
        })
    }
}

fn validate_request(request: &CheckoutRequest) -> AppResult<()> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;

    if request.order_id.trim().is_empty() {
        return Err(AppError::Validation("Order id is required".to_string()));
    }

    if !request.amount.is_positive() {
        return Err(AppError::Validation("Amount must be positive".to_string()));
    }

    if let Some(item) = request
        .items
        .iter()
        .find(|item| item.name.trim().is_empty() || item.quantity == 0)
    {
        return Err(AppError::Validation(format!(
            "Invalid item '{}': name is required and quantity must be at least 1",
            item.name
        )));
    }

    Ok(())
}

fn split_name(full_name: &str) -> (&str, &str) {
    let full_name = full_name.trim();
    match full_name.split_once(char::is_whitespace) {
        Some((first, last)) => (first, last.trim()),
        None => (full_name, ""),
    }
}

fn describe_items(items: &[CheckoutItem]) -> String {
    let description = items
        .iter()
        .map(|item| format!("{} x{}", item.name.trim(), item.quantity))
        .collect::<Vec<_>>()
        .join(", ");

    truncate_chars(&description, ITEM_DESCRIPTION_MAX)
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
