use std::net::IpAddr;
use std::sync::Arc;

use crate::config::{AppEnvironment, Config};
use crate::crypto_utils::PayFastSignature;
use crate::db::OrderStore;
use crate::error::{AppError, AppResult};
use crate::models::{ItnOutcome, ItnPayload};

use super::{IpAllowList, PayFastClient};

/// Authenticates PayFast ITNs and applies the resulting order transition.
pub struct ItnReconciler {
    environment: AppEnvironment,
    passphrase: Option<String>,
    allow_list: IpAllowList,
    orders: Arc<dyn OrderStore>,
    validator: Option<PayFastClient>,
}

impl ItnReconciler {
    pub fn new(config: &Config, orders: Arc<dyn OrderStore>) -> AppResult<Self> {
        let validator = if config.payfast.validate_remote {
            Some(PayFastClient::new(&config.payfast)?)
        } else {
            None
        };

        Ok(Self {
            environment: config.environment,
            passphrase: config.payfast.passphrase().map(str::to_string),
            allow_list: IpAllowList::payfast(&config.payfast.extra_allowed_ips),
            orders,
            validator,
        })
    }

    /// Run one notification through every gate, in order.
    ///
    /// Gateway statuses without a mapping are acknowledged without touching
    /// the order.
    pub async fn process(&self, source_ip: Option<IpAddr>, body: &[u8]) -> AppResult<ItnOutcome> {
        let source = source_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if self.environment.is_production() {
            let allowed = source_ip.map_or(false, |ip| self.allow_list.contains(ip));
            if !allowed {
                tracing::warn!(source_ip = %source, "PayFast notification from unlisted address");
                return Err(AppError::Forbidden("Source address not allowed".to_string()));
            }
        }

        let payload = ItnPayload::from_form(body).map_err(|e| {
            tracing::warn!(source_ip = %source, error = %e, "Malformed PayFast notification body");
            AppError::Validation("Malformed notification body".to_string())
        })?;

        let signature_ok = payload.signature().map_or(false, |claimed| {
            PayFastSignature::verify(payload.fields(), claimed, self.passphrase.as_deref())
        });
        if !signature_ok {
            tracing::warn!(
                source_ip = %source,
                order_id = payload.order_reference().unwrap_or("-"),
                "PayFast notification failed signature check"
            );
            return Err(AppError::InvalidSignature(
                "Signature verification failed".to_string(),
            ));
        }

        let order_id = payload.order_reference().ok_or_else(|| {
            tracing::warn!(source_ip = %source, "PayFast notification without order reference");
            AppError::MissingOrderReference
        })?;

        if let Some(validator) = &self.validator {
            validator.validate_notification(payload.fields()).await?;
        }

        let gateway_status = payload.payment_status();
        let Some(target) = gateway_status.target_status() else {
            tracing::info!(
                order_id = %order_id,
                payment_status = %gateway_status,
                "PayFast status needs no order change"
            );
            return Ok(ItnOutcome {
                order_id: order_id.to_string(),
                applied: None,
                changed: false,
            });
        };

        let order = self
            .orders
            .find(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;

        if let Some(received) = payload.amount_gross() {
            let received = received.map_err(|e| {
                tracing::warn!(
                    source_ip = %source,
                    order_id = %order_id,
                    error = %e,
                    "PayFast notification carries an unreadable amount"
                );
                AppError::Validation("Malformed amount_gross".to_string())
            })?;

            if received != order.total() {
                tracing::warn!(
                    source_ip = %source,
                    order_id = %order_id,
                    expected = %order.total(),
                    received = %received,
                    "PayFast amount does not match order total"
                );
                return Err(AppError::AmountMismatch {
                    order_id: order_id.to_string(),
                    expected: order.total().to_string(),
                    received: received.to_string(),
                });
            }
        }

        let update = self
            .orders
            .apply_payment_status(order_id, target, payload.gateway_reference())
            .await?;

        if update.changed {
            tracing::info!(
                order_id = %order_id,
                status = %update.order.status,
                pf_payment_id = payload.gateway_reference().unwrap_or("-"),
                "Order status updated from PayFast notification"
            );
        } else {
            tracing::info!(
                order_id = %order_id,
                current = %update.order.status,
                requested = %target,
                "PayFast notification left order unchanged"
            );
        }

        Ok(ItnOutcome {
            order_id: order_id.to_string(),
            applied: Some(update.order.status),
            changed: update.changed,
        })
    }
}
