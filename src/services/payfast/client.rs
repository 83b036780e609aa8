use reqwest::Client;

use crate::config::PayFastConfig;
use crate::crypto_utils::PayFastFields;
use crate::error::{AppError, AppResult};

const VALID_RESPONSE: &str = "VALID";

/// Server-to-server calls back into PayFast.
#[derive(Clone)]
pub struct PayFastClient {
    http_client: Client,
    validate_url: String,
}

impl PayFastClient {
    pub fn new(config: &PayFastConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            validate_url: config.validate_url(),
        })
    }

    /// Ask the gateway to confirm it really sent this notification.
    ///
    /// Transport and 5xx failures surface as [`AppError::HttpClient`] so the
    /// notification is retried. A 4xx or any body other than `VALID` is a
    /// definite "not ours" and a client error.
    pub async fn validate_notification(&self, fields: &PayFastFields) -> AppResult<()> {
        let response = self
            .http_client
            .post(&self.validate_url)
            .form(fields)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            tracing::warn!(status = %status, "PayFast refused notification validation");
            return Err(AppError::GatewayValidation(format!(
                "Gateway answered validation with {}",
                status
            )));
        }

        let response = response.error_for_status()?;

        let body = response.text().await?;

        if body.trim() == VALID_RESPONSE {
            Ok(())
        } else {
            tracing::warn!(response = %body.trim(), "PayFast rejected notification validation");
            Err(AppError::GatewayValidation(
                "Gateway did not confirm the notification".to_string(),
            ))
        }
    }
}
