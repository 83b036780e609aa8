#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use storefront_payments::{
    api::create_router,
    config::{
        AppEnvironment, Config, DatabaseConfig, PayFastConfig, RateLimitConfig, SecurityConfig,
        ServerConfig,
    },
    crypto_utils::{PayFastFields, PayFastSignature, SIGNATURE_FIELD},
    db::{InMemoryOrderStore, OrderStore},
    models::{Money, NewOrder},
    AppState,
};

pub const PASSPHRASE: &str = "jt7NOE43FZPn";
pub const ADMIN_EMAIL: &str = "owner@scents.example";
pub const PAYFAST_IP: &str = "197.97.145.150";

pub fn test_config(environment: AppEnvironment) -> Config {
    Config {
        environment,
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_url: "https://shop.example".to_string(),
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
        },
        payfast: PayFastConfig {
            merchant_id: Some("10000100".to_string()),
            merchant_key: Some("46f0cd694581a".to_string()),
            passphrase: Some(PASSPHRASE.to_string()),
            sandbox: true,
            base_url: None,
            validate_remote: false,
            extra_allowed_ips: Vec::new(),
        },
        security: SecurityConfig {
            admin_emails: vec![ADMIN_EMAIL.to_string()],
        },
        rate_limit: RateLimitConfig {
            requests_per_second: 1000,
            burst_size: 1000,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryOrderStore>,
}

impl TestApp {
    pub fn new(config: Config) -> Self {
        let store = Arc::new(InMemoryOrderStore::new());
        let state = AppState::new(config, store.clone()).expect("state should build");

        Self {
            router: create_router(state),
            store,
        }
    }

    pub fn development() -> Self {
        Self::new(test_config(AppEnvironment::Development))
    }

    pub async fn seed_order(&self, id: &str, total: &str) {
        self.store
            .create(NewOrder {
                id: id.to_string(),
                total: total.parse::<Money>().expect("valid amount"),
                customer_email: Some("a@b.com".to_string()),
            })
            .await
            .expect("order should be created");
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, body)
    }
}

pub fn fields(pairs: &[(&str, &str)]) -> PayFastFields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Form body signed the way PayFast signs its notifications.
pub fn signed_form(pairs: &[(&str, &str)], passphrase: Option<&str>) -> String {
    let mut payload = fields(pairs);
    let signature = PayFastSignature::sign(&payload, passphrase);
    payload.insert(SIGNATURE_FIELD.to_string(), signature);
    serde_urlencoded::to_string(&payload).expect("form should encode")
}

pub fn itn_fields<'a>(order_id: &'a str, status: &'a str, amount: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("m_payment_id", order_id),
        ("pf_payment_id", "1089250"),
        ("payment_status", status),
        ("item_name", "Order"),
        ("amount_gross", amount),
        ("amount_fee", "-2.30"),
        ("custom_str1", order_id),
        ("merchant_id", "10000100"),
    ]
}

pub fn notify_request(body: String, forwarded_for: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/payfast/notify")
        .header("content-type", "application/x-www-form-urlencoded");

    if let Some(ip) = forwarded_for {
        builder = builder.header("X-Forwarded-For", ip);
    }

    builder.body(Body::from(body)).expect("request should build")
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("json should encode")))
        .expect("request should build")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}
