use std::collections::HashSet;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::AppState;

/// Header the fronting identity proxy sets to the signed-in user's email.
///
/// Clients can send it too: the edge proxy must strip any inbound copy
/// before setting its own, and the service must not be reachable around it.
pub const PRINCIPAL_HEADER: &str = "X-Forwarded-Email";

/// Authenticated caller, as asserted by the identity proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
}

/// Decides who may use the back-office routes.
pub trait AuthorizationPolicy: Send + Sync {
    fn is_authorized(&self, principal: &Principal) -> bool;
}

/// Admin access by email address, case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct EmailAllowList {
    emails: HashSet<String>,
}

impl EmailAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| normalize(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }
}

impl AuthorizationPolicy for EmailAllowList {
    fn is_authorized(&self, principal: &Principal) -> bool {
        self.emails.contains(&normalize(&principal.email))
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Admin guard middleware.
///
/// Missing identity is a 401, an identity the policy refuses is a 403. The
/// accepted [`Principal`] is placed in the request extensions.
pub async fn admin_guard(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let principal = request
        .headers()
        .get(PRINCIPAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|email| Principal {
            email: email.to_string(),
        })
        .ok_or_else(|| {
            tracing::warn!(path = %request.uri().path(), "Admin request without identity");
            AppError::Unauthorized("Sign-in required".to_string())
        })?;

    if !state.policy.is_authorized(&principal) {
        tracing::warn!(
            email = %principal.email,
            path = %request.uri().path(),
            "Admin access denied"
        );
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
