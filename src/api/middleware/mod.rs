pub mod auth;
pub mod logging;
pub mod rate_limit;

pub use auth::{admin_guard, AuthorizationPolicy, EmailAllowList, Principal, PRINCIPAL_HEADER};
pub use logging::request_logging;
pub use rate_limit::{rate_limit_by_ip, IpRateLimiter};
