use ipnet::IpNet;

use crate::services::payfast::parse_network;

const PAYFAST_SANDBOX_URL: &str = "https://sandbox.payfast.co.za";
const PAYFAST_LIVE_URL: &str = "https://www.payfast.co.za";

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub payfast: PayFastConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("production") {
            AppEnvironment::Production
        } else {
            AppEnvironment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        *self == AppEnvironment::Production
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL of the storefront, used for gateway redirects.
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct PayFastConfig {
    pub merchant_id: Option<String>,
    pub merchant_key: Option<String>,
    pub passphrase: Option<String>,
    pub sandbox: bool,
    /// Overrides the sandbox/live host, mainly for tests.
    pub base_url: Option<String>,
    pub validate_remote: bool,
    pub extra_allowed_ips: Vec<IpNet>,
}

impl PayFastConfig {
    pub fn base_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/'),
            None if self.sandbox => PAYFAST_SANDBOX_URL,
            None => PAYFAST_LIVE_URL,
        }
    }

    pub fn process_url(&self) -> String {
        format!("{}/eng/process", self.base_url())
    }

    pub fn validate_url(&self) -> String {
        format!("{}/eng/query/validate", self.base_url())
    }

    /// Signing passphrase; blank counts as unset.
    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Values stay strings so numeric-looking credentials keep leading zeros.
        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("_"))
            .build()?;

        let optional = |key: &str| {
            config
                .get_string(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment =
            AppEnvironment::from_name(&optional("app.env").unwrap_or_default());

        let port: u16 = narrow("PORT", config.get_int("port").unwrap_or(8080))?;
        let public_url = optional("site.url")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let extra_allowed_ips = split_list(&optional("payfast.allowed.ips").unwrap_or_default())
            .iter()
            .map(|entry| {
                parse_network(entry).map_err(|e| {
                    config::ConfigError::Message(format!("PAYFAST_ALLOWED_IPS: {}", e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let database_url = optional("database.url");
        if environment.is_production() && database_url.is_none() {
            return Err(config::ConfigError::NotFound(
                "DATABASE_URL is required in production".to_string(),
            ));
        }

        Ok(Config {
            environment,
            server: ServerConfig {
                host: optional("host").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
                public_url,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: narrow(
                    "DATABASE_MAX_CONNECTIONS",
                    config.get_int("database.max.connections").unwrap_or(10),
                )?,
            },
            payfast: PayFastConfig {
                merchant_id: optional("payfast.merchant.id"),
                merchant_key: optional("payfast.merchant.key"),
                passphrase: optional("payfast.passphrase"),
                sandbox: config.get_bool("payfast.sandbox").unwrap_or(true),
                base_url: optional("payfast.base.url"),
                validate_remote: config.get_bool("payfast.validate.remote").unwrap_or(false),
                extra_allowed_ips,
            },
            security: SecurityConfig {
                admin_emails: split_list(&optional("admin.emails").unwrap_or_default()),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: narrow(
                    "RATE_LIMIT_REQUESTS_PER_SECOND",
                    config.get_int("rate.limit.requests.per.second").unwrap_or(20),
                )?,
                burst_size: narrow(
                    "RATE_LIMIT_BURST_SIZE",
                    config.get_int("rate.limit.burst.size").unwrap_or(40),
                )?,
            },
        })
    }
}

fn narrow<T: TryFrom<i64>>(name: &str, value: i64) -> Result<T, config::ConfigError> {
    T::try_from(value)
        .map_err(|_| config::ConfigError::Message(format!("{} is out of range: {}", name, value)))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
