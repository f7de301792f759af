//! Connection settings for the remote service.
//!
//! Every setting is resolved independently: an environment value wins, otherwise
//! the compiled-in default is used. Resolution never fails; a wrong URL or
//! credential only shows up on the first remote call.

use std::fmt;
use std::time::Duration;
use tracing::warn;

pub const URL_VAR: &str = "ODOO_URL";
pub const DATABASE_VAR: &str = "ODOO_DATABASE";
pub const USERNAME_VAR: &str = "ODOO_USERNAME";
pub const API_KEY_VAR: &str = "ODOO_API_KEY";
pub const TIMEOUT_VAR: &str = "ODOO_TIMEOUT";

const DEFAULT_URL: &str = "http://localhost:8069";
const DEFAULT_DATABASE: &str = "crearis";
const DEFAULT_USERNAME: &str = "admin";
const DEFAULT_API_KEY: &str = "admin";

/// Immutable connection configuration, built once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    pub api_key: String,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            timeout: None,
        }
    }
}

impl ConnectionConfig {
    /// Resolve the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let timeout = lookup(TIMEOUT_VAR)
            .filter(|v| !v.trim().is_empty())
            .and_then(|raw| match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    warn!(value = %raw, "ignoring invalid {}", TIMEOUT_VAR);
                    None
                }
            });

        Self {
            url: get(URL_VAR, DEFAULT_URL).trim_end_matches('/').to_string(),
            database: get(DATABASE_VAR, DEFAULT_DATABASE),
            username: get(USERNAME_VAR, DEFAULT_USERNAME),
            api_key: get(API_KEY_VAR, DEFAULT_API_KEY),
            timeout,
        }
    }

    /// Full URL of one of the XML-RPC services, e.g. `.../xmlrpc/2/object`.
    pub fn service_url(&self, service: &str) -> String {
        format!("{}/xmlrpc/2/{}", self.url, service)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
