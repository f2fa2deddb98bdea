//! Runtime configuration read from environment variables.

use std::env;

/// Default address the HTTP server binds when nothing is configured.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Environment-driven server settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address the HTTP server listens on.
    pub bind_addr: String,
    /// Override for the link-map mirror base URL.
    pub linkmap_mirror: Option<String>,
    /// Override for the fetch mirror base URL.
    pub fetch_mirror: Option<String>,
}

impl Config {
    /// Reads settings from the process environment.
    ///
    /// `APP_ADDR` takes the full bind address verbatim. Without it, a numeric
    /// `PORT` (the form container platforms inject) binds `0.0.0.0:{port}`.
    /// Mirror overrides default to the built-in bases when unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bind_addr: bind_addr_from(env_non_empty("APP_ADDR"), env_non_empty("PORT")),
            linkmap_mirror: env_non_empty("SHAREBOX_LINKMAP_MIRROR"),
            fetch_mirror: env_non_empty("SHAREBOX_FETCH_MIRROR"),
        }
    }
}

/// Reads an environment variable, treating unset and blank the same.
fn env_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Resolves the bind address from `APP_ADDR` and `PORT` values.
fn bind_addr_from(app_addr: Option<String>, port: Option<String>) -> String {
    if let Some(addr) = app_addr {
        return addr;
    }

    if let Some(port) = port
        && port.parse::<u16>().is_ok()
    {
        return format!("0.0.0.0:{port}");
    }

    DEFAULT_BIND_ADDR.to_string()
}
