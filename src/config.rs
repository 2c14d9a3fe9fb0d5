//! # Configuration Module
//!
//! Settings of both binaries, read from the environment after `.env` has
//! been loaded with `dotenv`.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::rpc::ServiceKind;

pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ADMIN_VARS_FILE: &str = ".vars.json";

/// Environment variable holding the URL of a service
pub fn url_var(kind: ServiceKind) -> &'static str {
    match kind {
        ServiceKind::Auth => "AUTH_SERVICE_URL",
        ServiceKind::Menu => "MENU_SERVICE_URL",
        ServiceKind::Promo => "PROMO_SERVICE_URL",
        ServiceKind::Info => "INFO_SERVICE_URL",
        ServiceKind::Media => "MEDIA_SERVICE_URL",
    }
}

/// Port a service listens on unless `SERVICE_PORT` says otherwise
pub fn default_port(kind: ServiceKind) -> u16 {
    match kind {
        ServiceKind::Auth => 8081,
        ServiceKind::Menu => 8082,
        ServiceKind::Promo => 8083,
        ServiceKind::Info => 8084,
        ServiceKind::Media => 8085,
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Settings of the Telegram front end
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub telegram_token: String,
    pub service_urls: HashMap<ServiceKind, String>,
    pub rpc_timeout: Duration,
    pub admin_vars_file: PathBuf,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let Some(telegram_token) = non_empty(&lookup, "TELEGRAM_BOT_TOKEN") else {
            bail!("TELEGRAM_BOT_TOKEN must be set");
        };

        let service_urls = ServiceKind::ALL
            .iter()
            .map(|kind| {
                let url = non_empty(&lookup, url_var(*kind))
                    .unwrap_or_else(|| format!("http://localhost:{}", default_port(*kind)));
                (*kind, url)
            })
            .collect();

        let rpc_timeout = match non_empty(&lookup, "RPC_TIMEOUT_SECS") {
            Some(secs) => secs
                .parse::<u64>()
                .with_context(|| format!("RPC_TIMEOUT_SECS is not a number of seconds: {secs}"))?,
            None => DEFAULT_RPC_TIMEOUT_SECS,
        };
        if rpc_timeout == 0 {
            bail!("RPC_TIMEOUT_SECS must be greater than zero");
        }

        let admin_vars_file = non_empty(&lookup, "ADMIN_VARS_FILE")
            .unwrap_or_else(|| DEFAULT_ADMIN_VARS_FILE.to_string())
            .into();

        Ok(Self {
            telegram_token,
            service_urls,
            rpc_timeout: Duration::from_secs(rpc_timeout),
            admin_vars_file,
        })
    }
}

/// Settings of one backend service process
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub kind: ServiceKind,
    pub port: u16,
    /// `None` runs the service on the in-memory store
    pub database_url: Option<String>,
}

impl ServiceConfig {
    pub fn from_env(kind: ServiceKind) -> Result<Self> {
        Self::from_lookup(kind, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(kind: ServiceKind, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match non_empty(&lookup, "SERVICE_PORT") {
            Some(port) => port
                .parse()
                .with_context(|| format!("SERVICE_PORT is not a valid port: {port}"))?,
            None => default_port(kind),
        };

        Ok(Self {
            kind,
            port,
            database_url: non_empty(&lookup, "DATABASE_URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_bot_config_defaults() {
        let config = BotConfig::from_lookup(vars(&[("TELEGRAM_BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(config.telegram_token, "123:abc");
        assert_eq!(config.rpc_timeout, Duration::from_secs(10));
        assert_eq!(config.admin_vars_file, PathBuf::from(".vars.json"));
        assert_eq!(
            config.service_urls[&ServiceKind::Promo],
            "http://localhost:8083"
        );
    }

    #[test]
    fn test_bot_config_overrides() {
        let config = BotConfig::from_lookup(vars(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("MENU_SERVICE_URL", "http://menu:9000"),
            ("RPC_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.service_urls[&ServiceKind::Menu], "http://menu:9000");
        assert_eq!(config.rpc_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_bot_config_requires_token() {
        assert!(BotConfig::from_lookup(vars(&[])).is_err());
        assert!(BotConfig::from_lookup(vars(&[("TELEGRAM_BOT_TOKEN", "  ")])).is_err());
    }

    #[test]
    fn test_bot_config_rejects_bad_timeout() {
        let bad = vars(&[("TELEGRAM_BOT_TOKEN", "t"), ("RPC_TIMEOUT_SECS", "soon")]);
        assert!(BotConfig::from_lookup(bad).is_err());
        let zero = vars(&[("TELEGRAM_BOT_TOKEN", "t"), ("RPC_TIMEOUT_SECS", "0")]);
        assert!(BotConfig::from_lookup(zero).is_err());
    }

    #[test]
    fn test_service_config() {
        let config = ServiceConfig::from_lookup(ServiceKind::Info, vars(&[])).unwrap();
        assert_eq!(config.port, 8084);
        assert_eq!(config.database_url, None);

        let config = ServiceConfig::from_lookup(
            ServiceKind::Info,
            vars(&[("SERVICE_PORT", "9100"), ("DATABASE_URL", "postgres://localhost/cafe")]),
        )
        .unwrap();
        assert_eq!(config.port, 9100);
        assert!(config.database_url.is_some());
    }
}
