//! # Access Gate Module
//!
//! Decides whether a user may run administrative actions. The static
//! allow-lists are checked first; anyone not on them costs exactly one
//! `verify` call to the auth service. Failures of that call deny access.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::client::ServiceClient;

/// Allow-lists loaded at startup
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AdminVars {
    #[serde(default, deserialize_with = "ids_as_strings")]
    pub admin_telegram_ids: Vec<String>,
    #[serde(default)]
    pub admin_usernames: Vec<String>,
}

/// Ids may be written as JSON numbers or strings
fn ids_as_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(i64),
        Text(String),
    }

    let ids = Vec::<Id>::deserialize(deserializer)?;
    Ok(ids
        .into_iter()
        .map(|id| match id {
            Id::Number(n) => n.to_string(),
            Id::Text(s) => s.trim().to_string(),
        })
        .collect())
}

impl AdminVars {
    /// Read and validate the admin vars file
    ///
    /// A file naming no admin at all is rejected; the bot would be unmanageable.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read admin vars file {}", path.display()))?;
        let vars: AdminVars = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse admin vars file {}", path.display()))?;

        if vars.admin_telegram_ids.is_empty() && vars.admin_usernames.is_empty() {
            bail!("Admin vars file {} lists no admins", path.display());
        }

        info!(
            ids = vars.admin_telegram_ids.len(),
            usernames = vars.admin_usernames.len(),
            "Loaded admin allow-lists"
        );
        Ok(vars)
    }
}

pub struct AccessGate {
    ids: HashSet<String>,
    usernames: HashSet<String>,
    client: ServiceClient,
}

impl AccessGate {
    pub fn new(vars: AdminVars, client: ServiceClient) -> Self {
        Self {
            ids: vars.admin_telegram_ids.into_iter().collect(),
            usernames: vars
                .admin_usernames
                .into_iter()
                .map(|u| u.trim_start_matches('@').to_string())
                .filter(|u| !u.is_empty())
                .collect(),
            client,
        }
    }

    /// Whether this user may run administrative actions
    pub async fn is_privileged(&self, user_id: i64, username: Option<&str>) -> bool {
        let id = user_id.to_string();
        if self.ids.contains(&id) {
            debug!(user_id, "Admin by id allow-list");
            return true;
        }

        if let Some(name) = username.filter(|n| !n.is_empty()) {
            if self.usernames.contains(name) {
                debug!(user_id, username = name, "Admin by username allow-list");
                return true;
            }
        }

        match self.client.verify_admin(&id).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                warn!(user_id, error = %e, "Admin verification denied");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_accept_numbers_and_strings() {
        let vars: AdminVars = serde_json::from_str(
            r#"{"admin_telegram_ids": [1001, "2002"], "admin_usernames": ["owner"]}"#,
        )
        .unwrap();
        assert_eq!(vars.admin_telegram_ids, vec!["1001", "2002"]);
        assert_eq!(vars.admin_usernames, vec!["owner"]);
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let vars: AdminVars = serde_json::from_str(r#"{"admin_usernames": ["owner"]}"#).unwrap();
        assert!(vars.admin_telegram_ids.is_empty());
    }
}
