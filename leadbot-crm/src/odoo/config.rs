//! Odoo connection settings.

use serde::{Deserialize, Serialize};

/// Connection settings for an Odoo instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdooConfig {
    pub url: String,
    pub db: String,
    pub username: String,
    pub password: String,
}

impl OdooConfig {
    pub fn new(
        url: impl Into<String>,
        db: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self { url: url.into(), db: db.into(), username: username.into(), password: password.into() }
    }

    /// Build a config only when every setting is present and non-blank.
    pub fn from_parts(
        url: Option<String>,
        db: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Option<Self> {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Some(Self::new(present(url)?, present(db)?, present(username)?, present(password)?))
    }

    /// `true` when all four settings are non-blank.
    pub fn is_complete(&self) -> bool {
        [&self.url, &self.db, &self.username, &self.password].iter().all(|v| !v.trim().is_empty())
    }

    /// The instance root. Web-client URLs ending in `/odoo` are accepted.
    pub fn base_url(&self) -> &str {
        let url = self.url.trim().trim_end_matches('/');
        url.strip_suffix("/odoo").unwrap_or(url)
    }

    /// The JSON-RPC endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/jsonrpc", self.base_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_client_suffix_is_stripped() {
        let config = OdooConfig::new("https://crm.example.com/odoo/", "db", "bot", "pw");
        assert_eq!(config.base_url(), "https://crm.example.com");
        assert_eq!(config.endpoint(), "https://crm.example.com/jsonrpc");

        let plain = OdooConfig::new("https://crm.example.com", "db", "bot", "pw");
        assert_eq!(plain.endpoint(), "https://crm.example.com/jsonrpc");
    }

    #[test]
    fn partial_settings_are_not_a_config() {
        assert!(OdooConfig::from_parts(
            Some("https://crm.example.com".into()),
            Some("db".into()),
            Some("bot".into()),
            Some("  ".into()),
        )
        .is_none());

        let config = OdooConfig::from_parts(
            Some("https://crm.example.com".into()),
            Some("db".into()),
            Some("bot".into()),
            Some("pw".into()),
        )
        .unwrap();
        assert!(config.is_complete());
        assert!(!OdooConfig::default().is_complete());
    }
}
