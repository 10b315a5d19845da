//! Connection provider configuration and factory trait.

use std::collections::HashMap;
use std::sync::Arc;

use crate::connection::DriverConnection;
use crate::error::DriverError;
use crate::isolation::IsolationLevel;

/// Opens fresh physical connections.
///
/// A factory is the only way new connections enter the system. It receives
/// the full [`ProviderConfig`] on every call so identity mutations (URL,
/// credentials) made between calls take effect on the next open.
pub trait ConnectionFactory: Send + Sync {
    /// Open a new physical connection.
    ///
    /// The factory is expected to apply the config's session defaults
    /// (auto-commit mode, isolation level) to the fresh connection before
    /// returning it. May block; errors propagate to the caller.
    fn open(&self, config: &ProviderConfig) -> Result<Arc<dyn DriverConnection>, DriverError>;
}

/// Configuration for opening connections.
///
/// Carries the identity triple (URL, username, password) plus the session
/// defaults a factory applies to every fresh connection.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Database URL.
    pub url: String,

    /// Username for authentication.
    pub username: String,

    /// Password for authentication.
    pub password: String,

    /// Default auto-commit mode for fresh connections.
    pub auto_commit: bool,

    /// Default transaction isolation level, if any.
    pub isolation: Option<IsolationLevel>,

    /// Driver-specific properties passed through to the factory.
    pub properties: HashMap<String, String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            auto_commit: true,
            isolation: None,
            properties: HashMap::new(),
        }
    }
}

impl ProviderConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parse a `key=value;` connection string into configuration.
    ///
    /// Recognized keys: `url`, `user`, `password`, `autocommit`,
    /// `isolation`. Unknown keys are retained as driver properties.
    ///
    /// ```text
    /// url=db://localhost:5432/app;user=app;password=secret;autocommit=true;
    /// ```
    pub fn from_connection_string(conn_str: &str) -> Result<Self, DriverError> {
        let mut config = Self::default();

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| DriverError::Config(format!("invalid key-value: {part}")))?;

            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "url" => {
                    config.url = value.to_string();
                }
                "user" | "username" => {
                    config.username = value.to_string();
                }
                "password" | "pwd" => {
                    config.password = value.to_string();
                }
                "autocommit" | "auto commit" => {
                    config.auto_commit = value.eq_ignore_ascii_case("true")
                        || value.eq_ignore_ascii_case("yes")
                        || value == "1";
                }
                "isolation" => {
                    config.isolation = Some(value.parse()?);
                }
                _ => {
                    // Retain unknown options for the driver
                    tracing::debug!(
                        key = key,
                        value = value,
                        "retaining unknown connection string option as driver property"
                    );
                    config.properties.insert(key, value.to_string());
                }
            }
        }

        if config.url.is_empty() {
            return Err(DriverError::Config(
                "connection string has no url".to_string(),
            ));
        }

        Ok(config)
    }

    /// Set the database URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the default auto-commit mode.
    #[must_use]
    pub fn auto_commit(mut self, enabled: bool) -> Self {
        self.auto_commit = enabled;
        self
    }

    /// Set the default transaction isolation level.
    #[must_use]
    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    /// Add a driver-specific property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_string_parsing() {
        let config = ProviderConfig::from_connection_string(
            "url=db://localhost:5432/app;user=app;password=secret;",
        )
        .unwrap();

        assert_eq!(config.url, "db://localhost:5432/app");
        assert_eq!(config.username, "app");
        assert_eq!(config.password, "secret");
        assert!(config.auto_commit);
    }

    #[test]
    fn test_connection_string_session_defaults() {
        let config = ProviderConfig::from_connection_string(
            "url=db://h/d;autocommit=no;isolation=serializable;",
        )
        .unwrap();

        assert!(!config.auto_commit);
        assert_eq!(config.isolation, Some(IsolationLevel::Serializable));
    }

    #[test]
    fn test_connection_string_unknown_keys_become_properties() {
        let config =
            ProviderConfig::from_connection_string("url=db://h/d;application name=dblink;")
                .unwrap();

        assert_eq!(
            config.properties.get("application name").map(String::as_str),
            Some("dblink")
        );
    }

    #[test]
    fn test_connection_string_requires_url() {
        assert!(ProviderConfig::from_connection_string("user=app;").is_err());
    }

    #[test]
    fn test_builder() {
        let config = ProviderConfig::new("db://h/d")
            .username("app")
            .password("secret")
            .auto_commit(false)
            .isolation(IsolationLevel::RepeatableRead)
            .property("tls", "require");

        assert_eq!(config.url, "db://h/d");
        assert!(!config.auto_commit);
        assert_eq!(config.properties.get("tls").map(String::as_str), Some("require"));
    }
}
