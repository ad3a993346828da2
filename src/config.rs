//! Provider configuration.
//!
//! Every setting can be given in the provider block or through the
//! environment. Explicit configuration wins over the environment.
//!
//! | attribute | environment | default |
//! |---|---|---|
//! | `token` | `STREAMDAL_TOKEN` | required |
//! | `address` | `STREAMDAL_ADDRESS` | `localhost:8082` |
//! | `connection_timeout` | `STREAMDAL_CONNECTION_TIMEOUT` | `10` seconds |

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "STREAMDAL_TOKEN";
/// Environment variable holding the server address.
pub const ADDRESS_ENV: &str = "STREAMDAL_ADDRESS";
/// Environment variable holding the dial timeout in seconds.
pub const TIMEOUT_ENV: &str = "STREAMDAL_CONNECTION_TIMEOUT";

/// Address used when neither configuration nor environment sets one.
pub const DEFAULT_ADDRESS: &str = "localhost:8082";
/// Dial timeout used when neither configuration nor environment sets one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Provider block as written by the user. Every field may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    token: Option<String>,
    address: Option<String>,
    connection_timeout: Option<i64>,
}

/// Resolved provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// API token sent in the `auth-token` header.
    pub token: String,
    /// Server address, `host:port` or a full URI.
    pub address: String,
    /// Dial timeout.
    pub connection_timeout: Duration,
}

// Keeps the token out of logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("token", &"<redacted>")
            .field("address", &self.address)
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve configuration against the process environment.
    pub fn from_value(config: &Value) -> Result<Self, ProviderError> {
        Self::from_value_with_env(config, |key| std::env::var(key).ok())
    }

    /// Resolve configuration with a custom environment lookup.
    pub fn from_value_with_env<F>(config: &Value, env: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = match config {
            Value::Null => RawConfig::default(),
            other => serde_json::from_value(other.clone())?,
        };

        let token = non_empty(raw.token)
            .or_else(|| non_empty(env(TOKEN_ENV)))
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "token is required (set it in the provider block or {})",
                    TOKEN_ENV
                ))
            })?;

        let address = non_empty(raw.address)
            .or_else(|| non_empty(env(ADDRESS_ENV)))
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        let timeout_secs = match raw.connection_timeout {
            Some(secs) => secs,
            None => match non_empty(env(TIMEOUT_ENV)) {
                Some(s) => s.trim().parse::<i64>().map_err(|_| {
                    ProviderError::Configuration(format!(
                        "{} must be a whole number of seconds, got '{}'",
                        TIMEOUT_ENV, s
                    ))
                })?,
                None => DEFAULT_TIMEOUT_SECS as i64,
            },
        };

        if timeout_secs <= 0 {
            return Err(ProviderError::Configuration(format!(
                "connection_timeout must be positive, got {}",
                timeout_secs
            )));
        }

        Ok(Self {
            token,
            address,
            connection_timeout: Duration::from_secs(timeout_secs as u64),
        })
    }

    /// Address as a URI; plain `host:port` is assumed to be `http://`.
    pub fn endpoint_uri(&self) -> String {
        if self.address.contains("://") {
            self.address.clone()
        } else {
            format!("http://{}", self.address)
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_config() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"token": "abc", "address": "streamdal:9090", "connection_timeout": 3}),
            env_from(&[]),
        )
        .unwrap();

        assert_eq!(config.token, "abc");
        assert_eq!(config.address, "streamdal:9090");
        assert_eq!(config.connection_timeout, Duration::from_secs(3));
        assert_eq!(config.endpoint_uri(), "http://streamdal:9090");
    }

    #[test]
    fn test_defaults() {
        let config =
            ProviderConfig::from_value_with_env(&json!({"token": "abc"}), env_from(&[])).unwrap();

        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(
            config.connection_timeout,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_environment_fallback() {
        let env = env_from(&[
            (TOKEN_ENV, "from-env"),
            (ADDRESS_ENV, "https://streamdal.example.com"),
            (TIMEOUT_ENV, "25"),
        ]);
        let config = ProviderConfig::from_value_with_env(&Value::Null, env).unwrap();

        assert_eq!(config.token, "from-env");
        assert_eq!(config.endpoint_uri(), "https://streamdal.example.com");
        assert_eq!(config.connection_timeout, Duration::from_secs(25));
    }

    #[test]
    fn test_explicit_wins_over_environment() {
        let env = env_from(&[(TOKEN_ENV, "from-env")]);
        let config = ProviderConfig::from_value_with_env(&json!({"token": "explicit"}), env).unwrap();
        assert_eq!(config.token, "explicit");
    }

    #[test]
    fn test_missing_token() {
        let err = ProviderConfig::from_value_with_env(&json!({}), env_from(&[])).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.to_string().contains("token is required"));
    }

    #[test]
    fn test_bad_timeout() {
        let err = ProviderConfig::from_value_with_env(
            &json!({"token": "t"}),
            env_from(&[(TIMEOUT_ENV, "soon")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("whole number"));

        let err = ProviderConfig::from_value_with_env(
            &json!({"token": "t", "connection_timeout": 0}),
            env_from(&[]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config =
            ProviderConfig::from_value_with_env(&json!({"token": "secret"}), env_from(&[])).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
