//! Layered configuration for the console data layer
//!
//! Configuration is assembled in three steps: defaults (or a TOML file),
//! `WARDEN_<SECTION>_<KEY>` environment overrides, then validation.
//!
//! ```rust,ignore
//! let mut config = WardenConfig::load_from_file(Path::new("warden.toml"))?;
//! config.merge_with_env()?;
//! config.validate()?;
//! ```

use crate::WardenError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "WARDEN_";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// HTTP client settings
    pub client: ClientConfig,
    /// Response cache bounds
    pub cache: CacheConfig,
    /// Form behavior
    pub forms: FormsConfig,
    /// Notification display
    pub notifications: NotificationConfig,
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Prefix joined onto every relative request URL
    pub url_root: String,
    /// Log full request URLs and params at debug level
    pub debug_mode: bool,
    /// Running inside the hosted deployment (no resource-param encoding)
    pub hosted: bool,
    /// Request timeout in milliseconds, `0` for none
    pub timeout_ms: u64,
    /// CSRF token sent as `X-CSRF-TOKEN`
    pub csrf_token: Option<String>,
    /// Scheme and host that root-relative URLs resolve against, e.g.
    /// `https://console.example.com`
    pub origin: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url_root: String::new(),
            debug_mode: false,
            hosted: false,
            timeout_ms: 30_000,
            csrf_token: None,
            origin: None,
        }
    }
}

impl ClientConfig {
    /// Request timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Response cache bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached responses
    pub capacity: usize,
    /// Entry lifetime in milliseconds
    pub ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl_ms: 60_000,
        }
    }
}

impl CacheConfig {
    /// Entry lifetime as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Form behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    /// Quiet period before a changed field is validated
    pub debounce_ms: u64,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl FormsConfig {
    /// Debounce delay as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Notification display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Auto-hide delay for toasts
    pub auto_hide_ms: u64,
    /// Auto-hide delay for error toasts in the hosted deployment
    pub hosted_error_auto_hide_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            auto_hide_ms: 5_000,
            hosted_error_auto_hide_ms: 15_000,
        }
    }
}

impl WardenConfig {
    /// Parse configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, WardenError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, WardenError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WardenError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `WARDEN_<SECTION>_<KEY>` overrides from the process environment.
    pub fn merge_with_env(&mut self) -> Result<(), WardenError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply overrides from an iterator of `(name, value)` pairs.
    ///
    /// Names without the `WARDEN_` prefix are ignored; unknown keys under the
    /// prefix are rejected so typos surface at startup.
    pub fn merge_with_vars(
        &mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), WardenError> {
        for (name, value) in vars {
            let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let rest = rest.to_lowercase();
            let Some((section, key)) = rest.split_once('_') else {
                return Err(WardenError::config(format!("Malformed override {name}")));
            };
            self.set_from_string(&format!("{section}.{key}"), &value)?;
        }
        Ok(())
    }

    /// Set one value by dotted key, e.g. `cache.capacity`.
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), WardenError> {
        match key {
            "client.url_root" => self.client.url_root = value.to_string(),
            "client.debug_mode" => self.client.debug_mode = parse_value(key, value)?,
            "client.hosted" => self.client.hosted = parse_value(key, value)?,
            "client.timeout_ms" => self.client.timeout_ms = parse_value(key, value)?,
            "client.csrf_token" => self.client.csrf_token = Some(value.to_string()),
            "client.origin" => self.client.origin = Some(value.to_string()),
            "cache.capacity" => self.cache.capacity = parse_value(key, value)?,
            "cache.ttl_ms" => self.cache.ttl_ms = parse_value(key, value)?,
            "forms.debounce_ms" => self.forms.debounce_ms = parse_value(key, value)?,
            "notifications.auto_hide_ms" => {
                self.notifications.auto_hide_ms = parse_value(key, value)?;
            }
            "notifications.hosted_error_auto_hide_ms" => {
                self.notifications.hosted_error_auto_hide_ms = parse_value(key, value)?;
            }
            _ => return Err(WardenError::config(format!("Unknown config key {key}"))),
        }
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), WardenError> {
        let root = &self.client.url_root;
        if !(root.is_empty() || root.starts_with('/') || root.starts_with("http")) {
            return Err(WardenError::config(format!(
                "client.url_root must be empty, absolute, or a path: {root}"
            )));
        }
        if let Some(origin) = &self.client.origin {
            if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                return Err(WardenError::config(format!(
                    "client.origin must be an http(s) URL: {origin}"
                )));
            }
        }
        if self.cache.capacity == 0 {
            return Err(WardenError::config("cache.capacity must be at least 1"));
        }
        if self.forms.debounce_ms == 0 {
            return Err(WardenError::config("forms.debounce_ms must be positive"));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, WardenError> {
    value
        .trim()
        .parse()
        .map_err(|_| WardenError::config(format!("Invalid value for {key}: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = WardenConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.forms.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = WardenConfig::from_toml_str(
            r#"
            [client]
            url_root = "/api/v1"
            debug_mode = true

            [cache]
            capacity = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.client.url_root, "/api/v1");
        assert!(config.client.debug_mode);
        assert_eq!(config.cache.capacity, 16);
        assert_eq!(config.cache.ttl_ms, 60_000);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = WardenConfig::default();
        config
            .merge_with_vars(vec![
                ("WARDEN_CACHE_TTL_MS".to_string(), "1000".to_string()),
                ("WARDEN_CLIENT_HOSTED".to_string(), "true".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
            ])
            .unwrap();

        assert_eq!(config.cache.ttl_ms, 1000);
        assert!(config.client.hosted);
    }

    #[test]
    fn test_unknown_override_rejected() {
        let mut config = WardenConfig::default();
        let err = config
            .merge_with_vars(vec![("WARDEN_CACHE_SIZE".to_string(), "1".to_string())])
            .unwrap_err();
        assert!(matches!(err, WardenError::Config { .. }));
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let mut config = WardenConfig::default();
        config.cache.capacity = 0;
        assert!(config.validate().is_err());

        config.cache.capacity = 1;
        config.client.url_root = "api".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_origin_must_be_http() {
        let mut config = WardenConfig::default();
        config.client.url_root = "/service".to_string();
        config.client.origin = Some("console.example.com".to_string());
        assert!(config.validate().is_err());

        config
            .merge_with_vars(vec![(
                "WARDEN_CLIENT_ORIGIN".to_string(),
                "https://console.example.com".to_string(),
            )])
            .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_disabled_at_zero() {
        let mut client = ClientConfig::default();
        assert!(client.timeout().is_some());
        client.timeout_ms = 0;
        assert!(client.timeout().is_none());
    }
}
