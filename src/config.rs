//! Provider settings.

use crate::error::Error;
use std::env;
use std::fmt;
use std::time::Duration;

/// Default AI/ML API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.aimlapi.com/v1";

/// Site attribution sent when none is configured.
pub const DEFAULT_SITE_NAME: &str = "Casibase";
pub const DEFAULT_SITE_URL: &str = "https://casibase.org";

/// Immutable per-provider settings. Build with [`ProviderConfig::builder`].
#[derive(Clone)]
pub struct ProviderConfig {
    pub(crate) model: String,
    pub(crate) secret_key: String,
    pub(crate) site_name: String,
    pub(crate) site_url: String,
    pub(crate) temperature: f64,
    pub(crate) top_p: f64,
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
}

impl ProviderConfig {
    pub fn builder() -> ProviderConfigBuilder {
        ProviderConfigBuilder::new()
    }

    /// Configured model identifier. May be empty.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn top_p(&self) -> f64 {
        self.top_p
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Attribution sent as `X-Title` and `HTTP-Referer`.
    pub fn site(&self) -> (&str, &str) {
        (&self.site_name, &self.site_url)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("model", &self.model)
            .field("secret_key", &"<redacted>")
            .field("site_name", &self.site_name)
            .field("site_url", &self.site_url)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builder for [`ProviderConfig`].
#[derive(Debug, Clone)]
pub struct ProviderConfigBuilder {
    config: ProviderConfig,
}

impl ProviderConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ProviderConfig {
                model: String::new(),
                secret_key: String::new(),
                site_name: DEFAULT_SITE_NAME.to_string(),
                site_url: DEFAULT_SITE_URL.to_string(),
                temperature: 1.0,
                top_p: 1.0,
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout: Duration::from_secs(120),
            },
        }
    }

    /// Model identifier; empty selects the provider default.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn secret_key(mut self, key: impl Into<String>) -> Self {
        self.config.secret_key = key.into();
        self
    }

    /// Site attribution sent with every request.
    pub fn site(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.config.site_name = name.into();
        self.config.site_url = url.into();
        self
    }

    /// Set temperature for sampling.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set top-p for nucleus sampling.
    pub fn top_p(mut self, top_p: f64) -> Self {
        self.config.top_p = top_p;
        self
    }

    /// Set a custom base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Load settings from `AIMLAPI_API_KEY`, `AIMLAPI_MODEL` and `AIMLAPI_BASE_URL`.
    pub fn from_env(mut self) -> Self {
        if let Ok(key) = env::var("AIMLAPI_API_KEY") {
            self.config.secret_key = key;
        }
        if let Ok(model) = env::var("AIMLAPI_MODEL") {
            self.config.model = model;
        }
        if let Ok(url) = env::var("AIMLAPI_BASE_URL") {
            self.config.base_url = url;
        }
        self
    }

    pub fn build(self) -> Result<ProviderConfig, Error> {
        let config = self.config;
        if !(0.0..=2.0).contains(&config.temperature) {
            return Err(Error::Config(format!(
                "temperature must be within 0..=2, got {}",
                config.temperature
            )));
        }
        if !(0.0..=1.0).contains(&config.top_p) {
            return Err(Error::Config(format!(
                "top_p must be within 0..=1, got {}",
                config.top_p
            )));
        }
        if config.base_url.is_empty() {
            return Err(Error::Config("base url is empty".into()));
        }
        Ok(config)
    }
}

impl Default for ProviderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ProviderConfig::builder().secret_key("k").build().unwrap();
        assert_eq!(config.model(), "");
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(config.temperature(), 1.0);
        assert_eq!(config.top_p(), 1.0);
        assert_eq!(config.site(), (DEFAULT_SITE_NAME, DEFAULT_SITE_URL));
    }

    #[test]
    fn test_builder_overrides() {
        let config = ProviderConfig::builder()
            .model("deepseek-chat")
            .temperature(0.2)
            .top_p(0.9)
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(config.model(), "deepseek-chat");
        assert_eq!(config.temperature(), 0.2);
        assert_eq!(config.top_p(), 0.9);
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_out_of_range_sampling() {
        assert!(matches!(
            ProviderConfig::builder().temperature(2.5).build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ProviderConfig::builder().top_p(-0.1).build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ProviderConfig::builder().top_p(f64::NAN).build(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ProviderConfig::builder().secret_key("sk-secret").build().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
