//! Capability configuration sources
//!
//! A [`ConfigSource`] produces a parsed and validated [`CapabilityConfig`] or
//! a [`ConfigError`]. It is called once at startup and once per refresh tick.

use crate::error::ConfigError;
use crate::models::CapabilityConfig;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self) -> Result<CapabilityConfig, ConfigError>;

    /// Human-readable location, used in logs
    fn describe(&self) -> String;
}

/// Pulls the config document from a control-plane URL with `GET`
#[derive(Clone)]
pub struct HttpConfigSource {
    url: String,
    client: reqwest::Client,
}

impl HttpConfigSource {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn fetch(&self) -> Result<CapabilityConfig, ConfigError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ConfigError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfigError::Status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("").to_string(),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ConfigError::Unreachable(e.to_string()))?;

        CapabilityConfig::from_json_str(&body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Reads the config document from disk on every fetch
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn fetch(&self) -> Result<CapabilityConfig, ConfigError> {
        let document = tokio::fs::read_to_string(&self.path).await?;
        CapabilityConfig::from_json_str(&document)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Serves a fixed in-memory config, typically one built in code with local
/// handlers
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
    config: CapabilityConfig,
}

impl StaticConfigSource {
    pub fn new(config: CapabilityConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn fetch(&self) -> Result<CapabilityConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config.clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

/// Picks a source for a location string: `http://` and `https://` URLs are
/// fetched over HTTP, everything else is treated as a file path.
pub fn config_source_from_location(location: &str) -> Arc<dyn ConfigSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Arc::new(HttpConfigSource::new(location))
    } else {
        Arc::new(FileConfigSource::new(location))
    }
}
