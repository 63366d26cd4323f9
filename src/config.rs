//! Connection settings for the document service.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. The builder clamps numeric knobs to sane ranges
//! and [`ClientConfigBuilder::build`] rejects what cannot be clamped (an
//! unparseable base URL, a prefix without a leading slash).

use crate::error::MergeError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for talking to the document service.
///
/// # Example
/// ```rust
/// use docmerge_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://docs.internal:8000")
///     .request_timeout_secs(10)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_root().unwrap().as_str(), "http://docs.internal:8000/api/v1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Scheme, host and port of the service. Default: `http://localhost:8000`.
    pub base_url: String,

    /// Versioned API prefix every endpoint lives under. Default: `/api/v1`.
    pub api_prefix: String,

    /// Timeout for queue and listing requests in seconds. Default: 30.
    pub request_timeout_secs: u64,

    /// Deadline for a merge job in seconds. Default: 300.
    ///
    /// Merging is the one call whose cost grows with the queue: a few hundred
    /// pages from several sources can keep the server busy for minutes.
    pub execute_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_prefix: "/api/v1".to_string(),
            request_timeout_secs: 30,
            execute_timeout_secs: 300,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// `base_url` joined with `api_prefix`, without a trailing slash.
    ///
    /// Only fails for configs that bypassed the builder.
    pub fn api_root(&self) -> Result<Url, MergeError> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_prefix.trim_matches('/')
        );
        let joined = joined.trim_end_matches('/');
        Url::parse(joined)
            .map_err(|e| MergeError::InvalidConfig(format!("invalid base URL '{}': {e}", self.base_url)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn execute_timeout(&self) -> Duration {
        Duration::from_secs(self.execute_timeout_secs)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.api_prefix = prefix.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.clamp(1, 600);
        self
    }

    pub fn execute_timeout_secs(mut self, secs: u64) -> Self {
        self.config.execute_timeout_secs = secs.clamp(1, 3600);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, MergeError> {
        let c = &self.config;
        let url = Url::parse(&c.base_url)
            .map_err(|e| MergeError::InvalidConfig(format!("invalid base URL '{}': {e}", c.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MergeError::InvalidConfig(format!(
                "base URL must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if !c.api_prefix.is_empty() && !c.api_prefix.starts_with('/') {
            return Err(MergeError::InvalidConfig(format!(
                "API prefix must start with '/', got '{}'",
                c.api_prefix
            )));
        }
        c.api_root()?;
        Ok(self.config)
    }
}
