//! HTTP quote source
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use chrono::Utc;
use log::{debug, info};
use std::time::Duration;
use url::Url;

use super::api::{Post, PushRequest};
use super::{QuoteSource, normalize_posts};
use crate::config::QuotebookConfig;
use crate::error::{QuoteError, Result};
use crate::models::Quote;

/// Quote source backed by a JSON post listing endpoint
pub struct HttpQuoteSource {
    agent: ureq::Agent,
    endpoint: Url,
    category: String,
    limit: Option<usize>,
}

impl HttpQuoteSource {
    /// Create a source for the given endpoint
    ///
    /// # Arguments
    /// * `endpoint` - URL of the record listing resource
    /// * `category` - Category label given to every fetched quote
    /// * `timeout` - Overall per-request timeout
    pub fn new(endpoint: Url, category: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            agent,
            endpoint,
            category: category.into(),
            limit: None,
        }
    }

    /// Build a source from loaded configuration
    ///
    /// Settings are validated first so fetched quotes always get a usable
    /// category.
    pub fn from_config(config: &QuotebookConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| QuoteError::Validation(format!("{:#}", e)))?;
        let endpoint = config
            .endpoint_url()
            .map_err(|e| QuoteError::Validation(format!("{:#}", e)))?;
        Ok(Self::new(endpoint, &config.remote_category, config.request_timeout())
            .with_limit(config.remote_limit))
    }

    /// Keep at most `limit` remote records per fetch
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Describe a ureq failure for the user
fn transport_error(action: &str, err: ureq::Error) -> QuoteError {
    match err {
        ureq::Error::StatusCode(code) => {
            QuoteError::Transport(format!("{} failed with HTTP status {}", action, code))
        }
        other => QuoteError::Transport(format!("{} failed: {}", action, other)),
    }
}

impl QuoteSource for HttpQuoteSource {
    fn fetch(&self) -> Result<Vec<Quote>> {
        debug!("Fetching quotes from {}", self.endpoint);

        let mut response = self
            .agent
            .get(self.endpoint.as_str())
            .header("Accept", "application/json")
            .call()
            .map_err(|e| transport_error("Fetching quotes", e))?;

        let posts: Vec<Post> = response
            .body_mut()
            .read_json()
            .map_err(|e| transport_error("Reading quotes response", e))?;

        let quotes = normalize_posts(posts, &self.category, self.limit);
        info!("Fetched {} quotes from server", quotes.len());
        Ok(quotes)
    }

    fn push(&self, quotes: &[Quote]) -> Result<()> {
        let request = PushRequest {
            quotes,
            pushed_at: Utc::now(),
        };

        // The mock endpoint echoes the payload back without storing it
        self.agent
            .post(self.endpoint.as_str())
            .send_json(&request)
            .map_err(|e| transport_error("Pushing quotes", e))?;

        info!("Pushed {} quotes to server", quotes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_uses_settings() {
        let config = QuotebookConfig {
            remote_category: "Remote".to_string(),
            remote_limit: Some(5),
            ..QuotebookConfig::default()
        };
        let source = HttpQuoteSource::from_config(&config).unwrap();
        assert_eq!(source.category, "Remote");
        assert_eq!(source.limit, Some(5));
        assert_eq!(source.endpoint().as_str(), config.endpoint);
    }

    #[test]
    fn test_from_config_rejects_bad_endpoint() {
        let config = QuotebookConfig {
            endpoint: "not a url".to_string(),
            ..QuotebookConfig::default()
        };
        assert!(matches!(
            HttpQuoteSource::from_config(&config),
            Err(QuoteError::Validation(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_reserved_category() {
        let config = QuotebookConfig {
            remote_category: "ALL".to_string(),
            ..QuotebookConfig::default()
        };
        assert!(matches!(
            HttpQuoteSource::from_config(&config),
            Err(QuoteError::Validation(_))
        ));
    }

    #[test]
    fn test_unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let endpoint = Url::parse("http://127.0.0.1:9/posts").unwrap();
        let source = HttpQuoteSource::new(endpoint, "Server", Duration::from_secs(2));
        assert!(matches!(source.fetch(), Err(QuoteError::Transport(_))));
    }
}
