use std::sync::Arc;
use std::time::Duration;

use pgpt_core::{DocumentService, Result};
use url::Url;

pub mod http;
pub mod normalize;

pub use http::HttpDocumentService;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend; endpoint paths are joined onto it.
    pub api_url: Url,
    /// Unset means the transport default.
    pub timeout: Option<Duration>,
    /// Legacy behaviour: retry a failed upload exactly once before reporting the error.
    pub retry_upload_once: bool,
}

impl ClientConfig {
    pub fn new(api_url: &str) -> Result<Self> {
        let mut api_url = Url::parse(api_url)?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        Ok(Self {
            api_url,
            timeout: None,
            retry_upload_once: false,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_upload_retry(mut self, enabled: bool) -> Self {
        self.retry_upload_once = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL).expect("default API URL is valid")
    }
}

pub fn create_service(config: ClientConfig) -> Result<Arc<dyn DocumentService>> {
    tracing::debug!("Using backend at {}", config.api_url);
    Ok(Arc::new(HttpDocumentService::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_gets_a_trailing_slash() {
        let config = ClientConfig::new("https://policies.example.com/api").unwrap();
        assert_eq!(
            config.api_url.join("upload").unwrap().as_str(),
            "https://policies.example.com/api/upload"
        );

        let config = ClientConfig::new("http://localhost:8000").unwrap();
        assert_eq!(
            config.api_url.join("languages").unwrap().as_str(),
            "http://localhost:8000/languages"
        );
    }

    #[test]
    fn rejects_garbage_urls() {
        assert!(matches!(ClientConfig::new("not a url"), Err(pgpt_core::Error::InvalidUrl(_))));
    }

    #[test]
    fn defaults_to_local_backend_without_retry() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url.as_str(), DEFAULT_API_URL);
        assert!(config.timeout.is_none());
        assert!(!config.retry_upload_once);
    }
}
