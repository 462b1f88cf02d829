use crate::error::ConfigError;
use reqwest::Url;
use std::fmt;
use std::time::Duration;

/// Default timeout for `/recognize`, `/recognize/file` and enrollment calls.
pub const DEFAULT_RECOGNITION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for every other call (info, health, listing, admin).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for one recognition service.
///
/// Built once and handed to [`RecognitionApiClient::new`](crate::RecognitionApiClient::new).
/// Fields are private; the only way to change a value is to build a new config.
#[derive(Clone)]
pub struct ApiConfig {
    base_url: Url,
    api_key: String,
    recognition_timeout: Duration,
    request_timeout: Duration,
}

impl ApiConfig {
    /// Validate and build a config with default timeouts.
    ///
    /// The base URL must be absolute `http` or `https`. A trailing path
    /// (e.g. `https://host/api`) is kept and endpoint paths are appended to it.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim();
        let mut url =
            Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl(format!("{trimmed}: {e}")))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidBaseUrl(format!(
                "{trimmed}: unsupported scheme {:?}",
                url.scheme()
            )));
        }
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(ConfigError::InvalidBaseUrl(format!("{trimmed}: missing host")));
        }

        // Normalize so joining endpoint paths never drops a path prefix.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);

        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if api_key.trim() != api_key {
            return Err(ConfigError::ApiKeyWhitespace);
        }

        Ok(Self {
            base_url: url,
            api_key,
            recognition_timeout: DEFAULT_RECOGNITION_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_recognition_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("recognition"));
        }
        self.recognition_timeout = timeout;
        Ok(self)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("request"));
        }
        self.request_timeout = timeout;
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn recognition_timeout(&self) -> Duration {
        self.recognition_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Resolve an endpoint path (no leading slash) against the base URL.
    pub(crate) fn endpoint_url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!("{}{}", self.base_url.path(), path.trim_start_matches('/'));
        url.set_path(&joined);
        url
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("recognition_timeout", &self.recognition_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
