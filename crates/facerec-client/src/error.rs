use std::fmt;
use thiserror::Error;

/// The remote operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ServiceInfo,
    Health,
    Recognize,
    RecognizeFile,
    Enroll,
    ListTrainingImages,
    DeleteTrainingImage,
    ReloadModel,
}

impl Endpoint {
    /// HTTP method and path template, as documented by the service.
    pub fn route(self) -> (&'static str, &'static str) {
        match self {
            Endpoint::ServiceInfo => ("GET", "/"),
            Endpoint::Health => ("GET", "/health"),
            Endpoint::Recognize => ("POST", "/recognize"),
            Endpoint::RecognizeFile => ("POST", "/recognize/file"),
            Endpoint::Enroll => ("POST", "/training_image/add"),
            Endpoint::ListTrainingImages => ("GET", "/training_image/list"),
            Endpoint::DeleteTrainingImage => ("DELETE", "/training_image/delete/{employee_id}"),
            Endpoint::ReloadModel => ("POST", "/training_image/reload"),
        }
    }

    fn failure(self) -> &'static str {
        match self {
            Endpoint::ServiceInfo => "service unavailable",
            Endpoint::Health => "health check failed",
            Endpoint::Recognize | Endpoint::RecognizeFile => "recognition failed",
            Endpoint::Enroll => "enrollment failed",
            Endpoint::ListTrainingImages => "listing failed",
            Endpoint::DeleteTrainingImage => "training image removal failed",
            Endpoint::ReloadModel => "model reload failed",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (method, path) = self.route();
        write!(f, "{method} {path}")
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    /// No response was received: connect/DNS failure, timeout, or a body read that broke off.
    #[error("transport error on {endpoint}: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
    /// The service answered with a non-success status. `body` is kept verbatim.
    #[error("{} ({status}): {body}", .endpoint.failure())]
    HttpStatus {
        endpoint: Endpoint,
        status: u16,
        body: String,
    },
    /// The service answered 200 but the body did not match the expected shape.
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
    /// Caller input was rejected before any request was sent.
    #[error("invalid request: {0}")]
    Validation(String),
}

impl ClientError {
    /// HTTP status for `HttpStatus` failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body for `HttpStatus` failures.
    pub fn body(&self) -> Option<&str> {
        match self {
            ClientError::HttpStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        match self {
            ClientError::Transport { endpoint, .. }
            | ClientError::HttpStatus { endpoint, .. }
            | ClientError::Decode { endpoint, .. } => Some(*endpoint),
            ClientError::Validation(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport { source, .. } if source.is_timeout())
    }

    /// Whether repeating the same call could plausibly succeed.
    ///
    /// Only transport failures qualify; a status error or a decode error
    /// will come back the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }

    /// The server's `detail` (or `message`) field, when the error body is JSON.
    pub fn server_detail(&self) -> Option<String> {
        let body = self.body()?;
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        match value.get("detail").or_else(|| value.get("message"))? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("API key is empty")]
    MissingApiKey,
    #[error("API key has leading or trailing whitespace")]
    ApiKeyWhitespace,
    #[error("{0} timeout must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(endpoint: Endpoint, status: u16, body: &str) -> ClientError {
        ClientError::HttpStatus {
            endpoint,
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_status_error_display_names_failure() {
        let err = status_error(Endpoint::Health, 401, r#"{"detail": "invalid api key"}"#);
        assert_eq!(
            err.to_string(),
            r#"health check failed (401): {"detail": "invalid api key"}"#
        );

        let err = status_error(Endpoint::ServiceInfo, 503, "down");
        assert_eq!(err.to_string(), "service unavailable (503): down");
    }

    #[test]
    fn test_status_and_body_accessors() {
        let err = status_error(Endpoint::Enroll, 422, "bad");
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.body(), Some("bad"));
        assert_eq!(err.endpoint(), Some(Endpoint::Enroll));
        assert!(!err.is_retryable());

        let err = ClientError::Validation("employee id is required".into());
        assert_eq!(err.status(), None);
        assert_eq!(err.endpoint(), None);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_server_detail_extraction() {
        let err = status_error(Endpoint::Recognize, 401, r#"{"detail": "invalid api key"}"#);
        assert_eq!(err.server_detail().as_deref(), Some("invalid api key"));

        // FastAPI validation errors carry a list under `detail`.
        let err = status_error(
            Endpoint::Enroll,
            422,
            r#"{"detail": [{"loc": ["body", "employee_id"], "msg": "field required"}]}"#,
        );
        let detail = err.server_detail().unwrap();
        assert!(detail.contains("employee_id"));

        let err = status_error(Endpoint::Recognize, 500, "Internal Server Error");
        assert_eq!(err.server_detail(), None);
    }

    #[test]
    fn test_endpoint_routes() {
        assert_eq!(Endpoint::RecognizeFile.to_string(), "POST /recognize/file");
        assert_eq!(Endpoint::ListTrainingImages.route(), ("GET", "/training_image/list"));
    }
}
