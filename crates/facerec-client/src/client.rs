//! Async client for the recognition service.

use crate::config::ApiConfig;
use crate::encoding::mime_for_filename;
use crate::error::{ClientError, ConfigError, Endpoint};
use crate::types::{
    EmployeeListing, EnrollmentRequest, EnrollmentResult, HealthStatus, RecognitionRequest,
    RecognitionResult, ServerReply, ServiceInfo,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Instant;

/// Header carrying the static API key on every authenticated call.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Typed wrapper over the recognition service's REST endpoints.
///
/// Each method performs exactly one HTTP round-trip and either returns the
/// decoded response or a [`ClientError`] describing why it could not.
/// Nothing is retried here; use [`ClientError::is_retryable`] to decide.
pub struct RecognitionApiClient {
    config: ApiConfig,
    http: reqwest::Client,
}

impl RecognitionApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            // Connections are not kept idle between calls.
            .pool_max_idle_per_host(0)
            .user_agent(concat!("facerec/", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::info!(base_url = %config.base_url(), "recognition client initialized");

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// `GET /` — unauthenticated service description.
    pub async fn service_info(&self) -> Result<ServiceInfo, ClientError> {
        let url = self.config.endpoint_url("");
        let request = self.http.get(url);
        self.execute(Endpoint::ServiceInfo, request).await
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let request = self.authed(Method::GET, "health");
        self.execute(Endpoint::Health, request).await
    }

    /// `POST /recognize` with the image as base64 JSON.
    pub async fn recognize(
        &self,
        request: &RecognitionRequest,
    ) -> Result<RecognitionResult, ClientError> {
        require_image(&request.image_bytes)?;

        let builder = self
            .authed(Method::POST, "recognize")
            .timeout(self.config.recognition_timeout())
            .json(request);
        let result: RecognitionResult = self.execute(Endpoint::Recognize, builder).await?;

        tracing::debug!(
            detections = result.detections.len(),
            server_ms = result.processing_time_ms,
            "recognize: decoded result"
        );
        Ok(result)
    }

    /// `POST /recognize/file` with the image as a raw multipart `file` part.
    ///
    /// Only the API key header is set; the multipart encoder supplies the
    /// content type and boundary.
    pub async fn recognize_file(
        &self,
        image_bytes: Vec<u8>,
        filename: &str,
    ) -> Result<RecognitionResult, ClientError> {
        require_image(&image_bytes)?;
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(ClientError::Validation("upload filename is required".into()));
        }

        let part = Part::bytes(image_bytes)
            .file_name(filename.to_string())
            .mime_str(mime_for_filename(filename))
            .map_err(|e| ClientError::Validation(format!("invalid file part: {e}")))?;
        let form = Form::new().part("file", part);

        let builder = self
            .authed(Method::POST, "recognize/file")
            .timeout(self.config.recognition_timeout())
            .multipart(form);
        self.execute(Endpoint::RecognizeFile, builder).await
    }

    /// `POST /training_image/add` — register a face image for an employee.
    ///
    /// An empty employee id or image is rejected without contacting the server.
    pub async fn enroll_employee(
        &self,
        request: &EnrollmentRequest,
    ) -> Result<EnrollmentResult, ClientError> {
        require_employee_id(&request.employee_id)?;
        require_image(&request.image_bytes)?;

        let builder = self
            .authed(Method::POST, "training_image/add")
            .timeout(self.config.recognition_timeout())
            .json(request);
        let result: EnrollmentResult = self.execute(Endpoint::Enroll, builder).await?;

        tracing::info!(
            employee_id = %result.employee_id,
            quality = result.quality_score,
            "training image added"
        );
        Ok(result)
    }

    /// `GET /training_image/list`
    pub async fn list_employees(&self) -> Result<EmployeeListing, ClientError> {
        let request = self.authed(Method::GET, "training_image/list");
        self.execute(Endpoint::ListTrainingImages, request).await
    }

    /// `DELETE /training_image/delete/{employee_id}`
    pub async fn delete_training_image(&self, employee_id: &str) -> Result<ServerReply, ClientError> {
        require_employee_id(employee_id)?;

        let mut url = self.config.endpoint_url("training_image/delete");
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation("base URL cannot carry a path".into()))?
            .push(employee_id);

        let request = self
            .http
            .delete(url)
            .header(API_KEY_HEADER, self.config.api_key());
        let reply: ServerReply = self.execute(Endpoint::DeleteTrainingImage, request).await?;

        tracing::info!(employee_id, "training image removed");
        Ok(reply)
    }

    /// `POST /training_image/reload` — ask the service to rebuild its gallery.
    pub async fn reload_model(&self) -> Result<ServerReply, ClientError> {
        let request = self.authed(Method::POST, "training_image/reload");
        self.execute(Endpoint::ReloadModel, request).await
    }

    fn authed(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.config.endpoint_url(path))
            .header(API_KEY_HEADER, self.config.api_key())
    }

    /// Send one request and decode a `200 OK` JSON body into `T`.
    ///
    /// Any other status, including other 2xx codes, is a [`ClientError::HttpStatus`].
    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let started = Instant::now();
        tracing::debug!(%endpoint, "sending request");

        let response = request.send().await.map_err(|source| {
            tracing::warn!(%endpoint, error = %source, "request failed before a response");
            ClientError::Transport { endpoint, source }
        })?;

        let status = response.status();

        if status != StatusCode::OK {
            // A truncated error body still reports the status.
            let body = response.text().await.unwrap_or_else(|error| {
                tracing::debug!(%endpoint, %error, "error body could not be read");
                String::new()
            });
            let elapsed_ms = started.elapsed().as_millis() as u64;
            tracing::warn!(%endpoint, status = status.as_u16(), elapsed_ms, "service returned an error");
            return Err(ClientError::HttpStatus {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Transport { endpoint, source })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(%endpoint, status = status.as_u16(), elapsed_ms, "response received");

        serde_json::from_str(&body).map_err(|source| {
            tracing::warn!(%endpoint, error = %source, "response did not match the expected shape");
            ClientError::Decode { endpoint, source }
        })
    }
}

/// Blank ids are rejected; anything else is sent exactly as given.
fn require_employee_id(employee_id: &str) -> Result<(), ClientError> {
    if employee_id.trim().is_empty() {
        return Err(ClientError::Validation("employee id is required".into()));
    }
    Ok(())
}

fn require_image(bytes: &[u8]) -> Result<(), ClientError> {
    if bytes.is_empty() {
        return Err(ClientError::Validation("image is empty".into()));
    }
    Ok(())
}
