//! facerec-client — Typed client for the remote face recognition API.
//!
//! Wraps the service's fixed REST endpoints (recognition, enrollment,
//! training image management) behind one async client. Every call is a
//! single round-trip: no retries, no cached state beyond [`ApiConfig`].

pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod types;

pub use client::RecognitionApiClient;
pub use config::ApiConfig;
pub use error::{ClientError, ConfigError, Endpoint};
pub use types::{
    ConfidenceLevel, Detection, EmployeeListing, EnrollmentRequest, EnrollmentResult,
    HealthStatus, RecognitionRequest, RecognitionResult, ServerReply, ServiceInfo, TrainingImage,
};
