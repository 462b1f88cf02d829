use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Similarity at or above which a match is reported as [`ConfidenceLevel::High`].
pub const HIGH_THRESHOLD: f32 = 0.65;
/// Similarity at or above which a match is reported as [`ConfidenceLevel::Medium`].
pub const MEDIUM_THRESHOLD: f32 = 0.45;
/// Lowest similarity the service still reports as a match.
pub const LOW_THRESHOLD: f32 = 0.35;

/// Confidence band of a recognized face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Band for a cosine similarity. `None` below [`LOW_THRESHOLD`] (and for NaN).
    pub fn classify(similarity: f32) -> Option<Self> {
        if similarity >= HIGH_THRESHOLD {
            Some(ConfidenceLevel::High)
        } else if similarity >= MEDIUM_THRESHOLD {
            Some(ConfidenceLevel::Medium)
        } else if similarity >= LOW_THRESHOLD {
            Some(ConfidenceLevel::Low)
        } else {
            None
        }
    }

    /// Parse a server label. The service has shipped both English and French labels.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "HIGH" | "HAUTE" => Some(ConfidenceLevel::High),
            "MEDIUM" | "MOYENNE" => Some(ConfidenceLevel::Medium),
            "LOW" | "FAIBLE" => Some(ConfidenceLevel::Low),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::High => "HIGH",
            ConfidenceLevel::Medium => "MEDIUM",
            ConfidenceLevel::Low => "LOW",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lenient_level<'de, D>(deserializer: D) -> Result<Option<ConfidenceLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let label = Option::<String>::deserialize(deserializer)?;
    Ok(label.as_deref().and_then(ConfidenceLevel::from_label))
}

/// Body of `POST /recognize`.
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionRequest {
    #[serde(rename = "image_base64", serialize_with = "serialize_base64")]
    pub image_bytes: Vec<u8>,
    pub return_embeddings: bool,
    pub return_quality_info: bool,
    /// Server-side minimum similarity. Omitted from the body when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f32>,
}

impl RecognitionRequest {
    /// Request with quality info on and embeddings off.
    pub fn new(image_bytes: Vec<u8>) -> Self {
        Self {
            image_bytes,
            return_embeddings: false,
            return_quality_info: true,
            confidence_threshold: None,
        }
    }
}

/// Body of `POST /training_image/add`.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentRequest {
    pub employee_id: String,
    /// Sent as an empty string when absent.
    #[serde(serialize_with = "serialize_optional_name")]
    pub employee_name: Option<String>,
    #[serde(rename = "image_base64", serialize_with = "serialize_base64")]
    pub image_bytes: Vec<u8>,
}

impl EnrollmentRequest {
    pub fn new(employee_id: impl Into<String>, image_bytes: Vec<u8>) -> Self {
        Self {
            employee_id: employee_id.into(),
            employee_name: None,
            image_bytes,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.employee_name = if name.trim().is_empty() { None } else { Some(name) };
        self
    }
}

fn serialize_base64<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&crate::encoding::encode_image(bytes))
}

fn serialize_optional_name<S: serde::Serializer>(
    name: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(name.as_deref().unwrap_or(""))
}

/// One face found in a recognition frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    pub name: String,
    /// Label as reported by the server; `None` when missing or unrecognized.
    #[serde(default, deserialize_with = "lenient_level")]
    pub confidence_level: Option<ConfidenceLevel>,
    pub similarity: f32,
    /// Present when quality info was requested.
    #[serde(default)]
    pub quality_score: Option<f32>,
    /// `[x1, y1, x2, y2]` in frame pixels.
    pub bbox: [f32; 4],
    /// Present when embeddings were requested.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl Detection {
    /// Server label, or the band derived from `similarity` when the server gave none.
    pub fn confidence(&self) -> Option<ConfidenceLevel> {
        self.confidence_level
            .or_else(|| ConfidenceLevel::classify(self.similarity))
    }
}

/// Response of `POST /recognize` and `POST /recognize/file`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecognitionResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub processing_time_ms: f64,
    pub frame_width: u32,
    pub frame_height: u32,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

/// Response of `GET /health`, flattened out of its `model_info` object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "HealthWire")]
pub struct HealthStatus {
    pub status: String,
    pub loaded_persons: u64,
    pub model_name: String,
    /// Detector input size, e.g. `"640x640"` or `"[640, 640]"`.
    pub det_size: String,
}

#[derive(Deserialize)]
struct HealthWire {
    status: String,
    loaded_persons: u64,
    model_info: ModelInfoWire,
}

#[derive(Deserialize)]
struct ModelInfoWire {
    model_name: String,
    det_size: serde_json::Value,
}

impl From<HealthWire> for HealthStatus {
    fn from(wire: HealthWire) -> Self {
        let det_size = match wire.model_info.det_size {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Self {
            status: wire.status,
            loaded_persons: wire.loaded_persons,
            model_name: wire.model_info.model_name,
            det_size,
        }
    }
}

/// Response of `GET /`. The service describes itself freely, so fields are kept as-is.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ServiceInfo {
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ServiceInfo {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name").or_else(|| self.get_str("message"))
    }

    pub fn version(&self) -> Option<&str> {
        self.get_str("version")
    }
}

/// Response of `POST /training_image/add`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "EnrollmentWire")]
pub struct EnrollmentResult {
    pub message: String,
    pub employee_id: String,
    pub image_path: String,
    pub quality_score: f32,
    pub face_size_px: f32,
}

#[derive(Deserialize)]
struct EnrollmentWire {
    message: String,
    employee_id: String,
    image_path: String,
    quality_info: QualityInfoWire,
}

#[derive(Deserialize)]
struct QualityInfoWire {
    quality_score: f32,
    face_size: f32,
}

impl From<EnrollmentWire> for EnrollmentResult {
    fn from(wire: EnrollmentWire) -> Self {
        Self {
            message: wire.message,
            employee_id: wire.employee_id,
            image_path: wire.image_path,
            quality_score: wire.quality_info.quality_score,
            face_size_px: wire.quality_info.face_size,
        }
    }
}

/// One stored training image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainingImage {
    pub index: u32,
    pub employee_id: String,
    pub filename: String,
    pub file_size_kb: f64,
}

/// Response of `GET /training_image/list`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmployeeListing {
    pub total: u64,
    #[serde(default)]
    pub images: Vec<TrainingImage>,
}

/// Acknowledgement returned by the admin endpoints (delete, reload).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerReply {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(ConfidenceLevel::classify(0.91), Some(ConfidenceLevel::High));
        assert_eq!(ConfidenceLevel::classify(0.65), Some(ConfidenceLevel::High));
        assert_eq!(ConfidenceLevel::classify(0.6499), Some(ConfidenceLevel::Medium));
        assert_eq!(ConfidenceLevel::classify(0.45), Some(ConfidenceLevel::Medium));
        assert_eq!(ConfidenceLevel::classify(0.4499), Some(ConfidenceLevel::Low));
        assert_eq!(ConfidenceLevel::classify(0.35), Some(ConfidenceLevel::Low));
        assert_eq!(ConfidenceLevel::classify(0.3499), None);
        assert_eq!(ConfidenceLevel::classify(-1.0), None);
        assert_eq!(ConfidenceLevel::classify(f32::NAN), None);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let mut previous = None;
        for step in 0..=100 {
            let level = ConfidenceLevel::classify(step as f32 / 100.0);
            assert!(level >= previous, "band dropped at similarity {}", step as f32 / 100.0);
            previous = level;
        }
    }

    #[test]
    fn test_from_label_accepts_both_languages() {
        assert_eq!(ConfidenceLevel::from_label("HIGH"), Some(ConfidenceLevel::High));
        assert_eq!(ConfidenceLevel::from_label("haute"), Some(ConfidenceLevel::High));
        assert_eq!(ConfidenceLevel::from_label("Moyenne"), Some(ConfidenceLevel::Medium));
        assert_eq!(ConfidenceLevel::from_label("FAIBLE"), Some(ConfidenceLevel::Low));
        assert_eq!(ConfidenceLevel::from_label("UNKNOWN"), None);
    }

    #[test]
    fn test_recognition_request_body() {
        let body = serde_json::to_value(RecognitionRequest::new(b"abc".to_vec())).unwrap();
        assert_eq!(
            body,
            json!({
                "image_base64": "YWJj",
                "return_embeddings": false,
                "return_quality_info": true,
            })
        );

        let mut request = RecognitionRequest::new(b"abc".to_vec());
        request.confidence_threshold = Some(0.5);
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(body["confidence_threshold"], json!(0.5));
    }

    #[test]
    fn test_enrollment_request_body() {
        let body = serde_json::to_value(EnrollmentRequest::new("EMP001", b"abc".to_vec())).unwrap();
        assert_eq!(
            body,
            json!({"employee_id": "EMP001", "employee_name": "", "image_base64": "YWJj"})
        );

        let request = EnrollmentRequest::new("EMP001", vec![1]).with_name("Awa Diop");
        assert_eq!(request.employee_name.as_deref(), Some("Awa Diop"));
        let request = EnrollmentRequest::new("EMP001", vec![1]).with_name("  ");
        assert_eq!(request.employee_name, None);
    }

    #[test]
    fn test_decode_recognition_result() {
        let result: RecognitionResult = serde_json::from_value(json!({
            "success": true,
            "message": "ok",
            "processing_time_ms": 12.5,
            "frame_width": 640,
            "frame_height": 480,
            "detections": [{
                "name": "Alice",
                "confidence_level": "HIGH",
                "similarity": 0.91,
                "quality_score": 0.8,
                "bbox": [10, 20, 100, 120]
            }]
        }))
        .unwrap();

        assert_eq!(result.frame_width, 640);
        assert_eq!(result.detections.len(), 1);
        let det = &result.detections[0];
        assert_eq!(det.name, "Alice");
        assert_eq!(det.confidence_level, Some(ConfidenceLevel::High));
        assert_eq!(det.bbox, [10.0, 20.0, 100.0, 120.0]);
        assert_eq!(det.quality_score, Some(0.8));
        assert!(det.embedding.is_none());
    }

    #[test]
    fn test_detection_confidence_falls_back_to_similarity() {
        let det: Detection = serde_json::from_value(json!({
            "name": "Unknown",
            "confidence_level": null,
            "similarity": 0.5,
            "bbox": [0, 0, 1, 1]
        }))
        .unwrap();
        assert_eq!(det.confidence_level, None);
        assert_eq!(det.confidence(), Some(ConfidenceLevel::Medium));
    }

    #[test]
    fn test_decode_health_flattens_model_info() {
        let health: HealthStatus = serde_json::from_value(json!({
            "status": "healthy",
            "loaded_persons": 12,
            "model_info": {"model_name": "buffalo_l", "det_size": [640, 640]}
        }))
        .unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.loaded_persons, 12);
        assert_eq!(health.model_name, "buffalo_l");
        assert_eq!(health.det_size, "[640,640]");
    }

    #[test]
    fn test_decode_health_missing_model_info_fails() {
        let result = serde_json::from_value::<HealthStatus>(json!({
            "status": "healthy",
            "loaded_persons": 1
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_enrollment_result() {
        let result: EnrollmentResult = serde_json::from_value(json!({
            "message": "Image ajoutée",
            "employee_id": "EMP001",
            "image_path": "training/EMP001.jpg",
            "quality_info": {"quality_score": 0.87, "face_size": 182.0}
        }))
        .unwrap();
        assert_eq!(result.employee_id, "EMP001");
        assert_eq!(result.face_size_px, 182.0);
        assert!((result.quality_score - 0.87).abs() < 1e-6);
    }

    #[test]
    fn test_decode_listing_keeps_order() {
        let listing: EmployeeListing = serde_json::from_value(json!({
            "total": 2,
            "images": [
                {"index": 1, "employee_id": "EMP002", "filename": "EMP002.jpg", "file_size_kb": 41.2},
                {"index": 2, "employee_id": "EMP001", "filename": "EMP001.jpg", "file_size_kb": 38.0}
            ]
        }))
        .unwrap();
        assert_eq!(listing.total, 2);
        let ids: Vec<_> = listing.images.iter().map(|i| i.employee_id.as_str()).collect();
        assert_eq!(ids, ["EMP002", "EMP001"]);
    }

    #[test]
    fn test_server_reply_keeps_extra_fields() {
        let reply: ServerReply = serde_json::from_value(json!({
            "success": true,
            "message": "reloaded",
            "loaded_persons": 4
        }))
        .unwrap();
        assert_eq!(reply.success, Some(true));
        assert_eq!(reply.message.as_deref(), Some("reloaded"));
        assert_eq!(reply.fields.get("loaded_persons"), Some(&json!(4)));
    }

    #[test]
    fn test_service_info_accessors() {
        let info: ServiceInfo = serde_json::from_value(json!({
            "name": "Face Recognition API",
            "version": "2.1.0"
        }))
        .unwrap();
        assert_eq!(info.name(), Some("Face Recognition API"));
        assert_eq!(info.version(), Some("2.1.0"));
    }
}
