//! Human-readable rendering of client results and errors.

use facerec_client::{
    ClientError, Detection, EmployeeListing, EnrollmentResult, HealthStatus, RecognitionResult,
    ServerReply, ServiceInfo,
};
use std::fmt::Write;

const RULE: &str = "--------------------------------------------------------------------------------";

pub fn rule() -> &'static str {
    RULE
}

/// `0.910 (91.0%)`
pub fn similarity(value: f32) -> String {
    format!("{value:.3} ({:.1}%)", value * 100.0)
}

pub fn detection(index: usize, det: &Detection) -> String {
    let mut out = String::new();
    let confidence = det
        .confidence()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());

    let _ = writeln!(out, "  #{index}:");
    let _ = writeln!(out, "    Name:       {}", det.name);
    let _ = writeln!(out, "    Confidence: {confidence}");
    let _ = writeln!(out, "    Similarity: {}", similarity(det.similarity));
    if let Some(quality) = det.quality_score {
        let _ = writeln!(out, "    Quality:    {quality:.3}");
    }
    let [x1, y1, x2, y2] = det.bbox;
    let _ = writeln!(out, "    BBox:       [{x1:.0}, {y1:.0}, {x2:.0}, {y2:.0}]");
    if let Some(embedding) = &det.embedding {
        let _ = writeln!(out, "    Embedding:  {} values", embedding.len());
    }
    out
}

pub fn recognition(result: &RecognitionResult) -> String {
    let mut out = String::new();
    let status = if result.success { "OK" } else { "FAILED" };
    let _ = writeln!(out, "{status}: {}", result.message);
    let _ = writeln!(out, "Processing time: {:.1}ms", result.processing_time_ms);
    let _ = writeln!(out, "Frame: {}x{}", result.frame_width, result.frame_height);

    if result.detections.is_empty() {
        let _ = writeln!(out, "\nNo face recognized");
        return out;
    }

    let _ = writeln!(out, "\nDetections ({}):", result.detections.len());
    for (i, det) in result.detections.iter().enumerate() {
        out.push('\n');
        out.push_str(&detection(i + 1, det));
    }
    out
}

pub fn health(status: &HealthStatus) -> String {
    format!(
        "Status:         {}\nLoaded persons: {}\nModel:          {}\nDetection size: {}\n",
        status.status, status.loaded_persons, status.model_name, status.det_size
    )
}

pub fn service_info(info: &ServiceInfo) -> String {
    serde_json::to_string_pretty(&info.fields).unwrap_or_else(|_| format!("{:?}", info.fields)) + "\n"
}

pub fn enrollment(result: &EnrollmentResult) -> String {
    format!(
        "{}\n  Employee ID: {}\n  File:        {}\n  Quality:     {:.3}\n  Face size:   {:.0}px\n",
        result.message,
        result.employee_id,
        result.image_path,
        result.quality_score,
        result.face_size_px
    )
}

pub fn listing(listing: &EmployeeListing) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total: {} employee image(s)", listing.total);
    for image in &listing.images {
        let _ = writeln!(out, "\n  #{} - {}", image.index, image.employee_id);
        let _ = writeln!(out, "       File: {}", image.filename);
        let _ = writeln!(out, "       Size: {} KB", image.file_size_kb);
    }
    out
}

pub fn reply(reply: &ServerReply) -> String {
    match (&reply.message, reply.success) {
        (Some(message), _) => format!("{message}\n"),
        (None, Some(false)) => "Request was not successful\n".to_string(),
        (None, _) => "Done\n".to_string(),
    }
}

/// Multi-line description of a client failure, including the server's detail when it sent one.
pub fn client_error(err: &ClientError) -> String {
    let mut out = String::new();
    match err {
        ClientError::HttpStatus { status, body, .. } => {
            let summary = err.to_string();
            let headline = summary.split(':').next().unwrap_or(&summary);
            let _ = writeln!(out, "{headline}");
            match serde_json::from_str::<serde_json::Value>(body) {
                Ok(json) => {
                    let pretty = serde_json::to_string_pretty(&json).unwrap_or_else(|_| body.clone());
                    let _ = writeln!(out, "Details:\n{pretty}");
                }
                Err(_) if !body.trim().is_empty() => {
                    let _ = writeln!(out, "Details: {}", body.trim());
                }
                Err(_) => {}
            }
            if *status == 401 || *status == 403 {
                let _ = writeln!(out, "Hint: check the API key (FACEREC_API_KEY)");
            }
        }
        ClientError::Transport { .. } if err.is_timeout() => {
            let _ = writeln!(out, "{err}");
            let _ = writeln!(out, "Hint: the service did not answer in time; try again");
        }
        ClientError::Transport { .. } => {
            let _ = writeln!(out, "{err}");
            let _ = writeln!(out, "Hint: is the service reachable at the configured URL?");
        }
        _ => {
            let _ = writeln!(out, "{err}");
        }
    }
    out
}

/// Render any CLI failure, expanding client errors found anywhere in the chain.
///
/// Context attached above the client error is printed first, one line.
pub fn error(err: &anyhow::Error) -> String {
    let Some(client_err) = err.chain().find_map(|e| e.downcast_ref::<ClientError>()) else {
        return format!("{err:#}\n");
    };
    let wrapped = err
        .chain()
        .next()
        .is_some_and(|outer| outer.downcast_ref::<ClientError>().is_none());
    if wrapped {
        format!("{err}\n{}", client_error(client_err))
    } else {
        client_error(client_err)
    }
}
