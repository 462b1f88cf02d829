//! Image payload encoding.
//!
//! JSON endpoints take the image as plain standard base64, never as a
//! `data:image/...;base64,` URI. The file upload endpoint takes raw bytes.

use base64::Engine;

/// Encode raw image bytes for a JSON `image_base64` field.
pub fn encode_image(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode an `image_base64` value back to raw bytes.
///
/// Accepts a `data:` URI as well, since some callers hand those over from browsers.
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };
    base64::engine::general_purpose::STANDARD.decode(payload.trim())
}

/// Content type for an uploaded file, from its extension.
pub fn mime_for_filename(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
