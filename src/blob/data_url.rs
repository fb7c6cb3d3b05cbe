//! Data-URL (`data:<mime>;base64,<payload>`) construction and validation.

use base64::{engine::general_purpose::STANDARD, Engine};

use super::{BlobError, BlobResult};

/// Build the `data:<mime>;base64,` prefix for a MIME type.
pub fn prefix(mime: &str) -> String {
    format!("data:{};base64,", mime)
}

/// Build a complete data-URL from a MIME type and a base64 payload.
pub fn build(mime: &str, payload: &str) -> String {
    format!("data:{};base64,{}", mime, payload)
}

/// Base64-encode raw bytes into a complete data-URL.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    build(mime, &STANDARD.encode(bytes))
}

/// Split a data-URL into `(mime, payload)`, rejecting anything that does not
/// match the `data:<mime>;base64,<payload>` shape.
///
/// The payload is not base64-validated here: a head fragment carries a
/// truncated payload that only decodes once its tail chunks are appended.
pub fn split_prefix(value: &str) -> BlobResult<(&str, &str)> {
    let rest = value
        .strip_prefix("data:")
        .ok_or_else(|| BlobError::MalformedDataUrl("missing data: scheme".to_string()))?;

    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| BlobError::MalformedDataUrl("missing ;base64, marker".to_string()))?;

    if !is_valid_mime(mime) {
        return Err(BlobError::MalformedDataUrl(format!(
            "invalid mime type {:?}",
            mime
        )));
    }

    Ok((mime, payload))
}

/// Decode a complete data-URL into `(mime, bytes)`.
pub fn decode(value: &str) -> BlobResult<(String, Vec<u8>)> {
    let (mime, payload) = split_prefix(value)?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| BlobError::MalformedDataUrl(format!("invalid base64 payload: {}", e)))?;
    Ok((mime.to_string(), bytes))
}

/// A MIME type usable inside a data-URL prefix: `type/subtype` in printable
/// ASCII, with none of the characters that delimit the prefix itself.
pub fn is_valid_mime(mime: &str) -> bool {
    if mime.is_empty() || !mime.contains('/') {
        return false;
    }
    mime.bytes()
        .all(|b| b.is_ascii_graphic() && b != b';' && b != b',')
}
