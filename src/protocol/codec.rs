use super::{codes, OcrResult, Request};

/// Serialize a request into one newline-terminated JSON line.
///
/// Failures come back as a ready-made 904 result so drivers never need a
/// second error channel.
pub fn encode_request(request: &Request) -> Result<Vec<u8>, OcrResult> {
    if let Some(reason) = request.invalid() {
        return Err(OcrResult::failure(
            codes::ENCODE_FAILED,
            format!("JSON marshal error: {reason}"),
        ));
    }
    let mut line = serde_json::to_vec(request.fields()).map_err(|err| {
        OcrResult::failure(codes::ENCODE_FAILED, format!("JSON marshal error: {err}"))
    })?;
    line.push(b'\n');
    Ok(line)
}

/// Parse one response line. `None` means the stream ended without a line.
pub fn decode_response(line: Option<&[u8]>) -> OcrResult {
    let Some(raw) = line else {
        return OcrResult::failure(codes::NO_RESPONSE, "No response from engine");
    };
    let trimmed = trim_line_ending(raw);
    if trimmed.is_empty() {
        return OcrResult::failure(codes::NO_RESPONSE, "No response from engine");
    }
    match serde_json::from_slice::<OcrResult>(trimmed) {
        Ok(result) => result,
        Err(err) => OcrResult::failure(
            codes::DECODE_FAILED,
            format!(
                "Engine output JSON deserialization failed: {err}. Original content: [{}]",
                String::from_utf8_lossy(trimmed)
            ),
        ),
    }
}

fn trim_line_ending(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}
