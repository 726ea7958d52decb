//! JSON-lines wire protocol spoken with the OCR engine.
//!
//! One JSON object per request, one per response, each terminated by a single
//! newline. Requests carry `image_path` or `image_base64` (plus optional
//! engine flags); responses are `{"code": <int>, "data": <payload>}`.

mod codec;
pub mod codes;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub use codec::{decode_response, encode_request};

/// Field carrying a filesystem path (or the `clipboard` sentinel).
pub const FIELD_IMAGE_PATH: &str = "image_path";
/// Field carrying a standard base64 image payload.
pub const FIELD_IMAGE_BASE64: &str = "image_base64";
/// Sentinel path the engine reads from the system clipboard.
pub const CLIPBOARD_SENTINEL: &str = "clipboard";

/// A request object: unique field names mapped to JSON values.
#[derive(Debug, Clone, Default)]
pub struct Request {
    fields: Map<String, Value>,
    invalid: Option<String>,
}

impl Request {
    /// Empty request, used as the socket connectivity probe.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_path(path: impl Into<String>) -> Self {
        let mut request = Self::new();
        request
            .fields
            .insert(FIELD_IMAGE_PATH.to_string(), Value::String(path.into()));
        request
    }

    pub fn image_base64(payload: impl Into<String>) -> Self {
        let mut request = Self::new();
        request
            .fields
            .insert(FIELD_IMAGE_BASE64.to_string(), Value::String(payload.into()));
        request
    }

    /// Set `name` to any serializable value, replacing an earlier value.
    ///
    /// A value that cannot be represented as JSON is remembered and surfaces as
    /// an encode failure when the request is sent.
    pub fn with<T: Serialize>(mut self, name: impl Into<String>, value: T) -> Self {
        let name = name.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.fields.insert(name, value);
            }
            Err(err) => {
                if self.invalid.is_none() {
                    self.invalid = Some(format!("field '{name}': {err}"));
                }
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub(crate) fn invalid(&self) -> Option<&str> {
        self.invalid.as_deref()
    }
}

/// One recognized region of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Quadrilateral corners, clockwise from top-left.
    #[serde(rename = "box")]
    pub bbox: [[i32; 2]; 4],
    pub score: f64,
    pub text: String,
    /// Separator hint emitted after this block (`"\n"`, `" "`, or empty).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub end: String,
}

/// Outcome of every request. `code` is authoritative; `data` holds text
/// blocks on success and a message string on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub code: i64,
    #[serde(default)]
    pub data: Value,
}

impl OcrResult {
    pub fn new(code: i64, data: Value) -> Self {
        Self { code, data }
    }

    /// Client-assigned failure carrying a human-readable message.
    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            data: Value::String(message.into()),
        }
    }

    pub fn clipboard_disabled() -> Self {
        Self::failure(
            codes::CLIPBOARD_UNAVAILABLE,
            "Clipboard function not available",
        )
    }

    pub fn engine_unavailable() -> Self {
        Self::failure(codes::ENGINE_UNAVAILABLE, "Engine instance does not exist")
    }

    /// 100 or 101.
    pub fn is_success(&self) -> bool {
        self.code == codes::OK || self.code == codes::OK_NO_TEXT
    }

    /// Decode `data` as text blocks. Empty for 101, `None` for failures or a
    /// payload that does not match the block shape.
    pub fn text_blocks(&self) -> Option<Vec<TextBlock>> {
        match self.code {
            codes::OK => serde_json::from_value(self.data.clone()).ok(),
            codes::OK_NO_TEXT => Some(Vec::new()),
            _ => None,
        }
    }

    /// Error message for failure codes.
    pub fn message(&self) -> Option<&str> {
        if self.is_success() {
            return None;
        }
        self.data.as_str()
    }

    /// Multi-line report: numbered blocks on success, code and message otherwise.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for OcrResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            codes::OK => match self.text_blocks() {
                Some(blocks) => {
                    for (index, block) in blocks.iter().enumerate() {
                        writeln!(
                            f,
                            "{}-Confidence: {:.2}, Text: {}",
                            index + 1,
                            block.score,
                            block.text
                        )?;
                        if block.end == "\n" {
                            writeln!(f)?;
                        }
                    }
                    Ok(())
                }
                None => writeln!(
                    f,
                    "Recognition successful but data format unexpected: {}",
                    self.data
                ),
            },
            codes::OK_NO_TEXT => writeln!(f, "No text recognized in image."),
            code => {
                let message = match &self.data {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                match codes::describe_code(code) {
                    Some(label) => writeln!(
                        f,
                        "Image recognition failed. Error code: {code} ({label}), Error message: {message}"
                    ),
                    None => writeln!(
                        f,
                        "Image recognition failed. Error code: {code}, Error message: {message}"
                    ),
                }
            }
        }
    }
}
