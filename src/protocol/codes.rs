//! Result codes shared by the engine and the client.
//!
//! The engine owns the 1xx-4xx range; the client reserves 212 for its own
//! short-circuit and 901-905 for transport failures.

/// Recognition succeeded and `data` holds text blocks.
pub const OK: i64 = 100;
/// Recognition succeeded but the image contains no text.
pub const OK_NO_TEXT: i64 = 101;

pub const ERR_PATH_EXIST: i64 = 200;
pub const ERR_PATH_CONV: i64 = 201;
pub const ERR_PATH_READ: i64 = 202;
pub const ERR_PATH_DECODE: i64 = 203;

pub const ERR_CLIP_OPEN: i64 = 210;
pub const ERR_CLIP_EMPTY: i64 = 211;
/// Engine: clipboard format not supported. Client: clipboard feature disabled.
pub const CLIPBOARD_UNAVAILABLE: i64 = 212;
pub const ERR_CLIP_DATA: i64 = 213;
pub const ERR_CLIP_FILES: i64 = 214;
pub const ERR_CLIP_GETOBJ: i64 = 215;
pub const ERR_CLIP_BITMAP: i64 = 216;
pub const ERR_CLIP_CHANNEL: i64 = 217;

pub const ERR_BASE64_DECODE: i64 = 300;
pub const ERR_BASE64_IM_DECODE: i64 = 301;

pub const ERR_JSON_DUMP: i64 = 400;
pub const ERR_JSON_PARSE: i64 = 401;
pub const ERR_JSON_PARSE_KEY: i64 = 402;
pub const ERR_NO_TASK: i64 = 403;

/// No engine to talk to: never started, already exited, or torn down.
pub const ENGINE_UNAVAILABLE: i64 = 901;
/// Engine crashed, refused the connection, or the request write failed.
pub const PROCESS_CRASHED: i64 = 902;
/// No response line arrived (closed stream, read error, deadline, cancel).
pub const NO_RESPONSE: i64 = 903;
/// The request could not be serialized.
pub const ENCODE_FAILED: i64 = 904;
/// The response line was not a valid result object.
pub const DECODE_FAILED: i64 = 905;

/// True for the codes the client assigns to transport-level failures.
pub fn is_transport_failure(code: i64) -> bool {
    (ENGINE_UNAVAILABLE..=DECODE_FAILED).contains(&code)
}

/// Short human-readable label for a known code.
pub fn describe_code(code: i64) -> Option<&'static str> {
    let text = match code {
        OK => "text recognized",
        OK_NO_TEXT => "no text found",
        ERR_PATH_EXIST => "image path does not exist",
        ERR_PATH_CONV => "image path could not be converted",
        ERR_PATH_READ => "image file could not be opened",
        ERR_PATH_DECODE => "image file could not be decoded",
        ERR_CLIP_OPEN => "clipboard could not be opened",
        ERR_CLIP_EMPTY => "clipboard is empty",
        CLIPBOARD_UNAVAILABLE => "clipboard unavailable or format not supported",
        ERR_CLIP_DATA => "clipboard data handle unavailable",
        ERR_CLIP_FILES => "clipboard must hold exactly one file",
        ERR_CLIP_GETOBJ => "clipboard graphic object unavailable",
        ERR_CLIP_BITMAP => "clipboard bitmap bits unavailable",
        ERR_CLIP_CHANNEL => "clipboard bitmap channel count not supported",
        ERR_BASE64_DECODE => "base64 payload could not be decoded",
        ERR_BASE64_IM_DECODE => "base64 payload is not a decodable image",
        ERR_JSON_DUMP => "engine failed to serialize its result",
        ERR_JSON_PARSE => "engine failed to parse the request",
        ERR_JSON_PARSE_KEY => "engine failed to parse a request field",
        ERR_NO_TASK => "request contained no task",
        ENGINE_UNAVAILABLE => "engine unavailable",
        PROCESS_CRASHED => "engine crashed or refused the request",
        NO_RESPONSE => "no response from engine",
        ENCODE_FAILED => "request encode failure",
        DECODE_FAILED => "response decode failure",
        _ => return None,
    };
    Some(text)
}
