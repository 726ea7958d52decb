use super::stdout::read_line;
use crate::cancel::{is_abandoned, Wait};
use crate::config::Endpoint;
use crate::error::ClientError;
use std::io::BufRead;

/// Pipe-mode readiness marker.
pub const INIT_COMPLETED: &str = "OCR init completed.";
/// Socket-mode readiness marker, followed by `<ip>:<port>`.
pub const SOCKET_COMPLETED: &str = "Socket init completed.";
/// Capability line (the engine's spelling).
pub const CLIPBOARD_ENABLED: &str = "OCR clipboard enbaled.";
/// Fatal startup marker.
pub const INIT_FAILED: &str = "OCR init fail";

/// Which readiness marker ends the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeKind {
    Pipe,
    Socket,
}

/// What the engine announced before accepting requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Handshake {
    pub clipboard_enabled: bool,
    /// Bound address of a socket engine.
    pub endpoint: Option<Endpoint>,
}

/// Classification of one startup log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeLine {
    InitCompleted,
    /// Text after the socket marker, trimmed.
    SocketCompleted(String),
    ClipboardEnabled,
    InitFailed,
    Other,
}

pub fn classify_line(line: &str) -> HandshakeLine {
    if let Some(index) = line.find(SOCKET_COMPLETED) {
        let rest = &line[index + SOCKET_COMPLETED.len()..];
        return HandshakeLine::SocketCompleted(rest.trim().to_string());
    }
    if line.contains(INIT_COMPLETED) {
        return HandshakeLine::InitCompleted;
    }
    if line.contains(CLIPBOARD_ENABLED) {
        return HandshakeLine::ClipboardEnabled;
    }
    if line.contains(INIT_FAILED) {
        return HandshakeLine::InitFailed;
    }
    HandshakeLine::Other
}

/// Consume startup lines until `kind`'s readiness marker, a failure marker, or
/// end of stream. Never interprets JSON.
pub(crate) fn read_handshake<R: BufRead>(
    reader: &mut R,
    kind: HandshakeKind,
    wait: &Wait<'_>,
) -> Result<Handshake, ClientError> {
    let mut handshake = Handshake::default();
    loop {
        let raw = match read_line(reader, wait) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Err(ClientError::StreamClosed),
            Err(err) if is_abandoned(&err) => return Err(ClientError::HandshakeTimedOut),
            Err(err) => {
                return Err(ClientError::HandshakeFailed(format!(
                    "reading engine output: {err}"
                )))
            }
        };
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end();
        match classify_line(line) {
            HandshakeLine::InitCompleted if kind == HandshakeKind::Pipe => {
                tracing::debug!(clipboard = handshake.clipboard_enabled, "pipe engine ready");
                return Ok(handshake);
            }
            HandshakeLine::SocketCompleted(endpoint) if kind == HandshakeKind::Socket => {
                let endpoint = parse_endpoint(&endpoint)?;
                tracing::debug!(%endpoint, "socket engine ready");
                handshake.endpoint = Some(endpoint);
                return Ok(handshake);
            }
            HandshakeLine::ClipboardEnabled => handshake.clipboard_enabled = true,
            HandshakeLine::InitFailed => {
                return Err(ClientError::HandshakeFailed(line.to_string()));
            }
            _ => tracing::trace!(line, "engine startup output"),
        }
    }
}

fn parse_endpoint(text: &str) -> Result<Endpoint, ClientError> {
    let malformed = || ClientError::MalformedEndpoint(text.to_string());
    let (host, port) = text.rsplit_once(':').ok_or_else(malformed)?;
    let host = host.trim();
    let port = port.trim().parse::<u16>().map_err(|_| malformed())?;
    if host.is_empty() {
        return Err(malformed());
    }
    Ok(Endpoint::new(host, port))
}
