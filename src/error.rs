//! Construction-time failures.
//!
//! Everything that can go wrong *before* a client exists is reported through
//! [`ClientError`]. Once a client is ready, failures are folded into
//! [`OcrResult`](crate::protocol::OcrResult) codes instead.

use crate::protocol::codes;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent an [`OcrClient`](crate::OcrClient) from being built.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid engine target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("invalid engine option '{name}': {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("engine executable '{}' not found or not runnable", path.display())]
    ExecutableNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("models path '{}' does not exist or is not a directory", .0.display())]
    ModelsPathMissing(PathBuf),

    #[error("failed to start engine process '{}'", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("engine reported initialization failure: {0}")]
    HandshakeFailed(String),

    #[error("engine output closed before initialization completed")]
    StreamClosed,

    #[error("engine handshake timed out")]
    HandshakeTimedOut,

    #[error("engine announced an unparseable socket endpoint: '{0}'")]
    MalformedEndpoint(String),

    #[error("socket engine probe failed (code {code}): {message}")]
    ProbeFailed { code: i64, message: String },

    #[error("{mode} mode cannot drive target '{target}'")]
    ModeMismatch { mode: &'static str, target: String },
}

impl ClientError {
    /// Nearest protocol code for this failure, so callers that only branch on
    /// codes can treat construction and per-call failures the same way.
    pub fn code(&self) -> i64 {
        match self {
            ClientError::ProbeFailed { code, .. } => *code,
            ClientError::StreamClosed | ClientError::HandshakeTimedOut => codes::NO_RESPONSE,
            ClientError::HandshakeFailed(_) => codes::PROCESS_CRASHED,
            ClientError::MalformedEndpoint(_) => codes::DECODE_FAILED,
            ClientError::InvalidTarget { .. }
            | ClientError::InvalidOption { .. }
            | ClientError::ModeMismatch { .. }
            | ClientError::ExecutableNotFound { .. }
            | ClientError::ModelsPathMissing(_)
            | ClientError::Spawn { .. } => codes::ENGINE_UNAVAILABLE,
        }
    }
}
