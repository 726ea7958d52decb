//! Client for PaddleOCR-json engines.
//!
//! The engine runs out of process. A client either spawns it and talks over
//! its stdin/stdout (pipe mode) or sends one TCP connection per request to a
//! local or remote socket engine. Every call returns an [`OcrResult`]; only
//! construction can fail with a [`ClientError`].

mod cancel;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
mod lock;
pub mod protocol;
mod telemetry;
#[cfg(test)]
mod test_support;
mod transport;

pub use client::{ClientState, EngineInfo, OcrClient};
pub use config::{
    AppConfig, Endpoint, EngineConfig, EngineTarget, IpcMode, ListenAddr, OptionValue,
    RunningMode,
};
pub use error::ClientError;
pub use protocol::codes::{self, describe_code};
pub use protocol::{OcrResult, Request, TextBlock};
pub use telemetry::{init_tracing, tracing_log_path};
