//! The client facade: one engine, one serialization lock, uniform results.

#[cfg(test)]
mod tests;

use crate::cancel::{CancelToken, Wait};
use crate::config::{
    build_engine_command, Endpoint, EngineConfig, EngineTarget, IpcMode, RunningMode,
};
use crate::error::ClientError;
use crate::lock::SerialLock;
use crate::protocol::{codes, OcrResult, Request, CLIPBOARD_SENTINEL};
use crate::transport::{PipeTransport, SocketTransport, Transport};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Lifecycle of a client. A constructed client starts `Ready`; construction
/// failures never produce a client at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Ready,
    Exited,
}

/// Mode-specific facts about the engine, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineInfo {
    /// Engine spawned by this client. `endpoint` is set in socket mode.
    Local {
        pid: u32,
        endpoint: Option<Endpoint>,
    },
    /// Engine managed elsewhere.
    Remote { endpoint: Endpoint },
}

/// Blocking OCR client. Safe to share between threads; requests are
/// serialized so at most one is in flight.
pub struct OcrClient {
    transport: SerialLock<Box<dyn Transport>>,
    cancel: CancelToken,
    exited: AtomicBool,
    running_mode: RunningMode,
    ipc_mode: IpcMode,
    clipboard_enabled: bool,
    info: EngineInfo,
    request_timeout: Option<Duration>,
}

impl OcrClient {
    /// Parse `target` (`remote://host:port` or an executable path) and connect.
    pub fn new(target: &str, mode: IpcMode, config: EngineConfig) -> Result<Self, ClientError> {
        Self::connect(EngineTarget::parse(target)?, mode, config)
    }

    /// Start or attach to the engine and complete its handshake (and the
    /// connectivity probe in socket mode).
    pub fn connect(
        target: EngineTarget,
        mode: IpcMode,
        config: EngineConfig,
    ) -> Result<Self, ClientError> {
        let ipc_mode = resolve_mode(&target, mode)?;
        let startup = Wait::within(config.startup_timeout);
        let running_mode = target.running_mode();

        let (transport, clipboard_enabled, info): (Box<dyn Transport>, bool, EngineInfo) =
            match target {
                EngineTarget::Remote { host, port } => {
                    if config.models_path.is_some() || !config.options().is_empty() {
                        tracing::warn!("engine options are ignored for a remote target");
                    }
                    let endpoint = Endpoint::new(host, port);
                    let transport = SocketTransport::connect_remote(endpoint.clone(), &startup)?;
                    (Box::new(transport), false, EngineInfo::Remote { endpoint })
                }
                EngineTarget::Local { executable } if ipc_mode == IpcMode::Socket => {
                    let command = build_engine_command(&executable, &config, true)?;
                    let (transport, handshake) = SocketTransport::start_local(&command, &startup)?;
                    let info = EngineInfo::Local {
                        pid: transport.pid().unwrap_or_default(),
                        endpoint: handshake.endpoint,
                    };
                    (Box::new(transport), handshake.clipboard_enabled, info)
                }
                EngineTarget::Local { executable } => {
                    let command = build_engine_command(&executable, &config, false)?;
                    let (transport, handshake) = PipeTransport::start(&command, &startup)?;
                    let info = EngineInfo::Local {
                        pid: transport.pid().unwrap_or_default(),
                        endpoint: None,
                    };
                    (Box::new(transport), handshake.clipboard_enabled, info)
                }
            };

        tracing::info!(
            running_mode = running_mode.as_str(),
            ipc_mode = ipc_mode.label(),
            clipboard = clipboard_enabled,
            "ocr client ready"
        );
        Ok(Self {
            transport: SerialLock::new("ocr client transport", transport),
            cancel: CancelToken::new(),
            exited: AtomicBool::new(false),
            running_mode,
            ipc_mode,
            clipboard_enabled,
            info,
            request_timeout: config.request_timeout,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_transport(
        transport: Box<dyn Transport>,
        running_mode: RunningMode,
        ipc_mode: IpcMode,
        clipboard_enabled: bool,
        info: EngineInfo,
    ) -> Self {
        Self {
            transport: SerialLock::new("ocr client transport", transport),
            cancel: CancelToken::new(),
            exited: AtomicBool::new(false),
            running_mode,
            ipc_mode,
            clipboard_enabled,
            info,
            request_timeout: None,
        }
    }

    /// Recognize the image at `path` (resolved by the engine).
    pub fn run(&self, path: impl AsRef<Path>) -> OcrResult {
        let path = path.as_ref().to_string_lossy();
        self.run_request(&Request::image_path(path))
    }

    /// Recognize an in-memory image; equivalent to `run_base64` of its
    /// standard base64 encoding.
    pub fn run_bytes(&self, image: &[u8]) -> OcrResult {
        self.run_base64(&STANDARD.encode(image))
    }

    pub fn run_base64(&self, payload: &str) -> OcrResult {
        self.run_request(&Request::image_base64(payload))
    }

    /// Recognize the clipboard image. Returns 212 without contacting the engine
    /// when the engine did not announce clipboard support.
    pub fn run_clipboard(&self) -> OcrResult {
        if !self.clipboard_enabled {
            return OcrResult::clipboard_disabled();
        }
        self.run_request(&Request::image_path(CLIPBOARD_SENTINEL))
    }

    /// Send an arbitrary request under the configured request timeout.
    pub fn run_request(&self, request: &Request) -> OcrResult {
        let deadline = self.request_timeout.map(|timeout| Instant::now() + timeout);
        self.dispatch(request, deadline)
    }

    /// Send a request that gives up with 903 at `deadline`. Time spent waiting
    /// for another caller's request counts against it.
    pub fn run_request_until(&self, request: &Request, deadline: Instant) -> OcrResult {
        self.dispatch(request, Some(deadline))
    }

    fn dispatch(&self, request: &Request, deadline: Option<Instant>) -> OcrResult {
        if self.exited.load(Ordering::SeqCst) {
            return OcrResult::engine_unavailable();
        }
        let wait = Wait::new(deadline, Some(&self.cancel));
        let mut transport = match self.transport.acquire_within(&wait) {
            Ok(transport) => transport,
            Err(_) if self.exited.load(Ordering::SeqCst) => {
                return OcrResult::engine_unavailable();
            }
            Err(err) => {
                tracing::debug!(error = %err, "gave up waiting for the engine");
                return OcrResult::failure(
                    codes::NO_RESPONSE,
                    format!("No response from engine: {err}"),
                );
            }
        };
        if self.exited.load(Ordering::SeqCst) {
            return OcrResult::engine_unavailable();
        }
        let result = transport.send(request, &wait);
        tracing::debug!(
            fields = ?request.field_names().collect::<Vec<_>>(),
            code = result.code,
            "request finished"
        );
        result
    }

    pub fn running_mode(&self) -> RunningMode {
        self.running_mode
    }

    /// `Pipe` or `Socket`; never `Auto`.
    pub fn ipc_mode(&self) -> IpcMode {
        self.ipc_mode
    }

    pub fn is_clipboard_enabled(&self) -> bool {
        self.clipboard_enabled
    }

    pub fn engine_info(&self) -> &EngineInfo {
        &self.info
    }

    /// PID of the engine this client spawned, until `exit`.
    pub fn try_pid(&self) -> Option<u32> {
        match &self.info {
            EngineInfo::Local { pid, .. } if self.state() == ClientState::Ready => Some(*pid),
            _ => None,
        }
    }

    /// Socket endpoint in socket mode.
    pub fn try_endpoint(&self) -> Option<&Endpoint> {
        match &self.info {
            EngineInfo::Local { endpoint, .. } => endpoint.as_ref(),
            EngineInfo::Remote { endpoint } => Some(endpoint),
        }
    }

    pub fn state(&self) -> ClientState {
        if self.exited.load(Ordering::SeqCst) {
            ClientState::Exited
        } else {
            ClientState::Ready
        }
    }

    /// Release the engine. Idempotent. A request parked in a read is abandoned
    /// with 903 first, so this does not wait on a hung engine.
    pub fn exit(&self) {
        if self.exited.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        let mut transport = self.transport.acquire();
        transport.close();
        tracing::info!(running_mode = self.running_mode.as_str(), "ocr client exited");
    }
}

impl fmt::Debug for OcrClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrClient")
            .field("running_mode", &self.running_mode)
            .field("ipc_mode", &self.ipc_mode)
            .field("clipboard_enabled", &self.clipboard_enabled)
            .field("info", &self.info)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for OcrClient {
    fn drop(&mut self) {
        self.exit();
    }
}

fn resolve_mode(target: &EngineTarget, requested: IpcMode) -> Result<IpcMode, ClientError> {
    match (requested, target.running_mode()) {
        (IpcMode::Auto, RunningMode::Remote) => Ok(IpcMode::Socket),
        (IpcMode::Auto, RunningMode::Local) => Ok(IpcMode::Pipe),
        (IpcMode::Pipe, RunningMode::Remote) => Err(ClientError::ModeMismatch {
            mode: IpcMode::Pipe.label(),
            target: target.to_string(),
        }),
        (mode, _) => Ok(mode),
    }
}
