use super::{read_failure, Reply, Transport};
use crate::cancel::{is_abandoned, Wait};
use crate::config::{EngineCommand, Endpoint};
use crate::engine::{read_handshake, read_line, EngineProcess, Handshake, HandshakeKind};
use crate::error::ClientError;
use crate::protocol::{codes, OcrResult};

/// Long-lived stdin/stdout channel to a local engine. Responses are matched
/// to requests purely by order, so exchanges must never overlap.
pub(crate) struct PipeTransport {
    process: EngineProcess,
}

impl PipeTransport {
    /// Spawn the engine and wait for `OCR init completed.`. The process is
    /// killed if the handshake fails.
    pub(crate) fn start(
        command: &EngineCommand,
        wait: &Wait<'_>,
    ) -> Result<(Self, Handshake), ClientError> {
        let mut process = EngineProcess::spawn(command)?;
        let handshake = match process.stdout_mut() {
            Some(stdout) => read_handshake(stdout, HandshakeKind::Pipe, wait),
            None => Err(ClientError::StreamClosed),
        };
        match handshake {
            Ok(handshake) => {
                tracing::info!(
                    pid = process.pid(),
                    clipboard = handshake.clipboard_enabled,
                    "pipe engine ready"
                );
                Ok((Self { process }, handshake))
            }
            Err(err) => {
                tracing::warn!(error = %err, "pipe engine handshake failed");
                process.terminate();
                Err(err)
            }
        }
    }
}

impl Transport for PipeTransport {
    fn exchange(&mut self, line: &[u8], wait: &Wait<'_>) -> Reply {
        if self.process.pid().is_none() {
            return Err(OcrResult::engine_unavailable());
        }
        if !self.process.is_alive() {
            return Err(OcrResult::failure(
                codes::PROCESS_CRASHED,
                "Engine process has exited",
            ));
        }
        if let Err(err) = wait.check() {
            return Err(read_failure(&err));
        }

        if let Err(err) = self.process.write_line(line) {
            tracing::warn!(pid = self.process.pid(), error = %err, "engine stdin write failed");
            return Err(OcrResult::failure(
                codes::PROCESS_CRASHED,
                format!("Failed to write request to engine: {err}"),
            ));
        }
        tracing::debug!(bytes = line.len(), "request written to engine stdin");

        let Some(stdout) = self.process.stdout_mut() else {
            return Err(OcrResult::engine_unavailable());
        };
        match read_line(stdout, wait) {
            Ok(reply) => Ok(reply),
            Err(err) => {
                if is_abandoned(&err) {
                    // A late reply would pair with the next request.
                    tracing::warn!(
                        pid = self.process.pid(),
                        reason = %err,
                        "abandoning pipe engine mid-request"
                    );
                    self.process.terminate();
                }
                Err(read_failure(&err))
            }
        }
    }

    fn close(&mut self) {
        self.process.terminate();
    }

    fn pid(&self) -> Option<u32> {
        self.process.pid()
    }

    fn endpoint(&self) -> Option<Endpoint> {
        None
    }
}
