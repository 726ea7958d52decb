use super::{read_failure, Reply, Transport};
use crate::cancel::{is_abandoned, Wait, POLL_SLICE};
use crate::config::{EngineCommand, Endpoint};
use crate::engine::{read_handshake, read_line, EngineProcess, Handshake, HandshakeKind};
use crate::error::ClientError;
use crate::protocol::{codes, OcrResult, Request};
use std::io::{self, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

/// One TCP connection per request against a fixed endpoint, optionally backed
/// by a locally spawned engine.
pub(crate) struct SocketTransport {
    endpoint: Endpoint,
    process: Option<EngineProcess>,
    closed: bool,
}

impl SocketTransport {
    /// Attach to an engine someone else runs, after a connectivity probe.
    pub(crate) fn connect_remote(endpoint: Endpoint, wait: &Wait<'_>) -> Result<Self, ClientError> {
        let mut transport = Self {
            endpoint,
            process: None,
            closed: false,
        };
        transport.probe(wait)?;
        tracing::info!(
            host = %transport.endpoint.host,
            port = transport.endpoint.port,
            "remote socket engine reachable"
        );
        Ok(transport)
    }

    /// Spawn a socket-mode engine, read the endpoint it announces, and probe
    /// it. Stdout is released once the endpoint is known.
    pub(crate) fn start_local(
        command: &EngineCommand,
        wait: &Wait<'_>,
    ) -> Result<(Self, Handshake), ClientError> {
        let mut process = EngineProcess::spawn(command)?;
        let handshake = match process.stdout_mut() {
            Some(stdout) => read_handshake(stdout, HandshakeKind::Socket, wait),
            None => Err(ClientError::StreamClosed),
        };
        let handshake = match handshake {
            Ok(handshake) => handshake,
            Err(err) => {
                tracing::warn!(error = %err, "socket engine handshake failed");
                process.terminate();
                return Err(err);
            }
        };
        let Some(endpoint) = handshake.endpoint.clone() else {
            process.terminate();
            return Err(ClientError::MalformedEndpoint(String::new()));
        };
        process.release_stdout();

        let mut transport = Self::owning(endpoint, process);
        // Dropping the transport on probe failure terminates the process.
        transport.probe(wait)?;
        tracing::info!(
            pid = transport.pid(),
            endpoint = %transport.endpoint,
            clipboard = handshake.clipboard_enabled,
            "local socket engine ready"
        );
        Ok((transport, handshake))
    }

    /// Transport for an engine this client spawned and already handshook.
    pub(super) fn owning(endpoint: Endpoint, process: EngineProcess) -> Self {
        Self {
            endpoint,
            process: Some(process),
            closed: false,
        }
    }

    /// Send an empty request; any transport-level failure, including a local
    /// engine that died after announcing its endpoint, aborts construction.
    pub(super) fn probe(&mut self, wait: &Wait<'_>) -> Result<(), ClientError> {
        let result = self.send(&Request::new(), wait);
        if codes::is_transport_failure(result.code) {
            let message = result.message().unwrap_or_default().to_string();
            tracing::warn!(endpoint = %self.endpoint, code = result.code, "socket probe failed");
            return Err(ClientError::ProbeFailed {
                code: result.code,
                message,
            });
        }
        tracing::debug!(endpoint = %self.endpoint, code = result.code, "socket probe answered");
        Ok(())
    }

    fn open(&self, wait: &Wait<'_>) -> io::Result<TcpStream> {
        let addrs: Vec<SocketAddr> = (self.endpoint.host.as_str(), self.endpoint.port)
            .to_socket_addrs()?
            .collect();
        let mut last_err = io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{} did not resolve", self.endpoint),
        );
        for addr in addrs {
            wait.check()?;
            let attempt = match wait.remaining() {
                Some(remaining) if remaining.is_zero() => {
                    return Err(io::ErrorKind::TimedOut.into());
                }
                Some(remaining) => TcpStream::connect_timeout(&addr, remaining),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }
}

impl Transport for SocketTransport {
    fn exchange(&mut self, line: &[u8], wait: &Wait<'_>) -> Reply {
        if self.closed {
            return Err(OcrResult::engine_unavailable());
        }
        if let Some(process) = self.process.as_mut() {
            if !process.is_alive() {
                return Err(OcrResult::engine_unavailable());
            }
        }
        if let Err(err) = wait.check() {
            return Err(read_failure(&err));
        }

        let stream = self.open(wait).map_err(|err| {
            if is_abandoned(&err) {
                return read_failure(&err);
            }
            OcrResult::failure(
                codes::PROCESS_CRASHED,
                format!("Failed to connect to {}: {err}", self.endpoint),
            )
        })?;
        let written = send_line(&stream, line, wait);
        if let Err(err) = written {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(OcrResult::failure(
                codes::PROCESS_CRASHED,
                format!("Failed to send request to {}: {err}", self.endpoint),
            ));
        }
        tracing::debug!(endpoint = %self.endpoint, bytes = line.len(), "request sent");

        let reply = stream
            .set_read_timeout(Some(POLL_SLICE))
            .and_then(|()| read_line(&mut BufReader::new(&stream), wait));
        let _ = stream.shutdown(Shutdown::Both);
        reply.map_err(|err| read_failure(&err))
    }

    fn close(&mut self) {
        self.closed = true;
        if let Some(process) = self.process.as_mut() {
            process.terminate();
        }
    }

    fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(EngineProcess::pid)
    }

    fn endpoint(&self) -> Option<Endpoint> {
        Some(self.endpoint.clone())
    }
}

/// Write the request and half-close, which is how the engine knows the
/// request is complete.
fn send_line(mut stream: &TcpStream, line: &[u8], wait: &Wait<'_>) -> io::Result<()> {
    stream.set_write_timeout(wait.remaining().filter(|left| !left.is_zero()))?;
    stream.write_all(line)?;
    stream.flush()?;
    stream.shutdown(Shutdown::Write)
}
