use super::{Endpoint, RunningMode};
use crate::error::ClientError;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

const REMOTE_PREFIX: &str = "remote://";

fn remote_pattern() -> &'static Regex {
    static REMOTE_RE: OnceLock<Regex> = OnceLock::new();
    REMOTE_RE.get_or_init(|| {
        Regex::new(r"^remote://(.+):(\d+)$").expect("remote target regex should compile")
    })
}

/// Parsed launch specification: a local executable or a remote socket engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineTarget {
    Local { executable: PathBuf },
    Remote { host: String, port: u16 },
}

impl EngineTarget {
    /// Parse `remote://<host>:<port>` or treat the string as an executable path.
    /// `any` and `loopback` hosts map to `0.0.0.0` and `127.0.0.1`.
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid(raw, "target is empty"));
        }
        if !trimmed.starts_with(REMOTE_PREFIX) {
            return Ok(EngineTarget::Local {
                executable: PathBuf::from(trimmed),
            });
        }

        let captures = remote_pattern()
            .captures(trimmed)
            .ok_or_else(|| invalid(raw, "expected remote://<host>:<port>"))?;
        let host = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let port_text = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
        let port = port_text
            .parse::<u16>()
            .map_err(|_| invalid(raw, &format!("port {port_text} is out of range")))?;

        let host = match host {
            "any" => "0.0.0.0".to_string(),
            "loopback" => "127.0.0.1".to_string(),
            other => other
                .strip_prefix('[')
                .and_then(|inner| inner.strip_suffix(']'))
                .unwrap_or(other)
                .to_string(),
        };
        Ok(EngineTarget::Remote { host, port })
    }

    pub fn running_mode(&self) -> RunningMode {
        match self {
            EngineTarget::Local { .. } => RunningMode::Local,
            EngineTarget::Remote { .. } => RunningMode::Remote,
        }
    }

    pub fn endpoint(&self) -> Option<Endpoint> {
        match self {
            EngineTarget::Local { .. } => None,
            EngineTarget::Remote { host, port } => Some(Endpoint::new(host.clone(), *port)),
        }
    }

    pub fn executable(&self) -> Option<&Path> {
        match self {
            EngineTarget::Local { executable } => Some(executable),
            EngineTarget::Remote { .. } => None,
        }
    }
}

impl FromStr for EngineTarget {
    type Err = ClientError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl fmt::Display for EngineTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineTarget::Local { executable } => write!(f, "{}", executable.display()),
            EngineTarget::Remote { host, port } => write!(f, "{REMOTE_PREFIX}{host}:{port}"),
        }
    }
}

fn invalid(target: &str, reason: &str) -> ClientError {
    ClientError::InvalidTarget {
        target: target.to_string(),
        reason: reason.to_string(),
    }
}
