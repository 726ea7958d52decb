//! Engine launch configuration: target parsing, typed options, and the
//! command line handed to the engine executable.

mod app;
mod args;
mod target;
mod validation;

use clap::ValueEnum;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub use app::AppConfig;
pub use args::{build_engine_command, EngineCommand, RESERVED_OPTION_NAMES};
pub use target::EngineTarget;
pub use validation::parse_engine_arg;

/// Transport used to talk to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum IpcMode {
    /// Socket for `remote://` targets, pipe otherwise.
    #[default]
    Auto,
    Pipe,
    Socket,
}

impl IpcMode {
    pub fn label(self) -> &'static str {
        match self {
            IpcMode::Auto => "auto",
            IpcMode::Pipe => "pipe",
            IpcMode::Socket => "socket",
        }
    }
}

/// Where the engine runs relative to this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningMode {
    Local,
    Remote,
}

impl RunningMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunningMode::Local => "local",
            RunningMode::Remote => "remote",
        }
    }
}

impl fmt::Display for RunningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host and port of a socket engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Address a locally spawned socket engine should bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenAddr {
    Loopback,
    Any,
    Ip(IpAddr),
}

impl ListenAddr {
    pub fn as_arg(&self) -> String {
        match self {
            ListenAddr::Loopback => "loopback".to_string(),
            ListenAddr::Any => "any".to_string(),
            ListenAddr::Ip(ip) => ip.to_string(),
        }
    }
}

impl FromStr for ListenAddr {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "loopback" => Ok(ListenAddr::Loopback),
            "any" => Ok(ListenAddr::Any),
            other => other
                .parse::<IpAddr>()
                .map(ListenAddr::Ip)
                .map_err(|_| format!("'{other}' is not 'loopback', 'any', or an IP address")),
        }
    }
}

/// Scalar value of an engine command-line option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
    Int(i64),
    Float(f64),
}

impl OptionValue {
    /// Type a raw `key=value` right-hand side: bool, then integer, then float,
    /// falling back to a string.
    pub fn infer(raw: &str) -> Self {
        match raw {
            "true" => return OptionValue::Bool(true),
            "false" => return OptionValue::Bool(false),
            _ => {}
        }
        if let Ok(value) = raw.parse::<i64>() {
            return OptionValue::Int(value);
        }
        if let Ok(value) = raw.parse::<f64>() {
            if value.is_finite() {
                return OptionValue::Float(value);
            }
        }
        OptionValue::Str(raw.to_string())
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(value) => write!(f, "{value}"),
            OptionValue::Str(value) => f.write_str(value),
            OptionValue::Int(value) => write!(f, "{value}"),
            OptionValue::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

macro_rules! option_value_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for OptionValue {
            fn from(value: $ty) -> Self {
                OptionValue::Int(i64::from(value))
            }
        })*
    };
}

option_value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for OptionValue {
    fn from(value: f32) -> Self {
        OptionValue::Float(f64::from(value))
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

/// Everything needed to launch (or reach) an engine besides the target itself.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Passed as `--models_path`; must be an existing directory.
    pub models_path: Option<PathBuf>,
    /// Socket engine port (`0` picks a free port). Defaults to `0` in socket mode.
    pub port: Option<u16>,
    /// Socket engine bind address. Defaults to loopback in socket mode.
    pub addr: Option<ListenAddr>,
    /// Default deadline applied to every request.
    pub request_timeout: Option<Duration>,
    /// Deadline for the startup handshake of a local engine.
    pub startup_timeout: Option<Duration>,
    options: Vec<(String, OptionValue)>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.models_path = Some(path.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_addr(mut self, addr: ListenAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = Some(timeout);
        self
    }

    /// Add a pass-through engine option. Later values for the same name win but
    /// keep the position of the first insertion.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.set_option(name, value);
        self
    }

    pub fn set_option(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        let name = name.into();
        let value = value.into();
        match self.options.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.options.push((name, value)),
        }
    }

    pub fn options(&self) -> &[(String, OptionValue)] {
        &self.options
    }
}
