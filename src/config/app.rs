use super::{IpcMode, ListenAddr};
use clap::Parser;
use std::path::PathBuf;

/// Command-line settings for the `ppocr` driver.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "ppocr",
    about = "Recognize text in images through a PaddleOCR-json engine",
    author,
    version
)]
pub struct AppConfig {
    /// Engine executable path, or remote://<host>:<port> for a running socket engine
    #[arg(value_name = "TARGET", env = "PPOCR_ENGINE")]
    pub target: String,

    /// Images to recognize, in order
    #[arg(value_name = "IMAGES")]
    pub images: Vec<PathBuf>,

    /// Transport to the engine (auto: socket for remote targets, pipe otherwise)
    #[arg(long = "ipc-mode", value_enum, default_value_t = IpcMode::Auto)]
    pub ipc_mode: IpcMode,

    /// Engine models directory (passed as --models_path)
    #[arg(long = "models-path")]
    pub models_path: Option<PathBuf>,

    /// Port a locally spawned socket engine should bind (0 picks a free port)
    #[arg(long = "port")]
    pub port: Option<u16>,

    /// Address a locally spawned socket engine should bind (loopback, any, or an IP)
    #[arg(long = "addr")]
    pub addr: Option<ListenAddr>,

    /// Extra engine option as KEY=VALUE (repeatable)
    #[arg(long = "engine-arg", value_name = "KEY=VALUE")]
    pub engine_args: Vec<String>,

    /// Also recognize the clipboard image
    #[arg(long = "clipboard", default_value_t = false)]
    pub clipboard: bool,

    /// Print raw JSON results, one per line
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,

    /// Per-request timeout (ms)
    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    /// Engine startup handshake timeout (ms)
    #[arg(long = "startup-timeout-ms")]
    pub startup_timeout_ms: Option<u64>,

    /// Write JSON trace logs (path from PPOCR_TRACE_LOG)
    #[arg(long = "logs", env = "PPOCR_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all logging (overrides --logs and --log-level)
    #[arg(long = "no-logs", env = "PPOCR_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Log to stderr with this filter (e.g. debug, ppocr_client=trace)
    #[arg(long = "log-level", value_name = "FILTER")]
    pub log_level: Option<String>,
}
