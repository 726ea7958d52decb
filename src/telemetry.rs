use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// JSON trace file, overridable with `PPOCR_TRACE_LOG`.
pub fn tracing_log_path() -> PathBuf {
    env::var("PPOCR_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("ppocr_trace.jsonl"))
}

/// Install the process-wide subscriber for the `ppocr` binary. The library
/// itself only emits events.
pub fn init_tracing(config: &AppConfig) {
    if config.no_logs {
        return;
    }
    if !config.logs && config.log_level.is_none() {
        return;
    }

    let _ = TRACING_INIT.get_or_init(|| {
        if config.logs {
            let path = tracing_log_path();
            let file = match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => file,
                Err(_) => return,
            };
            let subscriber = tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter_for(config.log_level.as_deref(), "debug"))
                .with_timer(UtcTime::rfc_3339())
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        } else {
            let subscriber = tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter_for(config.log_level.as_deref(), "info"))
                .with_writer(io::stderr)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    });
}

fn filter_for(level: Option<&str>, fallback: &str) -> EnvFilter {
    level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}
