use anyhow::{Context, Result};
use ppocr_client::{EngineInfo, OcrClient, OcrResult};
use std::io::{self, Write};

pub(crate) fn print_banner(client: &OcrClient) {
    let location = match client.engine_info() {
        EngineInfo::Local {
            pid,
            endpoint: Some(endpoint),
        } => format!("pid {pid}, listening on {endpoint}"),
        EngineInfo::Local { pid, endpoint: None } => format!("pid {pid}"),
        EngineInfo::Remote { endpoint } => endpoint.to_string(),
    };
    println!(
        "Engine ready ({} {}, {location}, clipboard {})",
        client.running_mode(),
        client.ipc_mode().label(),
        if client.is_clipboard_enabled() {
            "on"
        } else {
            "off"
        }
    );
}

/// One JSON line per result, or a labelled human-readable summary.
pub(crate) fn print_result(label: &str, result: &OcrResult, json: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer(&mut stdout, result).context("failed to encode result")?;
        writeln!(stdout)?;
    } else {
        writeln!(stdout, "== {label} ==")?;
        write!(stdout, "{result}")?;
    }
    stdout.flush().context("failed to write result")
}
