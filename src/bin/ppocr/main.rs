//! `ppocr` driver: start (or reach) an engine, recognize the given images, and
//! print each result.

mod report;

use anyhow::{Context, Result};
use ppocr_client::{init_tracing, AppConfig, OcrClient};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let config = AppConfig::parse_args()?;
    init_tracing(&config);

    let engine_config = config.engine_config()?;
    let client = OcrClient::new(&config.target, config.ipc_mode, engine_config)
        .with_context(|| format!("failed to start OCR engine '{}'", config.target))?;
    tracing::info!(
        mode = client.running_mode().as_str(),
        pid = client.try_pid(),
        endpoint = ?client.try_endpoint(),
        "engine connected"
    );
    if !config.json {
        report::print_banner(&client);
    }

    let mut failures = 0usize;
    for image in &config.images {
        let result = client.run(image);
        if !result.is_success() {
            failures += 1;
        }
        report::print_result(&image.display().to_string(), &result, config.json)?;
    }
    if config.clipboard {
        let result = client.run_clipboard();
        if !result.is_success() {
            failures += 1;
        }
        report::print_result("clipboard", &result, config.json)?;
    }

    client.exit();
    if failures > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
