use super::{AppConfig, EngineConfig, EngineTarget, OptionValue, RESERVED_OPTION_NAMES};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const MAX_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1000;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before anything is spawned.
    pub fn validate(&mut self) -> Result<()> {
        let target = EngineTarget::parse(&self.target)?;

        if self.images.is_empty() && !self.clipboard {
            bail!("nothing to recognize: pass one or more IMAGES or --clipboard");
        }
        for (flag, value) in [
            ("--timeout-ms", self.timeout_ms),
            ("--startup-timeout-ms", self.startup_timeout_ms),
        ] {
            if let Some(ms) = value {
                if ms == 0 || ms > MAX_TIMEOUT_MS {
                    bail!("{flag} must be between 1 and {MAX_TIMEOUT_MS}, got {ms}");
                }
            }
        }
        if let Some(models) = &self.models_path {
            if target.executable().is_none() {
                bail!("--models-path only applies to a local engine executable");
            }
            if !models.is_dir() {
                bail!("--models-path '{}' is not a directory", models.display());
            }
        }
        if (self.port.is_some() || self.addr.is_some()) && target.executable().is_none() {
            bail!("--port and --addr only apply to a locally spawned socket engine");
        }
        for raw in &self.engine_args {
            parse_engine_arg(raw)?;
        }
        if let Some(filter) = &self.log_level {
            EnvFilter::try_new(filter)
                .with_context(|| format!("invalid --log-level filter '{filter}'"))?;
        }
        Ok(())
    }

    /// Engine settings derived from the flags.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::new();
        config.models_path = self.models_path.clone();
        config.port = self.port;
        config.addr = self.addr;
        config.request_timeout = self.timeout_ms.map(Duration::from_millis);
        config.startup_timeout = self.startup_timeout_ms.map(Duration::from_millis);
        for raw in &self.engine_args {
            let (name, value) = parse_engine_arg(raw)?;
            config.set_option(name, value);
        }
        Ok(config)
    }
}

/// Split `KEY=VALUE` and type the value.
pub fn parse_engine_arg(raw: &str) -> Result<(String, OptionValue)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("--engine-arg '{raw}' must look like KEY=VALUE"))?;
    let name = name.trim().trim_start_matches("--");
    if name.is_empty() {
        bail!("--engine-arg '{raw}' has an empty key");
    }
    if RESERVED_OPTION_NAMES.contains(&name) {
        bail!("--engine-arg '{name}' has a dedicated flag; use --{} instead", name.replace('_', "-"));
    }
    Ok((name.to_string(), OptionValue::infer(value)))
}
