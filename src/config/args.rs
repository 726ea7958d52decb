use super::{EngineConfig, ListenAddr, OptionValue};
use crate::error::ClientError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Option names owned by typed [`EngineConfig`] fields.
pub const RESERVED_OPTION_NAMES: &[&str] = &["models_path", "port", "addr"];

/// Fully resolved engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    /// Absolute path of the engine executable.
    pub program: PathBuf,
    /// Arguments after the program.
    pub args: Vec<String>,
    /// The executable's directory, so relative engine resources resolve.
    pub working_dir: PathBuf,
}

impl EngineCommand {
    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.to_string_lossy().into_owned());
        argv.extend(self.args.iter().cloned());
        argv
    }
}

/// Resolve the executable and format every option into engine arguments.
///
/// Order: `--models_path`, typed socket options, then pass-through options in
/// insertion order. `socket_defaults` fills in `port=0` and `addr=loopback`
/// when the caller did not set them.
pub fn build_engine_command(
    executable: &Path,
    config: &EngineConfig,
    socket_defaults: bool,
) -> Result<EngineCommand, ClientError> {
    for (name, _) in config.options() {
        validate_option_name(name)?;
    }

    let program = resolve_executable(executable)?;
    let working_dir = program
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut args = Vec::new();
    if let Some(models) = &config.models_path {
        let models = resolve_models_path(models)?;
        args.push("--models_path".to_string());
        args.push(models.to_string_lossy().into_owned());
    }

    let port = config.port.or(socket_defaults.then_some(0));
    if let Some(port) = port {
        push_option(&mut args, "port", &OptionValue::Int(i64::from(port)));
    }
    let addr = config.addr.or(socket_defaults.then_some(ListenAddr::Loopback));
    if let Some(addr) = addr {
        push_option(&mut args, "addr", &OptionValue::Str(addr.as_arg()));
    }

    for (name, value) in config.options() {
        push_option(&mut args, name, value);
    }

    Ok(EngineCommand {
        program,
        args,
        working_dir,
    })
}

fn push_option(args: &mut Vec<String>, name: &str, value: &OptionValue) {
    match value {
        OptionValue::Bool(flag) => args.push(format!("--{name}={flag}")),
        other => {
            args.push(format!("--{name}"));
            args.push(other.to_string());
        }
    }
}

pub(super) fn validate_option_name(name: &str) -> Result<(), ClientError> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.starts_with('-') {
        Some("name must not start with '-'")
    } else if name.contains('=') || name.chars().any(char::is_whitespace) {
        Some("name must not contain '=' or whitespace")
    } else if RESERVED_OPTION_NAMES.contains(&name) {
        Some("use the typed EngineConfig field instead")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ClientError::InvalidOption {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Canonicalize the engine path and make sure it is a runnable file.
pub(super) fn resolve_executable(path: &Path) -> Result<PathBuf, ClientError> {
    let not_found = |source: io::Error| ClientError::ExecutableNotFound {
        path: path.to_path_buf(),
        source,
    };
    let canonical = path.canonicalize().map_err(not_found)?;
    let metadata = fs::metadata(&canonical).map_err(not_found)?;
    if !metadata.is_file() {
        return Err(not_found(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();
        if mode & 0o111 == 0 {
            return Err(not_found(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("not executable (mode {mode:o})"),
            )));
        }
    }
    Ok(canonical)
}

pub(super) fn resolve_models_path(path: &Path) -> Result<PathBuf, ClientError> {
    match path.canonicalize() {
        Ok(canonical) if canonical.is_dir() => Ok(canonical),
        _ => Err(ClientError::ModelsPathMissing(path.to_path_buf())),
    }
}
