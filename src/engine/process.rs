use super::stdout::EngineStdout;
use crate::config::EngineCommand;
use crate::error::ClientError;
use std::io::{BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

/// A spawned engine and the pipes this client owns.
///
/// Torn down exactly once: [`terminate`](Self::terminate) is a no-op after the
/// first call and also runs on drop.
pub struct EngineProcess {
    child: Option<Child>,
    pid: u32,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<EngineStdout>>,
}

impl EngineProcess {
    /// Start the engine with piped stdin/stdout in its own directory. Stderr is
    /// discarded.
    pub fn spawn(command: &EngineCommand) -> Result<Self, ClientError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = cmd.spawn().map_err(|source| ClientError::Spawn {
            path: command.program.clone(),
            source,
        })?;
        let pid = child.id();
        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .map(|out| BufReader::new(EngineStdout::new(out)));
        tracing::info!(
            pid,
            program = %command.program.display(),
            args = ?command.args,
            "engine process spawned"
        );
        Ok(Self {
            child: Some(child),
            pid,
            stdin,
            stdout,
        })
    }

    /// OS process id while the process is owned.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(|_| self.pid)
    }

    /// True until the process has been observed to exit or was terminated.
    pub fn is_alive(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::warn!(pid = self.pid, %status, "engine process exited");
                false
            }
            Err(err) => {
                tracing::warn!(pid = self.pid, error = %err, "engine status check failed");
                false
            }
        }
    }

    /// Kill and reap the process. Safe on an exited or already terminated one.
    pub fn terminate(&mut self) {
        // Closing stdin first lets a well-behaved engine see EOF.
        self.stdin = None;
        self.stdout = None;
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(err) = child.kill() {
            tracing::debug!(pid = self.pid, error = %err, "engine kill failed (already exited?)");
        }
        match child.wait() {
            Ok(status) => tracing::info!(pid = self.pid, %status, "engine process reaped"),
            Err(err) => tracing::warn!(pid = self.pid, error = %err, "failed to reap engine"),
        }
    }

    pub(crate) fn stdout_mut(&mut self) -> Option<&mut BufReader<EngineStdout>> {
        self.stdout.as_mut()
    }

    /// Drop our end of stdout once the engine no longer talks over it.
    pub(crate) fn release_stdout(&mut self) {
        self.stdout = None;
    }

    /// Write one full request line and flush it.
    pub(crate) fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::BrokenPipe))?;
        stdin.write_all(line)?;
        stdin.flush()
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}
