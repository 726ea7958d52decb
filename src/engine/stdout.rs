use crate::cancel::Wait;
use std::io::{self, BufRead, ErrorKind, Read};
use std::process::ChildStdout;

/// Engine stdout that never blocks longer than one poll slice, so callers can
/// notice deadlines and cancellation between reads.
pub(crate) struct EngineStdout {
    inner: ChildStdout,
}

impl EngineStdout {
    pub(crate) fn new(inner: ChildStdout) -> Self {
        Self { inner }
    }
}

impl Read for EngineStdout {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            if !wait_readable(self.inner.as_raw_fd())? {
                return Err(ErrorKind::WouldBlock.into());
            }
        }
        self.inner.read(buf)
    }
}

#[cfg(unix)]
fn wait_readable(fd: std::os::unix::io::RawFd) -> io::Result<bool> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = crate::cancel::POLL_SLICE.as_millis() as libc::c_int;
    let rc = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    // POLLHUP/POLLERR also count: the following read reports EOF or the error.
    Ok(rc > 0)
}

/// Read one `\n`-terminated line, retrying timed-out slices until the line
/// completes or `wait` gives up. `None` means EOF before any byte arrived; a
/// final line without a newline is still returned.
pub(crate) fn read_line<R: BufRead>(reader: &mut R, wait: &Wait<'_>) -> io::Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    loop {
        wait.check()?;
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => return Ok((!line.is_empty()).then_some(line)),
            Ok(_) => return Ok(Some(line)),
            Err(err) if should_retry_read_error(&err) => continue,
            Err(err) => return Err(err),
        }
    }
}

fn should_retry_read_error(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
