//! Stub engines shared by unit tests.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

/// Handshake plus a loop that answers every request line with
/// `{"code":100,"data":<request>}`.
pub(crate) const ECHO_ENGINE: &str = r#"#!/bin/sh
echo "PaddleOCR-json v1.4"
echo "OCR init completed."
while IFS= read -r line; do
  printf '{"code":100,"data":%s}\n' "$line"
done
"#;

/// Completes the handshake and then never answers.
pub(crate) const SILENT_ENGINE: &str = r#"#!/bin/sh
echo "OCR init completed."
while IFS= read -r line; do
  :
done
"#;

#[cfg(unix)]
pub(crate) fn write_stub_script(contents: &str) -> PathBuf {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let seq = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("ppocr_stub_{nanos}_{seq}"));
    fs::create_dir_all(&dir).expect("create stub dir");
    let path = dir.join("engine.sh");
    fs::write(&path, contents).expect("write stub");
    let mut perms = fs::metadata(&path).expect("stat stub").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod stub");
    path
}

/// In-process socket engine. Each connection is read to EOF (so the client
/// must half-close) and answered by `respond`; `None` closes silently.
pub(crate) struct StubSocketEngine {
    pub(crate) port: u16,
    pub(crate) connections: Arc<AtomicUsize>,
}

impl StubSocketEngine {
    pub(crate) fn start<F>(respond: F) -> Self
    where
        F: Fn(&[u8]) -> Option<String> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub engine");
        let port = listener.local_addr().expect("local addr").port();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connections);
        let respond = Arc::new(respond);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let respond = Arc::clone(&respond);
                thread::spawn(move || serve_one(stream, respond.as_ref()));
            }
        });
        Self { port, connections }
    }

    /// Echo engine: `{"code":100,"data":<request>}`.
    pub(crate) fn echo() -> Self {
        Self::start(|request| {
            let body = String::from_utf8_lossy(request);
            Some(format!("{{\"code\":100,\"data\":{}}}\n", body.trim()))
        })
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

fn serve_one(mut stream: TcpStream, respond: &(dyn Fn(&[u8]) -> Option<String> + Send + Sync)) {
    let mut request = Vec::new();
    if stream.read_to_end(&mut request).is_err() {
        return;
    }
    if let Some(reply) = respond(&request) {
        let _ = stream.write_all(reply.as_bytes());
    }
}

/// A port with nothing listening on it.
pub(crate) fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    listener.local_addr().expect("local addr").port()
}
