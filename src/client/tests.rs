use super::*;
use crate::cancel::Wait;
use crate::protocol::{codes, Request};
use crate::test_support::{closed_port, StubSocketEngine};
use crate::transport::Reply;
use serde_json::{json, Value};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::thread;

/// Answers every exchange with the request echoed under `data`, counting
/// calls.
struct CountingTransport {
    exchanges: Arc<AtomicUsize>,
}

impl Transport for CountingTransport {
    fn exchange(&mut self, line: &[u8], _wait: &Wait<'_>) -> Reply {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        let request: Value = serde_json::from_slice(line).expect("request is JSON");
        let reply = json!({ "code": 100, "data": request });
        Ok(Some(format!("{reply}\n").into_bytes()))
    }

    fn close(&mut self) {}

    fn pid(&self) -> Option<u32> {
        None
    }

    fn endpoint(&self) -> Option<Endpoint> {
        None
    }
}

fn counting_client(clipboard_enabled: bool) -> (OcrClient, Arc<AtomicUsize>) {
    let exchanges = Arc::new(AtomicUsize::new(0));
    let transport = CountingTransport {
        exchanges: Arc::clone(&exchanges),
    };
    let client = OcrClient::with_transport(
        Box::new(transport),
        RunningMode::Local,
        IpcMode::Pipe,
        clipboard_enabled,
        EngineInfo::Local {
            pid: 4242,
            endpoint: None,
        },
    );
    (client, exchanges)
}

#[cfg(unix)]
fn stub_engine(script: &str) -> String {
    crate::test_support::write_stub_script(script)
        .to_string_lossy()
        .into_owned()
}

// -------------------------------------------------------------------------
// Facade behavior over a stub transport
// -------------------------------------------------------------------------

#[test]
fn clipboard_disabled_short_circuits() {
    let (client, exchanges) = counting_client(false);
    let result = client.run_clipboard();
    assert_eq!(result.code, codes::CLIPBOARD_UNAVAILABLE);
    assert_eq!(result.message(), Some("Clipboard function not available"));
    assert_eq!(exchanges.load(Ordering::SeqCst), 0);
}

#[test]
fn clipboard_enabled_sends_sentinel_path() {
    let (client, exchanges) = counting_client(true);
    let result = client.run_clipboard();
    assert_eq!(result.data, json!({ "image_path": "clipboard" }));
    assert_eq!(exchanges.load(Ordering::SeqCst), 1);
}

#[test]
fn run_bytes_matches_run_base64() {
    let (client, _) = counting_client(false);
    let images: [&[u8]; 3] = [b"", b"\x89PNG\r\n\x1a\n", &[0, 255, 17, 3]];
    for image in images {
        let encoded = STANDARD.encode(image);
        assert_eq!(client.run_bytes(image), client.run_base64(&encoded));
    }
    assert_eq!(
        client.run_bytes(b"").data,
        json!({ "image_base64": "" })
    );
}

#[test]
fn run_builds_image_path_request() {
    let (client, _) = counting_client(false);
    let result = client.run(Path::new("/tmp/scan.png"));
    assert_eq!(result.data, json!({ "image_path": "/tmp/scan.png" }));
}

#[test]
fn run_request_passes_extra_fields() {
    let (client, _) = counting_client(false);
    let request = Request::image_path("a.png").with("det", false).with("limit_side_len", 960);
    let result = client.run_request(&request);
    assert_eq!(
        result.data,
        json!({ "image_path": "a.png", "det": false, "limit_side_len": 960 })
    );
}

#[test]
fn encode_failure_skips_the_transport() {
    struct Refusing;
    impl serde::Serialize for Refusing {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not representable"))
        }
    }

    let (client, exchanges) = counting_client(false);
    let result = client.run_request(&Request::image_path("a.png").with("bad", Refusing));
    assert_eq!(result.code, codes::ENCODE_FAILED);
    assert_eq!(exchanges.load(Ordering::SeqCst), 0);
}

#[test]
fn exit_is_idempotent_and_final() {
    let (client, exchanges) = counting_client(true);
    assert_eq!(client.state(), ClientState::Ready);
    assert_eq!(client.try_pid(), Some(4242));

    client.exit();
    client.exit();
    assert_eq!(client.state(), ClientState::Exited);
    assert_eq!(client.try_pid(), None);

    assert_eq!(client.run("a.png").code, codes::ENGINE_UNAVAILABLE);
    assert_eq!(client.run_bytes(b"x").code, codes::ENGINE_UNAVAILABLE);
    assert_eq!(client.run_clipboard().code, codes::ENGINE_UNAVAILABLE);
    assert_eq!(exchanges.load(Ordering::SeqCst), 0);
}

// -------------------------------------------------------------------------
// Construction
// -------------------------------------------------------------------------

#[test]
fn pipe_mode_rejects_remote_target() {
    let err = OcrClient::new("remote://loopback:9999", IpcMode::Pipe, EngineConfig::new())
        .err()
        .expect("pipe cannot reach a remote engine");
    assert!(matches!(err, ClientError::ModeMismatch { mode: "pipe", .. }));
}

#[test]
fn missing_executable_is_a_construction_error() {
    let err = OcrClient::new(
        "/definitely/not/an/engine",
        IpcMode::Auto,
        EngineConfig::new(),
    )
    .err()
    .expect("executable is missing");
    assert!(matches!(err, ClientError::ExecutableNotFound { .. }));
    assert_eq!(err.code(), 901);
}

#[test]
fn remote_probe_against_closed_port_fails() {
    let target = format!("remote://loopback:{}", closed_port());
    let err = OcrClient::new(&target, IpcMode::Auto, EngineConfig::new())
        .err()
        .expect("nothing is listening");
    assert!((902..=905).contains(&err.code()));
}

#[test]
fn remote_client_uses_socket_transport() {
    let engine = StubSocketEngine::echo();
    let target = format!("remote://loopback:{}", engine.port);
    let client = OcrClient::new(&target, IpcMode::Auto, EngineConfig::new()).unwrap();
    assert_eq!(client.running_mode(), RunningMode::Remote);
    assert_eq!(client.running_mode().as_str(), "remote");
    assert_eq!(client.ipc_mode(), IpcMode::Socket);
    assert!(!client.is_clipboard_enabled());
    assert_eq!(client.try_pid(), None);
    assert_eq!(
        client.try_endpoint(),
        Some(&Endpoint::new("127.0.0.1", engine.port))
    );

    let result = client.run("remote.png");
    assert_eq!(result.data, json!({ "image_path": "remote.png" }));
    assert_eq!(client.run_clipboard().code, codes::CLIPBOARD_UNAVAILABLE);

    client.exit();
    assert_eq!(client.run("remote.png").code, codes::ENGINE_UNAVAILABLE);
}

// -------------------------------------------------------------------------
// Local engines
// -------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn local_pipe_client_reports_mode_and_pid() {
    let path = stub_engine(crate::test_support::ECHO_ENGINE);
    let client = OcrClient::new(&path, IpcMode::Auto, EngineConfig::new()).unwrap();
    assert_eq!(client.running_mode().as_str(), "local");
    assert_eq!(client.ipc_mode(), IpcMode::Pipe);
    assert!(client.try_pid().is_some());
    assert!(client.try_endpoint().is_none());
    assert!(!client.is_clipboard_enabled());

    let result = client.run_base64("aGk=");
    assert_eq!(result.data, json!({ "image_base64": "aGk=" }));
}

#[cfg(unix)]
#[test]
fn clipboard_line_enables_clipboard() {
    let script = r#"#!/bin/sh
echo "OCR clipboard enbaled."
echo "OCR init completed."
while IFS= read -r line; do
  printf '{"code":100,"data":%s}\n' "$line"
done
"#;
    let client = OcrClient::new(&stub_engine(script), IpcMode::Auto, EngineConfig::new()).unwrap();
    assert!(client.is_clipboard_enabled());
    assert_eq!(client.running_mode().as_str(), "local");
    assert_eq!(
        client.run_clipboard().data,
        json!({ "image_path": "clipboard" })
    );
}

#[cfg(unix)]
#[test]
fn concurrent_callers_never_cross_talk() {
    let path = stub_engine(crate::test_support::ECHO_ENGINE);
    let client = Arc::new(OcrClient::new(&path, IpcMode::Pipe, EngineConfig::new()).unwrap());

    let workers: Vec<_> = (0..50)
        .map(|worker| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for call in 0..20 {
                    let name = format!("w{worker}-c{call}.png");
                    let result = client.run(&name);
                    assert_eq!(result.code, 100);
                    assert_eq!(result.data, json!({ "image_path": name }));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker panicked");
    }
}

#[cfg(unix)]
#[test]
fn request_timeout_abandons_pipe_engine() {
    let path = stub_engine(crate::test_support::SILENT_ENGINE);
    let config = EngineConfig::new().with_request_timeout(Duration::from_millis(200));
    let client = OcrClient::new(&path, IpcMode::Auto, config).unwrap();

    let started = Instant::now();
    assert_eq!(client.run("a.png").code, codes::NO_RESPONSE);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(client.run("b.png").code, codes::ENGINE_UNAVAILABLE);
}

#[cfg(unix)]
#[test]
fn exit_releases_a_parked_request() {
    let path = stub_engine(crate::test_support::SILENT_ENGINE);
    let client = Arc::new(OcrClient::new(&path, IpcMode::Auto, EngineConfig::new()).unwrap());

    let parked = {
        let client = Arc::clone(&client);
        thread::spawn(move || client.run("a.png"))
    };
    thread::sleep(Duration::from_millis(200));
    let started = Instant::now();
    client.exit();
    let result = parked.join().expect("request thread panicked");
    assert_eq!(result.code, codes::NO_RESPONSE);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(client.run("b.png").code, codes::ENGINE_UNAVAILABLE);
}

#[cfg(unix)]
#[test]
fn crashed_engine_reports_no_response_then_crash() {
    let script = "#!/bin/sh\necho \"OCR init completed.\"\nread -r line\nexit 1\n";
    let client = OcrClient::new(&stub_engine(script), IpcMode::Auto, EngineConfig::new()).unwrap();
    assert_eq!(client.run("a.png").code, codes::NO_RESPONSE);

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut code = client.run("b.png").code;
    while code != codes::PROCESS_CRASHED && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
        code = client.run("b.png").code;
    }
    assert_eq!(code, codes::PROCESS_CRASHED);
}

#[cfg(unix)]
#[test]
fn local_socket_client_passes_socket_defaults() {
    let engine = StubSocketEngine::echo();
    let script = format!(
        "#!/bin/sh\necho \"$@\" > \"$(dirname \"$0\")/args.txt\"\necho \"Socket init completed. 127.0.0.1:{}\"\nexec sleep 30\n",
        engine.port
    );
    let path = stub_engine(&script);
    let client = OcrClient::new(&path, IpcMode::Socket, EngineConfig::new()).unwrap();
    assert_eq!(client.running_mode(), RunningMode::Local);
    assert_eq!(client.ipc_mode(), IpcMode::Socket);
    assert!(client.try_pid().is_some());
    assert_eq!(
        client.try_endpoint(),
        Some(&Endpoint::new("127.0.0.1", engine.port))
    );

    let args_file = Path::new(&path).with_file_name("args.txt");
    let args = std::fs::read_to_string(args_file).expect("stub recorded its args");
    assert_eq!(args.trim(), "--port 0 --addr loopback");

    assert_eq!(client.run("s.png").data, json!({ "image_path": "s.png" }));
}

#[cfg(unix)]
#[test]
fn deadline_covers_time_queued_behind_another_request() {
    let path = stub_engine(crate::test_support::SILENT_ENGINE);
    let client = Arc::new(OcrClient::new(&path, IpcMode::Auto, EngineConfig::new()).unwrap());

    let parked = {
        let client = Arc::clone(&client);
        thread::spawn(move || client.run("a.png"))
    };
    thread::sleep(Duration::from_millis(200));

    let started = Instant::now();
    let result = client.run_request_until(
        &Request::image_path("b.png"),
        started + Duration::from_millis(200),
    );
    assert_eq!(result.code, codes::NO_RESPONSE);
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(client.state(), ClientState::Ready);

    client.exit();
    assert_eq!(
        parked.join().expect("request thread panicked").code,
        codes::NO_RESPONSE
    );
}

#[cfg(unix)]
#[test]
fn exit_releases_queued_callers() {
    let path = stub_engine(crate::test_support::SILENT_ENGINE);
    let client = Arc::new(OcrClient::new(&path, IpcMode::Auto, EngineConfig::new()).unwrap());

    let callers: Vec<_> = (0..3)
        .map(|call| {
            let client = Arc::clone(&client);
            thread::spawn(move || client.run(format!("q{call}.png")).code)
        })
        .collect();
    thread::sleep(Duration::from_millis(200));
    let started = Instant::now();
    client.exit();
    for caller in callers {
        let code = caller.join().expect("caller panicked");
        assert!(code == codes::NO_RESPONSE || code == codes::ENGINE_UNAVAILABLE);
    }
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn concurrent_socket_callers_never_cross_talk() {
    let engine = StubSocketEngine::echo();
    let target = format!("remote://loopback:{}", engine.port);
    let client = Arc::new(OcrClient::new(&target, IpcMode::Socket, EngineConfig::new()).unwrap());

    let workers: Vec<_> = (0..20)
        .map(|worker| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for call in 0..10 {
                    let name = format!("s{worker}-c{call}.png");
                    let result = client.run(&name);
                    assert_eq!(result.code, 100);
                    assert_eq!(result.data, json!({ "image_path": name }));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker panicked");
    }
    // One probe connection plus one per request.
    assert_eq!(engine.connection_count(), 1 + 20 * 10);
}
