//! Local engine supervision: spawning the executable with piped stdio, reading
//! its startup handshake, and tearing it down.

mod handshake;
mod process;
mod stdout;

pub(crate) use handshake::read_handshake;
pub use handshake::{
    classify_line, Handshake, HandshakeKind, HandshakeLine, CLIPBOARD_ENABLED, INIT_COMPLETED,
    INIT_FAILED, SOCKET_COMPLETED,
};
pub use process::EngineProcess;
pub(crate) use stdout::read_line;
