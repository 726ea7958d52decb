//! Transport drivers: one request line out, one response line back.
//!
//! Drivers never surface errors through a second channel; every failure is
//! folded into an [`OcrResult`] with a client-assigned code.

mod pipe;
mod socket;

use crate::cancel::{is_abandoned, Wait};
use crate::config::Endpoint;
use crate::protocol::{codes, decode_response, encode_request, OcrResult, Request};
use std::io;

pub(crate) use pipe::PipeTransport;
pub(crate) use socket::SocketTransport;

/// Raw reply of one exchange: the response line, or `None` when the peer
/// closed without sending one.
pub(crate) type Reply = Result<Option<Vec<u8>>, OcrResult>;

pub(crate) trait Transport: Send {
    /// Write `line` (already newline-terminated) and read one line back.
    fn exchange(&mut self, line: &[u8], wait: &Wait<'_>) -> Reply;

    /// Release the engine or connection. Later exchanges return 901.
    fn close(&mut self);

    /// PID of an owned engine process.
    fn pid(&self) -> Option<u32>;

    /// Address of a socket engine.
    fn endpoint(&self) -> Option<Endpoint>;

    /// Encode, exchange, and decode one request.
    fn send(&mut self, request: &Request, wait: &Wait<'_>) -> OcrResult {
        let line = match encode_request(request) {
            Ok(line) => line,
            Err(failure) => return failure,
        };
        match self.exchange(&line, wait) {
            Ok(reply) => decode_response(reply.as_deref()),
            Err(failure) => failure,
        }
    }
}

/// 903 for a read that failed or was abandoned.
fn read_failure(err: &io::Error) -> OcrResult {
    if is_abandoned(err) {
        OcrResult::failure(
            codes::NO_RESPONSE,
            format!("No response from engine: {err}"),
        )
    } else {
        OcrResult::failure(codes::NO_RESPONSE, format!("Engine read failed: {err}"))
    }
}
