//! # Hangman Session Layer
//!
//! Networking core used symmetrically by the hangman client and server. It
//! multiplexes every connection of one endpoint on a single thread, frames
//! application messages on the TCP byte stream, and lets other threads talk
//! to sessions only through per-session queues plus an explicit wakeup.
//!
//! ## Module Organization
//!
//! ### Message and Codec (`message`, `codec`)
//! The five message kinds and their `<TYPE>##<body>` text payload. Payloads
//! are carried behind a 4-byte length header so split and coalesced reads
//! decode to exactly the frames that were sent.
//!
//! ### Sessions (`session`, `handle`)
//! Per-socket receive buffer, partially written frame and lifecycle state,
//! plus the bounded outbound queue shared with producer threads. Producers
//! hold a [`SessionHandle`] and never touch the socket.
//!
//! ### Event Loop (`event_loop`, `handler`)
//! The readiness loop built on `mio`. It accepts or connects sockets, flips
//! interest between READ and WRITE, and hands decoded messages to a
//! [`SessionHandler`] implemented by the server registry or the client sink.
//!
//! ## Threading Contract
//!
//! Only the loop thread reads or writes sockets. A producer's entire surface
//! is `SessionHandle::enqueue` and the [`LoopHandle`] requests; both wake the
//! loop. Delivery order is FIFO per session and unspecified across sessions.

pub mod codec;
pub mod error;
pub mod event_loop;
pub mod handle;
pub mod handler;
pub mod message;
pub mod session;

pub use error::{CloseReason, EnqueueError, ProtocolError, TransportError};
pub use event_loop::{EventLoop, LoopConfig};
pub use handle::{LoopHandle, SessionHandle};
pub use handler::{Disposition, SessionHandler};
pub use message::{Message, MessageType};
pub use session::SessionId;

/// Port used when none (or an invalid one) is given.
pub const DEFAULT_PORT: u16 = 4444;

/// Separates the type token from the body in a payload.
pub const DELIMITER: &str = "##";

/// Parses a port argument, falling back to [`DEFAULT_PORT`] for anything
/// outside 1..=65535.
pub fn parse_port(arg: Option<&str>) -> u16 {
    arg.and_then(|raw| raw.trim().parse::<u16>().ok())
        .filter(|port| *port != 0)
        .unwrap_or(DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_port_valid() {
        assert_eq!(parse_port(Some("8080")), 8080);
        assert_eq!(parse_port(Some("1")), 1);
        assert_eq!(parse_port(Some("65535")), 65535);
    }

    #[test]
    fn test_parse_port_falls_back() {
        assert_eq!(parse_port(None), DEFAULT_PORT);
        assert_eq!(parse_port(Some("0")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("65536")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("-1")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("port")), DEFAULT_PORT);
    }
}
