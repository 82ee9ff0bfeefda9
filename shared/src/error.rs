//! Error types shared by both endpoints of the session layer

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// A frame or payload that could not be turned into a [`Message`](crate::Message).
///
/// Each one concerns a single frame. The loop logs it, drops the frame and
/// keeps the session running.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown message type `{0}`")]
    UnknownType(String),

    #[error("message body contains the reserved delimiter `{}`", crate::DELIMITER)]
    DelimiterInBody,

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
}

/// Session-scoped I/O failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("peer closed the connection")]
    PeerClosed,

    #[error("could not connect to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("connect to {addr} was cancelled before it completed")]
    ConnectAborted { addr: SocketAddr },

    #[error("event loop is no longer running")]
    LoopClosed,
}

/// Returned to producers when a message cannot be queued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("outbound queue is full ({capacity} messages pending)")]
    Full { capacity: usize },

    #[error("message of {len} bytes exceeds the {max} byte frame limit")]
    TooLarge { len: usize, max: usize },

    #[error("session is closed")]
    Closed,
}

/// Why a session was torn down. Reported exactly once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer asked to end the session (QUIT).
    Quit,
    /// End-of-stream on read.
    PeerClosed,
    /// Unrecoverable read/write failure.
    Transport(String),
    /// Our own side requested the close.
    Local,
    /// The loop is stopping.
    Shutdown,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Quit => write!(f, "quit"),
            CloseReason::PeerClosed => write!(f, "peer closed the connection"),
            CloseReason::Transport(e) => write!(f, "transport error: {}", e),
            CloseReason::Local => write!(f, "closed locally"),
            CloseReason::Shutdown => write!(f, "event loop shut down"),
        }
    }
}
