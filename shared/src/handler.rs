//! Dispatch seam between the event loop and the application
//!
//! The loop calls these hooks inline on its own thread, so implementations
//! must return quickly and hand long work off elsewhere.

use crate::error::{CloseReason, TransportError};
use crate::handle::SessionHandle;
use crate::message::Message;
use crate::session::SessionId;
use std::net::SocketAddr;

/// What the loop should do with a session after a message was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    /// Flush queued output, then close.
    Close,
}

pub trait SessionHandler {
    /// A session was accepted, or an outgoing connect completed.
    fn on_open(&mut self, _session: &SessionHandle) {}

    /// One decoded message. Replies go through `session.enqueue`.
    fn on_message(&mut self, session: &SessionHandle, message: Message) -> Disposition;

    /// The session is gone. Called at most once per opened session.
    fn on_close(&mut self, _id: SessionId, _reason: &CloseReason) {}

    /// An outgoing connect did not complete.
    fn on_connect_failed(&mut self, _addr: SocketAddr, _error: &TransportError) {}
}
