//! Client-side dispatch of server responses to the presentation layer

use log::{debug, info, warn};
use shared::{
    CloseReason, Disposition, Message, MessageType, SessionHandle, SessionHandler, SessionId,
    TransportError,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// Receives every line of text meant for the player.
///
/// Called inline on the loop thread, so implementations must return quickly.
pub trait Observer: Send + Sync {
    fn deliver(&self, text: &str);
}

impl<O: Observer + ?Sized> Observer for Arc<O> {
    fn deliver(&self, text: &str) {
        (**self).deliver(text)
    }
}

/// Forwards response bodies and connection diagnostics to an [`Observer`].
#[derive(Debug)]
pub struct ResponseSink<O> {
    observer: O,
}

impl<O: Observer> ResponseSink<O> {
    pub fn new(observer: O) -> Self {
        Self { observer }
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Delivers a response body. Returns false for anything that is not a
    /// response.
    pub fn forward(&self, message: &Message) -> bool {
        match message.kind() {
            MessageType::ResponseStart | MessageType::ResponseGuess => {
                self.observer.deliver(message.body());
                true
            }
            kind => {
                warn!("Received server-bound {} from the server, ignoring", kind);
                false
            }
        }
    }
}

impl<O: Observer> SessionHandler for ResponseSink<O> {
    fn on_open(&mut self, session: &SessionHandle) {
        info!("Session {} established", session.id());
        self.observer.deliver("Connected to server");
    }

    fn on_message(&mut self, session: &SessionHandle, message: Message) -> Disposition {
        debug!("Session {} received {}", session.id(), message.kind());
        self.forward(&message);
        Disposition::Continue
    }

    fn on_close(&mut self, id: SessionId, reason: &CloseReason) {
        info!("Session {} closed: {}", id, reason);
        match reason {
            CloseReason::Quit | CloseReason::Local | CloseReason::Shutdown => {
                self.observer.deliver("Disconnected from server")
            }
            CloseReason::PeerClosed => self.observer.deliver("Server closed the connection"),
            other => self
                .observer
                .deliver(&format!("Connection lost: {}", other)),
        }
    }

    fn on_connect_failed(&mut self, addr: SocketAddr, error: &TransportError) {
        debug!("Connect to {} failed: {}", addr, error);
        self.observer
            .deliver(&format!("Couldn't establish connection to {}", addr));
    }
}
