//! Producer-side facade used by the console
//!
//! The controller never touches the socket. Every operation either queues a
//! message on the current session or sends a request to the loop, and
//! reports failure to the caller instead of dropping it.

use log::{debug, info};
use parking_lot::Mutex;
use shared::{
    EnqueueError, LoopHandle, Message, MessageType, ProtocolError, SessionHandle, SessionId,
    TransportError,
};
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Not connected, use `connect` first")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Unable to send: {0}")]
    Enqueue(#[from] EnqueueError),

    #[error("Invalid message: {0}")]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct Controller {
    event_loop: LoopHandle,
    session: Mutex<Option<SessionHandle>>,
}

impl Controller {
    pub fn new(event_loop: LoopHandle) -> Self {
        Self {
            event_loop,
            session: Mutex::new(None),
        }
    }

    /// Connects and resolves once the handshake completed or failed.
    pub async fn connect(&self, addr: SocketAddr) -> Result<SessionId, ClientError> {
        if self.is_connected() {
            return Err(ClientError::AlreadyConnected);
        }

        let session = self.event_loop.connect(addr).await?;
        let id = session.id();
        info!("Connected to {} as session {}", addr, id);
        *self.session.lock() = Some(session);
        Ok(id)
    }

    /// False once the server has closed the session.
    pub fn is_connected(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .map_or(false, |session| !session.is_closed())
    }

    pub fn start_game(&self) -> Result<(), ClientError> {
        self.send(Message::empty(MessageType::Start))
    }

    pub fn submit_guess(&self, guess: &str) -> Result<(), ClientError> {
        self.send(Message::new(MessageType::Guess, guess)?)
    }

    /// Sends QUIT and closes once it has been flushed.
    pub fn disconnect(&self) -> Result<(), ClientError> {
        let session = self
            .session
            .lock()
            .take()
            .filter(|session| !session.is_closed())
            .ok_or(ClientError::NotConnected)?;

        debug!(
            "Disconnecting session {} with {} messages pending",
            session.id(),
            session.pending()
        );
        session.enqueue(Message::empty(MessageType::Quit))?;
        session.close()?;
        Ok(())
    }

    /// Stops the event loop. Open sessions are closed by the loop.
    pub fn shutdown(&self) -> Result<(), ClientError> {
        self.event_loop.shutdown()?;
        Ok(())
    }

    fn send(&self, message: Message) -> Result<(), ClientError> {
        let guard = self.session.lock();
        let session = guard
            .as_ref()
            .filter(|session| !session.is_closed())
            .ok_or(ClientError::NotConnected)?;
        session.enqueue(message)?;
        Ok(())
    }
}
