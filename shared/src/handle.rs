//! Producer-side handles
//!
//! Producer threads never touch a socket. They queue messages through a
//! [`SessionHandle`] and send requests through a [`LoopHandle`]; both wake the
//! loop so a pending readiness wait returns.

use crate::error::{EnqueueError, TransportError};
use crate::message::Message;
use crate::session::{OutboundQueue, SessionId};
use log::debug;
use mio::Waker;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Requests applied by the loop thread at the start of each iteration.
#[derive(Debug)]
pub(crate) enum LoopRequest {
    /// Arm WRITE interest for a session with queued output.
    Flush(SessionId),
    /// Open a client connection.
    Connect {
        addr: SocketAddr,
        reply: oneshot::Sender<Result<SessionHandle, TransportError>>,
    },
    /// Flush then close a session.
    Close(SessionId),
    /// Stop the loop.
    Shutdown,
}

/// Cloneable, thread-safe handle to a running event loop.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    requests: mpsc::UnboundedSender<LoopRequest>,
    waker: Arc<Waker>,
}

impl LoopHandle {
    pub(crate) fn new(requests: mpsc::UnboundedSender<LoopRequest>, waker: Arc<Waker>) -> Self {
        Self { requests, waker }
    }

    pub(crate) fn send(&self, request: LoopRequest) -> Result<(), TransportError> {
        self.requests
            .send(request)
            .map_err(|_| TransportError::LoopClosed)?;
        self.waker.wake()?;
        Ok(())
    }

    /// Starts a non-blocking connect and resolves once it succeeds or fails.
    pub async fn connect(&self, addr: SocketAddr) -> Result<SessionHandle, TransportError> {
        let (reply, done) = oneshot::channel();
        self.send(LoopRequest::Connect { addr, reply })?;
        done.await.map_err(|_| TransportError::LoopClosed)?
    }

    /// Same as [`connect`](Self::connect) for callers outside an async context.
    pub fn connect_blocking(&self, addr: SocketAddr) -> Result<SessionHandle, TransportError> {
        let (reply, done) = oneshot::channel();
        self.send(LoopRequest::Connect { addr, reply })?;
        done.blocking_recv()
            .map_err(|_| TransportError::LoopClosed)?
    }

    /// Asks the loop to flush and close one session.
    pub fn close(&self, id: SessionId) -> Result<(), TransportError> {
        self.send(LoopRequest::Close(id))
    }

    /// Asks the loop to stop after its current iteration.
    pub fn shutdown(&self) -> Result<(), TransportError> {
        self.send(LoopRequest::Shutdown)
    }
}

/// Producer view of one session: its outbound queue plus the way to wake the
/// loop.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    queue: Arc<OutboundQueue>,
    owner: LoopHandle,
}

impl SessionHandle {
    pub(crate) fn new(id: SessionId, queue: Arc<OutboundQueue>, owner: LoopHandle) -> Self {
        Self { id, queue, owner }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    /// Queues a message for this session. Never blocks; a full queue or a
    /// message too large to frame is reported instead of queued.
    pub fn enqueue(&self, message: Message) -> Result<(), EnqueueError> {
        if self.queue.push(message)? {
            if let Err(e) = self.owner.send(LoopRequest::Flush(self.id)) {
                debug!("Session {} could not request a flush: {}", self.id, e);
                return Err(EnqueueError::Closed);
            }
        }
        Ok(())
    }

    /// Flushes pending output, then closes the session.
    pub fn close(&self) -> Result<(), TransportError> {
        self.owner.close(self.id)
    }

    /// Messages not yet taken by the loop.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}
