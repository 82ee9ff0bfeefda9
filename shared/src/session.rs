//! Per-connection session state
//!
//! A [`Session`] owns the socket, the receive buffer and the partially written
//! frame. Only the loop thread touches it. The [`OutboundQueue`] is the one
//! piece producer threads share with it, guarded by its own lock.

use crate::codec::FrameCodec;
use crate::error::{CloseReason, EnqueueError, ProtocolError};
use crate::handle::SessionHandle;
use crate::message::Message;
use bytes::{Buf, BytesMut};
use log::{trace, warn};
use mio::{Interest, Token};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::net::SocketAddr;

const READ_CHUNK: usize = 4096;

/// Read budget of one readable event, in maximum-size frames.
const READ_BUDGET_FRAMES: usize = 4;

/// Identifies one session inside its event loop. Doubles as the poll token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub usize);

impl SessionId {
    pub fn token(self) -> Token {
        Token(self.0)
    }
}

impl From<Token> for SessionId {
    fn from(token: Token) -> Self {
        SessionId(token.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a session. Server sessions start at `Established`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Established,
    Closing,
    Closed,
}

/// What the loop is currently waiting for on this socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInterest {
    Connect,
    Read,
    Write,
}

impl From<SessionInterest> for Interest {
    fn from(interest: SessionInterest) -> Self {
        match interest {
            SessionInterest::Connect | SessionInterest::Write => Interest::WRITABLE,
            SessionInterest::Read => Interest::READABLE,
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    messages: VecDeque<Message>,
    flush_requested: bool,
    closed: bool,
}

/// Bounded FIFO of messages waiting to be written.
///
/// `flush_requested` is set by the first push after the loop found the queue
/// empty and cleared by the pop that finds it empty again, so producers only
/// wake the loop when it is not already draining.
#[derive(Debug)]
pub struct OutboundQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    max_frame_len: usize,
}

impl OutboundQueue {
    pub fn new(capacity: usize, max_frame_len: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            capacity: capacity.max(1),
            max_frame_len,
        }
    }

    /// Appends a message. Returns true when the caller must ask the loop to
    /// arm WRITE interest.
    pub fn push(&self, message: Message) -> Result<bool, EnqueueError> {
        let len = message.payload_len();
        if len > self.max_frame_len {
            return Err(EnqueueError::TooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        let mut state = self.state.lock();
        if state.closed {
            return Err(EnqueueError::Closed);
        }
        if state.messages.len() >= self.capacity {
            return Err(EnqueueError::Full {
                capacity: self.capacity,
            });
        }
        state.messages.push_back(message);
        let wake = !state.flush_requested;
        state.flush_requested = true;
        Ok(wake)
    }

    /// Takes the oldest message, or clears the flush flag if there is none.
    pub fn pop(&self) -> Option<Message> {
        let mut state = self.state.lock();
        let message = state.messages.pop_front();
        if message.is_none() {
            state.flush_requested = false;
        }
        message
    }

    /// Stops accepting new messages. Already queued ones stay for flushing.
    /// Returns false if the queue was already closed.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        !std::mem::replace(&mut state.closed, true)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().messages.is_empty()
    }
}

/// How a read pass ended.
#[derive(Debug)]
pub enum ReadEnd {
    /// Socket drained; more may arrive later.
    WouldBlock,
    /// Read budget spent with the socket possibly still holding data. No
    /// further readiness event will come for it.
    Budget,
    /// Peer closed its side.
    Eof,
    /// Unrecoverable error.
    Failed(io::Error),
}

/// Frames decoded during one read pass, in arrival order.
#[derive(Debug)]
pub struct ReadOutcome {
    pub frames: Vec<Result<Message, ProtocolError>>,
    pub end: ReadEnd,
}

/// Result of a write pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Queue empty and nothing left half-written.
    Drained,
    /// Socket buffer full; the remainder waits for the next writable event.
    Blocked,
}

/// One live connection plus its framing and queue state.
pub struct Session<S> {
    handle: SessionHandle,
    stream: S,
    peer_addr: Option<SocketAddr>,
    state: SessionState,
    interest: SessionInterest,
    codec: FrameCodec,
    recv: BytesMut,
    read_budget: usize,
    pending: BytesMut,
    close_reason: Option<CloseReason>,
}

impl<S: Read + Write> Session<S> {
    /// A session for an accepted socket.
    pub fn established(
        handle: SessionHandle,
        stream: S,
        peer_addr: Option<SocketAddr>,
        max_frame_len: usize,
    ) -> Self {
        Self::with_state(
            handle,
            stream,
            peer_addr,
            max_frame_len,
            SessionState::Established,
            SessionInterest::Read,
        )
    }

    /// A session whose non-blocking connect is still in flight.
    pub fn connecting(
        handle: SessionHandle,
        stream: S,
        peer_addr: SocketAddr,
        max_frame_len: usize,
    ) -> Self {
        Self::with_state(
            handle,
            stream,
            Some(peer_addr),
            max_frame_len,
            SessionState::Connecting,
            SessionInterest::Connect,
        )
    }

    fn with_state(
        handle: SessionHandle,
        stream: S,
        peer_addr: Option<SocketAddr>,
        max_frame_len: usize,
        state: SessionState,
        interest: SessionInterest,
    ) -> Self {
        Self {
            handle,
            stream,
            peer_addr,
            state,
            interest,
            codec: FrameCodec::new(max_frame_len),
            recv: BytesMut::with_capacity(READ_CHUNK),
            read_budget: max_frame_len
                .saturating_mul(READ_BUDGET_FRAMES)
                .max(READ_CHUNK),
            pending: BytesMut::new(),
            close_reason: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn interest(&self) -> SessionInterest {
        self.interest
    }

    /// Records the new interest. Returns true if it changed, meaning the
    /// socket has to be re-registered.
    pub fn set_interest(&mut self, interest: SessionInterest) -> bool {
        let changed = self.interest != interest;
        self.interest = interest;
        changed
    }

    pub fn mark_established(&mut self, peer_addr: SocketAddr) {
        self.peer_addr = Some(peer_addr);
        self.state = SessionState::Established;
    }

    /// Enqueue from the loop thread or any producer.
    pub fn enqueue_outbound(&self, message: Message) -> Result<(), EnqueueError> {
        self.handle.enqueue(message)
    }

    /// Reads until the socket would block, the peer closes, an error occurs or
    /// the read budget is spent. Every chunk is decoded as soon as it is read.
    pub fn read_available(&mut self) -> ReadOutcome {
        let mut frames = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        let mut budget = self.read_budget;

        let end = loop {
            if budget == 0 {
                break ReadEnd::Budget;
            }
            let want = budget.min(READ_CHUNK);
            match self.stream.read(&mut chunk[..want]) {
                Ok(0) => break ReadEnd::Eof,
                Ok(n) => {
                    trace!("Session {} read {} bytes", self.id(), n);
                    budget -= n;
                    frames.extend(self.absorb_readable(&chunk[..n]));
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break ReadEnd::WouldBlock,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => break ReadEnd::Failed(e),
            }
        };

        ReadOutcome { frames, end }
    }

    /// Appends bytes to the receive buffer and decodes every complete frame.
    ///
    /// Errors are single malformed or oversized frames that have already been
    /// dropped from the buffer.
    pub fn absorb_readable(&mut self, bytes: &[u8]) -> Vec<Result<Message, ProtocolError>> {
        self.recv.extend_from_slice(bytes);

        let mut frames = Vec::new();
        loop {
            match self.codec.decode_message(&mut self.recv) {
                Ok(Some(message)) => frames.push(Ok(message)),
                Ok(None) => return frames,
                Err(e) => frames.push(Err(e)),
            }
        }
    }

    /// Writes queued messages in order until the queue is empty or the socket
    /// stops accepting bytes. A partially written frame is finished before the
    /// next one is taken from the queue.
    pub fn drain_writable(&mut self) -> io::Result<DrainOutcome> {
        loop {
            if self.pending.is_empty() {
                let Some(message) = self.handle.queue().pop() else {
                    return Ok(DrainOutcome::Drained);
                };
                if let Err(e) = self.codec.encode_message(&message, &mut self.pending) {
                    warn!("Session {} dropped outbound {}: {}", self.id(), message.kind(), e);
                }
                continue;
            }

            match self.stream.write(&self.pending) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero)),
                Ok(n) => {
                    self.pending.advance(n);
                    trace!(
                        "Session {} wrote {} bytes, {} left in frame",
                        self.id(),
                        n,
                        self.pending.len()
                    );
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(DrainOutcome::Blocked),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// True while something is queued or half-written.
    pub fn has_pending_output(&self) -> bool {
        !self.pending.is_empty() || !self.handle.queue().is_empty()
    }

    /// Stops accepting new outbound messages; the loop flushes what is queued
    /// and then closes. Returns false if already closing or closed.
    pub fn begin_closing(&mut self, reason: CloseReason) -> bool {
        match self.state {
            SessionState::Closing | SessionState::Closed => false,
            _ => {
                self.handle.queue().close();
                self.state = SessionState::Closing;
                self.close_reason = Some(reason);
                true
            }
        }
    }

    pub fn take_close_reason(&mut self) -> CloseReason {
        self.close_reason.take().unwrap_or(CloseReason::Local)
    }

    /// Final transition. Returns false if the session was already closed.
    pub fn close(&mut self) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        self.handle.queue().close();
        self.state = SessionState::Closed;
        true
    }
}
