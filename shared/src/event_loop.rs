//! Single-threaded readiness loop shared by the client and the server
//!
//! One thread owns the [`Poll`], every socket and every [`Session`]. Each
//! iteration first applies requests sent by producer threads (flush, connect,
//! close, shutdown), then blocks in `poll` until a socket is ready or a
//! producer wakes it, then dispatches:
//!
//! - listener readable: accept new sessions with READ interest
//! - connecting session ready: finish the handshake and switch to WRITE
//! - readable: read, decode every complete frame, hand each to the handler
//! - writable: drain the outbound queue, then switch back to READ
//!
//! A failure on one session never leaves this module: it is logged and the
//! session is torn down, the loop keeps serving the others.

use crate::error::{CloseReason, TransportError};
use crate::handle::{LoopHandle, LoopRequest, SessionHandle};
use crate::handler::{Disposition, SessionHandler};
use crate::session::{
    DrainOutcome, OutboundQueue, ReadEnd, Session, SessionId, SessionInterest, SessionState,
};
use log::{debug, error, info, warn};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};
use std::collections::HashMap;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

const WAKER_TOKEN: Token = Token(0);
const LISTENER_TOKEN: Token = Token(1);
const FIRST_SESSION_ID: usize = 2;

/// Tunables for one event loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Messages a session may have queued before producers see `Full`.
    pub queue_capacity: usize,
    /// Largest accepted payload in bytes.
    pub max_frame_len: usize,
    /// Readiness events fetched per poll.
    pub events_capacity: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            max_frame_len: 8192,
            events_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Readiness {
    token: Token,
    readable: bool,
    writable: bool,
    failed: bool,
}

type ConnectReply = oneshot::Sender<Result<SessionHandle, TransportError>>;

/// Multiplexes every session of one endpoint on the calling thread.
pub struct EventLoop<H> {
    poll: Poll,
    waker: Arc<Waker>,
    listener: Option<TcpListener>,
    sessions: HashMap<SessionId, Session<TcpStream>>,
    connect_replies: HashMap<SessionId, ConnectReply>,
    requests_tx: mpsc::UnboundedSender<LoopRequest>,
    requests_rx: mpsc::UnboundedReceiver<LoopRequest>,
    /// Sessions that spent their read budget and still have to be read.
    unread: Vec<SessionId>,
    handler: H,
    config: LoopConfig,
    next_id: usize,
    running: bool,
}

impl<H: SessionHandler> EventLoop<H> {
    /// A loop without a listener, for the client side.
    pub fn new(handler: H, config: LoopConfig) -> io::Result<Self> {
        let poll = Poll::new()?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER_TOKEN)?);
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();

        Ok(Self {
            poll,
            waker,
            listener: None,
            sessions: HashMap::new(),
            connect_replies: HashMap::new(),
            requests_tx,
            requests_rx,
            unread: Vec::new(),
            handler,
            config,
            next_id: FIRST_SESSION_ID,
            running: true,
        })
    }

    /// A loop that accepts sessions on `addr`.
    pub fn bind(addr: SocketAddr, handler: H, config: LoopConfig) -> io::Result<Self> {
        let mut event_loop = Self::new(handler, config)?;
        let mut listener = TcpListener::bind(addr)?;
        event_loop
            .poll
            .registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
        info!("Listening on {}", listener.local_addr()?);
        event_loop.listener = Some(listener);
        Ok(event_loop)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// A handle producers can use from any thread.
    pub fn handle(&self) -> LoopHandle {
        LoopHandle::new(self.requests_tx.clone(), Arc::clone(&self.waker))
    }

    #[cfg(test)]
    pub(crate) fn handler(&self) -> &H {
        &self.handler
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Runs until a shutdown request arrives, then closes every session.
    pub fn run(&mut self) -> io::Result<()> {
        info!("Event loop started");
        while self.running {
            self.turn(None)?;
        }
        self.flush_pending();
        self.close_all(CloseReason::Shutdown);
        info!("Event loop stopped");
        Ok(())
    }

    /// One iteration: apply requests, wait for readiness, dispatch.
    ///
    /// Only a failing `poll` itself is returned as an error.
    pub fn turn(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.apply_requests();
        if !self.running {
            return Ok(());
        }

        // Sessions left with unread input get no new readiness event, so the
        // wait must not block while any are pending.
        let carried = std::mem::take(&mut self.unread);
        let timeout = if carried.is_empty() {
            timeout
        } else {
            Some(Duration::ZERO)
        };

        let mut events = Events::with_capacity(self.config.events_capacity);
        match self.poll.poll(&mut events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => {
                self.unread.extend(carried);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let ready: Vec<Readiness> = events
            .iter()
            .map(|event| Readiness {
                token: event.token(),
                readable: event.is_readable() || event.is_read_closed(),
                writable: event.is_writable(),
                failed: event.is_error(),
            })
            .collect();

        for readiness in ready {
            match readiness.token {
                // Requests are picked up at the top of the next turn
                WAKER_TOKEN => {}
                LISTENER_TOKEN => self.accept_sessions(),
                token => self.dispatch(SessionId::from(token), readiness),
            }
        }

        for id in carried {
            if !self.unread.contains(&id) && self.sessions.contains_key(&id) {
                self.session_readable(id);
            }
        }

        Ok(())
    }

    /// Tears a session down right away, without flushing. Repeated calls are
    /// no-ops and the handler hears about the close once.
    pub fn close_session(&mut self, id: SessionId, reason: CloseReason) {
        let Some(mut session) = self.sessions.remove(&id) else {
            return;
        };

        if let Err(e) = self.poll.registry().deregister(session.stream_mut()) {
            debug!("Session {} deregister failed: {}", id, e);
        }
        let opened = session.state() != SessionState::Connecting;
        let addr = session.peer_addr();
        session.close();
        self.unread.retain(|pending| *pending != id);

        if let Some(reply) = self.connect_replies.remove(&id) {
            let err = match (&reason, addr) {
                (CloseReason::Shutdown, _) | (_, None) => TransportError::LoopClosed,
                (_, Some(addr)) => TransportError::ConnectAborted { addr },
            };
            if reply.send(Err(err)).is_err() {
                debug!("Nobody is waiting for session {} to connect", id);
            }
        }

        info!("Session {} closed: {}", id, reason);
        if opened {
            self.handler.on_close(id, &reason);
        }
    }

    /// Closes every session, e.g. on shutdown.
    pub fn close_all(&mut self, reason: CloseReason) {
        debug!("Closing {} sessions: {}", self.session_count(), reason);
        for id in self.session_ids() {
            self.close_session(id, reason.clone());
        }
    }

    /// Writes whatever queued output the sockets accept right now. Never
    /// waits for writable readiness.
    fn flush_pending(&mut self) {
        for (id, session) in self.sessions.iter_mut() {
            let open = matches!(
                session.state(),
                SessionState::Established | SessionState::Closing
            );
            if !open || !session.has_pending_output() {
                continue;
            }
            match session.drain_writable() {
                Ok(DrainOutcome::Drained) => debug!("Session {} flushed before shutdown", id),
                Ok(DrainOutcome::Blocked) => debug!("Session {} output cut short by shutdown", id),
                Err(e) => debug!("Session {} final flush failed: {}", id, e),
            }
        }
    }

    fn apply_requests(&mut self) {
        while let Ok(request) = self.requests_rx.try_recv() {
            match request {
                LoopRequest::Flush(id) => self.arm_write(id),
                LoopRequest::Connect { addr, reply } => self.start_connect(addr, reply),
                LoopRequest::Close(id) => self.begin_close(id, CloseReason::Local),
                LoopRequest::Shutdown => {
                    info!("Shutdown requested");
                    self.running = false;
                }
            }
        }
    }

    fn dispatch(&mut self, id: SessionId, readiness: Readiness) {
        let Some(session) = self.sessions.get(&id) else {
            debug!("Readiness for unknown session {}", id);
            return;
        };

        if session.state() == SessionState::Connecting {
            self.finish_connect(id);
            return;
        }

        if readiness.readable || readiness.failed {
            self.session_readable(id);
        }
        if readiness.writable && self.sessions.contains_key(&id) {
            self.session_writable(id);
        }
    }

    fn accept_sessions(&mut self) {
        loop {
            let Some(listener) = self.listener.as_ref() else {
                return;
            };

            match listener.accept() {
                Ok((stream, peer)) => self.register_accepted(stream, peer),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset
                    ) =>
                {
                    warn!("Transient accept error: {}", e);
                    continue;
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    break;
                }
            }
        }
    }

    fn register_accepted(&mut self, mut stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY for {}: {}", peer, e);
        }

        let id = self.allocate_id();
        let handle = self.new_session_handle(id);
        if let Err(e) = self
            .poll
            .registry()
            .register(&mut stream, id.token(), Interest::READABLE)
        {
            error!("Failed to register session from {}: {}", peer, e);
            return;
        }

        info!("Session {} accepted from {}", id, peer);
        let session =
            Session::established(handle.clone(), stream, Some(peer), self.config.max_frame_len);
        self.sessions.insert(id, session);
        self.handler.on_open(&handle);
    }

    fn start_connect(&mut self, addr: SocketAddr, reply: ConnectReply) {
        let mut stream = match TcpStream::connect(addr) {
            Ok(stream) => stream,
            Err(e) => return self.fail_connect(addr, e, reply),
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
        }

        let id = self.allocate_id();
        if let Err(e) = self.poll.registry().register(
            &mut stream,
            id.token(),
            SessionInterest::Connect.into(),
        ) {
            return self.fail_connect(addr, e, reply);
        }

        info!("Session {} connecting to {}", id, addr);
        let handle = self.new_session_handle(id);
        let session = Session::connecting(handle, stream, addr, self.config.max_frame_len);
        self.sessions.insert(id, session);
        self.connect_replies.insert(id, reply);
    }

    fn finish_connect(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };

        let result = match session.stream().take_error() {
            Ok(Some(e)) | Err(e) => Err(e),
            Ok(None) => match session.stream().peer_addr() {
                Ok(peer) => Ok(peer),
                // Still in progress
                Err(e) if e.kind() == ErrorKind::NotConnected => return,
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(peer) => {
                session.mark_established(peer);
                let handle = session.handle().clone();
                info!("Session {} connected to {}", id, peer);

                self.set_interest(id, SessionInterest::Write);
                if let Some(reply) = self.connect_replies.remove(&id) {
                    if reply.send(Ok(handle.clone())).is_err() {
                        debug!("Nobody is waiting for session {} to connect", id);
                    }
                }
                self.handler.on_open(&handle);
            }
            Err(e) => {
                let addr = session.peer_addr();
                if let Some(mut session) = self.sessions.remove(&id) {
                    if let Err(e) = self.poll.registry().deregister(session.stream_mut()) {
                        debug!("Session {} deregister failed: {}", id, e);
                    }
                    session.close();
                }
                let reply = self.connect_replies.remove(&id);
                match (addr, reply) {
                    (Some(addr), Some(reply)) => self.fail_connect(addr, e, reply),
                    _ => warn!("Session {} failed to connect: {}", id, e),
                }
            }
        }
    }

    fn fail_connect(&mut self, addr: SocketAddr, source: io::Error, reply: ConnectReply) {
        let err = TransportError::ConnectFailed { addr, source };
        warn!("{}", err);
        self.handler.on_connect_failed(addr, &err);
        if reply.send(Err(err)).is_err() {
            debug!("Nobody is waiting for the connect to {}", addr);
        }
    }

    fn session_readable(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };

        let outcome = session.read_available();
        let handle = session.handle().clone();
        let mut accepting = session.state() == SessionState::Established;

        for frame in outcome.frames {
            match frame {
                Ok(message) if accepting => {
                    debug!("Session {} received {}", id, message.kind());
                    if self.handler.on_message(&handle, message) == Disposition::Close {
                        self.begin_close(id, CloseReason::Quit);
                        accepting = false;
                    }
                }
                Ok(message) => {
                    debug!("Session {} is closing, dropping {}", id, message.kind());
                }
                Err(e) => warn!("Session {} dropped a malformed frame: {}", id, e),
            }
        }

        match outcome.end {
            ReadEnd::WouldBlock => {}
            ReadEnd::Budget => {
                if self.sessions.contains_key(&id) {
                    debug!("Session {} read budget spent, continuing next turn", id);
                    self.unread.push(id);
                }
            }
            ReadEnd::Eof => self.close_session(id, CloseReason::PeerClosed),
            ReadEnd::Failed(e) => self.close_session(id, CloseReason::Transport(e.to_string())),
        }
    }

    fn session_writable(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };

        match session.drain_writable() {
            Ok(DrainOutcome::Drained) => {
                if session.state() == SessionState::Closing {
                    let reason = session.take_close_reason();
                    self.close_session(id, reason);
                } else {
                    self.set_interest(id, SessionInterest::Read);
                }
            }
            Ok(DrainOutcome::Blocked) => {
                debug!("Session {} send buffer full, waiting for writable", id);
            }
            Err(e) => {
                warn!("Session {} write failed: {}", id, e);
                self.close_session(id, CloseReason::Transport(e.to_string()));
            }
        }
    }

    fn arm_write(&mut self, id: SessionId) {
        match self.sessions.get(&id).map(|s| s.state()) {
            Some(SessionState::Established) | Some(SessionState::Closing) => {
                self.set_interest(id, SessionInterest::Write)
            }
            // Connect completion arms WRITE itself
            Some(_) => {}
            None => debug!("Flush requested for unknown session {}", id),
        }
    }

    fn begin_close(&mut self, id: SessionId, reason: CloseReason) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };

        match session.state() {
            SessionState::Connecting => self.close_session(id, reason),
            SessionState::Established => {
                session.begin_closing(reason);
                if session.has_pending_output() {
                    debug!("Session {} flushing before close", id);
                    self.set_interest(id, SessionInterest::Write);
                } else {
                    let reason = session.take_close_reason();
                    self.close_session(id, reason);
                }
            }
            SessionState::Closing | SessionState::Closed => {}
        }
    }

    fn set_interest(&mut self, id: SessionId, interest: SessionInterest) {
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        if !session.set_interest(interest) {
            return;
        }

        if let Err(e) =
            self.poll
                .registry()
                .reregister(session.stream_mut(), id.token(), interest.into())
        {
            error!("Session {} could not change interest: {}", id, e);
            self.close_session(id, CloseReason::Transport(e.to_string()));
        }
    }

    fn new_session_handle(&self, id: SessionId) -> SessionHandle {
        SessionHandle::new(
            id,
            Arc::new(OutboundQueue::new(
                self.config.queue_capacity,
                self.config.max_frame_len,
            )),
            self.handle(),
        )
    }

    fn allocate_id(&mut self) -> SessionId {
        loop {
            let candidate = SessionId(self.next_id);
            self.next_id = self.next_id.checked_add(1).unwrap_or(FIRST_SESSION_ID);
            if !self.sessions.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode_frame, FRAME_HEADER_LEN};
    use crate::message::{Message, MessageType};
    use std::io::{Read, Write};
    use std::net::TcpStream as StdTcpStream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    #[derive(Default)]
    struct Recorder {
        opened: Vec<SessionId>,
        received: Vec<Message>,
        closes: Vec<(SessionId, CloseReason)>,
        connect_failures: usize,
        seen: Arc<AtomicUsize>,
    }

    impl SessionHandler for Recorder {
        fn on_open(&mut self, session: &SessionHandle) {
            self.opened.push(session.id());
        }

        fn on_message(&mut self, session: &SessionHandle, message: Message) -> Disposition {
            let kind = message.kind();
            self.received.push(message);
            self.seen.fetch_add(1, Ordering::SeqCst);
            match kind {
                MessageType::Start => {
                    let reply = Message::new(MessageType::ResponseStart, "started").unwrap();
                    session.enqueue(reply).unwrap();
                    Disposition::Continue
                }
                MessageType::Quit => {
                    let reply = Message::new(MessageType::ResponseGuess, "bye").unwrap();
                    session.enqueue(reply).unwrap();
                    Disposition::Close
                }
                _ => Disposition::Continue,
            }
        }

        fn on_close(&mut self, id: SessionId, reason: &CloseReason) {
            self.closes.push((id, reason.clone()));
        }

        fn on_connect_failed(&mut self, _addr: SocketAddr, _error: &TransportError) {
            self.connect_failures += 1;
        }
    }

    fn server() -> EventLoop<Recorder> {
        EventLoop::bind(
            "127.0.0.1:0".parse().unwrap(),
            Recorder::default(),
            LoopConfig::default(),
        )
        .unwrap()
    }

    fn turn_until<H: SessionHandler>(event_loop: &mut EventLoop<H>, done: impl Fn(&EventLoop<H>) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(event_loop) {
            assert!(Instant::now() < deadline, "Timed out waiting for the event loop");
            event_loop.turn(Some(Duration::from_millis(20))).unwrap();
        }
    }

    fn pump<H: SessionHandler>(event_loop: &mut EventLoop<H>, turns: usize) {
        for _ in 0..turns {
            event_loop.turn(Some(Duration::from_millis(10))).unwrap();
        }
    }

    fn read_frame(stream: &mut StdTcpStream) -> Message {
        let mut header = [0u8; FRAME_HEADER_LEN];
        stream.read_exact(&mut header).unwrap();
        let mut payload = vec![0u8; u32::from_be_bytes(header) as usize];
        stream.read_exact(&mut payload).unwrap();
        decode(&payload).unwrap()
    }

    fn connect_client(event_loop: &mut EventLoop<Recorder>) -> StdTcpStream {
        let addr = event_loop.local_addr().unwrap();
        let stream = StdTcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        turn_until(event_loop, |l| l.session_count() == 1);
        stream
    }

    #[test]
    fn test_accept_dispatch_and_reply() {
        let mut event_loop = server();
        let mut client = connect_client(&mut event_loop);

        client
            .write_all(&encode_frame(&Message::empty(MessageType::Start)))
            .unwrap();
        turn_until(&mut event_loop, |l| l.handler().received.len() == 1);
        pump(&mut event_loop, 5);

        let reply = read_frame(&mut client);
        assert_eq!(reply.kind(), MessageType::ResponseStart);
        assert_eq!(reply.body(), "started");
        assert_eq!(event_loop.handler().opened.len(), 1);
    }

    #[test]
    fn test_close_twice_notifies_once() {
        let mut event_loop = server();
        let _client = connect_client(&mut event_loop);
        let id = event_loop.session_ids()[0];

        event_loop.close_session(id, CloseReason::Local);
        event_loop.close_session(id, CloseReason::Local);

        assert_eq!(event_loop.session_count(), 0);
        assert_eq!(event_loop.handler().closes, vec![(id, CloseReason::Local)]);
    }

    #[test]
    fn test_peer_close_tears_down_only_that_session() {
        let mut event_loop = server();
        let first = connect_client(&mut event_loop);
        let addr = event_loop.local_addr().unwrap();
        let _second = StdTcpStream::connect(addr).unwrap();
        turn_until(&mut event_loop, |l| l.session_count() == 2);

        drop(first);
        turn_until(&mut event_loop, |l| l.session_count() == 1);

        let closes = &event_loop.handler().closes;
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].1, CloseReason::PeerClosed);
    }

    #[test]
    fn test_quit_flushes_reply_before_close() {
        let mut event_loop = server();
        let mut client = connect_client(&mut event_loop);

        client
            .write_all(&encode_frame(&Message::empty(MessageType::Quit)))
            .unwrap();
        turn_until(&mut event_loop, |l| l.session_count() == 0);

        let reply = read_frame(&mut client);
        assert_eq!(reply.body(), "bye");

        let mut rest = Vec::new();
        assert_eq!(client.read_to_end(&mut rest).unwrap(), 0);
        assert_eq!(event_loop.handler().closes[0].1, CloseReason::Quit);
    }

    #[test]
    fn test_malformed_frame_keeps_session_open() {
        let mut event_loop = server();
        let mut client = connect_client(&mut event_loop);

        let mut bytes = Vec::new();
        bytes.extend(&9u32.to_be_bytes());
        bytes.extend(b"JUMP##now");
        bytes.extend(encode_frame(&Message::new(MessageType::Guess, "w").unwrap()));
        client.write_all(&bytes).unwrap();

        turn_until(&mut event_loop, |l| l.handler().received.len() == 1);
        assert_eq!(event_loop.handler().received[0].body(), "w");
        assert_eq!(event_loop.session_count(), 1);
    }

    #[test]
    fn test_oversized_frame_is_dropped_and_session_continues() {
        let mut event_loop = server();
        let mut client = connect_client(&mut event_loop);

        let mut bytes = Vec::new();
        bytes.extend(&9000u32.to_be_bytes());
        bytes.extend(b"GUESS##");
        bytes.extend(vec![b'x'; 8993]);
        bytes.extend(encode_frame(&Message::new(MessageType::Guess, "w").unwrap()));
        client.write_all(&bytes).unwrap();

        turn_until(&mut event_loop, |l| l.handler().received.len() == 1);
        assert_eq!(event_loop.handler().received[0].body(), "w");
        assert_eq!(event_loop.session_count(), 1);
        assert!(event_loop.handler().closes.is_empty());
    }

    #[test]
    fn test_input_beyond_read_budget_is_not_stranded() {
        let config = LoopConfig {
            max_frame_len: 64,
            ..LoopConfig::default()
        };
        let mut event_loop =
            EventLoop::bind("127.0.0.1:0".parse().unwrap(), Recorder::default(), config).unwrap();
        let mut client = connect_client(&mut event_loop);

        // Far more than one read budget, sent in a single write.
        let mut bytes = Vec::new();
        for _ in 0..1000 {
            bytes.extend(encode_frame(&Message::new(MessageType::Guess, "w").unwrap()));
        }
        client.write_all(&bytes).unwrap();

        turn_until(&mut event_loop, |l| l.handler().received.len() == 1000);
        assert_eq!(event_loop.session_count(), 1);
    }

    #[test]
    fn test_local_close_while_connecting_aborts_connect() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut event_loop = EventLoop::new(Recorder::default(), LoopConfig::default()).unwrap();

        let (reply, mut done) = oneshot::channel();
        event_loop.start_connect(addr, reply);
        let id = event_loop.session_ids()[0];
        event_loop.close_session(id, CloseReason::Local);

        match done.try_recv() {
            Ok(Err(TransportError::ConnectAborted { addr: aborted })) => assert_eq!(aborted, addr),
            other => panic!("Expected an aborted connect, got {:?}", other),
        }
        assert_eq!(event_loop.session_count(), 0);
        // Never opened, so the handler hears nothing.
        assert!(event_loop.handler().closes.is_empty());
    }

    #[test]
    fn test_connect_refused_reports_failure() {
        let addr = {
            let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap()
        };

        let mut event_loop = EventLoop::new(Recorder::default(), LoopConfig::default()).unwrap();
        let handle = event_loop.handle();
        let worker = thread::spawn(move || {
            event_loop.run().unwrap();
            event_loop
        });

        let result = handle.connect_blocking(addr);
        assert!(matches!(result, Err(TransportError::ConnectFailed { .. })));

        handle.shutdown().unwrap();
        let event_loop = worker.join().unwrap();
        assert_eq!(event_loop.handler().connect_failures, 1);
        assert!(event_loop.handler().opened.is_empty());
    }

    #[test]
    fn test_client_loop_exchanges_with_server_loop() {
        let mut server_loop = server();
        let addr = server_loop.local_addr().unwrap();
        let server_handle = server_loop.handle();
        let server_worker = thread::spawn(move || {
            server_loop.run().unwrap();
            server_loop
        });

        let client_seen = Arc::new(AtomicUsize::new(0));
        let recorder = Recorder {
            seen: Arc::clone(&client_seen),
            ..Recorder::default()
        };
        let mut client_loop = EventLoop::new(recorder, LoopConfig::default()).unwrap();
        let client_handle = client_loop.handle();
        let client_worker = thread::spawn(move || {
            client_loop.run().unwrap();
            client_loop
        });

        let session = client_handle.connect_blocking(addr).unwrap();
        session.enqueue(Message::empty(MessageType::Start)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while client_seen.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        client_handle.shutdown().unwrap();
        server_handle.shutdown().unwrap();
        let client_loop = client_worker.join().unwrap();
        let server_loop = server_worker.join().unwrap();

        assert_eq!(server_loop.handler().received[0].kind(), MessageType::Start);
        assert_eq!(client_loop.handler().received[0].body(), "started");
        assert_eq!(client_loop.handler().closes[0].1, CloseReason::Shutdown);
    }
}
