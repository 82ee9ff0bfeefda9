//! Server network layer binding the listener and driving the session loop

use crate::game::GameLogic;
use crate::registry::SessionRegistry;
use log::info;
use shared::{EventLoop, LoopConfig, LoopHandle};
use std::io;
use std::net::SocketAddr;

/// Hangman server: one listener, one loop thread, one game per session.
pub struct Server<G> {
    event_loop: EventLoop<SessionRegistry<G>>,
    addr: SocketAddr,
}

impl<G: GameLogic> Server<G> {
    /// Binds the listening socket. Nothing is accepted until [`run`](Self::run).
    pub fn bind(addr: SocketAddr, logic: G, config: LoopConfig) -> io::Result<Self> {
        let event_loop = EventLoop::bind(addr, SessionRegistry::new(logic), config)?;
        let addr = event_loop.local_addr().unwrap_or(addr);
        info!("Server listening on {}", addr);
        Ok(Self { event_loop, addr })
    }

    /// Actual bound address, useful after binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Handle for stopping the server from another thread.
    pub fn handle(&self) -> LoopHandle {
        self.event_loop.handle()
    }

    /// Serves until a shutdown request arrives, then closes every session.
    pub fn run(&mut self) -> io::Result<()> {
        self.event_loop.run()?;
        info!("Server on {} stopped", self.addr);
        Ok(())
    }
}
