//! # Hangman Client Library
//!
//! Console client for the hangman server. One event loop thread owns the
//! connection; the console task is a pure producer that turns typed commands
//! into queued messages.
//!
//! ## Architecture Overview
//!
//! ### Producer / Loop Split
//! The console never reads or writes the socket. It calls the [`controller::Controller`],
//! which queues messages on the session handle and wakes the loop. Connecting
//! returns a future that resolves once the handshake completes or fails.
//!
//! ### Response Delivery
//! Server responses are handed to an [`sink::Observer`] inline on the loop
//! thread. Connection failures travel the same path as diagnostics, so the
//! console only ever prints text.
//!
//! ## Module Organization
//!
//! ### Command Module (`command`)
//! Parses `connect`, `start`, `guess`, `quit` and `help`, validating hosts and ports.
//!
//! ### Config Module (`config`)
//! Command line flags for the default server address and loop tunables.
//!
//! ### Console Module (`console`)
//! The interpreter loop over stdin and the stdout observer with its prompt.
//!
//! ### Controller Module (`controller`)
//! Connection lifecycle and message submission on behalf of the console.
//!
//! ### Sink Module (`sink`)
//! The client's session handler, forwarding response bodies to the observer.

pub mod command;
pub mod config;
pub mod console;
pub mod controller;
pub mod sink;
