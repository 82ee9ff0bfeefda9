//! # Hangman Server Library
//!
//! The authoritative side of the hangman game. Each TCP connection is one
//! session with its own game; the server answers every command with exactly
//! one response and never initiates traffic on its own.
//!
//! ## Core Responsibilities
//!
//! ### Session Tracking
//! Sessions are created by the shared event loop on accept. The registry
//! keeps one optional game per session, created on the first `START` and
//! dropped when the session closes.
//!
//! ### Game Rules
//! Attempts are the larger of five and the word length. A single letter
//! uncovers every matching position or costs an attempt; a full word either
//! wins the round or costs an attempt. Running out costs one point and deals
//! a new word. Rules are pure functions over [`game::GameState`], so a
//! rejected guess cannot leave a half-applied state behind.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! All sockets are owned by one loop thread that also runs the game rules
//! inline. The binary moves that loop onto a blocking task and keeps the
//! async runtime for signal handling.
//!
//! ## Module Organization
//!
//! ### Config Module (`config`)
//! Command line flags: port with fallback, bind host, word file and loop tunables.
//!
//! ### Game Module (`game`)
//! Game state, the [`game::GameLogic`] seam and the classic rules in [`game::Hangman`].
//!
//! ### Network Module (`network`)
//! Binds the listener and runs the session loop with the registry installed.
//!
//! ### Registry Module (`registry`)
//! Maps sessions to games and converts commands into responses.
//!
//! ### Words Module (`words`)
//! Target word sources: a file-backed random list and a fixed sequence.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::Hangman;
//! use server::network::Server;
//! use server::words::WordList;
//! use shared::LoopConfig;
//!
//! fn main() -> std::io::Result<()> {
//!     let logic = Hangman::new(WordList::builtin());
//!     let mut server = Server::bind("127.0.0.1:4444".parse().unwrap(), logic, LoopConfig::default())?;
//!
//!     // Blocks until a LoopHandle::shutdown arrives from another thread.
//!     server.run()
//! }
//! ```

pub mod config;
pub mod game;
pub mod network;
pub mod registry;
pub mod words;
