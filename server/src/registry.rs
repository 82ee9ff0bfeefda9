//! Per-session game state for the hangman server
//!
//! The registry is the server's [`SessionHandler`]. It keeps one optional
//! game per connected session and turns each inbound command into exactly
//! one response:
//! - `START` creates or renews the session's game and answers `RESPONSE_START`
//! - `GUESS` runs the rules against the stored game and answers `RESPONSE_GUESS`
//! - `QUIT` closes the session once queued responses are flushed
//!
//! A failed guess leaves the stored game untouched.

use crate::game::{GameLogic, GameState};
use log::{debug, info, warn};
use shared::{CloseReason, Disposition, Message, MessageType, SessionHandle, SessionHandler, SessionId};
use std::collections::HashMap;

/// Body sent when a session guesses before starting a game.
pub const NO_ACTIVE_GAME: &str = "No active game, send START first";

/// Tracks every connected session and the game it is playing, if any
#[derive(Debug)]
pub struct SessionRegistry<G> {
    logic: G,
    games: HashMap<SessionId, Option<GameState>>,
}

impl<G: GameLogic> SessionRegistry<G> {
    pub fn new(logic: G) -> Self {
        Self {
            logic,
            games: HashMap::new(),
        }
    }

    /// Records a new session with no game yet
    pub fn register(&mut self, id: SessionId) {
        self.games.insert(id, None);
    }

    /// Forgets a session and whatever game it had
    pub fn unregister(&mut self, id: SessionId) -> bool {
        self.games.remove(&id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.games.len()
    }

    pub fn game(&self, id: SessionId) -> Option<&GameState> {
        self.games.get(&id).and_then(Option::as_ref)
    }

    /// Starts a game for the session, or a new round carrying its score
    pub fn handle_start(&mut self, id: SessionId) -> Message {
        let slot = self.games.entry(id).or_insert(None);
        let next = match slot.as_ref() {
            Some(current) => self.logic.new_game(current),
            None => self.logic.start_game(),
        };
        debug!("Session {} playing a {} letter word", id, next.word_len());

        let body = next.to_string();
        *slot = Some(next);
        response(MessageType::ResponseStart, body)
    }

    /// Applies one guess. Errors are reported to the player and leave the
    /// stored game as it was.
    pub fn handle_guess(&mut self, id: SessionId, guess: &str) -> Message {
        let Some(current) = self.games.get_mut(&id).and_then(Option::as_mut) else {
            return response(MessageType::ResponseGuess, NO_ACTIVE_GAME.to_string());
        };

        let body = match self.logic.guess(guess, current) {
            Ok(next) => {
                *current = next;
                current.to_string()
            }
            Err(e) => {
                debug!("Session {} sent a rejected guess: {}", id, e);
                format!("{} ({})", current, e)
            }
        };
        response(MessageType::ResponseGuess, body)
    }
}

impl<G: GameLogic> SessionHandler for SessionRegistry<G> {
    fn on_open(&mut self, session: &SessionHandle) {
        info!("Session {} connected", session.id());
        self.register(session.id());
    }

    fn on_message(&mut self, session: &SessionHandle, message: Message) -> Disposition {
        let id = session.id();
        let reply = match message.kind() {
            MessageType::Start => self.handle_start(id),
            MessageType::Guess => self.handle_guess(id, message.body()),
            MessageType::Quit => {
                info!("Session {} quit", id);
                return Disposition::Close;
            }
            kind => {
                warn!("Session {} sent server-bound response {}, ignoring", id, kind);
                return Disposition::Continue;
            }
        };

        if let Err(e) = session.enqueue(reply) {
            warn!("Dropping reply to session {}: {}", id, e);
        }
        Disposition::Continue
    }

    fn on_close(&mut self, id: SessionId, reason: &CloseReason) {
        if self.unregister(id) {
            info!("Session {} closed: {}", id, reason);
        }
    }
}

/// Game bodies never carry the delimiter, but a custom word list could.
fn response(kind: MessageType, body: String) -> Message {
    Message::new(kind, body).unwrap_or_else(|e| {
        warn!("Unable to build {} response: {}", kind, e);
        Message::empty(kind)
    })
}
