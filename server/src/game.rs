use crate::words::WordSource;
use log::debug;
use std::fmt;
use thiserror::Error;

/// Floor on the attempts granted for a round.
pub const MIN_ATTEMPTS: u32 = 5;

const HIDDEN: char = '_';

/// One player's view of a round. An empty word means the round was won and
/// the player has to START again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    score: u32,
    remaining_attempts: u32,
    mask: Vec<char>,
    word: String,
}

impl GameState {
    /// A fresh round for `word`, keeping `score`.
    pub fn with_word(score: u32, word: &str) -> Self {
        let len = word.chars().count();
        Self {
            score,
            remaining_attempts: attempts_for(len),
            mask: vec![HIDDEN; len],
            word: word.to_string(),
        }
    }

    fn round_won(score: u32) -> Self {
        Self {
            score,
            remaining_attempts: 0,
            mask: Vec::new(),
            word: String::new(),
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.remaining_attempts
    }

    pub fn mask(&self) -> String {
        self.mask.iter().collect()
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn word_len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_round_over(&self) -> bool {
        self.word.is_empty()
    }

    /// Uncovers every position holding `letter`. Returns whether any did.
    fn reveal(&mut self, letter: char) -> bool {
        let mut hit = false;
        for (slot, actual) in self.mask.iter_mut().zip(self.word.chars()) {
            if actual == letter {
                *slot = actual;
                hit = true;
            }
        }
        hit
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_round_over() {
            write!(f, "Round over, send START to keep playing | Score: {}", self.score)
        } else {
            write!(
                f,
                "Word: {} | Remaining attempts: {} | Score: {}",
                self.mask(),
                self.remaining_attempts,
                self.score
            )
        }
    }
}

pub fn attempts_for(word_len: usize) -> u32 {
    MIN_ATTEMPTS.max(word_len as u32)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuessError {
    #[error("`{guess}` is not a letter or a word of at most {word_len} letters")]
    InvalidGuess { guess: String, word_len: usize },

    #[error("the round is over, send START for a new word")]
    RoundOver,
}

/// Pure game rules. Callers own the state and swap in whatever comes back.
pub trait GameLogic {
    fn start_game(&mut self) -> GameState;

    /// Next round, carrying the score of `current`.
    fn new_game(&mut self, current: &GameState) -> GameState;

    fn guess(&mut self, guess: &str, current: &GameState) -> Result<GameState, GuessError>;
}

/// Classic hangman over a word source.
#[derive(Debug)]
pub struct Hangman<W> {
    words: W,
}

impl<W: WordSource> Hangman<W> {
    pub fn new(words: W) -> Self {
        Self { words }
    }

    fn guess_letter(&mut self, letter: char, current: &GameState) -> GameState {
        let mut next = current.clone();
        if next.reveal(letter) {
            next
        } else {
            self.lose_attempt(next)
        }
    }

    fn guess_word(&mut self, guess: &str, current: &GameState) -> GameState {
        if guess == current.word {
            debug!("Word `{}` guessed", current.word);
            GameState::round_won(current.score + 1)
        } else {
            self.lose_attempt(current.clone())
        }
    }

    fn lose_attempt(&mut self, mut state: GameState) -> GameState {
        state.remaining_attempts = state.remaining_attempts.saturating_sub(1);
        if state.remaining_attempts > 0 {
            return state;
        }
        debug!("Out of attempts on `{}`", state.word);
        state.score = state.score.saturating_sub(1);
        self.new_game(&state)
    }
}

impl<W: WordSource> GameLogic for Hangman<W> {
    fn start_game(&mut self) -> GameState {
        GameState::with_word(0, &self.words.first_word())
    }

    fn new_game(&mut self, current: &GameState) -> GameState {
        GameState::with_word(current.score, &self.words.next_word())
    }

    fn guess(&mut self, guess: &str, current: &GameState) -> Result<GameState, GuessError> {
        if current.is_round_over() {
            return Err(GuessError::RoundOver);
        }

        let guess = guess.trim().to_lowercase();
        let word_len = current.word_len();
        let mut letters = guess.chars();

        match (letters.next(), letters.next()) {
            (Some(letter), None) => Ok(self.guess_letter(letter, current)),
            (Some(_), Some(_)) if guess.chars().count() <= word_len => {
                Ok(self.guess_word(&guess, current))
            }
            _ => Err(GuessError::InvalidGuess { guess, word_len }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::words::WordSequence;

    fn hangman() -> Hangman<WordSequence> {
        Hangman::new(WordSequence::new(["word", "replacement"]))
    }

    #[test]
    fn test_start_game_uses_floor_attempts() {
        let state = hangman().start_game();
        assert_eq!(state.remaining_attempts(), 5);
        assert_eq!(state.mask(), "____");
        assert_eq!(state.score(), 0);
        assert_eq!(state.word(), "word");
    }

    #[test]
    fn test_long_word_gets_one_attempt_per_letter() {
        let state = GameState::with_word(0, "replacement");
        assert_eq!(state.remaining_attempts(), 11);
        assert_eq!(attempts_for(2), 5);
    }

    #[test]
    fn test_correct_letter_reveals_without_cost() {
        let mut game = hangman();
        let state = game.start_game();

        let next = game.guess("w", &state).unwrap();
        assert_eq!(next.mask(), "w___");
        assert_eq!(next.remaining_attempts(), 5);
        // The previous state is untouched.
        assert_eq!(state.mask(), "____");
    }

    #[test]
    fn test_repeated_letter_reveals_every_position() {
        let mut game = Hangman::new(WordSequence::new(["letter"]));
        let state = game.start_game();
        let next = game.guess("t", &state).unwrap();
        assert_eq!(next.mask(), "__tt__");
    }

    #[test]
    fn test_guess_is_case_insensitive() {
        let mut game = hangman();
        let state = game.start_game();
        let next = game.guess(" W ", &state).unwrap();
        assert_eq!(next.mask(), "w___");
    }

    #[test]
    fn test_wrong_letter_costs_attempt() {
        let mut game = hangman();
        let state = game.start_game();
        let next = game.guess("z", &state).unwrap();
        assert_eq!(next.remaining_attempts(), 4);
        assert_eq!(next.mask(), "____");
    }

    #[test]
    fn test_running_out_replaces_word_once() {
        let mut game = hangman();
        let mut state = GameState::with_word(2, "word");

        for wrong in ["a", "b", "c", "e"] {
            state = game.guess(wrong, &state).unwrap();
            assert_eq!(state.score(), 2);
            assert_eq!(state.word(), "word");
        }
        assert_eq!(state.remaining_attempts(), 1);

        state = game.guess("f", &state).unwrap();
        assert_eq!(state.score(), 1);
        assert_eq!(state.word(), "word");
        assert_eq!(state.remaining_attempts(), 5);
        assert_eq!(state.mask(), "____");

        // Only one decrement for the exhausted round.
        let next = game.guess("z", &state).unwrap();
        assert_eq!(next.score(), 1);
    }

    #[test]
    fn test_score_never_goes_negative() {
        let mut game = hangman();
        let mut state = game.start_game();
        for _ in 0..5 {
            state = game.guess("x", &state).unwrap();
        }
        assert_eq!(state.score(), 0);
        assert_eq!(state.remaining_attempts(), 5);
    }

    #[test]
    fn test_full_word_wins_round() {
        let mut game = hangman();
        let state = game.start_game();

        let won = game.guess("word", &state).unwrap();
        assert_eq!(won.score(), 1);
        assert_eq!(won.remaining_attempts(), 0);
        assert_eq!(won.mask(), "");
        assert!(won.is_round_over());
        assert_eq!(
            won.to_string(),
            "Round over, send START to keep playing | Score: 1"
        );
    }

    #[test]
    fn test_wrong_word_costs_attempt() {
        let mut game = hangman();
        let state = game.start_game();
        let next = game.guess("ward", &state).unwrap();
        assert_eq!(next.remaining_attempts(), 4);
        assert_eq!(next.score(), 0);
    }

    #[test]
    fn test_invalid_guess_lengths() {
        let mut game = hangman();
        let state = game.start_game();

        assert_eq!(
            game.guess("words", &state),
            Err(GuessError::InvalidGuess {
                guess: "words".to_string(),
                word_len: 4
            })
        );
        assert!(matches!(
            game.guess("   ", &state),
            Err(GuessError::InvalidGuess { .. })
        ));
    }

    #[test]
    fn test_guess_after_win_is_rejected() {
        let mut game = hangman();
        let state = game.start_game();
        let won = game.guess("word", &state).unwrap();
        assert_eq!(game.guess("w", &won), Err(GuessError::RoundOver));
    }

    #[test]
    fn test_new_game_keeps_score() {
        let mut game = hangman();
        let state = GameState::with_word(3, "word");
        let next = game.new_game(&state);
        assert_eq!(next.score(), 3);
        assert_eq!(next.word(), "word");
        let after = game.new_game(&next);
        assert_eq!(after.word(), "replacement");
    }

    #[test]
    fn test_display_in_progress() {
        let mut game = hangman();
        let state = game.start_game();
        let state = game.guess("w", &state).unwrap();
        assert_eq!(
            state.to_string(),
            "Word: w___ | Remaining attempts: 5 | Score: 0"
        );
    }
}
