//! Target word sources
//!
//! The game asks a [`WordSource`] for each new target word. The server uses a
//! [`WordList`] loaded from disk; tests pin the sequence with [`WordSequence`].

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::Path;

/// Used when the word file is missing or holds no usable words.
const BUILTIN_WORDS: &[&str] = &[
    "word", "socket", "buffer", "thread", "channel", "session", "network", "protocol", "hangman",
    "letter", "stream", "server", "client", "packet", "select", "window", "kernel", "binary",
];

pub trait WordSource {
    /// Word for the first round of a session.
    fn first_word(&mut self) -> String {
        self.next_word()
    }

    /// Word for every following round.
    fn next_word(&mut self) -> String;
}

/// Random picks from a fixed vocabulary.
#[derive(Debug)]
pub struct WordList {
    words: Vec<String>,
    rng: StdRng,
}

impl WordList {
    /// Reads whitespace-separated words. Falls back to the built-in list when the
    /// file cannot be read or holds nothing usable.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let words = parse_words(&contents);
                if words.is_empty() {
                    warn!("No usable words in {}, using built-in list", path.display());
                    Self::builtin()
                } else {
                    debug!("Loaded {} words from {}", words.len(), path.display());
                    Self::from_words(words)
                }
            }
            Err(e) => {
                warn!("Unable to read {}: {}, using built-in list", path.display(), e);
                Self::builtin()
            }
        }
    }

    pub fn builtin() -> Self {
        Self::from_words(BUILTIN_WORDS.iter().map(|w| w.to_string()).collect())
    }

    pub fn from_words(words: Vec<String>) -> Self {
        Self {
            words,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic picks, for tests.
    pub fn with_seed(words: Vec<String>, seed: u64) -> Self {
        Self {
            words,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl WordSource for WordList {
    fn next_word(&mut self) -> String {
        match self.words.choose(&mut self.rng) {
            Some(word) => word.clone(),
            None => BUILTIN_WORDS[0].to_string(),
        }
    }
}

/// Hands out words in order, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct WordSequence {
    words: Vec<String>,
    next: usize,
}

impl WordSequence {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
            next: 0,
        }
    }
}

impl WordSource for WordSequence {
    fn next_word(&mut self) -> String {
        if self.words.is_empty() {
            return BUILTIN_WORDS[0].to_string();
        }
        let word = self.words[self.next % self.words.len()].clone();
        self.next += 1;
        word
    }
}

/// Lowercases every whitespace-separated token and keeps the purely
/// alphabetic ones.
fn parse_words(contents: &str) -> Vec<String> {
    contents
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|word| word.chars().all(|c| c.is_ascii_alphabetic()))
        .collect()
}
