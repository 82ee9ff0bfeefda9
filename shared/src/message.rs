//! Application messages exchanged between the hangman client and server

use crate::error::ProtocolError;
use crate::DELIMITER;
use std::fmt;
use std::str::FromStr;

/// Every message kind understood on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Client asks for a new round
    Start,
    /// Client guesses a letter or the whole word
    Guess,
    /// Client ends the session
    Quit,
    /// Server reply to `Start`
    ResponseStart,
    /// Server reply to `Guess`
    ResponseGuess,
}

impl MessageType {
    pub const ALL: [MessageType; 5] = [
        MessageType::Start,
        MessageType::Guess,
        MessageType::Quit,
        MessageType::ResponseStart,
        MessageType::ResponseGuess,
    ];

    /// The token written in front of the delimiter.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Start => "START",
            MessageType::Guess => "GUESS",
            MessageType::Quit => "QUIT",
            MessageType::ResponseStart => "RESPONSE_START",
            MessageType::ResponseGuess => "RESPONSE_GUESS",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    /// Type tokens are matched case-insensitively.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let upper = token.trim().to_ascii_uppercase();
        MessageType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == upper)
            .ok_or_else(|| ProtocolError::UnknownType(token.to_string()))
    }
}

/// One application message: a type plus free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageType,
    body: String,
}

impl Message {
    /// Builds a message, rejecting bodies that contain the wire delimiter.
    pub fn new(kind: MessageType, body: impl Into<String>) -> Result<Self, ProtocolError> {
        let body = body.into();
        if body.contains(DELIMITER) {
            return Err(ProtocolError::DelimiterInBody);
        }
        Ok(Self { kind, body })
    }

    /// A message with an empty body. Always valid.
    pub fn empty(kind: MessageType) -> Self {
        Self {
            kind,
            body: String::new(),
        }
    }

    /// Used by the decoder, which has already split on the first delimiter.
    pub(crate) fn from_parts(kind: MessageType, body: String) -> Self {
        Self { kind, body }
    }

    pub fn kind(&self) -> MessageType {
        self.kind
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Encoded size of the `<TYPE>##<body>` payload in bytes.
    pub fn payload_len(&self) -> usize {
        self.kind.as_str().len() + DELIMITER.len() + self.body.len()
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.kind, DELIMITER, self.body)
    }
}
