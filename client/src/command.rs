//! Parsing of interactive console commands

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  connect [host port]   connect to a server (defaults to the configured address)
  start                 start a game, or get a new word keeping your score
  guess <letter|word>   guess one letter or the whole word
  quit                  disconnect and leave
  help                  show this text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `None` means the configured default address.
    Connect(Option<SocketAddr>),
    Start,
    Guess(String),
    Quit,
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command `{0}`, type `help` for the list")]
    Unknown(String),

    #[error("Missing guessed letter/word")]
    MissingGuess,

    #[error("`connect` takes no parameters or a host and a port")]
    ConnectArity,

    #[error("Invalid IP address `{0}`")]
    InvalidHost(String),

    #[error("Invalid port `{0}`")]
    InvalidPort(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let params: Vec<&str> = words.filter(|p| is_parameter(p)).collect();

        match name.to_ascii_lowercase().as_str() {
            "connect" => match params.as_slice() {
                [] => Ok(Command::Connect(None)),
                [host, port] => Ok(Command::Connect(Some(parse_addr(host, port)?))),
                _ => Err(CommandError::ConnectArity),
            },
            "start" => Ok(Command::Start),
            "guess" => params
                .first()
                .map(|guess| Command::Guess(guess.to_string()))
                .ok_or(CommandError::MissingGuess),
            "quit" => Ok(Command::Quit),
            "help" => Ok(Command::Help),
            _ => Err(CommandError::Unknown(name.to_string())),
        }
    }
}

/// Letters, digits and dots. Anything else is dropped before interpretation.
fn is_parameter(param: &str) -> bool {
    param.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
}

fn parse_addr(host: &str, port: &str) -> Result<SocketAddr, CommandError> {
    let ip: Ipv4Addr = host
        .parse()
        .map_err(|_| CommandError::InvalidHost(host.to_string()))?;
    let port = port
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| CommandError::InvalidPort(port.to_string()))?;
    Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
}
