//! Interactive console: reads commands, drives the controller and prints
//! whatever the server sends back.

use crate::command::{Command, HELP};
use crate::controller::{ClientError, Controller};
use crate::sink::Observer;
use log::debug;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const PROMPT: &str = "$ ";

const WELCOME: &str = "\
---------------- WELCOME TO HANGMAN ----------------

Type `connect` to join the server, `start` for a word, `guess <letter|word>`
to play and `quit` to leave. `help` lists every command.
";

/// Prints server output followed by a fresh prompt.
///
/// The lock keeps lines from the loop thread and the console from
/// interleaving.
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    stdout: Mutex<()>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self, text: &str, newline: bool) {
        let _guard = self.stdout.lock();
        let mut out = io::stdout().lock();
        let result = if newline {
            writeln!(out, "{}", text)
        } else {
            write!(out, "{}", text)
        };
        if let Err(e) = result.and_then(|_| out.flush()) {
            debug!("Unable to write to stdout: {}", e);
        }
    }
}

impl Observer for ConsoleObserver {
    fn deliver(&self, text: &str) {
        self.write(&format!("\n{}", text), true);
        self.write(PROMPT, false);
    }
}

/// Whether the interpreter keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Interpreter<O> {
    controller: Controller,
    observer: Arc<O>,
    default_addr: SocketAddr,
}

impl<O: Observer> Interpreter<O> {
    pub fn new(controller: Controller, observer: Arc<O>, default_addr: SocketAddr) -> Self {
        Self {
            controller,
            observer,
            default_addr,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Runs one command. Connection failures are already reported by the
    /// response sink, so they are not repeated here.
    pub async fn execute(&self, command: Command) -> Result<Flow, ClientError> {
        match command {
            Command::Connect(addr) => {
                let addr = addr.unwrap_or(self.default_addr);
                match self.controller.connect(addr).await {
                    Ok(_) => {}
                    Err(ClientError::Transport(e)) => debug!("Connect to {} failed: {}", addr, e),
                    Err(e) => return Err(e),
                }
            }
            Command::Start => self.controller.start_game()?,
            Command::Guess(guess) => self.controller.submit_guess(&guess)?,
            Command::Help => self.observer.deliver(HELP),
            Command::Quit => {
                if self.controller.is_connected() {
                    self.controller.disconnect()?;
                }
                self.observer.deliver("You are now disconnected from the server!");
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Reads commands until `quit` or end of input. Errors from single
    /// commands are printed and do not stop the loop.
    pub async fn run<R>(&self, input: R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.observer.deliver(WELCOME);
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let outcome = match line.parse::<Command>() {
                Ok(command) => self.execute(command).await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            match outcome {
                Ok(Flow::Exit) => return Ok(()),
                Ok(Flow::Continue) => {}
                Err(message) => self.observer.deliver(&message),
            }
        }

        debug!("Input closed");
        if self.controller.is_connected() {
            if let Err(e) = self.controller.disconnect() {
                debug!("Disconnect on end of input failed: {}", e);
            }
        }
        Ok(())
    }
}
