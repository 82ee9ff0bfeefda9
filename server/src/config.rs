//! Command line configuration for the server binary

use clap::Parser;
use shared::{parse_port, LoopConfig};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hangman game server", long_about = None)]
pub struct Args {
    /// Port to listen on. Anything outside 1-65535 falls back to 4444
    #[arg(allow_hyphen_values = true)]
    pub port: Option<String>,

    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// File with one candidate word per line
    #[arg(short, long, default_value = "assets/words.txt")]
    pub words: PathBuf,

    /// Outbound messages buffered per session before enqueue fails
    #[arg(long, default_value_t = 64)]
    pub queue_capacity: usize,

    /// Largest accepted frame payload in bytes
    #[arg(long, default_value_t = 8192)]
    pub max_frame: usize,
}

impl Args {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, parse_port(self.port.as_deref()))
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            queue_capacity: self.queue_capacity.max(1),
            max_frame_len: self.max_frame,
            ..LoopConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::DEFAULT_PORT;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["server"]).unwrap();
        assert_eq!(args.listen_addr(), SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)));
        assert_eq!(args.words, PathBuf::from("assets/words.txt"));

        let config = args.loop_config();
        assert_eq!(config.queue_capacity, 64);
        assert_eq!(config.max_frame_len, 8192);
    }

    #[test]
    fn test_explicit_port() {
        let args = Args::try_parse_from(["server", "8080", "--host", "127.0.0.1"]).unwrap();
        assert_eq!(args.listen_addr(), "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn test_invalid_port_falls_back() {
        for raw in ["0", "70000", "-1", "abc"] {
            let args = Args::try_parse_from(["server", raw]).unwrap();
            assert_eq!(args.listen_addr().port(), DEFAULT_PORT, "port {}", raw);
        }
    }

    #[test]
    fn test_queue_capacity_never_zero() {
        let args = Args::try_parse_from(["server", "--queue-capacity", "0"]).unwrap();
        assert_eq!(args.loop_config().queue_capacity, 1);
    }
}
