//! Command line configuration for the client binary

use clap::Parser;
use shared::{parse_port, LoopConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Parser, Debug)]
#[command(author, version, about = "Hangman game client", long_about = None)]
pub struct Args {
    /// Server port used by a bare `connect`. Anything outside 1-65535 falls back to 4444
    #[arg(allow_hyphen_values = true)]
    pub port: Option<String>,

    /// Server address used by a bare `connect`
    #[arg(short = 'H', long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Outbound messages buffered before commands are refused
    #[arg(long, default_value_t = 64)]
    pub queue_capacity: usize,

    /// Connect right away instead of waiting for `connect`
    #[arg(short, long)]
    pub connect: bool,
}

impl Args {
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, parse_port(self.port.as_deref()))
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            queue_capacity: self.queue_capacity.max(1),
            ..LoopConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["client"]).unwrap();
        assert_eq!(args.server_addr(), "127.0.0.1:4444".parse().unwrap());
        assert!(!args.connect);
        assert_eq!(args.loop_config().queue_capacity, 64);
    }

    #[test]
    fn test_host_and_port() {
        let args = Args::try_parse_from(["client", "--host", "10.1.2.3", "5000", "-c"]).unwrap();
        assert_eq!(args.server_addr(), "10.1.2.3:5000".parse().unwrap());
        assert!(args.connect);
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let args = Args::try_parse_from(["client", "99999"]).unwrap();
        assert_eq!(args.server_addr().port(), 4444);
    }
}
