use clap::Parser;
use log::{error, info};
use server::config::Args;
use server::game::Hangman;
use server::network::Server;
use server::words::WordList;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let words = WordList::load(&args.words);
    info!("Using {} candidate words", words.len());

    let addr = args.listen_addr();
    let mut server = match Server::bind(addr, Hangman::new(words), args.loop_config()) {
        Ok(server) => server,
        Err(e) => {
            error!("Unable to start server on {}: {}", addr, e);
            eprintln!("Unable to start server on {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    let handle = server.handle();
    let mut loop_task = tokio::task::spawn_blocking(move || server.run());

    tokio::select! {
        result = &mut loop_task => {
            match result {
                Ok(Ok(())) => info!("Event loop finished"),
                Ok(Err(e)) => {
                    error!("Event loop failed: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    error!("Event loop task panicked: {}", e);
                    return Err(e.into());
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            handle.shutdown()?;
            loop_task.await??;
        }
    }

    Ok(())
}
