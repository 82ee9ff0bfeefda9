use clap::Parser;
use client::config::Args;
use client::console::{ConsoleObserver, Interpreter};
use client::controller::Controller;
use client::sink::ResponseSink;
use log::{error, info};
use shared::EventLoop;
use std::sync::Arc;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let observer = Arc::new(ConsoleObserver::new());

    let mut event_loop = EventLoop::new(ResponseSink::new(observer.clone()), args.loop_config())?;
    let controller = Controller::new(event_loop.handle());
    let loop_task = tokio::task::spawn_blocking(move || event_loop.run());

    let interpreter = Interpreter::new(controller, observer, args.server_addr());
    if args.connect {
        info!("Connecting to {}", args.server_addr());
        if let Err(e) = interpreter.controller().connect(args.server_addr()).await {
            info!("Initial connect failed: {}", e);
        }
    }

    if let Err(e) = interpreter.run(BufReader::new(tokio::io::stdin())).await {
        error!("Console input failed: {}", e);
    }

    interpreter.controller().shutdown()?;
    match loop_task.await? {
        Ok(()) => info!("Client stopped"),
        Err(e) => error!("Event loop failed: {}", e),
    }

    Ok(())
}
