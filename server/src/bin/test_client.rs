//! Scripted smoke client: plays one short game against a running server.
//!
//! Usage: `test_client [port] [guess...]`

use bytes::BytesMut;
use shared::codec::{encode_frame, FrameCodec};
use shared::{parse_port, Message, MessageType};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

const MAX_FRAME: usize = 8192;

async fn send(stream: &mut TcpStream, message: Message) -> Result<(), Box<dyn std::error::Error>> {
    println!("> {}", message);
    stream.write_all(&encode_frame(&message)).await?;
    Ok(())
}

async fn receive(
    stream: &mut TcpStream,
    codec: &mut FrameCodec,
    buf: &mut BytesMut,
) -> Result<Option<Message>, Box<dyn std::error::Error>> {
    loop {
        if let Some(message) = codec.decode_message(buf)? {
            return Ok(Some(message));
        }
        let n = timeout(Duration::from_secs(5), stream.read_buf(buf)).await??;
        if n == 0 {
            return Ok(None);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let port = parse_port(args.next().as_deref());
    let mut guesses: Vec<String> = args.collect();
    if guesses.is_empty() {
        guesses = ["e", "a", "o", "s", "t"].iter().map(|g| g.to_string()).collect();
    }

    let addr = format!("127.0.0.1:{}", port);
    println!("Connecting to {}", addr);
    let mut stream = TcpStream::connect(&addr).await?;
    let mut codec = FrameCodec::new(MAX_FRAME);
    let mut buf = BytesMut::with_capacity(MAX_FRAME);

    send(&mut stream, Message::empty(MessageType::Start)).await?;
    match receive(&mut stream, &mut codec, &mut buf).await? {
        Some(reply) => println!("< {}", reply),
        None => {
            println!("Server closed the connection");
            return Ok(());
        }
    }

    for guess in guesses {
        send(&mut stream, Message::new(MessageType::Guess, guess)?).await?;
        match receive(&mut stream, &mut codec, &mut buf).await? {
            Some(reply) => println!("< {}", reply),
            None => {
                println!("Server closed the connection");
                return Ok(());
            }
        }
        sleep(Duration::from_millis(200)).await;
    }

    send(&mut stream, Message::empty(MessageType::Quit)).await?;
    match receive(&mut stream, &mut codec, &mut buf).await? {
        None => println!("Server closed the session"),
        Some(unexpected) => println!("Unexpected message after QUIT: {}", unexpected),
    }

    println!("Test client finished");
    Ok(())
}
