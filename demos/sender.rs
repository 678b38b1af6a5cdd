//! Interactive chat sender
//!
//! Run with: cargo run --example sender -- HOST PORT USERNAME
//!
//! Input lines:
//!   /join <room>   target a room
//!   /leave         stop targeting the room
//!   /quit          end the session
//!   anything else  broadcast to the current room

use chat_broker::client::{Command, CommandError, SenderClient};
use chat_broker::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

fn print_usage() {
    eprintln!("Usage: sender HOST PORT USERNAME");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() != 4 || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        std::process::exit(1);
    }

    let host = &args[1];
    let port: u16 = args[2].parse()?;
    let username = &args[3];

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chat_broker=warn".parse()?),
        )
        .init();

    let mut client = SenderClient::connect(host, port, username).await?;
    println!("Logged in as {}. Use /join <room> to pick a room.", username);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match client.execute(command).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(Error::Rejected(reason)) => eprintln!("Server refused: {}", reason),
            Err(e) if e.is_disconnect() => {
                eprintln!("Connection lost: {}", e);
                std::process::exit(1);
            }
            Err(e) => eprintln!("{}", e),
        }
    }

    // stdin closed
    client.quit().await?;
    Ok(())
}
