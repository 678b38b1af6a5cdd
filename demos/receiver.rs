//! Chat receiver that prints every delivery for one room
//!
//! Run with: cargo run --example receiver -- HOST PORT USERNAME ROOM

use chat_broker::client::ReceiverClient;

fn print_usage() {
    eprintln!("Usage: receiver HOST PORT USERNAME ROOM");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() != 5 || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        std::process::exit(1);
    }

    let host = &args[1];
    let port: u16 = args[2].parse()?;
    let username = &args[3];
    let room = &args[4];

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chat_broker=warn".parse()?),
        )
        .init();

    let mut client = ReceiverClient::connect(host, port, username, room).await?;
    println!("Joined {} as {}", client.room(), client.username());

    while let Some(delivery) = client.next_delivery().await? {
        println!("{}", delivery);
    }

    println!("Server closed the connection");
    Ok(())
}
