//! Chat broker server
//!
//! Run with: cargo run --example chat_server -- [PORT]
//!
//! Then connect a receiver and a sender:
//!   cargo run --example receiver -- localhost 5000 bob lobby
//!   cargo run --example sender -- localhost 5000 alice

use std::net::SocketAddr;

use chat_broker::protocol::constants::DEFAULT_PORT;
use chat_broker::{ChatServer, ServerConfig};

fn print_usage() {
    eprintln!("Usage: chat_server [PORT]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  PORT    TCP port to listen on (default: {})", DEFAULT_PORT);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let port = match args.get(1) {
        Some(port) => match port.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                eprintln!("Error: invalid port '{}'", port);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => DEFAULT_PORT,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chat_broker=info".parse()?)
                .add_directive("chat_server=info".parse()?),
        )
        .init();

    let config = ServerConfig {
        bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
        ..ServerConfig::default()
    };

    println!("Starting chat server on {}", config.bind_addr);
    println!("Press Ctrl+C to stop");

    let server = ChatServer::new(config);
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let stats = server.stats();
    println!(
        "Stats: connections={} publishers={} subscribers={} broadcasts={} deliveries={} uptime={:?}",
        stats.total_connections,
        stats.publisher_logins,
        stats.subscriber_logins,
        stats.broadcasts,
        stats.deliveries_sent,
        stats.uptime,
    );

    Ok(())
}
