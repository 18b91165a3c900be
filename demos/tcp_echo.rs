//! TCP example
//!
//! Run with: cargo run --example tcp_echo [BIND_ADDR]
//!
//! Starts a server (default 127.0.0.1:8080) that prints every chunk it
//! reads, then connects an async client and a blocking client to it.
//! Press Ctrl+C to stop.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use fanout_rs::{BlockingTcpClient, ClientConfig, TcpClient, TcpServer, TcpServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fanout_rs=debug".parse()?)
                .add_directive("tcp_echo=debug".parse()?),
        )
        .init();

    let bind_addr: SocketAddr = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => "127.0.0.1:8080".parse()?,
    };

    let server = TcpServer::bind(TcpServerConfig::with_addr(bind_addr)).await?;
    server.handler().add(|chunk: &Bytes| {
        println!("Server received: {}", String::from_utf8_lossy(chunk));
    });
    server.start()?;
    let addr = server.local_addr();

    let client = TcpClient::connect(ClientConfig::new(addr.ip().to_string(), addr.port())).await?;
    client.handler().add(|chunk: &Bytes| {
        println!("Client received: {}", String::from_utf8_lossy(chunk));
    });
    client.start()?;
    client.send(b"Hello, Server!").await?;

    let blocking = tokio::task::spawn_blocking(move || -> fanout_rs::Result<()> {
        let client = BlockingTcpClient::new(ClientConfig::new(addr.ip().to_string(), addr.port()));
        client.connect()?;
        client.send(b"Hello from a blocking client")?;
        client.disconnect();
        Ok(())
    });
    blocking.await??;

    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("Sessions: {:?}", server.sessions());

    tokio::signal::ctrl_c().await?;
    println!("Stats: {:?}", server.stats());
    server.stop();
    Ok(())
}
