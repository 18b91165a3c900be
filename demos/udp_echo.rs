//! UDP example
//!
//! Run with: cargo run --example udp_echo [PORT]
//!
//! Binds a receiver on 127.0.0.1:PORT (default 6333) with two handlers,
//! then a second peer sends to it with both the direct and the queued send
//! paths. Datagrams are printed on the receiver's dispatch thread.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use fanout_rs::{UdpConfig, UdpPeer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fanout_rs=debug".parse()?),
        )
        .init();

    let port: u16 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 6333,
    };
    let local: SocketAddr = ([127, 0, 0, 1], port).into();

    let receiver = UdpPeer::bind(UdpConfig::with_addr(local)).await?;
    receiver.handler().add(|datagram: &Bytes| {
        println!("A got: {}", String::from_utf8_lossy(datagram));
    });
    receiver.handler().add(|datagram: &Bytes| {
        println!("B got {} bytes", datagram.len());
    });
    receiver.start()?;

    let sender = UdpPeer::bind(
        UdpConfig::with_addr(([127, 0, 0, 1], 0).into()).remote(receiver.local_addr()),
    )
    .await?;

    sender.send(b"hello", None).await?;
    for i in 0..5 {
        sender.async_send(Bytes::from(format!("queued #{}", i)))?;
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    println!("receiver: {:?}", receiver.stats());
    println!("sender: {:?}", sender.stats());

    receiver.stop();
    Ok(())
}
