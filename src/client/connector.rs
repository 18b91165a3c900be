//! Async TCP client
//!
//! Connects once at construction. `start` spawns the receive loop; a
//! receive error or peer close ends the loop without reconnecting. The two
//! directions fail independently: a peer that only closes its write side
//! still accepts our sends.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{Result, TransportError};
use crate::event::Multicast;
use crate::stats::{TransportCounters, TransportStats};

use super::config::ClientConfig;

/// TCP client with a background receive loop
pub struct TcpClient {
    config: ClientConfig,
    handler: Arc<Multicast<Bytes>>,
    peer_addr: SocketAddr,
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    write_failed: AtomicBool,
    reader: Mutex<Option<OwnedReadHalf>>,
    receive_task: Mutex<Option<JoinHandle<()>>>,
    connected: Arc<AtomicBool>,
    counters: Arc<TransportCounters>,
    runtime: Handle,
}

impl TcpClient {
    /// Connect to the configured host and port
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let target = config.target();
        let stream = tokio::time::timeout(
            config.connect_timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"))
        .and_then(|r| r)
        .map_err(|e| {
            tracing::error!(addr = %target, error = %e, "Connect failed");
            e
        })?;

        if config.tcp_nodelay {
            stream.set_nodelay(true)?;
        }

        let peer_addr = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();
        tracing::info!(peer = %peer_addr, "TCP client connected");

        let counters = Arc::new(TransportCounters::default());
        counters.connection_opened();

        Ok(Self {
            config,
            handler: Arc::new(Multicast::new()),
            peer_addr,
            writer: tokio::sync::Mutex::new(writer),
            write_failed: AtomicBool::new(false),
            reader: Mutex::new(Some(reader)),
            receive_task: Mutex::new(None),
            connected: Arc::new(AtomicBool::new(true)),
            counters,
            runtime: Handle::current(),
        })
    }

    /// Handlers invoked with every received chunk
    pub fn handler(&self) -> &Multicast<Bytes> {
        &self.handler
    }

    /// Remote address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Whether the receive side is still open
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Spawn the receive loop
    pub fn start(&self) -> Result<()> {
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(TransportError::AlreadyStarted)?;

        let task = self.runtime.spawn(receive_loop(
            reader,
            self.config.recv_buffer_size,
            Arc::clone(&self.handler),
            Arc::clone(&self.connected),
            Arc::clone(&self.counters),
        ));
        *self
            .receive_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);
        Ok(())
    }

    /// Write all of `data`, returning once it has been handed to the socket
    ///
    /// Fails with `NotConnected` only after an earlier write failed; the
    /// state of the receive loop does not matter.
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        if self.write_failed.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected.into());
        }

        let mut writer = self.writer.lock().await;
        match writer.write_all(data).await {
            Ok(()) => {
                self.counters.sent(data.len());
                Ok(())
            }
            Err(e) => {
                self.write_failed.store(true, Ordering::Release);
                self.counters.error();
                tracing::error!(peer = %self.peer_addr, error = %e, "Send failed");
                Err(e.into())
            }
        }
    }

    /// Stop the receive loop
    pub fn stop(&self) {
        if let Some(task) = self
            .receive_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }

    /// Snapshot of the client counters
    pub fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }
}

impl Drop for TcpClient {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn receive_loop(
    mut reader: OwnedReadHalf,
    buffer_size: usize,
    handler: Arc<Multicast<Bytes>>,
    connected: Arc<AtomicBool>,
    counters: Arc<TransportCounters>,
) {
    let mut buffer = vec![0u8; buffer_size];

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => {
                tracing::debug!("Server closed connection");
                break;
            }
            Ok(n) => {
                counters.received(n);
                handler.invoke(&Bytes::copy_from_slice(&buffer[..n]));
            }
            Err(e) => {
                counters.error();
                tracing::warn!(error = %e, "Receive error");
                break;
            }
        }
    }

    connected.store(false, Ordering::Release);
    counters.connection_closed();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio_test::assert_ok;

    use super::*;

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn test_send_reaches_peer() {
        let (listener, port) = listener().await;
        let client = TcpClient::connect(ClientConfig::new("127.0.0.1", port))
            .await
            .unwrap();
        let (mut server_side, _) = listener.accept().await.unwrap();

        assert_ok!(client.send(b"hello").await);

        let mut buf = [0u8; 5];
        server_side.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(client.stats().bytes_sent, 5);
    }

    #[tokio::test]
    async fn test_receive_loop_invokes_handlers() {
        let (listener, port) = listener().await;
        let client = TcpClient::connect(ClientConfig::new("127.0.0.1", port))
            .await
            .unwrap();
        let (mut server_side, _) = listener.accept().await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let tx_b = tx.clone();
        client.handler().add(move |b: &Bytes| {
            let _ = tx.send(("a", b.clone()));
        });
        client.handler().add(move |b: &Bytes| {
            let _ = tx_b.send(("b", b.clone()));
        });
        client.start().unwrap();
        assert!(client.start().is_err());

        server_side.write_all(b"pong").await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first, ("a", Bytes::from_static(b"pong")));
        assert_eq!(second, ("b", Bytes::from_static(b"pong")));
    }

    #[tokio::test]
    async fn test_peer_close_ends_receive_loop() {
        let (listener, port) = listener().await;
        let client = TcpClient::connect(ClientConfig::new("127.0.0.1", port))
            .await
            .unwrap();
        let (server_side, _) = listener.accept().await.unwrap();
        client.start().unwrap();

        drop(server_side);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while client.is_connected() {
            assert!(tokio::time::Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(client.stats().active_connections, 0);
    }

    #[tokio::test]
    async fn test_send_after_peer_half_close() {
        let (listener, port) = listener().await;
        let client = TcpClient::connect(ClientConfig::new("127.0.0.1", port))
            .await
            .unwrap();
        let (mut server_side, _) = listener.accept().await.unwrap();
        client.start().unwrap();

        // Peer stops sending but keeps reading
        server_side.shutdown().await.unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while client.is_connected() {
            assert!(tokio::time::Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_ok!(client.send(b"late").await);
        let mut buf = [0u8; 4];
        server_side.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"late");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let (listener, port) = listener().await;
        drop(listener);

        assert!(TcpClient::connect(ClientConfig::new("127.0.0.1", port))
            .await
            .is_err());
    }
}
