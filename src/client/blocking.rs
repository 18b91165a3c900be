//! Blocking TCP client
//!
//! Every call blocks the calling thread. Sends serialize on the writer lock
//! and receives on the reader lock, so overlapping calls from several
//! threads never interleave bytes within one call.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::{Bytes, BytesMut};

use crate::error::{Result, TransportError};

use super::config::ClientConfig;

/// TCP client with explicit connect and disconnect
pub struct BlockingTcpClient {
    config: ClientConfig,
    writer: Mutex<Option<TcpStream>>,
    reader: Mutex<Option<TcpStream>>,
    connected: AtomicBool,
}

impl BlockingTcpClient {
    /// Create an unconnected client
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether `connect` succeeded and no disconnect or I/O failure followed
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Connect to the configured host and port
    ///
    /// Every resolved address is tried in turn. Calling this while already
    /// connected is a no-op.
    pub fn connect(&self) -> Result<()> {
        let mut writer = lock(&self.writer);
        if writer.is_some() && self.is_connected() {
            return Ok(());
        }

        let target = self.config.target();
        let addrs: Vec<SocketAddr> = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| {
                tracing::error!(addr = %target, error = %e, "Resolve failed");
                TransportError::Resolve(target.clone())
            })?
            .collect();
        if addrs.is_empty() {
            return Err(TransportError::Resolve(target).into());
        }

        let mut last_err = None;
        let mut stream = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, self.config.connect_timeout) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => {
                    tracing::debug!(addr = %addr, error = %e, "Connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        let stream = match (stream, last_err) {
            (Some(stream), _) => stream,
            (None, Some(e)) => {
                tracing::error!(addr = %target, error = %e, "Connect failed");
                return Err(e.into());
            }
            (None, None) => return Err(TransportError::Resolve(target).into()),
        };

        if self.config.tcp_nodelay {
            stream.set_nodelay(true)?;
        }
        let read_half = stream.try_clone()?;

        tracing::info!(addr = %target, "TCP client connected");
        *lock(&self.reader) = Some(read_half);
        *writer = Some(stream);
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    /// Close the connection
    pub fn disconnect(&self) {
        let stream = lock(&self.writer).take();
        lock(&self.reader).take();

        if let Some(stream) = stream {
            let _ = stream.shutdown(Shutdown::Both);
            tracing::debug!(addr = %self.config.target(), "TCP client disconnected");
        }
        self.connected.store(false, Ordering::Release);
    }

    /// Write all of `data`
    pub fn send(&self, data: &[u8]) -> Result<()> {
        let mut writer = lock(&self.writer);
        let stream = writer.as_mut().ok_or(TransportError::NotConnected)?;

        stream.write_all(data).map_err(|e| {
            tracing::error!(error = %e, "Send failed");
            self.connected.store(false, Ordering::Release);
            e
        })?;
        Ok(())
    }

    /// Read up to `n` bytes
    ///
    /// Returns early with what has been read so far when the peer closes or
    /// a read fails. An empty result means nothing could be read.
    pub fn receive(&self, n: usize) -> Bytes {
        let mut reader = lock(&self.reader);
        let Some(stream) = reader.as_mut() else {
            return Bytes::new();
        };

        let mut buf = BytesMut::zeroed(n);
        let mut filled = 0;
        while filled < n {
            match stream.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.connected.store(false, Ordering::Release);
                    break;
                }
                Ok(read) => filled += read,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Receive failed");
                    self.connected.store(false, Ordering::Release);
                    break;
                }
            }
        }

        buf.truncate(filled);
        buf.freeze()
    }
}

impl Drop for BlockingTcpClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn lock(stream: &Mutex<Option<TcpStream>>) -> MutexGuard<'_, Option<TcpStream>> {
    stream.lock().unwrap_or_else(PoisonError::into_inner)
}
