//! Per-connection sessions and the arena that owns them
//!
//! Each accepted socket becomes a [`Session`] running on its own task. The
//! task handle lives in the [`SessionArena`] keyed by session ID until the
//! session ends, so session lifetime is explicit: removal from the arena
//! happens on peer close, read error, or server stop.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinHandle;

use super::listener::ServerShared;

struct SessionEntry {
    peer_addr: SocketAddr,
    task: JoinHandle<()>,
}

/// Live sessions keyed by session ID
#[derive(Default)]
pub(crate) struct SessionArena {
    sessions: Mutex<HashMap<u64, SessionEntry>>,
}

impl SessionArena {
    /// Spawn a session task and record it under `id`
    ///
    /// The arena lock is held across the spawn so a session that finishes
    /// immediately cannot try to remove itself before it is inserted.
    pub(crate) fn spawn<F>(&self, runtime: &Handle, id: u64, peer_addr: SocketAddr, session: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut sessions = self.lock();
        let task = runtime.spawn(session);
        sessions.insert(id, SessionEntry { peer_addr, task });
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn peers(&self) -> Vec<(u64, SocketAddr)> {
        let mut peers: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, entry)| (*id, entry.peer_addr))
            .collect();
        peers.sort_by_key(|(id, _)| *id);
        peers
    }

    /// Abort every session task
    pub(crate) fn abort_all(&self) {
        let drained: Vec<SessionEntry> = self.lock().drain().map(|(_, entry)| entry).collect();
        for entry in drained {
            entry.task.abort();
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One accepted connection
pub(crate) struct Session {
    id: u64,
    socket: TcpStream,
    peer_addr: SocketAddr,
    buffer: Vec<u8>,
    shared: Arc<ServerShared>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Session {
    pub(crate) fn new(
        id: u64,
        socket: TcpStream,
        peer_addr: SocketAddr,
        shared: Arc<ServerShared>,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Self {
        let buffer = vec![0u8; shared.config.recv_buffer_size];
        shared.counters.connection_opened();

        Self {
            id,
            socket,
            peer_addr,
            buffer,
            shared,
            _permit: permit,
        }
    }

    /// Read until the peer closes or a read fails
    ///
    /// Reads are strictly sequential: the next read is only issued after the
    /// previous chunk has been handed to every handler.
    pub(crate) async fn run(mut self) {
        loop {
            match self.socket.read(&mut self.buffer).await {
                Ok(0) => {
                    tracing::debug!(session_id = self.id, peer = %self.peer_addr, "Peer closed connection");
                    break;
                }
                Ok(n) => {
                    let chunk = Bytes::copy_from_slice(&self.buffer[..n]);
                    self.shared.counters.received(n);
                    self.shared.handler.invoke(&chunk);
                }
                Err(e) => {
                    self.shared.counters.error();
                    tracing::warn!(session_id = self.id, peer = %self.peer_addr, error = %e, "Session read error");
                    break;
                }
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.counters.connection_closed();
        self.shared.sessions.remove(self.id);
        tracing::debug!(session_id = self.id, "Session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_arena_spawn_and_remove() {
        let arena = Arc::new(SessionArena::default());
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        arena.spawn(&Handle::current(), 1, addr, async move {
            let _ = rx.await;
        });
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.peers(), vec![(1, addr)]);

        assert!(arena.remove(1));
        assert!(!arena.remove(1));
        let _ = tx.send(());
    }

    #[tokio::test]
    async fn test_arena_abort_all() {
        let arena = SessionArena::default();
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);

        for id in 0..3 {
            let tx = tx.clone();
            arena.spawn(&Handle::current(), id, addr, async move {
                let _tx = tx;
                std::future::pending::<()>().await;
            });
        }
        drop(tx);

        arena.abort_all();
        assert_eq!(arena.len(), 0);

        // Every aborted task drops its sender, closing the channel
        let closed = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert_eq!(closed.unwrap(), None);
    }
}
