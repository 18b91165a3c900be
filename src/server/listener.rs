//! TCP server listener
//!
//! Handles the TCP accept loop and spawns a session per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::{Result, TransportError};
use crate::event::Multicast;
use crate::server::config::TcpServerConfig;
use crate::server::session::{Session, SessionArena};
use crate::stats::{TransportCounters, TransportStats};

/// State shared between the accept loop and its sessions
pub(crate) struct ServerShared {
    pub(crate) config: TcpServerConfig,
    pub(crate) handler: Multicast<Bytes>,
    pub(crate) sessions: SessionArena,
    pub(crate) counters: TransportCounters,
    listener: TcpListener,
    local_addr: SocketAddr,
    runtime: Handle,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

/// TCP byte-stream server
///
/// # Example
/// ```no_run
/// use fanout_rs::server::{TcpServer, TcpServerConfig};
///
/// # async fn example() -> fanout_rs::Result<()> {
/// let server = TcpServer::bind(TcpServerConfig::with_port(8080)).await?;
/// server.handler().add(|bytes| println!("received {} bytes", bytes.len()));
/// server.start()?;
/// # Ok(())
/// # }
/// ```
pub struct TcpServer {
    shared: Arc<ServerShared>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl TcpServer {
    /// Bind and listen
    ///
    /// Must be called from within a tokio runtime; sessions are spawned on
    /// that runtime.
    pub async fn bind(config: TcpServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "TCP server listening");

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Ok(Self {
            shared: Arc::new(ServerShared {
                config,
                handler: Multicast::new(),
                sessions: SessionArena::default(),
                counters: TransportCounters::default(),
                listener,
                local_addr,
                runtime: Handle::current(),
                next_session_id: AtomicU64::new(1),
                connection_semaphore,
            }),
            accept_task: Mutex::new(None),
        })
    }

    /// Handlers invoked with every chunk read from any session
    pub fn handler(&self) -> &Multicast<Bytes> {
        &self.shared.handler
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.shared.local_addr
    }

    /// Get the server configuration
    pub fn config(&self) -> &TcpServerConfig {
        &self.shared.config
    }

    /// Spawn the accept loop in the background
    pub fn start(&self) -> Result<()> {
        let mut task = self.accept_task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            return Err(TransportError::AlreadyStarted.into());
        }

        let shared = Arc::clone(&self.shared);
        *task = Some(self.shared.runtime.spawn(accept_loop(shared)));
        Ok(())
    }

    /// Run the accept loop on the current task
    ///
    /// This method only returns if the server is stopped from elsewhere.
    pub async fn run(&self) -> Result<()> {
        accept_loop(Arc::clone(&self.shared)).await;
        Ok(())
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = accept_loop(Arc::clone(&self.shared)) => {}
        }

        self.shared.sessions.abort_all();
        Ok(())
    }

    /// Stop accepting and tear down every session
    pub fn stop(&self) {
        let task = self
            .accept_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            tracing::info!(addr = %self.shared.local_addr, "TCP server stopped");
        }
        self.shared.sessions.abort_all();
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.shared.sessions.len()
    }

    /// Live sessions as (session ID, peer address), ordered by ID
    pub fn sessions(&self) -> Vec<(u64, SocketAddr)> {
        self.shared.sessions.peers()
    }

    /// Snapshot of the server counters
    pub fn stats(&self) -> TransportStats {
        self.shared.counters.snapshot()
    }
}

impl Drop for TcpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn accept_loop(shared: Arc<ServerShared>) {
    loop {
        match shared.listener.accept().await {
            Ok((socket, peer_addr)) => {
                handle_connection(&shared, socket, peer_addr);
            }
            Err(e) => {
                shared.counters.error();
                tracing::error!(error = %e, "Failed to accept connection");
            }
        }
    }
}

fn handle_connection(shared: &Arc<ServerShared>, socket: TcpStream, peer_addr: SocketAddr) {
    // Check connection limit
    let permit = if let Some(ref sem) = shared.connection_semaphore {
        match sem.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                return;
            }
        }
    } else {
        None
    };

    let session_id = shared.next_session_id.fetch_add(1, Ordering::Relaxed);

    tracing::debug!(
        session_id = session_id,
        peer = %peer_addr,
        "New connection"
    );

    if shared.config.tcp_nodelay {
        if let Err(e) = socket.set_nodelay(true) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }
    }

    let session = Session::new(session_id, socket, peer_addr, Arc::clone(shared), permit);
    shared
        .sessions
        .spawn(&shared.runtime, session_id, peer_addr, session.run());
}
