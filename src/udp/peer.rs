//! UDP peer with a decoupled dispatch thread and a FIFO outbound queue

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, TransportError};
use crate::event::Multicast;
use crate::stats::{TransportCounters, TransportStats};

use super::config::UdpConfig;

const DISPATCH_THREAD_NAME: &str = "fanout-udp-dispatch";

enum Inbound {
    Datagram(Bytes),
    Stop,
}

#[derive(Default)]
struct Outbound {
    pending: VecDeque<(Bytes, SocketAddr)>,
    sending: bool,
}

struct Loops {
    receive_task: JoinHandle<()>,
    inbound: mpsc::UnboundedSender<Inbound>,
    dispatch_thread: thread::JoinHandle<()>,
}

/// UDP peer
///
/// Bound local-only it is a pure receiver; with a remote address it can
/// also send without naming a target each time.
///
/// # Example
/// ```no_run
/// use fanout_rs::udp::{UdpConfig, UdpPeer};
///
/// # async fn example() -> fanout_rs::Result<()> {
/// let peer = UdpPeer::bind(UdpConfig::with_port(6333)).await?;
/// peer.handler().add(|datagram| println!("{} bytes", datagram.len()));
/// peer.start()?;
/// # Ok(())
/// # }
/// ```
pub struct UdpPeer {
    config: UdpConfig,
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    remote_addr: Mutex<Option<SocketAddr>>,
    handler: Arc<Multicast<Bytes>>,
    outbound: Arc<Mutex<Outbound>>,
    counters: Arc<TransportCounters>,
    runtime: Handle,
    started: AtomicBool,
    loops: Mutex<Option<Loops>>,
}

impl UdpPeer {
    /// Bind the local socket
    ///
    /// Must be called from within a tokio runtime; background I/O runs on
    /// that runtime.
    pub async fn bind(config: UdpConfig) -> Result<Self> {
        let socket = UdpSocket::bind(config.local_addr).await?;
        let local_addr = socket.local_addr()?;
        tracing::info!(addr = %local_addr, remote = ?config.remote_addr, "UDP peer bound");

        Ok(Self {
            remote_addr: Mutex::new(config.remote_addr),
            config,
            socket: Arc::new(socket),
            local_addr,
            handler: Arc::new(Multicast::new()),
            outbound: Arc::new(Mutex::new(Outbound::default())),
            counters: Arc::new(TransportCounters::default()),
            runtime: Handle::current(),
            started: AtomicBool::new(false),
            loops: Mutex::new(None),
        })
    }

    /// Handlers invoked once per received datagram, on the dispatch thread
    pub fn handler(&self) -> &Multicast<Bytes> {
        &self.handler
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Remembered remote peer
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        *self.remote_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the remembered remote peer
    pub fn set_remote_addr(&self, addr: Option<SocketAddr>) {
        *self.remote_addr.lock().unwrap_or_else(PoisonError::into_inner) = addr;
    }

    /// Get the peer configuration
    pub fn config(&self) -> &UdpConfig {
        &self.config
    }

    /// Whether the background loops are running
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Start the receive task and the dispatch thread
    pub fn start(&self) -> Result<()> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TransportError::AlreadyStarted.into());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let handler = Arc::clone(&self.handler);
        let dispatch_thread = match thread::Builder::new()
            .name(DISPATCH_THREAD_NAME.to_string())
            .spawn(move || dispatch_loop(rx, handler))
        {
            Ok(handle) => handle,
            Err(e) => {
                self.started.store(false, Ordering::Release);
                return Err(e.into());
            }
        };

        let receive_task = self.runtime.spawn(receive_loop(
            Arc::clone(&self.socket),
            self.config.recv_buffer_size,
            tx.clone(),
            Arc::clone(&self.counters),
        ));

        *self.loops.lock().unwrap_or_else(PoisonError::into_inner) = Some(Loops {
            receive_task,
            inbound: tx,
            dispatch_thread,
        });
        tracing::info!(addr = %self.local_addr, "UDP peer started");
        Ok(())
    }

    /// Send one datagram and wait for it to be handed to the socket
    ///
    /// An explicit `target` becomes the remembered remote peer.
    pub async fn send(&self, data: &[u8], target: Option<SocketAddr>) -> Result<()> {
        if target.is_some() {
            self.set_remote_addr(target);
        }
        let target = self.remote_addr().ok_or(TransportError::NoRemote)?;

        match self.socket.send_to(data, target).await {
            Ok(n) => {
                self.counters.sent(n);
                Ok(())
            }
            Err(e) => {
                self.counters.error();
                tracing::error!(peer = %target, error = %e, "UDP send failed");
                Err(e.into())
            }
        }
    }

    /// Queue a datagram for the remembered remote peer
    ///
    /// Queued datagrams go out in FIFO order with at most one write in
    /// flight. The drain task stops when the queue empties and the next
    /// call starts a new one.
    pub fn async_send(&self, data: Bytes) -> Result<()> {
        let target = self.remote_addr().ok_or(TransportError::NoRemote)?;

        let mut outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        outbound.pending.push_back((data, target));
        if !outbound.sending {
            outbound.sending = true;
            self.runtime.spawn(drain_outbound(
                Arc::clone(&self.socket),
                Arc::clone(&self.outbound),
                Arc::clone(&self.counters),
            ));
        }
        Ok(())
    }

    /// Receive a single datagram on the caller's task
    ///
    /// Only valid before `start`. With `echo` the datagram is sent back to
    /// whoever sent it.
    pub async fn recv(&self, echo: bool) -> Result<(Bytes, SocketAddr)> {
        if self.is_started() {
            return Err(TransportError::AlreadyStarted.into());
        }

        let mut buffer = vec![0u8; self.config.recv_buffer_size];
        let (n, from) = self.socket.recv_from(&mut buffer).await?;
        self.counters.received(n);
        tracing::debug!(peer = %from, len = n, "Datagram received");

        let datagram = Bytes::copy_from_slice(&buffer[..n]);
        if echo {
            let sent = self.socket.send_to(&datagram, from).await?;
            self.counters.sent(sent);
        }
        Ok((datagram, from))
    }

    /// Stop the background loops
    ///
    /// Datagrams already handed to the dispatch thread are still delivered
    /// before it exits.
    pub fn stop(&self) {
        let loops = self.loops.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(loops) = loops else {
            return;
        };

        loops.receive_task.abort();
        let _ = loops.inbound.send(Inbound::Stop);
        if loops.dispatch_thread.thread().id() != thread::current().id() {
            let _ = loops.dispatch_thread.join();
        }
        self.started.store(false, Ordering::Release);
        tracing::info!(addr = %self.local_addr, "UDP peer stopped");
    }

    /// Datagrams waiting in the outbound queue
    pub fn pending_sends(&self) -> usize {
        lock_outbound(&self.outbound).pending.len()
    }

    /// Snapshot of the peer counters
    pub fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }
}

impl Drop for UdpPeer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock_outbound(outbound: &Mutex<Outbound>) -> MutexGuard<'_, Outbound> {
    outbound.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    buffer_size: usize,
    inbound: mpsc::UnboundedSender<Inbound>,
    counters: Arc<TransportCounters>,
) {
    let mut buffer = vec![0u8; buffer_size];

    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((n, from)) => {
                counters.received(n);
                tracing::trace!(peer = %from, len = n, "Datagram received");
                let datagram = Bytes::copy_from_slice(&buffer[..n]);
                if inbound.send(Inbound::Datagram(datagram)).is_err() {
                    break;
                }
            }
            Err(e) => {
                counters.error();
                tracing::warn!(error = %e, "UDP receive error");
                break;
            }
        }
    }
}

fn dispatch_loop(mut inbound: mpsc::UnboundedReceiver<Inbound>, handler: Arc<Multicast<Bytes>>) {
    while let Some(Inbound::Datagram(datagram)) = inbound.blocking_recv() {
        handler.invoke(&datagram);
    }
    tracing::debug!("UDP dispatch loop exited");
}

async fn drain_outbound(
    socket: Arc<UdpSocket>,
    outbound: Arc<Mutex<Outbound>>,
    counters: Arc<TransportCounters>,
) {
    loop {
        let (data, target) = {
            let mut outbound = lock_outbound(&outbound);
            match outbound.pending.pop_front() {
                Some(next) => next,
                None => {
                    outbound.sending = false;
                    return;
                }
            }
        };

        match socket.send_to(&data, target).await {
            Ok(n) => counters.sent(n),
            Err(e) => {
                counters.error();
                tracing::warn!(peer = %target, error = %e, "UDP async send failed");
            }
        }
    }
}
