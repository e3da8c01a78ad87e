use std::{
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    sync::atomic::{AtomicUsize, Ordering},
};

use crossbeam_queue::SegQueue;
use tracing::trace;

use crate::error::TransportError;

/// A pool of UDP sockets connected to a single remote address.
///
/// Sockets are created lazily and cached across sends, amortizing the creation cost. The pool
/// hands out exclusive ownership of a socket on [`acquire`](Self::acquire); the socket only
/// re-enters the idle set when the caller hands it back via [`release`](Self::release). A socket
/// that failed its last send must be dropped by the caller instead of being released.
///
/// Dropping the pool closes every idle socket it still holds. Sockets out on loan at that moment
/// are owned by their borrowers and are closed when those borrowers drop them.
pub struct ConnectedSocketPool {
    addr: SocketAddr,
    idle: SegQueue<UdpSocket>,
    created: AtomicUsize,
}

impl ConnectedSocketPool {
    /// Creates an empty pool for the given remote address.
    ///
    /// No sockets are created until the first [`acquire`](Self::acquire).
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, idle: SegQueue::new(), created: AtomicUsize::new(0) }
    }

    /// Returns the remote address every socket in this pool is connected to.
    pub fn remote_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Takes an idle socket from the pool, creating a new one if none is available.
    ///
    /// Creating a socket binds an ephemeral local port and connects it to the pool's remote
    /// address. For UDP, "connect" only records the default destination locally; no packets are
    /// exchanged, so this never waits on the network.
    ///
    /// # Errors
    ///
    /// If the operating system refuses to create or connect the socket (e.g. the process is out
    /// of file descriptors), a [`TransportError::ResourceExhausted`] error is returned. The pool
    /// itself is unaffected and can be retried.
    pub fn acquire(&self) -> Result<UdpSocket, TransportError> {
        if let Some(socket) = self.idle.pop() {
            return Ok(socket);
        }

        let socket = self.create_socket().map_err(|source| {
            TransportError::ResourceExhausted { addr: self.addr, source }
        })?;

        self.created.fetch_add(1, Ordering::Relaxed);
        trace!(remote_addr = %self.addr, "Created new pooled socket.");

        Ok(socket)
    }

    /// Returns a socket to the idle set for reuse.
    ///
    /// Callers must only release sockets acquired from this pool whose last send completed
    /// successfully.
    pub fn release(&self, socket: UdpSocket) {
        self.idle.push(socket);
    }

    /// Number of sockets this pool has created over its lifetime.
    pub fn sockets_created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Number of idle sockets currently held by the pool.
    pub fn idle_sockets(&self) -> usize {
        self.idle.len()
    }

    fn create_socket(&self) -> std::io::Result<UdpSocket> {
        // Bind to the unspecified address of the matching family so that connecting to either an
        // IPv4 or IPv6 collector works.
        let bind_addr: SocketAddr = if self.addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(bind_addr)?;
        socket.connect(self.addr)?;
        Ok(socket)
    }
}
