use std::{net::SocketAddr, sync::Arc};

use arc_swap::ArcSwapOption;
use tracing::{debug, trace};

use crate::{
    endpoint::{EndpointSource, FixedEndpoint},
    error::TransportError,
    pool::ConnectedSocketPool,
};

/// A transport that sends metric payloads as UDP datagrams, pooling sockets across sends.
///
/// The transport resolves the remote address through its [`EndpointSource`] once per send, and
/// keeps a pool of connected sockets for whichever address is current. When the resolved address
/// changes, a pool for the new address atomically replaces the old one; the old pool's idle
/// sockets are closed once the last in-flight send using it completes.
///
/// Sends are best-effort, matching the underlying protocol: there is no retry, buffering, or
/// delivery guarantee. A failed send destroys the socket it used and surfaces the error to the
/// caller, leaving the transport ready for the next send.
///
/// Multiple threads may share one transport (behind an `Arc` or a reference) and call
/// [`send`](Self::send) concurrently with no external synchronization.
pub struct PooledUdpTransport<E = FixedEndpoint> {
    endpoint: E,
    pool: ArcSwapOption<ConnectedSocketPool>,
}

impl PooledUdpTransport<FixedEndpoint> {
    /// Creates a transport that always sends to the given `<host>:<port>` address.
    ///
    /// The address is resolved once, here. To re-resolve over time, supply a custom
    /// [`EndpointSource`] via [`new`](Self::new) instead.
    ///
    /// # Errors
    ///
    /// If the address cannot be resolved, an error is returned indicating the reason.
    pub fn with_fixed_endpoint<A>(addr: A) -> Result<Self, TransportError>
    where
        A: AsRef<str>,
    {
        Ok(Self::new(FixedEndpoint::resolve(addr)?))
    }
}

impl<E: EndpointSource> PooledUdpTransport<E> {
    /// Creates a transport that resolves its destination through the given endpoint source.
    ///
    /// No sockets are created until the first send.
    pub fn new(endpoint: E) -> Self {
        Self { endpoint, pool: ArcSwapOption::empty() }
    }

    /// Sends a metric string as a single UDP datagram, encoded as UTF-8.
    ///
    /// Empty or all-whitespace metrics are silently dropped without touching the network: an
    /// empty metric carries no information, so a no-op is success, not a failure.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ResourceExhausted`] if a socket could not be created, or
    /// [`TransportError::SendFailed`] if the datagram write failed. No retry is performed;
    /// callers decide whether to retry.
    pub fn send(&self, metric: &str) -> Result<(), TransportError> {
        if metric.trim().is_empty() {
            return Ok(());
        }

        self.send_bytes(metric.as_bytes())
    }

    /// Sends an already-encoded metric payload as a single UDP datagram.
    ///
    /// The slice is sent as-is, byte for byte; callers holding a larger buffer pass the relevant
    /// sub-slice to avoid copying. Empty payloads are silently dropped, as with
    /// [`send`](Self::send).
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub fn send_bytes(&self, payload: &[u8]) -> Result<(), TransportError> {
        if payload.is_empty() {
            return Ok(());
        }

        let addr = self.endpoint.endpoint();
        let pool = self.pool_for(addr);
        let socket = pool.acquire()?;

        match socket.send(payload) {
            Ok(_) => {
                pool.release(socket);
                Ok(())
            }
            Err(source) => {
                // The socket's connection state is unknown after a failed send; destroy it
                // before the error propagates so it can never re-enter the pool.
                drop(socket);
                Err(TransportError::SendFailed { addr: pool.remote_addr(), source })
            }
        }
    }

    /// Returns the pool for the given address, swapping in a new pool when the address changed.
    ///
    /// Concurrent senders under a stable address all take the comparison fast path. During an
    /// address change, racing senders each build a candidate pool and try to install it with a
    /// compare-and-swap; exactly one wins, and the losers drop their candidate and use the
    /// winner's pool without re-checking its address. That bounds the work per send to one pool
    /// construction, at the cost of tolerating a single possibly-stale send during the race.
    fn pool_for(&self, addr: SocketAddr) -> Arc<ConnectedSocketPool> {
        let current = self.pool.load();
        if let Some(pool) = &*current {
            if pool.remote_addr() == addr {
                return Arc::clone(pool);
            }
        }

        let fresh = Arc::new(ConnectedSocketPool::new(addr));
        let previous = self.pool.compare_and_swap(&*current, Some(Arc::clone(&fresh)));

        if same_pool(&current, &previous) {
            // Swap succeeded. The superseded pool (if any) is released here; its idle sockets
            // close once any in-flight sends still holding it complete.
            debug!(remote_addr = %addr, "Installed socket pool for remote address.");
            fresh
        } else {
            trace!(remote_addr = %addr, "Lost pool install race, using current pool.");
            match &*previous {
                Some(pool) => Arc::clone(pool),
                // Only reachable if the current pool was cleared concurrently, which the public
                // API never does; fall back to the pool we just built.
                None => fresh,
            }
        }
    }
}

fn same_pool(
    a: &Option<Arc<ConnectedSocketPool>>,
    b: &Option<Arc<ConnectedSocketPool>>,
) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::{SocketAddr, UdpSocket},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use super::PooledUdpTransport;
    use crate::{endpoint::FixedEndpoint, error::TransportError};

    fn local_target() -> (UdpSocket, SocketAddr) {
        let receiver = UdpSocket::bind("127.0.0.1:0").expect("failed to bind receiver");
        let addr = receiver.local_addr().unwrap();
        (receiver, addr)
    }

    #[test]
    fn sequential_sends_reuse_one_socket() {
        let (_receiver, addr) = local_target();
        let transport = PooledUdpTransport::new(FixedEndpoint::new(addr));

        transport.send("metric1:1|c").unwrap();
        transport.send("metric2:2|c").unwrap();
        transport.send("metric3:3|c").unwrap();

        let pool = transport.pool.load();
        let pool = pool.as_ref().expect("pool should exist after sending");
        assert_eq!(pool.sockets_created(), 1);
        assert_eq!(pool.idle_sockets(), 1);
    }

    #[test]
    fn blank_payloads_touch_nothing() {
        let (_receiver, addr) = local_target();
        let transport = PooledUdpTransport::new(FixedEndpoint::new(addr));

        transport.send("").unwrap();
        transport.send("   \t\n").unwrap();
        transport.send_bytes(&[]).unwrap();

        assert!(transport.pool.load().is_none());
    }

    #[test]
    fn address_change_swaps_pools() {
        let (_receiver_a, addr_a) = local_target();
        let (_receiver_b, addr_b) = local_target();

        let addrs = [addr_a, addr_b, addr_a];
        let which = Arc::new(AtomicUsize::new(0));
        let source = {
            let which = Arc::clone(&which);
            move || addrs[which.load(Ordering::SeqCst)]
        };

        let transport = PooledUdpTransport::new(source);

        transport.send("first:1|c").unwrap();
        let pool_a1 = Arc::clone(transport.pool.load().as_ref().unwrap());
        assert_eq!(pool_a1.remote_addr(), addr_a);

        // Address moves to B; the next send swaps in a pool for B.
        which.store(1, Ordering::SeqCst);
        transport.send("second:1|c").unwrap();
        let pool_b = Arc::clone(transport.pool.load().as_ref().unwrap());
        assert_eq!(pool_b.remote_addr(), addr_b);
        assert!(!Arc::ptr_eq(&pool_a1, &pool_b));

        // Back to A: the original pool for A is gone, so a fresh one is built. Reuse is
        // per-current-pool, not a cache keyed by address history.
        which.store(2, Ordering::SeqCst);
        transport.send("third:1|c").unwrap();
        let pool_a2 = Arc::clone(transport.pool.load().as_ref().unwrap());
        assert_eq!(pool_a2.remote_addr(), addr_a);
        assert!(!Arc::ptr_eq(&pool_a1, &pool_a2));
        assert_eq!(pool_a2.sockets_created(), 1);
    }

    #[test]
    fn concurrent_sends_never_create_more_sockets_than_in_flight_sends() {
        const THREADS: usize = 8;
        const SENDS_PER_THREAD: usize = 50;

        let (_receiver, addr) = local_target();
        let transport = Arc::new(PooledUdpTransport::new(FixedEndpoint::new(addr)));

        let handles = (0..THREADS)
            .map(|worker| {
                let transport = Arc::clone(&transport);
                std::thread::spawn(move || {
                    for i in 0..SENDS_PER_THREAD {
                        let metric = format!("worker{}.send{}:1|c", worker, i);
                        transport.send(&metric).unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().expect("worker thread panicked");
        }

        let pool = transport.pool.load();
        let pool = pool.as_ref().expect("pool should exist after sending");

        // A socket is only created when the idle queue is empty, i.e. every existing socket is
        // out with an in-flight send, so creations are bounded by the peak send concurrency.
        assert!(
            pool.sockets_created() <= THREADS,
            "created {} sockets for {} concurrent senders",
            pool.sockets_created(),
            THREADS,
        );
        assert!(pool.sockets_created() >= 1);

        // Every send succeeded, so every socket handed out came back to the idle set.
        assert_eq!(pool.idle_sockets(), pool.sockets_created());
    }

    #[test]
    fn failed_send_destroys_socket_and_recovers() {
        let (_receiver, addr) = local_target();
        let transport = PooledUdpTransport::new(FixedEndpoint::new(addr));

        // Larger than the maximum UDP payload, so the write fails deterministically.
        let oversized = vec![0u8; 100_000];
        match transport.send_bytes(&oversized) {
            Err(TransportError::SendFailed { addr: failed_addr, .. }) => {
                assert_eq!(failed_addr, addr);
            }
            other => panic!("expected SendFailed, got {:?}", other),
        }

        // The failed socket was not returned to the pool.
        {
            let pool = transport.pool.load();
            let pool = pool.as_ref().unwrap();
            assert_eq!(pool.sockets_created(), 1);
            assert_eq!(pool.idle_sockets(), 0);
        }

        // The next send creates a fresh socket and succeeds.
        transport.send("recovered:1|c").unwrap();
        let pool = transport.pool.load();
        let pool = pool.as_ref().unwrap();
        assert_eq!(pool.sockets_created(), 2);
        assert_eq!(pool.idle_sockets(), 1);
    }
}
