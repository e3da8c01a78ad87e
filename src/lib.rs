//! A pooled UDP transport for shipping [StatsD][statsd]-style metric datagrams to a remote
//! collector.
//!
//! [statsd]: https://github.com/statsd/statsd
//!
//! # Usage
//!
//! Using the transport is straightforward:
//!
//! ```no_run
//! # use statsd_transport::PooledUdpTransport;
//! // Point the transport at the collector. The address is resolved once here; supply a custom
//! // `EndpointSource` instead to re-resolve it over time.
//! let transport = PooledUdpTransport::with_fixed_endpoint("127.0.0.1:8125")
//!     .expect("failed to resolve collector address");
//!
//! // Each send puts one datagram on the wire. Pre-encoded payloads can be sent with
//! // `send_bytes` to skip re-encoding.
//! transport.send("requests:1|c").expect("failed to send metric");
//! ```
//!
//! # Features
//!
//! ## Socket pooling
//!
//! Sockets are connected to the collector address once and reused across sends, so the
//! steady-state cost of a send is a single datagram write. The pool is safe to drive from many
//! threads at once with no external locking.
//!
//! ## Endpoint re-resolution
//!
//! The collector address is obtained from an [`EndpointSource`] on every send. When the source
//! starts returning a new address (e.g. after a DNS change upstream), the transport atomically
//! swaps in a pool of sockets connected to the new address and closes the old pool's sockets.
//! The swap is a compare-and-swap on a shared reference, so no lock is held across a network
//! write.
//!
//! ## Best-effort semantics
//!
//! UDP gives no delivery or ordering guarantee, and this transport does not pretend otherwise:
//! there is no retry, buffering, or backoff. A failed send destroys the socket it used, surfaces
//! the error, and the next send starts clean with a fresh socket.
//!
//! # Missing
//!
//! ## Unix domain socket support
//!
//! We do not yet support sending to a collector over Unix domain sockets; UDP is the only
//! transport.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]

mod endpoint;
pub use self::endpoint::{EndpointSource, FixedEndpoint};

mod error;
pub use self::error::TransportError;

mod pool;
pub use self::pool::ConnectedSocketPool;

mod transport;
pub use self::transport::PooledUdpTransport;
