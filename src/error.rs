use std::{io, net::SocketAddr};

use thiserror::Error;

/// Errors that could occur while configuring the transport or sending a metric payload.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to resolve the remote endpoint address.
    #[error("invalid endpoint address: {reason}")]
    InvalidEndpoint {
        /// Details about the resolution failure.
        reason: String,
    },

    /// Failed to create a socket connected to the remote endpoint.
    ///
    /// This is a local failure (e.g. the process hit its file descriptor limit), not a network
    /// one: connecting a UDP socket only binds the default destination and performs no round-trip.
    #[error("failed to create socket for {addr}")]
    ResourceExhausted {
        /// The remote address the socket was being created for.
        addr: SocketAddr,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The datagram write failed after a socket was acquired.
    ///
    /// The offending socket has already been destroyed by the time this error is observed, so a
    /// poisoned socket can never re-enter the pool. Subsequent sends get a fresh socket.
    #[error("failed to send payload to {addr}")]
    SendFailed {
        /// The remote address the payload was being sent to.
        addr: SocketAddr,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}
