use std::net::{SocketAddr, ToSocketAddrs as _};

use crate::error::TransportError;

/// A source of the current remote collector address.
///
/// The transport consults the source once per send, and treats whatever it returns as
/// authoritative for that send. Implementations are free to return a different address on every
/// call (e.g. re-resolving a DNS name on a timer); the transport reacts by swapping its socket
/// pool over to the new address.
///
/// Implementations must not block indefinitely: the transport has no timeout of its own to
/// protect against a hanging resolver.
pub trait EndpointSource {
    /// Returns the address metrics should currently be sent to.
    fn endpoint(&self) -> SocketAddr;
}

impl<F> EndpointSource for F
where
    F: Fn() -> SocketAddr,
{
    fn endpoint(&self) -> SocketAddr {
        (self)()
    }
}

/// An endpoint source that always returns the same address.
#[derive(Clone, Copy, Debug)]
pub struct FixedEndpoint {
    addr: SocketAddr,
}

impl FixedEndpoint {
    /// Creates a `FixedEndpoint` from an already-resolved address.
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Creates a `FixedEndpoint` by resolving an address string in `<host>:<port>` form.
    ///
    /// Resolution happens once, here. When the name maps to multiple addresses, the first one is
    /// used.
    ///
    /// # Errors
    ///
    /// If the given address cannot be resolved to at least one socket address, an error is
    /// returned indicating the reason.
    pub fn resolve<A>(addr: A) -> Result<Self, TransportError>
    where
        A: AsRef<str>,
    {
        let addr = addr.as_ref();
        match addr.to_socket_addrs() {
            Ok(mut addrs) => match addrs.next() {
                Some(addr) => Ok(Self::new(addr)),
                None => Err(TransportError::InvalidEndpoint {
                    reason: format!("'{}' resolved to no addresses", addr),
                }),
            },
            Err(e) => Err(TransportError::InvalidEndpoint { reason: e.to_string() }),
        }
    }
}

impl EndpointSource for FixedEndpoint {
    fn endpoint(&self) -> SocketAddr {
        self.addr
    }
}
