//! Transport seam.
//!
//! The engine is transport-agnostic: it hands fully-formed [Packet]s to a
//! [Network] and receives inbound packets through a registered [Listener].
//! Wire framing, peer authentication, and connection management are all the
//! transport's concern.

use crate::{
    registry::Identity,
    types::{Error, Packet},
};
use std::{fmt::Debug, future::Future, sync::Arc};

/// Callback for inbound packets.
///
/// Invoked from arbitrary transport threads; implementations must be
/// thread-safe and must not block (the engine's implementation enqueues
/// into a bounded mailbox and drops on overflow).
pub trait Listener: Send + Sync + 'static {
    /// Delivers an inbound packet.
    fn new_packet(&self, packet: Packet);
}

/// Best-effort message transport.
///
/// Sends must not re-enter the registered listener synchronously on the
/// caller's stack with the expectation of completion: the engine invokes
/// [Network::send] from its own event loop and only drains its mailbox
/// between sends.
pub trait Network: Clone + Send + Sync + 'static {
    /// The public key type of the signature scheme in use.
    type PublicKey: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Registers the callback for inbound packets.
    fn register_listener(&self, listener: Arc<dyn Listener>);

    /// Sends the packet to every recipient, best-effort.
    fn send(
        &self,
        recipients: &[Identity<Self::PublicKey>],
        packet: Packet,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}
