//! Ingress into the [Engine](crate::Engine).

use crate::{net::Listener, types::Packet};
use futures::{channel::mpsc, SinkExt};
use tracing::trace;

/// Messages that can be sent to a [Mailbox].
pub(crate) enum Message {
    /// An inbound packet from the transport.
    Packet(Packet),
    /// Request to shut the engine down.
    Stop,
}

/// Handle for feeding and stopping a running [Engine](crate::Engine).
///
/// The engine registers a clone of this handle as the transport's
/// [Listener]; inbound packets are enqueued without blocking and dropped if
/// the engine's mailbox is full or the engine has stopped.
#[derive(Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Message>,
}

impl Mailbox {
    pub(crate) fn new(sender: mpsc::Sender<Message>) -> Self {
        Self { sender }
    }

    /// Stops the engine: the ticker and verification pipeline wind down and
    /// the output stream closes. Idempotent; packets delivered afterwards
    /// are discarded silently.
    pub async fn stop(&mut self) {
        let _ = self.sender.send(Message::Stop).await;
    }
}

impl Listener for Mailbox {
    fn new_packet(&self, packet: Packet) {
        let mut sender = self.sender.clone();
        if let Err(err) = sender.try_send(Message::Packet(packet)) {
            trace!(full = err.is_full(), "dropping inbound packet");
        }
    }
}
