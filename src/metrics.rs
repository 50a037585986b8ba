//! Metrics for the [Engine](crate::Engine).

use prometheus_client::{metrics::counter::Counter, registry::Registry};

/// Counters tracking engine activity.
///
/// Cloning shares the underlying counters, so a handle obtained before the
/// engine starts keeps observing it.
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    /// Packets handed to the engine (including malformed ones).
    pub messages_received: Counter,
    /// Packets dispatched to peers.
    pub messages_sent: Counter,
    /// Packets dropped at parse time (bad origin, level, or encoding).
    pub messages_invalid: Counter,
    /// Decoded aggregates dropped because the verification backlog was full.
    pub backlog_dropped: Counter,
    /// Aggregates that passed cryptographic verification.
    pub signatures_verified: Counter,
    /// Aggregates that failed cryptographic verification.
    pub signatures_rejected: Counter,
    /// Verified aggregates that improved a level's best.
    pub signatures_stored: Counter,
    /// Final aggregates emitted on the output stream.
    pub emitted: Counter,
}

impl Metrics {
    /// Registers all counters with the given registry.
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "messages_received",
            "Packets handed to the engine (including malformed ones)",
            self.messages_received.clone(),
        );
        registry.register(
            "messages_sent",
            "Packets dispatched to peers",
            self.messages_sent.clone(),
        );
        registry.register(
            "messages_invalid",
            "Packets dropped at parse time",
            self.messages_invalid.clone(),
        );
        registry.register(
            "backlog_dropped",
            "Decoded aggregates dropped because the verification backlog was full",
            self.backlog_dropped.clone(),
        );
        registry.register(
            "signatures_verified",
            "Aggregates that passed cryptographic verification",
            self.signatures_verified.clone(),
        );
        registry.register(
            "signatures_rejected",
            "Aggregates that failed cryptographic verification",
            self.signatures_rejected.clone(),
        );
        registry.register(
            "signatures_stored",
            "Verified aggregates that improved a level's best",
            self.signatures_stored.clone(),
        );
        registry.register(
            "emitted",
            "Final aggregates emitted on the output stream",
            self.emitted.clone(),
        );
    }
}
