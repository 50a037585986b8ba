//! Large-scale Byzantine-tolerant multi-signature aggregation.
//!
//! Inspired by [Handel](https://arxiv.org/abs/1906.05132), a population of
//! `N` participants, each holding a private signing key and a place in a
//! shared identity table, collectively produce one compact aggregate
//! signature over a shared message carrying at least a configured threshold
//! `T <= N` of contributions. The network is assumed to be
//! best-effort: packets may be lost, reordered, or duplicated, and any
//! number of participants may be slow or absent. Progress only requires
//! that enough honest contributions eventually arrive.
//!
//! # Features
//!
//! * Logarithmic Dissemination (binomial-tree peer partitioning)
//! * Bounded Verification Pipeline (flood-resistant, order-preserving)
//! * Best-So-Far Aggregation (cardinality-maximal among aggregates seen)
//! * Pluggable Cryptography, Transport, and Peer Selection
//! * Deterministic In-Memory Mocks for Testing
//!
//! # Design
//!
//! ## Protocol Description
//!
//! Every node views the id space as a logical binomial tree anchored at its
//! own id: level `k` covers the 2^(k-1) nodes whose ids share the first
//! `bitsize - k` bits with the anchor and differ at bit `k - 1`. The
//! intervals of successive levels are disjoint and, together with the
//! anchor, cover the whole population.
//!
//! A node repeatedly sends, for each active level, everything it knows
//! about its own side of that level's split: the union of its best
//! aggregates below the level. Receivers verify inbound aggregates against
//! the combined public keys of the claimed contributors, keep the best
//! aggregate per level, and emit the rolled-up result on an output stream
//! whenever it improves past the threshold.
//!
//! Levels activate progressively (level `k` after `(k - 1)` level
//! timeouts) so that nearby exchanges complete before wider ones begin, and
//! immediately when the levels below complete early. A periodic sweep
//! retransmits the current best aggregate of every active level to one
//! further candidate at a time, wrapping around the candidate list, until
//! every candidate has seen the current best; any improvement resets that
//! budget.
//!
//! ## Architecture
//!
//! All logic is split between the `Engine` and the verification worker.
//! The engine owns every piece of protocol state and serializes packet
//! intake, store updates, and dissemination through one event loop; the
//! worker performs cryptographic verification on the side, bounded by a
//! FIFO admission queue that drops (rather than blocks) under flood.
//!
//! ```txt
//!                          +------------+          +++++++++++++++
//!      Listener ---------->+            +--------->+             +
//!      (mailbox)           |   Engine   |          +    Peers    +
//!                 +------->+            +<---------+             +
//!                 |        +------+-----+          +++++++++++++++
//!                 |               |
//!                 |               v
//!            +----+-----+   +-----------+
//!            | Verifier |<--+  bounded  |
//!            | (worker) |   |   FIFO    |
//!            +----------+   +-----------+
//! ```
//!
//! ## Ordering
//!
//! Aggregates admitted to the pipeline come out of it in admission order,
//! and a verified aggregate is stored before any observer runs. Emitted
//! cardinalities never decrease, and every emission carries at least the
//! threshold of contributions. Stopping is idempotent: the output stream
//! closes once and later packets are discarded silently.
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use handel::{mocks, BinomialPartitioner, Config, Engine};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     // Four participants connected by an in-memory transport.
//!     let (registry, schemes) = mocks::fixture(4);
//!     let router = mocks::Router::new();
//!
//!     let mut outputs = Vec::new();
//!     for (id, scheme) in schemes.into_iter().enumerate() {
//!         let id = id as u32;
//!         let partitioner = BinomialPartitioner::new(id, registry.clone()).unwrap();
//!         let config = Config::new(
//!             scheme,
//!             registry.clone(),
//!             partitioner,
//!             id,
//!             bytes::Bytes::from_static(b"attest to this"),
//!         );
//!         let (engine, _mailbox, stream) = Engine::new(config).unwrap();
//!         engine.start(router.network(id));
//!         outputs.push(stream);
//!     }
//!
//!     // Every node eventually emits an aggregate meeting the threshold;
//!     // consumers typically keep the last one.
//!     for mut stream in outputs {
//!         let aggregate = stream.next().await.unwrap();
//!         println!("{} contributions", aggregate.cardinality());
//!     }
//! }
//! ```

mod bitset;
mod config;
mod engine;
mod ingress;
mod level;
mod metrics;
pub mod mocks;
mod multisig;
mod net;
mod partition;
mod registry;
pub mod scheme;
mod store;
mod tree;
mod types;
mod verifier;

pub use bitset::BitSet;
pub use config::Config;
pub use engine::Engine;
pub use ingress::Mailbox;
pub use metrics::Metrics;
pub use multisig::MultiSignature;
pub use net::{Listener, Network};
pub use partition::{BinomialPartitioner, Partitioner};
pub use registry::{ArrayRegistry, Identity, Registry};
pub use scheme::Scheme;
pub use types::{Error, Packet};

/// Returns the default contribution threshold for a population of `n`:
/// one more than half, capped at `n`.
pub fn majority(n: u32) -> u32 {
    (n / 2 + n % 2 + 1).min(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority() {
        assert_eq!(majority(2), 2);
        assert_eq!(majority(3), 3);
        assert_eq!(majority(4), 3);
        assert_eq!(majority(5), 4);
        assert_eq!(majority(8), 5);
        assert_eq!(majority(16), 9);
        assert_eq!(majority(1024), 513);
    }
}
