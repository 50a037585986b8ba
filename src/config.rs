//! Configuration for the [Engine](crate::Engine).

use crate::{partition::Partitioner, registry::Registry, scheme::Scheme, tree};
use bytes::Bytes;
use std::time::Duration;

/// Interval between periodic dissemination sweeps.
const DEFAULT_UPDATE_PERIOD: Duration = Duration::from_millis(50);

/// Additional startup delay applied per level.
const DEFAULT_LEVEL_TIMEOUT: Duration = Duration::from_millis(100);

/// Burst size for dissemination triggered by a completed level.
const DEFAULT_CANDIDATE_COUNT: usize = 10;

/// Smallest default queue capacity, so tiny populations still buffer a few
/// packets.
const MIN_QUEUE_CAPACITY: usize = 16;

/// Configuration for the [Engine](crate::Engine).
pub struct Config<S, R, P>
where
    S: Scheme,
    R: Registry<PublicKey = S::PublicKey>,
    P: Partitioner<PublicKey = S::PublicKey>,
{
    /// Signature scheme bound to the local signing key.
    pub scheme: S,

    /// The identity table shared by all participants.
    pub registry: R,

    /// Maps levels to candidate peers. Must agree with the registry size
    /// and be anchored at `local`.
    pub partitioner: P,

    /// Index of the local node in the identity table.
    pub local: u32,

    /// The message being collectively signed.
    pub message: Bytes,

    /// Interval between periodic dissemination sweeps.
    pub update_period: Duration,

    /// Additional startup delay applied per level: level `k` activates
    /// after `(k - 1) * level_timeout`, unless completing the levels below
    /// it activates it earlier.
    pub level_timeout: Duration,

    /// Number of peers contacted at once when a completed level triggers
    /// dissemination (the periodic sweep contacts one peer per level).
    pub candidate_count: usize,

    /// Number of contributions required before an aggregate is emitted on
    /// the output stream, as a function of the population size.
    pub contributions_threshold: fn(u32) -> u32,

    /// Capacity of the inbound packet mailbox. Overflow drops.
    pub mailbox_size: usize,

    /// Capacity of the verification pipeline's admission queue. Overflow
    /// drops.
    pub verify_backlog: usize,
}

impl<S, R, P> Config<S, R, P>
where
    S: Scheme,
    R: Registry<PublicKey = S::PublicKey>,
    P: Partitioner<PublicKey = S::PublicKey>,
{
    /// Creates a configuration with default tuning for the registry's size.
    pub fn new(scheme: S, registry: R, partitioner: P, local: u32, message: Bytes) -> Self {
        let size = registry.size();
        let capacity = (size as usize * tree::log2(size).max(1) as usize).max(MIN_QUEUE_CAPACITY);
        Self {
            scheme,
            registry,
            partitioner,
            local,
            message,
            update_period: DEFAULT_UPDATE_PERIOD,
            level_timeout: DEFAULT_LEVEL_TIMEOUT,
            candidate_count: DEFAULT_CANDIDATE_COUNT,
            contributions_threshold: crate::majority,
            mailbox_size: capacity,
            verify_backlog: capacity,
        }
    }

    /// Asserts that all tuning values are usable.
    pub fn assert(&self) {
        assert!(
            self.update_period > Duration::ZERO,
            "update_period must be non-zero"
        );
        assert!(
            self.level_timeout > Duration::ZERO,
            "level_timeout must be non-zero"
        );
        assert!(
            self.candidate_count > 0,
            "candidate_count must be non-zero"
        );
        assert!(self.mailbox_size > 0, "mailbox_size must be non-zero");
        assert!(self.verify_backlog > 0, "verify_backlog must be non-zero");
    }
}
