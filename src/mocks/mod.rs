//! Mock implementations of the external seams, used for testing.

mod network;
mod scheme;

pub use network::{Network, Router};
pub use scheme::{public_key, Insecure, PublicKey, Signature};

use crate::registry::{ArrayRegistry, Identity};

/// Builds a registry of `n` identities and the matching signing schemes,
/// one per participant.
pub fn fixture(n: u32) -> (ArrayRegistry<PublicKey>, Vec<Insecure>) {
    let identities = (0..n)
        .map(|id| Identity {
            id,
            address: format!("node-{id}"),
            public_key: public_key(id),
        })
        .collect();
    let registry = ArrayRegistry::new(identities).expect("ids are dense");
    let schemes = (0..n).map(Insecure::new).collect();
    (registry, schemes)
}
