//! Identity table shared by all participants.

use crate::types::Error;
use std::{fmt::Debug, ops::Range, sync::Arc};

/// A participant in the aggregation protocol.
///
/// Identities are assigned dense indices `0..N` agreed upon out-of-band; the
/// index determines the participant's position in the id space the candidate
/// tree is built over. The address is opaque to the engine and only consumed
/// by transports that dial peers directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity<P> {
    /// Dense index of the participant.
    pub id: u32,
    /// Transport address of the participant.
    pub address: String,
    /// Public key of the participant.
    pub public_key: P,
}

/// Read-only view of the identity table.
///
/// Implementations must be cheap to clone (the verification worker holds its
/// own copy) and must present identities in dense id order.
pub trait Registry: Clone + Send + Sync + 'static {
    /// The public key type of the signature scheme in use.
    type PublicKey: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Returns the number of identities.
    fn size(&self) -> u32;

    /// Returns the identity at the given index, if it exists.
    fn identity(&self, index: u32) -> Option<&Identity<Self::PublicKey>>;

    /// Returns the contiguous identities in `range`, or None if either
    /// endpoint falls outside `[0, size]`.
    fn identities(&self, range: Range<u32>) -> Option<&[Identity<Self::PublicKey>]>;
}

/// A [Registry] backed by a shared, immutable array.
#[derive(Clone, Debug)]
pub struct ArrayRegistry<P> {
    identities: Arc<Vec<Identity<P>>>,
}

impl<P: Clone + Debug + PartialEq + Send + Sync + 'static> ArrayRegistry<P> {
    /// Creates a registry over the given identities.
    ///
    /// Fails unless identities are sorted by id and densely indexed from
    /// zero (the candidate tree requires positional lookups to agree with
    /// ids).
    pub fn new(identities: Vec<Identity<P>>) -> Result<Self, Error> {
        for (index, identity) in identities.iter().enumerate() {
            if identity.id != index as u32 {
                return Err(Error::InvalidConfig("identities must be densely indexed"));
            }
        }
        Ok(Self {
            identities: Arc::new(identities),
        })
    }
}

impl<P: Clone + Debug + PartialEq + Send + Sync + 'static> Registry for ArrayRegistry<P> {
    type PublicKey = P;

    fn size(&self) -> u32 {
        self.identities.len() as u32
    }

    fn identity(&self, index: u32) -> Option<&Identity<P>> {
        self.identities.get(index as usize)
    }

    fn identities(&self, range: Range<u32>) -> Option<&[Identity<P>]> {
        if range.start > range.end || range.end > self.size() {
            return None;
        }
        Some(&self.identities[range.start as usize..range.end as usize])
    }
}
