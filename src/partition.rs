//! Candidate selection over the identity table.

use crate::{
    registry::{Identity, Registry},
    tree::CandidateTree,
    types::Error,
};
use std::{fmt::Debug, ops::Range};

/// Maps levels to candidate peers from the viewpoint of one anchor id.
///
/// Consulted once at engine startup to populate each level's candidate list.
/// Implementations must be deterministic for a given (anchor, registry)
/// pair: all nodes must agree on which ids a level covers for the exchanged
/// contributor sets to be interpretable.
pub trait Partitioner: Clone + Send + Sync + 'static {
    /// The public key type of the signature scheme in use.
    type PublicKey: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Returns the highest level.
    fn max_level(&self) -> u32;

    /// Returns the interval of ids covered by the given level.
    fn range(&self, level: u32) -> Result<Range<u32>, Error>;

    /// Returns the identities that are candidates at the given level, in id
    /// order.
    fn candidates(&self, level: u32) -> Result<Vec<Identity<Self::PublicKey>>, Error>;
}

/// The canonical [Partitioner]: the sibling half of the binomial tree at
/// each level, in natural id order.
#[derive(Clone, Debug)]
pub struct BinomialPartitioner<R: Registry> {
    tree: CandidateTree,
    registry: R,
}

impl<R: Registry> BinomialPartitioner<R> {
    /// Creates a partitioner anchored at `id` over the given registry.
    pub fn new(id: u32, registry: R) -> Result<Self, Error> {
        if id >= registry.size() {
            return Err(Error::UnknownIdentity(id));
        }
        Ok(Self {
            tree: CandidateTree::new(id, registry.size()),
            registry,
        })
    }
}

impl<R: Registry> Partitioner for BinomialPartitioner<R> {
    type PublicKey = R::PublicKey;

    fn max_level(&self) -> u32 {
        self.tree.bitsize()
    }

    fn range(&self, level: u32) -> Result<Range<u32>, Error> {
        self.tree.full_range(level)
    }

    fn candidates(&self, level: u32) -> Result<Vec<Identity<R::PublicKey>>, Error> {
        let range = self.tree.full_range(level)?;
        let identities = self
            .registry
            .identities(range.clone())
            .ok_or(Error::InvalidRange(range.start, range.end))?;
        Ok(identities.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ArrayRegistry;

    fn registry(n: u32) -> ArrayRegistry<u32> {
        let identities = (0..n)
            .map(|id| Identity {
                id,
                address: format!("node-{id}"),
                public_key: id,
            })
            .collect();
        ArrayRegistry::new(identities).unwrap()
    }

    #[test]
    fn test_candidates() {
        let partitioner = BinomialPartitioner::new(1, registry(16)).unwrap();
        assert_eq!(partitioner.max_level(), 4);

        let level2 = partitioner.candidates(2).unwrap();
        assert_eq!(
            level2.iter().map(|identity| identity.id).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(partitioner.candidates(4).unwrap().len(), 8);
        assert!(partitioner.candidates(5).is_err());
    }

    #[test]
    fn test_deterministic() {
        let registry = registry(16);
        let a = BinomialPartitioner::new(5, registry.clone()).unwrap();
        let b = BinomialPartitioner::new(5, registry).unwrap();
        for level in 1..=4 {
            assert_eq!(a.range(level).unwrap(), b.range(level).unwrap());
            assert_eq!(a.candidates(level).unwrap(), b.candidates(level).unwrap());
        }
    }

    #[test]
    fn test_unknown_anchor() {
        assert!(matches!(
            BinomialPartitioner::new(16, registry(16)),
            Err(Error::UnknownIdentity(16))
        ));
    }
}
