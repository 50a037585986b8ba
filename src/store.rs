//! Best-so-far storage of verified aggregates.

use crate::{multisig::MultiSignature, scheme::Scheme, types::Error};
use tracing::trace;

/// Keeps the highest-cardinality aggregate seen for every level and rolls
/// them up into combined aggregates.
///
/// Every aggregate's contributor set spans the whole id space; what varies
/// per slot is the interval contributors may fall in. Slot 0 holds the
/// node's own single-signer contribution (written at construction); slot
/// `k >= 1` holds the best aggregate received for level `k`, restricted to
/// that level's candidate interval. The intervals of distinct slots are
/// disjoint by construction of the candidate tree, so rolled-up contributor
/// sets never overlap.
pub struct SignatureStore<S: Scheme> {
    scheme: S,
    // Size of the id space (capacity of every stored contributor set).
    size: u32,
    best: Vec<Option<MultiSignature<S>>>,
}

impl<S: Scheme> SignatureStore<S> {
    /// Creates a store over `size` ids with `slots` levels (slot 0 being
    /// the anchor's own contribution).
    pub fn new(scheme: S, size: u32, slots: usize) -> Self {
        Self {
            scheme,
            size,
            best: vec![None; slots],
        }
    }

    /// Keeps the aggregate if it strictly improves on the slot's current
    /// best cardinality. Returns whether the aggregate was kept.
    pub fn store(&mut self, level: u32, multisig: MultiSignature<S>) -> Result<bool, Error> {
        if multisig.capacity() != self.size as usize {
            return Err(Error::CapacityMismatch(
                multisig.capacity(),
                self.size as usize,
            ));
        }
        let slot = self
            .best
            .get_mut(level as usize)
            .ok_or(Error::InvalidLevel(level))?;
        if let Some(best) = slot {
            if multisig.cardinality() <= best.cardinality() {
                return Ok(false);
            }
        }
        trace!(level, cardinality = multisig.cardinality(), "new best");
        *slot = Some(multisig);
        Ok(true)
    }

    /// Returns the best aggregate stored for the given level.
    pub fn best(&self, level: u32) -> Option<&MultiSignature<S>> {
        self.best.get(level as usize).and_then(Option::as_ref)
    }

    /// Rolls up the best aggregates of all levels below `level` into a
    /// single aggregate.
    ///
    /// Returns None when nothing is stored below `level` (never the case
    /// once the own contribution is written at slot 0).
    pub fn combined(&self, level: u32) -> Option<MultiSignature<S>> {
        let mut combined: Option<MultiSignature<S>> = None;
        let slots = (level as usize).min(self.best.len());
        for slot in 0..slots {
            let Some(best) = &self.best[slot] else {
                continue;
            };
            match &mut combined {
                Some(acc) => acc
                    .merge(best, &self.scheme)
                    .expect("stored aggregates share capacity"),
                None => combined = Some(best.clone()),
            }
        }
        combined
    }

    /// Rolls up every slot, including the top level.
    pub fn full_signature(&self) -> Option<MultiSignature<S>> {
        self.combined(self.best.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{self, Insecure};

    const MESSAGE: &[u8] = b"msg";

    // Store for anchor 1 in an id space of 8: slot 0 is {1}, slot 1 is {0},
    // slot 2 is [2, 4), slot 3 is [4, 8).
    fn store() -> SignatureStore<Insecure> {
        let mut store = SignatureStore::new(Insecure::new(1), 8, 4);
        let own = MultiSignature::individual(8, 1, Insecure::new(1).sign(MESSAGE));
        assert!(store.store(0, own).unwrap());
        store
    }

    // An aggregate over the given ids, spanning the whole id space.
    fn aggregate(signers: &[u32]) -> MultiSignature<Insecure> {
        let mut iter = signers.iter();
        let first = *iter.next().unwrap();
        let mut ms =
            MultiSignature::individual(8, first as usize, Insecure::new(first).sign(MESSAGE));
        for id in iter {
            let other =
                MultiSignature::individual(8, *id as usize, Insecure::new(*id).sign(MESSAGE));
            ms.merge(&other, &Insecure::new(first)).unwrap();
        }
        ms
    }

    #[test]
    fn test_best_tracks_max_cardinality() {
        let mut store = store();
        assert!(store.store(3, aggregate(&[5])).unwrap());
        assert_eq!(store.best(3).unwrap().cardinality(), 1);

        // Higher cardinality replaces.
        assert!(store.store(3, aggregate(&[4, 6, 7])).unwrap());
        assert_eq!(store.best(3).unwrap().cardinality(), 3);

        // Equal or lower cardinality is discarded (ties keep first-seen).
        assert!(!store.store(3, aggregate(&[4, 5, 6])).unwrap());
        assert!(!store.store(3, aggregate(&[7])).unwrap());
        let best = store.best(3).unwrap();
        assert_eq!(best.cardinality(), 3);
        assert!(best.signers.get(4));
        assert!(!best.signers.get(5));
    }

    #[test]
    fn test_store_invalid_level() {
        let mut store = store();
        assert!(matches!(
            store.store(4, aggregate(&[4])),
            Err(Error::InvalidLevel(4))
        ));
    }

    #[test]
    fn test_store_capacity_mismatch() {
        let mut store = store();
        let narrow = MultiSignature::individual(4, 0, Insecure::new(0).sign(MESSAGE));
        assert!(matches!(
            store.store(1, narrow),
            Err(Error::CapacityMismatch(4, 8))
        ));
    }

    #[test]
    fn test_combined_is_disjoint_union() {
        let mut store = store();
        store.store(1, aggregate(&[0])).unwrap();
        store.store(2, aggregate(&[3])).unwrap();
        store.store(3, aggregate(&[4, 7])).unwrap();

        // Rolling up below level 2: own contribution and slot 1 only.
        let low = store.combined(2).unwrap();
        assert_eq!(low.cardinality(), 2);
        assert_eq!(low.signers.iter_ones().collect::<Vec<_>>(), vec![0, 1]);

        // Each slot's bits appear exactly at its interval, nothing else.
        let full = store.full_signature().unwrap();
        assert_eq!(full.capacity(), 8);
        assert_eq!(
            full.signers.iter_ones().collect::<Vec<_>>(),
            vec![0, 1, 3, 4, 7]
        );

        // The rolled-up aggregate verifies against its contributors.
        let scheme = Insecure::new(1);
        let mut key = mocks::public_key(0);
        for id in [1, 3, 4, 7] {
            key = scheme.combine_public_keys(&key, &mocks::public_key(id));
        }
        assert!(scheme.verify(&key, MESSAGE, &full.signature));
    }

    #[test]
    fn test_combined_skips_missing_slots() {
        let store = store();
        let combined = store.combined(4).unwrap();
        assert_eq!(combined.cardinality(), 1);
        assert_eq!(combined.signers.iter_ones().collect::<Vec<_>>(), vec![1]);
        assert!(store.combined(0).is_none());
    }
}
