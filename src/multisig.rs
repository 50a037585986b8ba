//! Aggregate signature paired with its contributor set.

use crate::{bitset::BitSet, scheme::Scheme, types::Error};
use bytes::{Buf, BufMut, Bytes};

/// An aggregate signature together with the bit-set of contributors it
/// represents.
///
/// The bit-set is relative to some interval of the id space fixed by
/// context (the level a packet is addressed to, or the whole population for
/// rolled-up aggregates); bit `i` marks the `i`-th id of that interval. The
/// cardinality of the bit-set always equals the number of individual
/// signatures combined into the aggregate, and an empty contributor set is
/// never allowed at rest.
#[derive(Clone, Debug)]
pub struct MultiSignature<S: Scheme> {
    /// Contributors represented by the aggregate.
    pub signers: BitSet,
    /// The aggregate signature.
    pub signature: S::Signature,
}

impl<S: Scheme> MultiSignature<S> {
    /// Wraps a single signature as an aggregate of one contributor.
    pub fn individual(capacity: usize, index: usize, signature: S::Signature) -> Self {
        let mut signers = BitSet::new(capacity);
        signers.set(index, true);
        Self { signers, signature }
    }

    /// Returns the number of contributors.
    pub fn cardinality(&self) -> usize {
        self.signers.count_ones()
    }

    /// Returns the capacity of the contributor set.
    pub fn capacity(&self) -> usize {
        self.signers.capacity()
    }

    /// Merges another aggregate into this one.
    ///
    /// Defined only for aggregates over the same interval (equal
    /// capacities); the contributor sets are expected to be disjoint, as
    /// combining overlapping aggregates double-counts contributions.
    pub fn merge(&mut self, other: &Self, scheme: &S) -> Result<(), Error> {
        if self.capacity() != other.capacity() {
            return Err(Error::CapacityMismatch(self.capacity(), other.capacity()));
        }
        self.signers.or(&other.signers);
        self.signature = scheme.combine_signatures(&self.signature, &other.signature);
        Ok(())
    }

    /// Serializes the aggregate (contributor set first, then signature).
    pub fn write(&self, scheme: &S, buf: &mut impl BufMut) {
        self.signers.write(buf);
        scheme.write_signature(&self.signature, buf);
    }

    /// Serializes the aggregate into a freshly-allocated buffer.
    pub fn encode(&self, scheme: &S) -> Bytes {
        let mut buf = Vec::with_capacity(BitSet::encoded_size(self.capacity()));
        self.write(scheme, &mut buf);
        buf.into()
    }

    /// Deserializes an aggregate over an interval of the given capacity.
    ///
    /// Fails on malformed encodings and on an empty contributor set.
    pub fn read(scheme: &S, capacity: usize, buf: &mut impl Buf) -> Result<Self, Error> {
        let signers = BitSet::read(buf, capacity)?;
        if signers.is_empty() {
            return Err(Error::EmptySignature);
        }
        let signature = scheme.read_signature(buf)?;
        Ok(Self { signers, signature })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks;

    #[test]
    fn test_individual() {
        let scheme = mocks::Insecure::new(3);
        let ms = MultiSignature::<mocks::Insecure>::individual(8, 3, scheme.sign(b"msg"));
        assert_eq!(ms.cardinality(), 1);
        assert_eq!(ms.capacity(), 8);
        assert!(ms.signers.get(3));
    }

    #[test]
    fn test_merge() {
        let scheme = mocks::Insecure::new(0);
        let mut left =
            MultiSignature::<mocks::Insecure>::individual(4, 0, scheme.sign(b"msg"));
        let right = MultiSignature::<mocks::Insecure>::individual(
            4,
            2,
            mocks::Insecure::new(2).sign(b"msg"),
        );
        left.merge(&right, &scheme).unwrap();
        assert_eq!(left.cardinality(), 2);
        assert!(left.signers.get(0));
        assert!(left.signers.get(2));
    }

    #[test]
    fn test_merge_capacity_mismatch() {
        let scheme = mocks::Insecure::new(0);
        let mut left =
            MultiSignature::<mocks::Insecure>::individual(4, 0, scheme.sign(b"msg"));
        let right = MultiSignature::<mocks::Insecure>::individual(
            8,
            1,
            mocks::Insecure::new(1).sign(b"msg"),
        );
        assert!(matches!(
            left.merge(&right, &scheme),
            Err(Error::CapacityMismatch(4, 8))
        ));
    }

    #[test]
    fn test_codec() {
        let scheme = mocks::Insecure::new(1);
        let ms = MultiSignature::<mocks::Insecure>::individual(12, 1, scheme.sign(b"msg"));
        let encoded = ms.encode(&scheme);
        let decoded = MultiSignature::read(&scheme, 12, &mut &encoded[..]).unwrap();
        assert_eq!(decoded.cardinality(), 1);
        assert!(decoded.signers.get(1));
        assert_eq!(decoded.signature, ms.signature);
    }

    #[test]
    fn test_decode_rejects_empty() {
        let scheme = mocks::Insecure::new(0);
        let ms = MultiSignature::<mocks::Insecure>::individual(8, 0, scheme.sign(b"msg"));
        let mut encoded = ms.encode(&scheme).to_vec();
        encoded[0] = 0; // clear the only contributor
        assert!(matches!(
            MultiSignature::read(&scheme, 8, &mut &encoded[..]),
            Err(Error::EmptySignature)
        ));
    }
}
