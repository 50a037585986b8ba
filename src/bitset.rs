//! Fixed-capacity contributor bit-set.
//!
//! Contributor sets are exchanged on the wire alongside aggregate signatures,
//! so the encoding is strict: a set of capacity `c` occupies exactly
//! `ceil(c / 8)` bytes and any bit past the capacity must be zero.

use crate::types::Error;
use bytes::{Buf, BufMut};
use std::fmt;

const WORD_BITS: usize = u64::BITS as usize;

/// A fixed-capacity vector of bits backed by 64-bit words.
///
/// The capacity is immutable after construction. Within each byte of the
/// encoded form, lower-order bits come before higher-order bits.
#[derive(Clone, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<u64>,
    capacity: usize,
}

impl BitSet {
    /// Creates a new set of the given capacity with all bits cleared.
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity,
        }
    }

    /// Returns the capacity fixed at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sets the bit at `index` to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is at or beyond the capacity.
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.capacity, "bit index out of capacity");
        let mask = 1u64 << (index % WORD_BITS);
        if value {
            self.words[index / WORD_BITS] |= mask;
        } else {
            self.words[index / WORD_BITS] &= !mask;
        }
    }

    /// Returns the bit at `index`, or false if `index` is at or beyond the
    /// capacity.
    pub fn get(&self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }
        self.words[index / WORD_BITS] & (1u64 << (index % WORD_BITS)) != 0
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns true if no bit is set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Unions `other` into this set.
    ///
    /// # Panics
    ///
    /// Panics if the capacities differ. Callers merging sets of unknown
    /// provenance must compare [Self::capacity] first.
    pub fn or(&mut self, other: &Self) {
        assert_eq!(
            self.capacity, other.capacity,
            "cannot union bit-sets of different capacities"
        );
        for (word, other) in self.words.iter_mut().zip(other.words.iter()) {
            *word |= other;
        }
    }

    /// Returns an iterator over the indices of set bits, in increasing order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.capacity).filter(|index| self.get(*index))
    }

    /// Returns the encoded size of a set with the given capacity.
    pub fn encoded_size(capacity: usize) -> usize {
        capacity.div_ceil(8)
    }

    /// Serializes the set as `ceil(capacity / 8)` bytes.
    pub fn write(&self, buf: &mut impl BufMut) {
        for index in 0..Self::encoded_size(self.capacity) {
            let byte = (self.words[index / 8] >> ((index % 8) * 8)) as u8;
            buf.put_u8(byte);
        }
    }

    /// Deserializes a set of the given capacity.
    ///
    /// Fails if the buffer is short or if any bit past the capacity is set
    /// (a non-canonical encoding).
    pub fn read(buf: &mut impl Buf, capacity: usize) -> Result<Self, Error> {
        let size = Self::encoded_size(capacity);
        if buf.remaining() < size {
            return Err(Error::InvalidEncoding("bit-set truncated"));
        }
        let mut set = Self::new(capacity);
        for index in 0..size {
            let byte = buf.get_u8() as u64;
            set.words[index / 8] |= byte << ((index % 8) * 8);
        }
        if capacity % 8 != 0 {
            let last = set.words[(capacity - 1) / WORD_BITS];
            let spill = last >> (((capacity - 1) % WORD_BITS) + 1);
            if spill != 0 {
                return Err(Error::InvalidEncoding("bit-set has bits past capacity"));
            }
        }
        Ok(set)
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitSet[")?;
        for index in 0..self.capacity {
            write!(f, "{}", if self.get(index) { '1' } else { '0' })?;
        }
        write!(f, "]")
    }
}
