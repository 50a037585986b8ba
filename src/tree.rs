//! Logical binomial tree over the id space.
//!
//! Every node views the population as a binary partition of the id space
//! anchored at its own id: level `k` holds the nodes whose ids share the
//! first `bitsize - k` bits with the anchor and differ at bit `k - 1` (the
//! "sibling" half at that depth). Levels start at one and end at the bit
//! length of the id space, and each level's candidate set is a contiguous
//! interval of ids, so it can be computed by bisecting on the anchor's bits
//! without materializing the tree.

use crate::types::Error;
use std::ops::Range;

/// Computes per-level candidate ranges from the viewpoint of one anchor id.
#[derive(Clone, Debug)]
pub struct CandidateTree {
    id: u32,
    size: u32,
    bitsize: u32,
}

impl CandidateTree {
    /// Creates a tree over `size` ids anchored at `id`.
    pub fn new(id: u32, size: u32) -> Self {
        Self {
            id,
            size,
            bitsize: log2(size),
        }
    }

    /// Returns the number of levels (the bit length of the id space).
    pub fn bitsize(&self) -> u32 {
        self.bitsize
    }

    /// Returns the interval of ids that are candidates at the given level.
    ///
    /// Walks the anchor's bits from the most significant down to bit
    /// `level - 1`, keeping the half containing the anchor at every step but
    /// the last, where the choice is inverted to select the sibling half.
    pub fn full_range(&self, level: u32) -> Result<Range<u32>, Error> {
        if level < 1 || level > self.bitsize {
            return Err(Error::InvalidLevel(level));
        }

        let mut min = 0;
        let mut max = self.size;
        let last = level - 1;
        for index in (last..self.bitsize).rev() {
            let middle = (min + max) / 2;
            if is_set(self.id, index) {
                if index == last {
                    max = middle;
                } else {
                    min = middle;
                }
            } else if index == last {
                min = middle;
            } else {
                max = middle;
            }
            if min == max || max == 1 || min == self.size {
                break;
            }
        }
        Ok(min..max)
    }
}

/// Returns the bit length of an id space of `n` members (0 for n <= 1).
pub(crate) fn log2(n: u32) -> u32 {
    match n {
        0 | 1 => 0,
        n => 32 - (n - 1).leading_zeros(),
    }
}

/// Returns true if bit `index` of `nb` is one.
fn is_set(nb: u32, index: u32) -> bool {
    (nb >> index) & 1 == 1
}
