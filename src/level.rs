//! Per-level send/receive state.

use crate::registry::Identity;

/// Send/receive bookkeeping for one level of the candidate tree.
///
/// Level 1 starts active in both directions: the node trivially holds its
/// own contribution, which is all a level-1 exchange carries. Higher levels
/// are activated by the periodic timeout schedule or by completing the
/// levels below them.
pub struct Level<P> {
    /// The level's index, starting at one.
    pub id: u32,
    /// Candidate peers for this level, in id order.
    pub candidates: Vec<Identity<P>>,
    /// Whether dissemination at this level has been activated. Never
    /// cleared once set.
    pub send_started: bool,
    /// Whether a full aggregate for this level's interval has been
    /// received. Informational; admission does not depend on it.
    pub rcv_completed: bool,

    // Cursor into candidates; wraps.
    send_pos: usize,
    // Sends attempted with the current best aggregate.
    send_peers_ct: usize,
    // Cardinality of the best aggregate dispatched at this level so far.
    send_sig_size: usize,
}

impl<P: Clone> Level<P> {
    /// Creates the state for level `id` with the given candidates.
    pub fn new(id: u32, candidates: Vec<Identity<P>>) -> Self {
        Self {
            id,
            candidates,
            send_started: id == 1,
            rcv_completed: id == 1,
            send_pos: 0,
            send_peers_ct: 0,
            send_sig_size: 0,
        }
    }

    /// Returns up to `min(count, candidates)` peers starting at the cursor,
    /// advancing and wrapping it.
    pub fn pick_next(&mut self, count: usize) -> Vec<Identity<P>> {
        let total = self.candidates.len();
        if total == 0 {
            return Vec::new();
        }
        let picked = count.min(total);
        let mut peers = Vec::with_capacity(picked);
        for _ in 0..picked {
            peers.push(self.candidates[self.send_pos].clone());
            self.send_pos = (self.send_pos + 1) % total;
        }
        self.send_peers_ct += picked;
        peers
    }

    /// Returns true once every candidate has been contacted with the
    /// current best aggregate; further sends are pointless until a better
    /// one arrives.
    pub fn exhausted(&self) -> bool {
        self.send_peers_ct >= self.candidates.len()
    }

    /// Records that the aggregate available for dissemination at this level
    /// now has the given cardinality.
    ///
    /// A no-op unless the cardinality strictly improves on the best already
    /// dispatched; an improvement resets the send budget. Returns true when
    /// the improvement completes the level's interval, in which case the
    /// level is activated and the caller should dispatch immediately.
    pub fn update_sig_to_send(&mut self, cardinality: usize) -> bool {
        if cardinality <= self.send_sig_size {
            return false;
        }
        self.send_sig_size = cardinality;
        self.send_peers_ct = 0;
        if cardinality == self.candidates.len() {
            self.send_started = true;
            return true;
        }
        false
    }
}
