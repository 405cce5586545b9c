//! # Fixed-Capacity Skiplist
//!
//! A doubly linked skiplist ordered by `(virtual_deadline, pid)`, stored
//! in a fixed array so the scheduler never allocates. Slot 0 is a
//! permanent sentinel head; valid nodes live in `1..=NPROC`.
//!
//! All mutation is expected to happen under the table lock (see
//! `table::TaskTable`) — this type itself performs no locking.

use crate::config::{MAX_LEVEL, NPROC};
use crate::error::{DeleteError, InsertError};
use crate::rand::Xorshift32;

/// Sentinel meaning "no link" in a `forward`/`backward` slot.
const NONE: i32 = -1;

/// One skiplist node. Index 0 is always the sentinel head.
#[derive(Debug, Clone, Copy)]
struct Node {
    /// `false` for a free slot (head is always `true`).
    valid: bool,
    /// The task's virtual deadline at insertion time.
    value: i64,
    /// The task's pid; tie-breaker and identity.
    pid: i32,
    /// Highest level this node participates at.
    maxlevel: usize,
    forward: [i32; MAX_LEVEL],
    backward: [i32; MAX_LEVEL],
}

impl Node {
    const fn empty() -> Self {
        Self {
            valid: false,
            value: 0,
            pid: -1,
            maxlevel: 0,
            forward: [NONE; MAX_LEVEL],
            backward: [NONE; MAX_LEVEL],
        }
    }
}

/// The skiplist itself: `NPROC + 1` node slots and the PRNG used to draw
/// insertion levels.
pub struct Skiplist {
    nodes: [Node; NPROC + 1],
    /// Highest level at which any non-head node currently participates,
    /// or `-1` if the list has never been initialized. Delete does not
    /// lower this (spec §4.3/§9): a benign inefficiency.
    level: i32,
    rng: Xorshift32,
}

impl Skiplist {
    /// Build a freshly initialized, empty skiplist.
    pub const fn new() -> Self {
        let mut nodes = [Node::empty(); NPROC + 1];
        nodes[0].valid = true;
        nodes[0].value = -1;
        nodes[0].pid = -1;
        Self {
            nodes,
            level: 0,
            rng: Xorshift32::new(),
        }
    }

    /// Re-initialize the skiplist to the empty state described by
    /// `spec.md` §4.3 `init()`. `new()` already produces this state; this
    /// exists for symmetry with the spec and for tests that want to reset
    /// a populated list without reconstructing the PRNG.
    pub fn init(&mut self) {
        for node in self.nodes.iter_mut() {
            *node = Node::empty();
        }
        self.nodes[0].valid = true;
        self.nodes[0].value = -1;
        self.nodes[0].pid = -1;
        self.level = 0;
    }

    /// Highest level at which any non-head node currently participates.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Insert `(value, pid)`. See `spec.md` §4.3.
    pub fn insert(&mut self, value: i64, pid: i32) -> Result<(), InsertError> {
        let mut update = [0i32; MAX_LEVEL];
        let mut cur: i32 = 0;

        for l in (0..MAX_LEVEL).rev() {
            if (l as i32) > self.level {
                update[l] = 0;
                continue;
            }
            loop {
                let fwd = self.nodes[cur as usize].forward[l];
                if fwd == NONE {
                    break;
                }
                let fwd_node = &self.nodes[fwd as usize];
                if fwd_node.value < value {
                    cur = fwd;
                } else {
                    break;
                }
            }
            update[l] = cur;
        }

        // Duplicate-pid guard: the final predecessor itself may already hold
        // `pid` (its value is smaller than the new one), not just its
        // bottom-level successor (whose value would be larger or equal).
        if cur != 0 && self.nodes[cur as usize].valid && self.nodes[cur as usize].pid == pid {
            return Err(InsertError::DuplicatePid);
        }
        let succ = self.nodes[cur as usize].forward[0];
        if succ != NONE && self.nodes[succ as usize].valid && self.nodes[succ as usize].pid == pid
        {
            return Err(InsertError::DuplicatePid);
        }

        let new_level = self.rng.next_level();
        if (new_level as i32) > self.level {
            for l in (self.level + 1) as usize..=new_level {
                update[l] = 0;
            }
            self.level = new_level as i32;
        }

        let slot = match (1..=NPROC).find(|&i| !self.nodes[i].valid) {
            Some(i) => i,
            None => return Err(InsertError::Full),
        };

        self.nodes[slot] = Node {
            valid: true,
            value,
            pid,
            maxlevel: new_level,
            forward: [NONE; MAX_LEVEL],
            backward: [NONE; MAX_LEVEL],
        };

        for l in 0..=new_level {
            let pred = update[l];
            let succ = self.nodes[pred as usize].forward[l];
            self.nodes[slot].forward[l] = succ;
            self.nodes[slot].backward[l] = pred;
            if succ != NONE {
                self.nodes[succ as usize].backward[l] = slot as i32;
            }
            self.nodes[pred as usize].forward[l] = slot as i32;
        }

        Ok(())
    }

    /// Locate `(value, pid)`, returning its node slot index if present.
    /// Never mutates state.
    pub fn search(&self, value: i64, pid: i32) -> Option<usize> {
        let mut cur: i32 = 0;

        for l in (0..=self.level.max(0) as usize).rev() {
            loop {
                let fwd = self.nodes[cur as usize].forward[l];
                if fwd == NONE {
                    break;
                }
                let fwd_node = &self.nodes[fwd as usize];
                if fwd_node.valid && fwd_node.value < value {
                    cur = fwd;
                } else {
                    break;
                }
            }
        }

        // Walk the equal-value run at the bottom level looking for `pid`.
        let mut cand = self.nodes[cur as usize].forward[0];
        while cand != NONE {
            let node = &self.nodes[cand as usize];
            if !node.valid || node.value != value {
                break;
            }
            if node.pid == pid {
                return Some(cand as usize);
            }
            cand = node.forward[0];
        }
        None
    }

    /// Delete `(value, pid)`. See `spec.md` §4.3.
    pub fn delete(&mut self, value: i64, pid: i32) -> Result<(), DeleteError> {
        let idx = match self.search(value, pid) {
            Some(i) => i,
            None => return Err(DeleteError::NotFound),
        };

        let maxlevel = self.nodes[idx].maxlevel;
        for l in 0..=maxlevel {
            let back = self.nodes[idx].backward[l];
            let fwd = self.nodes[idx].forward[l];
            if back != NONE {
                self.nodes[back as usize].forward[l] = fwd;
            }
            if fwd != NONE {
                self.nodes[fwd as usize].backward[l] = back;
            }
        }

        self.nodes[idx] = Node::empty();
        Ok(())
    }

    /// The pid of the lowest-deadline runnable node, i.e. the head's
    /// level-0 successor, if any.
    pub fn front_pid(&self) -> Option<i32> {
        let fwd = self.nodes[0].forward[0];
        if fwd == NONE || !self.nodes[fwd as usize].valid {
            return None;
        }
        Some(self.nodes[fwd as usize].pid)
    }

    /// The `maxlevel` of the node holding `pid`, for schedlog reporting,
    /// or `-1` if `pid` is not currently in the skiplist at all (the
    /// caller is expected to pass the node's `(value, pid)` for an exact
    /// lookup when one is known; this scans for `pid` alone).
    pub fn maxlevel_of(&self, pid: i32) -> i32 {
        for i in 1..=NPROC {
            let node = &self.nodes[i];
            if node.valid && node.pid == pid {
                return node.maxlevel as i32;
            }
        }
        -1
    }

    /// Iterate the level-0 chain from the head, in ascending order. Used
    /// by tests to check global invariants.
    #[cfg(test)]
    pub fn level0_pids(&self) -> std::vec::Vec<i32> {
        let mut out = std::vec::Vec::new();
        let mut cur = self.nodes[0].forward[0];
        while cur != NONE {
            let node = &self.nodes[cur as usize];
            out.push(node.pid);
            cur = node.forward[0];
        }
        out
    }
}

impl Default for Skiplist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NPROC;

    #[test]
    fn insert_search_roundtrip() {
        let mut sl = Skiplist::new();
        sl.insert(100, 1).unwrap();
        assert!(sl.search(100, 1).is_some());
        sl.delete(100, 1).unwrap();
        assert!(sl.search(100, 1).is_none());
    }

    #[test]
    fn duplicate_pid_rejected() {
        let mut sl = Skiplist::new();
        sl.insert(100, 7).unwrap();
        assert_eq!(sl.insert(200, 7), Err(InsertError::DuplicatePid));
    }

    #[test]
    fn delete_not_found_is_noop() {
        let mut sl = Skiplist::new();
        assert_eq!(sl.delete(1, 1), Err(DeleteError::NotFound));
    }

    #[test]
    fn fifo_among_ties() {
        let mut sl = Skiplist::new();
        sl.insert(50, 1).unwrap();
        sl.insert(50, 2).unwrap();
        let pids = sl.level0_pids();
        let pos1 = pids.iter().position(|&p| p == 1).unwrap();
        let pos2 = pids.iter().position(|&p| p == 2).unwrap();
        assert!(pos1 < pos2);
    }

    #[test]
    fn capacity_is_respected() {
        let mut sl = Skiplist::new();
        for pid in 1..=NPROC as i32 {
            sl.insert(pid as i64, pid).unwrap();
        }
        assert_eq!(sl.insert(9999, NPROC as i32 + 1), Err(InsertError::Full));
    }

    #[test]
    fn ordering_is_maintained_after_mixed_ops() {
        let mut sl = Skiplist::new();
        let values = [30, 60, 90, 40, 20, 80, 70, 50, 10];
        for (pid, &v) in values.iter().enumerate() {
            sl.insert(v, pid as i32 + 1).unwrap();
        }
        sl.delete(90, 3).unwrap();
        sl.delete(20, 5).unwrap();

        let pids = sl.level0_pids();
        let mut last = i64::MIN;
        for pid in pids {
            let v = sl_value_of(&sl, pid);
            assert!(sl.search(v, pid).is_some());
            assert!(v >= last);
            last = v;
        }
    }

    fn sl_value_of(sl: &Skiplist, pid: i32) -> i64 {
        for i in 1..=NPROC {
            if sl.nodes[i].valid && sl.nodes[i].pid == pid {
                return sl.nodes[i].value;
            }
        }
        panic!("pid not found");
    }

    #[test]
    fn bidirectional_links_are_consistent() {
        let mut sl = Skiplist::new();
        for pid in 1..20 {
            sl.insert((pid * 7) as i64 % 53, pid).unwrap();
        }
        for i in 1..=NPROC {
            if !sl.nodes[i].valid {
                continue;
            }
            for l in 0..=sl.nodes[i].maxlevel {
                let fwd = sl.nodes[i].forward[l];
                if fwd != NONE {
                    assert_eq!(sl.nodes[fwd as usize].backward[l], i as i32);
                }
            }
        }
    }

    proptest::proptest! {
        #[test]
        fn property_ordering_and_uniqueness(
            ops in proptest::collection::vec((0i64..500, 1i32..(NPROC as i32 + 8), proptest::bool::ANY), 0..300)
        ) {
            let mut sl = Skiplist::new();
            let mut present = std::collections::BTreeSet::new();
            for (value, pid, do_insert) in ops {
                if do_insert {
                    match sl.insert(value, pid) {
                        Ok(()) => { present.insert(pid); }
                        Err(InsertError::DuplicatePid) => {
                            proptest::prop_assert!(present.contains(&pid));
                        }
                        Err(InsertError::Full) => {}
                    }
                } else if present.remove(&pid) {
                    // We don't track each pid's value, so just attempt a
                    // search-based delete: find whatever value this pid
                    // currently holds via a level-0 scan.
                    if let Some(v) = find_value(&sl, pid) {
                        sl.delete(v, pid).unwrap();
                    }
                }

                let pids = sl.level0_pids();
                let mut seen = std::collections::BTreeSet::new();
                for p in &pids {
                    proptest::prop_assert!(seen.insert(*p), "duplicate pid in skiplist");
                }
                let mut last = i64::MIN;
                for p in &pids {
                    let v = find_value(&sl, *p).unwrap();
                    proptest::prop_assert!(v >= last);
                    last = v;
                }
            }
        }
    }

    #[cfg(test)]
    fn find_value(sl: &Skiplist, pid: i32) -> Option<i64> {
        for i in 1..=NPROC {
            if sl.nodes[i].valid && sl.nodes[i].pid == pid {
                return Some(sl.nodes[i].value);
            }
        }
        None
    }
}
