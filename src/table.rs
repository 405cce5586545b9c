//! # Task Table
//!
//! The fixed-capacity array of TCBs plus the skiplist that ranks the
//! runnable subset of it, bundled behind the single global `table_lock`.
//! Every mutation to task state or skiplist membership happens through a
//! `TaskTable` method while the lock is held.

use crate::config::NPROC;
use crate::skiplist::Skiplist;
use crate::task::{Pid, TaskControlBlock, TaskState};

use lazy_static::lazy_static;
use spin::Mutex;

/// The task table: TCB array, ranking skiplist, and the small amount of
/// scheduler-wide bookkeeping (`nextpid`, the current task, schedlog
/// countdown) that `spec.md` §5 calls out as shared state guarded by
/// `table_lock`.
pub struct TaskTable {
    pub tasks: [TaskControlBlock; NPROC],
    pub skiplist: Skiplist,
    next_pid: Pid,
    /// Pid of the task presently dispatched on the (single) CPU, if any.
    pub current: Option<Pid>,
    /// Ticks of schedlog output remaining; `0` means logging is off.
    pub schedlog_remaining: u32,
}

impl TaskTable {
    /// Build an empty table: every slot `Unused`, skiplist initialized,
    /// pid allocation starting at 1.
    pub const fn new() -> Self {
        Self {
            tasks: [TaskControlBlock::empty(); NPROC],
            skiplist: Skiplist::new(),
            next_pid: 1,
            current: None,
            schedlog_remaining: 0,
        }
    }

    /// Draw the next pid. Pids are never reused while any task with that
    /// pid might still be referenced (a real allocator would need to
    /// wrap and skip live pids; `NPROC`-bounded demo workloads never wrap
    /// in practice).
    fn alloc_pid(&mut self) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    /// Index of the lowest-numbered free (`Unused`) slot, if any.
    pub fn find_free_slot(&self) -> Option<usize> {
        self.tasks.iter().position(|t| !t.is_used())
    }

    /// Locate the TCB for `pid`, if it is currently allocated.
    pub fn find_by_pid(&self, pid: Pid) -> Option<&TaskControlBlock> {
        self.tasks.iter().find(|t| t.is_used() && t.pid == pid)
    }

    /// Mutable counterpart of `find_by_pid`.
    pub fn find_by_pid_mut(&mut self, pid: Pid) -> Option<&mut TaskControlBlock> {
        self.tasks.iter_mut().find(|t| t.is_used() && t.pid == pid)
    }

    /// Allocate a fresh `Embryo` slot with a freshly drawn pid, or `None`
    /// if the table is full.
    pub fn allocate(&mut self) -> Option<Pid> {
        let slot = self.find_free_slot()?;
        let pid = self.alloc_pid();
        let tcb = &mut self.tasks[slot];
        tcb.pid = pid;
        tcb.state = TaskState::Embryo;
        Some(pid)
    }

    /// Highest index among non-`Unused` slots, for `schedlog`'s "ascending
    /// index up to the highest non-UNUSED slot" rule. `None` if the table
    /// is entirely empty.
    pub fn highest_used_index(&self) -> Option<usize> {
        self.tasks.iter().rposition(|t| t.is_used())
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// The single process-wide task table, guarded by `table_lock`.
    pub static ref TABLE: Mutex<TaskTable> = Mutex::new(TaskTable::new());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_assigns_distinct_pids() {
        let mut table = TaskTable::new();
        let a = table.allocate().unwrap();
        let b = table.allocate().unwrap();
        assert_ne!(a, b);
        assert_eq!(table.find_by_pid(a).unwrap().state, TaskState::Embryo);
    }

    #[test]
    fn allocate_fails_when_full() {
        let mut table = TaskTable::new();
        for _ in 0..NPROC {
            table.allocate().unwrap();
        }
        assert!(table.allocate().is_none());
    }

    #[test]
    fn highest_used_index_tracks_allocations() {
        let mut table = TaskTable::new();
        assert_eq!(table.highest_used_index(), None);
        table.allocate().unwrap();
        table.allocate().unwrap();
        assert_eq!(table.highest_used_index(), Some(1));
    }
}
