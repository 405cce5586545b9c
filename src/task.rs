//! # Task Control Block
//!
//! Defines the per-process state the scheduler reasons about: identity,
//! lifecycle state, niceness, virtual deadline, and the bookkeeping
//! `fork`/`exit`/`wait`/`sleep`/`wakeup`/`kill` need.
//!
//! ## Deadline Model
//!
//! Unlike a fixed-priority or round-robin scheduler, a task's position in
//! the run queue is its *virtual deadline*: an absolute tick value at
//! which its current slice would ideally end. Smaller deadlines run
//! first. Niceness only influences how far into the future a freshly
//! computed deadline lands — see `prio_ratio`.

use crate::config::{DEFAULT_QUANTUM, NICE_FIRST, NICE_LAST, STACK_SIZE, TASK_NAME_LEN};

/// A process identifier. Always positive while allocated; `0`/negative
/// are reserved (the sentinel skiplist head uses `-1`).
pub type Pid = i32;

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Execution state of a task.
///
/// ```text
///   Unused  ── allocproc ──► Embryo
///   Embryo  ── userinit/fork ──► Runnable
///   Runnable ── dispatch ──► Running
///   Running ── yield/preempt ──► Runnable
///   Running ── sleep ──► Sleeping
///   Running ── exit ──► Zombie
///   Sleeping ── wakeup/kill ──► Runnable
///   Zombie  ── wait reaps ──► Unused
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Free slot; no process occupies it.
    Unused,
    /// Allocated but not yet runnable (mid-`fork`/`userinit`).
    Embryo,
    /// Blocked on a sleep channel.
    Sleeping,
    /// Eligible to run; present in the skiplist.
    Runnable,
    /// Currently executing on a CPU.
    Running,
    /// Exited; awaiting reap by `wait`.
    Zombie,
}

/// A state transition the state machine does not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: TaskState,
    pub to: TaskState,
}

impl TaskState {
    /// Check a transition against the diagram above without performing
    /// it. Every state write the scheduler makes goes through this, so an
    /// invariant violation surfaces as an explicit error instead of a
    /// silent bad state.
    pub fn validate_transition(from: TaskState, to: TaskState) -> Result<(), InvalidTransition> {
        use TaskState::*;
        if from == to {
            return Ok(());
        }
        let ok = matches!(
            (from, to),
            (Unused, Embryo)
                | (Embryo, Runnable)
                | (Runnable, Running)
                | (Running, Runnable)
                | (Running, Sleeping)
                | (Running, Zombie)
                | (Sleeping, Runnable)
                | (Zombie, Unused)
        );
        if ok {
            Ok(())
        } else {
            Err(InvalidTransition { from, to })
        }
    }
}

// ---------------------------------------------------------------------------
// Deadline & quantum arithmetic
// ---------------------------------------------------------------------------

/// Convert a niceness value into the positive multiplier used to compute
/// a virtual deadline. Higher niceness means a later deadline, i.e. lower
/// effective priority.
///
/// `niceness` must already be within `[NICE_FIRST, NICE_LAST]`; callers
/// (`nicefork`) are responsible for rejecting out-of-range values before
/// this is called.
pub fn prio_ratio(niceness: i32) -> u32 {
    debug_assert!((NICE_FIRST..=NICE_LAST).contains(&niceness));
    (niceness - NICE_FIRST + 1) as u32
}

/// Compute the virtual deadline for a task with the given niceness,
/// dispatched/renewed at `now`.
pub fn compute_virtual_deadline(now: u64, niceness: i32) -> i64 {
    now as i64 + (prio_ratio(niceness) as i64) * (DEFAULT_QUANTUM as i64)
}

/// Reject niceness values outside the legal range, as `nicefork` must.
pub fn validate_niceness(niceness: i32) -> bool {
    (NICE_FIRST..=NICE_LAST).contains(&niceness)
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Per-process control block. Stored inline in a fixed-size array by
/// `table::TaskTable` — no heap allocation.
#[derive(Clone, Copy)]
pub struct TaskControlBlock {
    /// Unique pid while `state != Unused`; `0` when free.
    pub pid: Pid,
    /// Current lifecycle state.
    pub state: TaskState,
    /// Niceness in `[NICE_FIRST, NICE_LAST]`.
    pub niceness: i32,
    /// Absolute tick value at which this task's current slice should end.
    pub virtual_deadline: i64,
    /// Ticks remaining in the current quantum.
    pub ticks_left: u32,
    /// Level this task's node participates at in the skiplist, or `-1`
    /// if not currently present. Populated by the scheduler on insert,
    /// read back only for schedlog reporting.
    pub maxlevel: i32,
    /// Set by `kill`; observed cooperatively at the next user-mode return.
    pub killed: bool,
    /// Pid of the parent, if any. `None` for `init` and free slots.
    pub parent: Option<Pid>,
    /// Sleep channel; `Some` only while `state == Sleeping`.
    pub chan: Option<usize>,
    /// Cosmetic debug name, used only by the schedlog emitter.
    pub name: [u8; TASK_NAME_LEN],
    /// Saved stack pointer (PSP), written/read by the `ContextSwitch`
    /// backend. Points into `self.stack`.
    pub stack_pointer: *mut u32,
    /// Per-task stack memory. The `ContextSwitch` backend is responsible
    /// for 8-byte-aligning the frame it carves out of this buffer, as
    /// ARM AAPCS requires.
    pub stack: [u8; STACK_SIZE],
}

// Safety: `stack_pointer` always points into this TCB's own `stack`
// array, and all access to a TCB happens while `table_lock` is held.
unsafe impl Send for TaskControlBlock {}
unsafe impl Sync for TaskControlBlock {}

impl TaskControlBlock {
    /// Construct a free (`Unused`) slot.
    pub const fn empty() -> Self {
        Self {
            pid: 0,
            state: TaskState::Unused,
            niceness: 0,
            virtual_deadline: 0,
            ticks_left: 0,
            maxlevel: -1,
            killed: false,
            parent: None,
            chan: None,
            name: [0u8; TASK_NAME_LEN],
            stack_pointer: core::ptr::null_mut(),
            stack: [0u8; STACK_SIZE],
        }
    }

    /// Whether this slot currently holds a live process.
    #[inline]
    pub fn is_used(&self) -> bool {
        self.state != TaskState::Unused
    }

    /// Set `name` from a byte slice, truncating to `TASK_NAME_LEN` and
    /// zero-padding the rest.
    pub fn set_name(&mut self, name: &[u8]) {
        let n = name.len().min(TASK_NAME_LEN);
        self.name = [0u8; TASK_NAME_LEN];
        self.name[..n].copy_from_slice(&name[..n]);
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
