//! # Scheduler
//!
//! The earliest-virtual-deadline dispatch loop and the lifecycle
//! operations (`fork`/`yield`/`sleep`/`wakeup`/`exit`/`wait`/`kill`) that
//! drive task state transitions. Every function here takes `&mut
//! TaskTable` and assumes the caller already holds `table_lock` — these
//! are the bookkeeping bodies of the syscalls `kernel` exposes, kept free
//! of any dependency on the arch layer so they can be driven directly by
//! tests without a real tick source or context switch.

use crate::config::DEFAULT_QUANTUM;
use crate::error::{ForkError, KillError, WaitError};
use crate::table::TaskTable;
use crate::task::{compute_virtual_deadline, validate_niceness, Pid, TaskState};

/// Outcome of a `wait` call: either a zombie child was reaped immediately,
/// or the caller has living children and has been put to sleep awaiting
/// one of them to exit. `spec.md` §4.5 describes `wait` as blocking; since
/// this core models state transitions synchronously, the "go to sleep and
/// retry" half of that behaviour is surfaced explicitly here instead of
/// looping internally, so `kernel`'s trap-return path can drive the retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A zombie child was found and reaped; carries its pid.
    Reaped(Pid),
    /// No zombie child was ready; the caller is now `Sleeping` on its own
    /// pid as a wait channel and will be woken by the next `exit`.
    Blocked,
}

/// Reconcile skiplist membership with the task table (`spec.md` §4.4 step
/// 2): insert newly `Runnable` tasks, remove anything that is no longer
/// `Runnable`.
pub fn reconcile(table: &mut TaskTable) {
    for i in 0..table.tasks.len() {
        let (pid, state, deadline) = {
            let t = &table.tasks[i];
            (t.pid, t.state, t.virtual_deadline)
        };
        match state {
            TaskState::Unused => {}
            TaskState::Runnable => {
                if table.skiplist.search(deadline, pid).is_none() {
                    // Benign if Full: left for the next iteration per §4.7.
                    let _ = table.skiplist.insert(deadline, pid);
                }
            }
            _ => {
                if table.skiplist.search(deadline, pid).is_some() {
                    let _ = table.skiplist.delete(deadline, pid);
                }
            }
        }
        table.tasks[i].maxlevel = table.skiplist.maxlevel_of(pid);
    }
}

/// Run one dispatch round of the scheduler loop (`spec.md` §4.4 steps
/// 2-5). Reconciles, then picks and removes the earliest-deadline task
/// from the skiplist, marking it `Running`. Returns the dispatched pid,
/// or `None` if nothing is runnable (the caller should idle-spin).
///
/// `now` is the current tick count, used only to decide whether the
/// dispatched task's quantum needs resetting (§9: "preserve unless
/// exhausted").
pub fn schedule_one(table: &mut TaskTable, now: u64) -> Option<Pid> {
    reconcile(table);

    let pid = table.skiplist.front_pid()?;
    let deadline = table.find_by_pid(pid)?.virtual_deadline;
    let maxlevel = table.skiplist.maxlevel_of(pid);
    table
        .skiplist
        .delete(deadline, pid)
        .expect("front_pid must be present in the skiplist");

    let tcb = table
        .find_by_pid_mut(pid)
        .expect("dispatched pid must still be allocated");
    TaskState::validate_transition(tcb.state, TaskState::Running)
        .expect("reconcile only dispatches Runnable tasks");
    tcb.state = TaskState::Running;
    if tcb.ticks_left == 0 {
        tcb.ticks_left = DEFAULT_QUANTUM;
    }
    tcb.maxlevel = maxlevel;
    table.current = Some(pid);
    crate::schedlog::maybe_emit(table, now);
    Some(pid)
}

/// Voluntary or quantum-exhaustion preemption (`spec.md` §4.5 `yield`).
/// Renews the virtual deadline only when the quantum is exhausted.
pub fn yield_current(table: &mut TaskTable, now: u64) {
    let Some(pid) = table.current else { return };
    let Some(tcb) = table.find_by_pid_mut(pid) else {
        return;
    };
    if tcb.ticks_left == 0 {
        tcb.virtual_deadline = compute_virtual_deadline(now, tcb.niceness);
    }
    TaskState::validate_transition(tcb.state, TaskState::Runnable)
        .expect("yield is only called from Running");
    tcb.state = TaskState::Runnable;
    table.current = None;
}

/// Block the current task on `chan` (`spec.md` §4.5 `sleep`). The caller
/// is expected to have already released whatever resource `chan`
/// represents; under this core's model that release is implicit in
/// dropping `table_lock` at the syscall boundary.
pub fn sleep(table: &mut TaskTable, chan: usize) {
    let Some(pid) = table.current else { return };
    let Some(tcb) = table.find_by_pid_mut(pid) else {
        return;
    };
    TaskState::validate_transition(tcb.state, TaskState::Sleeping)
        .expect("sleep is only called from Running");
    tcb.state = TaskState::Sleeping;
    tcb.chan = Some(chan);
    table.current = None;
}

/// Wake every `Sleeping` task blocked on `chan` (`spec.md` §4.5
/// `wakeup`). Reconciliation on the next scheduler round re-inserts them.
pub fn wakeup(table: &mut TaskTable, chan: usize) {
    for tcb in table.tasks.iter_mut() {
        if tcb.state == TaskState::Sleeping && tcb.chan == Some(chan) {
            tcb.state = TaskState::Runnable;
            tcb.chan = None;
        }
    }
}

/// Create a child of the current task with the given niceness
/// (`spec.md` §4.1/§6 `nicefork`). Rejects niceness outside
/// `[NICE_FIRST, NICE_LAST]` before allocating, per §4.1.
pub fn nicefork(table: &mut TaskTable, now: u64, niceness: i32) -> Result<Pid, ForkError> {
    if !validate_niceness(niceness) {
        return Err(ForkError::NiceOutOfRange);
    }
    let parent = table.current;
    let pid = table.allocate().ok_or(ForkError::TableFull)?;
    let tcb = table
        .find_by_pid_mut(pid)
        .expect("allocate just populated this pid");
    tcb.niceness = niceness;
    tcb.virtual_deadline = compute_virtual_deadline(now, niceness);
    tcb.ticks_left = 0;
    tcb.parent = parent;
    TaskState::validate_transition(tcb.state, TaskState::Runnable)
        .expect("a freshly allocated task is always Embryo");
    tcb.state = TaskState::Runnable;
    Ok(pid)
}

/// `fork` is `nicefork` at the default niceness of `0` (`spec.md` §6).
pub fn fork(table: &mut TaskTable, now: u64) -> Result<Pid, ForkError> {
    nicefork(table, now, 0)
}

/// Mark the current task `Zombie` (`spec.md` §4.5 `exit`): reparents
/// living children to pid `1` (the `init` convention), wakes a parent
/// blocked in `wait`, and transitions self. Closing file descriptors and
/// releasing the address space are the caller's responsibility via the
/// `FileTable`/`AddressSpace` collaborators (`spec.md` §6) — out of scope
/// for this bookkeeping step.
pub fn exit(table: &mut TaskTable) {
    let Some(pid) = table.current else { return };

    for tcb in table.tasks.iter_mut() {
        if tcb.is_used() && tcb.parent == Some(pid) {
            tcb.parent = Some(1);
        }
    }

    if let Some(parent_pid) = table.find_by_pid(pid).and_then(|t| t.parent) {
        wakeup(table, parent_pid as usize);
    }

    let Some(tcb) = table.find_by_pid_mut(pid) else {
        return;
    };
    TaskState::validate_transition(tcb.state, TaskState::Zombie)
        .expect("exit is only called from Running");
    tcb.state = TaskState::Zombie;
    table.current = None;
}

/// Reap one zombie child of `caller`, or block the caller on its own pid
/// as a wait channel if it has living children but none have exited yet
/// (`spec.md` §4.5 `wait`). Fails with `NoChildren` if `caller` has no
/// children at all, living or dead.
pub fn wait(table: &mut TaskTable, caller: Pid) -> Result<WaitOutcome, WaitError> {
    let mut any_children = false;
    let mut zombie_slot = None;
    for i in 0..table.tasks.len() {
        let tcb = &table.tasks[i];
        if tcb.is_used() && tcb.parent == Some(caller) {
            any_children = true;
            if tcb.state == TaskState::Zombie {
                zombie_slot = Some(i);
                break;
            }
        }
    }

    if !any_children {
        return Err(WaitError::NoChildren);
    }

    if let Some(i) = zombie_slot {
        let reaped_pid = table.tasks[i].pid;
        TaskState::validate_transition(table.tasks[i].state, TaskState::Unused)
            .expect("only a Zombie slot is reaped");
        table.tasks[i] = crate::task::TaskControlBlock::empty();
        return Ok(WaitOutcome::Reaped(reaped_pid));
    }

    // Block directly on `caller` rather than delegating to `sleep`, which
    // reads `table.current` — `wait` already knows exactly which task is
    // blocking and must not assume it is the currently dispatched one.
    let tcb = table
        .find_by_pid_mut(caller)
        .expect("caller must be allocated to call wait");
    TaskState::validate_transition(tcb.state, TaskState::Sleeping)
        .expect("wait only blocks a Running caller");
    tcb.state = TaskState::Sleeping;
    tcb.chan = Some(caller as usize);
    if table.current == Some(caller) {
        table.current = None;
    }
    Ok(WaitOutcome::Blocked)
}

/// Signal `pid` (`spec.md` §4.5 `kill`): sets `killed`, cooperatively
/// observed at the target's next user-mode return; additionally forces a
/// `Sleeping` target to `Runnable` so it gets the chance to observe the
/// flag (§9: a `Running` target is not preempted out-of-band).
pub fn kill(table: &mut TaskTable, pid: Pid) -> Result<(), KillError> {
    let tcb = table.find_by_pid_mut(pid).ok_or(KillError::NoSuchPid)?;
    tcb.killed = true;
    if tcb.state == TaskState::Sleeping {
        TaskState::validate_transition(tcb.state, TaskState::Runnable)
            .expect("Sleeping -> Runnable is always legal");
        tcb.state = TaskState::Runnable;
        tcb.chan = None;
    }
    Ok(())
}
