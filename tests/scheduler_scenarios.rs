//! Integration tests driving `scheduler.rs` + `table::TaskTable` against
//! the `arch::mock` backend, the way a trap handler would: advance the
//! mock tick source, call the scheduler's pure functions, and assert on
//! what the mock collaborators recorded. No real context switch ever
//! happens — these exercise the same bookkeeping the `#[cfg(test)]`
//! modules in `src/` cover, but from outside the crate, wired through the
//! `arch` trait objects rather than calling scheduler functions bare.

use bfsched::arch::mock::{MockAddressSpace, MockClock, MockFileTable, MockSwitch};
use bfsched::arch::TickSource;
use bfsched::config::{DEFAULT_QUANTUM, NPROC};
use bfsched::error::{ForkError, KillError, WaitError};
use bfsched::scheduler::{self, WaitOutcome};
use bfsched::table::TaskTable;
use bfsched::task::TaskState;

/// A full simulated trap-return: schedule, dispatch-log via the mock
/// switch, then hand control back.
fn dispatch_round(table: &mut TaskTable, clock: &MockClock, switch: &MockSwitch) -> Option<i32> {
    let pid = scheduler::schedule_one(table, clock.ticks())?;
    let sp = table.find_by_pid(pid).unwrap().stack_pointer;
    unsafe { switch.switch(core::ptr::null_mut(), &mut { sp } as *mut _) };
    Some(pid)
}

#[test]
fn s1_simple_fifo_round_robin() {
    let mut table = TaskTable::new();
    let clock = MockClock::new();
    let switch = MockSwitch::new();

    let a = scheduler::fork(&mut table, clock.ticks()).unwrap();
    let b = scheduler::fork(&mut table, clock.ticks()).unwrap();

    let first = dispatch_round(&mut table, &clock, &switch).unwrap();
    assert_eq!(first, a);
    assert_eq!(switch.switch_count(), 1);

    clock.advance(50);
    table.find_by_pid_mut(a).unwrap().ticks_left = 0;
    scheduler::yield_current(&mut table, clock.ticks());

    let second = dispatch_round(&mut table, &clock, &switch).unwrap();
    assert_eq!(second, b);
    assert_eq!(switch.switch_count(), 2);
}

#[test]
fn s2_lower_niceness_dispatches_first() {
    let mut table = TaskTable::new();
    let clock = MockClock::new();
    let switch = MockSwitch::new();

    let _normal = scheduler::nicefork(&mut table, clock.ticks(), 0).unwrap();
    let favored = scheduler::nicefork(&mut table, clock.ticks(), -20).unwrap();

    let dispatched = dispatch_round(&mut table, &clock, &switch).unwrap();
    assert_eq!(dispatched, favored);
}

#[test]
fn s3_fork_rejects_out_of_range_niceness() {
    let mut table = TaskTable::new();
    let clock = MockClock::new();
    assert_eq!(
        scheduler::nicefork(&mut table, clock.ticks(), 100),
        Err(ForkError::NiceOutOfRange)
    );
    assert_eq!(
        scheduler::nicefork(&mut table, clock.ticks(), -21),
        Err(ForkError::NiceOutOfRange)
    );
}

#[test]
fn s4_table_full_rejects_further_forks() {
    let mut table = TaskTable::new();
    let clock = MockClock::new();
    for _ in 0..NPROC {
        scheduler::fork(&mut table, clock.ticks()).unwrap();
    }
    assert_eq!(
        scheduler::fork(&mut table, clock.ticks()),
        Err(ForkError::TableFull)
    );
}

#[test]
fn s5_sleep_wakeup_cycle_through_chan() {
    let mut table = TaskTable::new();
    let clock = MockClock::new();
    let switch = MockSwitch::new();

    let a = scheduler::fork(&mut table, clock.ticks()).unwrap();
    dispatch_round(&mut table, &clock, &switch);
    assert_eq!(table.current, Some(a));

    scheduler::sleep(&mut table, 42);
    assert_eq!(table.find_by_pid(a).unwrap().state, TaskState::Sleeping);
    assert!(dispatch_round(&mut table, &clock, &switch).is_none());

    scheduler::wakeup(&mut table, 42);
    let resumed = dispatch_round(&mut table, &clock, &switch).unwrap();
    assert_eq!(resumed, a);
}

#[test]
fn s6_kill_wakes_a_sleeping_task() {
    let mut table = TaskTable::new();
    let clock = MockClock::new();
    let switch = MockSwitch::new();

    let a = scheduler::fork(&mut table, clock.ticks()).unwrap();
    dispatch_round(&mut table, &clock, &switch);
    scheduler::sleep(&mut table, 7);

    scheduler::kill(&mut table, a).unwrap();
    assert!(table.find_by_pid(a).unwrap().killed);
    assert_eq!(table.find_by_pid(a).unwrap().state, TaskState::Runnable);

    assert_eq!(
        scheduler::kill(&mut table, 999),
        Err(KillError::NoSuchPid)
    );
}

/// Models a full `exit`/`wait` handshake the way `kernel::exit`/
/// `kernel::wait` would drive it: close files and switch to the kernel
/// address space before the bookkeeping transition, and retry `wait`
/// across a `Blocked` outcome the way the trap-return loop does.
#[test]
fn exit_and_wait_handshake_drives_the_mock_collaborators() {
    let mut table = TaskTable::new();
    let clock = MockClock::new();
    let switch = MockSwitch::new();
    let addr_space = MockAddressSpace::new();
    let file_table = MockFileTable::new();

    let parent = scheduler::fork(&mut table, clock.ticks()).unwrap();
    dispatch_round(&mut table, &clock, &switch);
    assert_eq!(table.current, Some(parent));

    let child = scheduler::fork(&mut table, clock.ticks()).unwrap();

    // parent calls wait() before the child has exited: blocks.
    let outcome = scheduler::wait(&mut table, parent).unwrap();
    assert_eq!(outcome, WaitOutcome::Blocked);
    assert_eq!(table.current, None);

    // child gets dispatched, then exits.
    let dispatched_child = dispatch_round(&mut table, &clock, &switch).unwrap();
    assert_eq!(dispatched_child, child);

    file_table.close_all(child);
    addr_space.switch_to_kernel();
    scheduler::exit(&mut table);
    assert!(file_table.was_closed(child));
    assert_eq!(addr_space.active(), None);

    // parent retries wait() and reaps the now-zombie child.
    let outcome = scheduler::wait(&mut table, parent).unwrap();
    assert_eq!(outcome, WaitOutcome::Reaped(child));

    // no more children: a third call fails.
    assert_eq!(scheduler::wait(&mut table, parent), Err(WaitError::NoChildren));
}

#[test]
fn quantum_is_preserved_across_a_voluntary_yield() {
    let mut table = TaskTable::new();
    let clock = MockClock::new();
    let switch = MockSwitch::new();

    let a = scheduler::fork(&mut table, clock.ticks()).unwrap();
    dispatch_round(&mut table, &clock, &switch);
    let deadline_before = table.find_by_pid(a).unwrap().virtual_deadline;

    // ticks_left is nonzero (just dispatched): a voluntary yield must not
    // renew the deadline.
    assert!(table.find_by_pid(a).unwrap().ticks_left > 0);
    scheduler::yield_current(&mut table, clock.ticks());
    assert_eq!(table.find_by_pid(a).unwrap().virtual_deadline, deadline_before);

    // re-dispatch preserves the remaining quantum rather than resetting it.
    let ticks_left_before = table.find_by_pid(a).unwrap().ticks_left;
    dispatch_round(&mut table, &clock, &switch);
    assert_eq!(table.find_by_pid(a).unwrap().ticks_left, ticks_left_before);
    assert_ne!(ticks_left_before, 0);
    let _ = DEFAULT_QUANTUM;
}

#[test]
fn exit_reparents_surviving_children_to_pid_one() {
    let mut table = TaskTable::new();
    let clock = MockClock::new();
    let switch = MockSwitch::new();

    let parent = scheduler::fork(&mut table, clock.ticks()).unwrap();
    dispatch_round(&mut table, &clock, &switch);
    let child = scheduler::fork(&mut table, clock.ticks()).unwrap();

    scheduler::exit(&mut table);

    assert_eq!(table.find_by_pid(child).unwrap().parent, Some(1));
    assert_eq!(table.find_by_pid(parent).unwrap().state, TaskState::Zombie);
}
