//! # Kernel
//!
//! The syscall surface: thin wrappers that lock `table::TABLE`, read `now`
//! from a `TickSource`, and delegate to the pure bookkeeping in
//! `scheduler.rs`. This is the only module that talks to the `arch` trait
//! objects — `scheduler.rs`/`table.rs` know nothing about context
//! switching, address spaces, or file descriptors.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()        ← Seed the task table, spawn init
//!         └─► kernel::start()       ← Launch scheduler (no return)
//!               ├─► Configure SysTick
//!               ├─► Set interrupt priorities
//!               └─► Enter the first task via ContextSwitch::enter_first
//! ```

#[cfg(target_os = "none")]
use crate::arch::{AddressSpace, ContextSwitch, FileTable};
use crate::arch::TickSource;
use crate::error::{ForkError, KillError, WaitError};
use crate::schedlog;
use crate::scheduler;
#[cfg(target_os = "none")]
use crate::scheduler::WaitOutcome;
#[cfg(target_os = "none")]
use crate::sync;
use crate::table::TABLE;
use crate::task::Pid;

/// Spawn the first process (`spec.md` §6's implicit `userinit`), running
/// `entry` once dispatched. Must be called exactly once, before `start`.
///
/// Only built for the bare-metal target: it drives the real
/// `arch::cortex_m4` stack-frame layout, which has no meaning on the
/// hosted `arch::mock` backend used by tests.
#[cfg(target_os = "none")]
pub fn init<T: TickSource>(tick_source: &T, entry: extern "C" fn() -> !) -> Pid {
    spawn(tick_source, entry, 0, b"init").expect("the task table is empty at boot, fork cannot fail")
}

/// Start the scheduler. **Does not return.** Configures the SysTick timer,
/// sets interrupt priorities, and enters the first task.
///
/// # Safety
/// `init()` must have already spawned at least one task, and this must be
/// called exactly once from the reset handler's thread, never from an ISR.
#[cfg(target_os = "none")]
pub unsafe fn start<C: ContextSwitch>(
    mut core_peripherals: cortex_m::Peripherals,
    ctx_switch: &C,
) -> ! {
    crate::arch::cortex_m4::configure_systick(&mut core_peripherals.SYST);
    crate::arch::cortex_m4::set_interrupt_priorities();

    let first_sp = sync::critical_section(|_cs| {
        let mut table = TABLE.lock();
        loop {
            if let Some(pid) = scheduler::schedule_one(&mut table, 0) {
                return table
                    .find_by_pid(pid)
                    .expect("just-dispatched pid is allocated")
                    .stack_pointer;
            }
            // No runnable task yet; `init()` is required to have forked
            // one, so this should be unreachable outside of a caller bug.
        }
    });

    ctx_switch.enter_first(first_sp)
}

/// Voluntarily yield the CPU (`spec.md` §6 `yield`).
#[cfg(target_os = "none")]
pub fn yield_task<T: TickSource>(tick_source: &T) {
    sync::critical_section(|_cs| {
        let mut table = TABLE.lock();
        scheduler::yield_current(&mut table, tick_source.ticks());
    });
    crate::arch::cortex_m4::trigger_pendsv();
}

/// Create a child of the calling task at the default niceness (`spec.md`
/// §6 `fork`).
pub fn fork<T: TickSource>(tick_source: &T) -> Result<Pid, ForkError> {
    let mut table = TABLE.lock();
    scheduler::fork(&mut table, tick_source.ticks())
}

/// Create a child of the calling task at an explicit niceness (`spec.md`
/// §6 `nicefork`).
pub fn nicefork<T: TickSource>(tick_source: &T, niceness: i32) -> Result<Pid, ForkError> {
    let mut table = TABLE.lock();
    scheduler::nicefork(&mut table, tick_source.ticks(), niceness)
}

/// Create a task that will start executing at `entry` on its first
/// dispatch. Combines `nicefork`'s table bookkeeping with the
/// architecture-specific stack-frame setup (`spec.md` §3 EXPANDED:
/// `stack_pointer`/`stack` are owned by the TCB, populated by the
/// `ContextSwitch` backend). Only meaningful for the real hardware
/// backend — `arch::mock` never actually jumps into a stack frame.
#[cfg(target_os = "none")]
pub fn spawn<T: TickSource>(
    tick_source: &T,
    entry: extern "C" fn() -> !,
    niceness: i32,
    name: &[u8],
) -> Result<Pid, ForkError> {
    let pid = nicefork(tick_source, niceness)?;
    sync::critical_section(|_cs| {
        let mut table = TABLE.lock();
        let tcb = table
            .find_by_pid_mut(pid)
            .expect("just-forked pid is allocated");
        tcb.set_name(name);
        crate::arch::cortex_m4::init_task_stack(tcb, entry);
    });
    Ok(pid)
}

/// Terminate the calling task (`spec.md` §6 `exit`). Releases its files
/// and address space via the collaborators before marking it `Zombie`,
/// triggers a context switch, and spins until the (now-pending) PendSV
/// actually takes this task off the CPU — it never returns to its
/// caller.
///
/// # Safety
/// As with `start`, must only be called from thread mode.
#[cfg(target_os = "none")]
pub unsafe fn exit<A, F>(addr_space: &A, file_table: &F) -> !
where
    A: AddressSpace,
    F: FileTable,
{
    let exiting = sync::critical_section(|_cs| TABLE.lock().current);
    if let Some(pid) = exiting {
        file_table.close_all(pid);
        addr_space.switch_to_kernel();
    }
    sync::critical_section(|_cs| {
        let mut table = TABLE.lock();
        scheduler::exit(&mut table);
    });
    crate::arch::cortex_m4::trigger_pendsv();
    loop {
        cortex_m::asm::wfi();
    }
}

/// Reap one zombie child, or block until one appears (`spec.md` §6
/// `wait`). The retry loop here is what `scheduler::WaitOutcome::Blocked`
/// defers to this layer: each iteration yields the CPU and re-checks.
#[cfg(target_os = "none")]
pub fn wait<T: TickSource>(tick_source: &T, caller: Pid) -> Result<Pid, WaitError> {
    loop {
        let outcome = sync::critical_section(|_cs| {
            let mut table = TABLE.lock();
            scheduler::wait(&mut table, caller)
        })?;
        match outcome {
            WaitOutcome::Reaped(pid) => return Ok(pid),
            WaitOutcome::Blocked => yield_task(tick_source),
        }
    }
}

/// Signal a process (`spec.md` §6 `kill`).
pub fn kill(pid: Pid) -> Result<(), KillError> {
    let mut table = TABLE.lock();
    scheduler::kill(&mut table, pid)
}

/// Put the calling task to sleep on `chan` (`spec.md` §6 `sleep`,
/// generalized beyond the `wait`-only use above for timers and other
/// blocking waits).
#[cfg(target_os = "none")]
pub fn sleep<T: TickSource>(tick_source: &T, chan: usize) {
    sync::critical_section(|_cs| {
        let mut table = TABLE.lock();
        scheduler::sleep(&mut table, chan);
    });
    yield_task(tick_source);
}

/// Wake every task sleeping on `chan` (`spec.md` §6 `wakeup`).
pub fn wakeup(chan: usize) {
    let mut table = TABLE.lock();
    scheduler::wakeup(&mut table, chan);
}

/// Current tick count (`spec.md` §6 `uptime`).
pub fn uptime<T: TickSource>(tick_source: &T) -> u64 {
    tick_source.ticks()
}

/// Pid of the calling task (`spec.md` §6 `getpid`), or `None` if called
/// outside any task's context.
pub fn getpid() -> Option<Pid> {
    TABLE.lock().current
}

/// Enable schedlog output for the next `n` ticks (`spec.md` §6
/// `schedlog`).
pub fn schedlog_enable(n: u32) {
    let mut table = TABLE.lock();
    schedlog::enable(&mut table, n);
}

/// Halt the system (`spec.md` §6 `shutdown`). **Does not return.**
#[cfg(target_os = "none")]
pub fn shutdown() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}
