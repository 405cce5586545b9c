//! # Architecture Abstraction Layer
//!
//! The four declared external interfaces of `spec.md` §6/§9: a tick
//! source, a context-switch primitive, address-space switching, and file
//! cleanup on exit. The scheduler core (`scheduler.rs`, `table.rs`,
//! `skiplist.rs`) never names a concrete backend — it is generic over
//! these traits, or simply takes a `now: u64` the caller already read
//! from a `TickSource`.
//!
//! Two backends implement all four: `cortex_m4` (real Cortex-M4
//! hardware, PendSV/SysTick/PSP) and `mock` (host-only, used by
//! `#[cfg(test)]` code and `tests/`).

use crate::task::Pid;

// Gated on `target_os` rather than `cfg(test)`: a `tests/` integration
// binary links this crate as an ordinary (non-test) dependency, so
// `cfg(test)` would not see it — but it always builds for a hosted
// target, never the bare-metal firmware target, so `target_os = "none"`
// reliably tells the two apart.
#[cfg(target_os = "none")]
pub mod cortex_m4;
#[cfg(not(target_os = "none"))]
pub mod mock;

/// A saved task context. Currently just the saved stack pointer — see
/// `task::TaskControlBlock::stack_pointer`.
pub type Context = *mut u32;

/// A monotonically increasing tick counter, driven by the timer
/// interrupt (`spec.md` §2 item 1).
pub trait TickSource {
    fn ticks(&self) -> u64;
}

/// The low-level context-switch primitive (`spec.md` §9: "two opaque
/// callable pairs (save/restore) behind a trait"). `switch` requests a
/// save of the current context and a restore of `to`; `enter_first`
/// performs the one-time jump into the very first task and never
/// returns.
pub trait ContextSwitch {
    /// # Safety
    /// `from` and `to` must each point at a live TCB's `stack_pointer`
    /// field.
    unsafe fn switch(&self, from: *mut Context, to: *mut Context);

    /// # Safety
    /// Must be called exactly once, with a stack pointer prepared by the
    /// same backend's stack-initialization routine.
    unsafe fn enter_first(&self, to: Context) -> !;
}

/// Switches the MMU/MPU mapping for a task, or back to the kernel's own
/// mapping (`spec.md` §6's `switch_address_space`/
/// `switch_kernel_address_space`).
pub trait AddressSpace {
    fn switch_to(&self, pid: Pid);
    fn switch_to_kernel(&self);
}

/// Stands in for `file_close`/`iput`/`begin_op`/`end_op` of `spec.md` §6,
/// collapsed into one call since file descriptors themselves are out of
/// scope for this core.
pub trait FileTable {
    fn close_all(&self, pid: Pid);
}
