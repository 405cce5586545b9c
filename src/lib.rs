//! # bfsched — a BFS-style earliest-virtual-deadline scheduler core
//!
//! A small preemptive scheduler for a teaching operating system, modeled
//! on the Brain Fuck Scheduler's virtual-deadline dispatch rule: every
//! runnable task carries an absolute tick value — its virtual deadline —
//! at which its current slice should end, and the scheduler always
//! dispatches whichever runnable task has the earliest one.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │   init() · start() · fork() · exit() · wait() · kill()  │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Task Table       │  Sync Primitives  │
//! │  scheduler.rs│   table.rs         │  sync.rs          │
//! │  ─ schedule_one  ─ TaskTable       │  ─ critical_section│
//! │  ─ yield_current ─ TABLE (lock)    │                   │
//! │  ─ sleep/wakeup  ─ Skiplist        │                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │      Task & Deadline Model (task.rs) · Skiplist          │
//! │   TCB · TaskState · virtual_deadline · skiplist.rs       │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs, arch/mock.rs)   │
//! │    PendSV · SysTick · Context Switch · Stack Init        │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Deadline Model
//!
//! Each task has a niceness in `[-20, 19]`. Dispatch (or quantum renewal)
//! computes `virtual_deadline = now + prio_ratio(niceness) * DEFAULT_QUANTUM`,
//! where `prio_ratio` maps niceness linearly onto `[1, 40]` — lower
//! niceness means a nearer deadline and thus earlier dispatch. Ties break
//! FIFO by insertion order into the ranking skiplist, never by pid.
//!
//! ## Ranking Structure
//!
//! The runnable set is kept ordered by `virtual_deadline` in a
//! fixed-capacity doubly-linked skiplist (`skiplist.rs`) seeded by a
//! deterministic xorshift32 PRNG (`rand.rs`) so level assignment — and
//! therefore schedlog traces — are reproducible across boots.
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **No `alloc`**: pure `core` only (outside `#[cfg(test)]`)
//! - **Fixed-size TCB array**: `[TaskControlBlock; NPROC]`
//! - **Per-task stack**: `[u8; STACK_SIZE]` inline in the TCB
//! - **`table_lock`**: a single `spin::Mutex<TaskTable>` guarding all
//!   shared scheduler state, wrapped in a critical section at the
//!   `kernel` API boundary

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod error;
pub mod kernel;
pub mod rand;
pub mod schedlog;
pub mod scheduler;
pub mod skiplist;
#[cfg(target_os = "none")]
pub mod sync;
pub mod table;
pub mod task;
