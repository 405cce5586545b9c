//! # Scheduler Configuration
//!
//! Compile-time constants governing the scheduler and system behavior.
//! All limits are fixed at compile time — no dynamic allocation.

/// Maximum number of processes the system can manage simultaneously.
/// Bounds the static task-table array and the skiplist's node array
/// (which reserves one extra slot for the sentinel head).
pub const NPROC: usize = 64;

/// Highest level a skiplist node may participate at (levels are
/// `0..MAX_LEVEL`).
pub const MAX_LEVEL: usize = 4;

/// Per-level promotion probability used by the random level generator,
/// expressed as a percentage in `[0, 100)` to keep the PRNG integer-only.
pub const CHANCE_PERCENT: u32 = 25;

/// Initial seed for the process-wide xorshift PRNG. Fixed (not reseeded
/// per boot) so schedlog traces are reproducible across runs.
pub const SEED: u32 = 62_301_983;

/// Default quantum, in ticks, assigned to a task on dispatch and used to
/// compute the next virtual deadline on renewal.
pub const DEFAULT_QUANTUM: u32 = 50;

/// Most negative legal niceness value.
pub const NICE_FIRST: i32 = -20;

/// Most positive legal niceness value.
pub const NICE_LAST: i32 = 19;

/// SysTick frequency in Hz. Determines scheduler tick granularity.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (STM32F4 at 16 MHz HSI, matching the
/// reference firmware's target board).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Per-task stack size in bytes. Must be large enough for the deepest
/// call chain plus the hardware exception frame and the software-saved
/// context.
pub const STACK_SIZE: usize = 1024;

/// Length, in bytes, of a task's cosmetic debug name.
pub const TASK_NAME_LEN: usize = 16;
