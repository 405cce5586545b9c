//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) processor.
//! Implements context switching via PendSV, SysTick timer configuration,
//! and interrupt management — the four `arch` traits generalized from a
//! single hardwired scheduler global to operate over `table::TABLE`.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model:
//! - **MSP** (Main Stack Pointer): used by the kernel and interrupt handlers
//! - **PSP** (Process Stack Pointer): used by tasks in Thread mode
//!
//! On exception entry, the hardware automatically stacks R0-R3, R12, LR, PC,
//! and xPSR onto the process stack. The PendSV handler manually saves and
//! restores R4-R11, which completes the full context save/restore.
//!
//! ## Interrupt Priorities
//!
//! - SysTick: lowest priority — can be preempted by anything else
//! - PendSV: lowest priority — runs only when no other ISR is active
//!
//! Both are set to the lowest priority so that a context switch never
//! preempts another interrupt handler.

use core::arch::asm;
use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::peripheral::syst::SystClkSource;

use crate::arch::{AddressSpace, Context, ContextSwitch, FileTable, TickSource};
use crate::config::{DEFAULT_QUANTUM, STACK_SIZE, SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::scheduler;
use crate::table::TABLE;
use crate::task::{Pid, TaskControlBlock};

/// Ticks elapsed since boot. `u32` is sufficient native atomic width on
/// ARMv7-M; widened to `u64` at the `TickSource` boundary.
static TICKS: AtomicU32 = AtomicU32::new(0);

/// The real hardware backend: `TickSource` reads `TICKS`, `ContextSwitch`
/// drives PendSV, `AddressSpace`/`FileTable` are no-ops since this
/// teaching kernel has neither an MMU/MPU mapping per task nor a file
/// system (both out of scope per `spec.md` §1).
pub struct CortexM4;

impl TickSource for CortexM4 {
    fn ticks(&self) -> u64 {
        TICKS.load(Ordering::Relaxed) as u64
    }
}

impl ContextSwitch for CortexM4 {
    unsafe fn switch(&self, _from: *mut Context, _to: *mut Context) {
        trigger_pendsv();
    }

    unsafe fn enter_first(&self, to: Context) -> ! {
        start_first_task(to)
    }
}

impl AddressSpace for CortexM4 {
    fn switch_to(&self, _pid: Pid) {}
    fn switch_to_kernel(&self) {}
}

impl FileTable for CortexM4 {
    fn close_all(&self, _pid: Pid) {}
}

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure the SysTick timer for the scheduler tick. Fires at `TICK_HZ`
/// using the processor clock; each tick calls the `SysTick` handler below.
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

// ---------------------------------------------------------------------------
// PendSV trigger
// ---------------------------------------------------------------------------

/// Set the PENDSVSET bit in the Interrupt Control and State Register,
/// requesting a context switch at the lowest interrupt priority.
#[inline]
pub fn trigger_pendsv() {
    const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;
    unsafe {
        core::ptr::write_volatile(ICSR, 1 << 28);
    }
}

// ---------------------------------------------------------------------------
// Interrupt priority configuration
// ---------------------------------------------------------------------------

/// Set PendSV and SysTick to the lowest interrupt priority so a context
/// switch never preempts another ISR.
pub fn set_interrupt_priorities() {
    unsafe {
        let shpr3: *mut u32 = 0xE000_ED20 as *mut u32;
        let val = core::ptr::read_volatile(shpr3);
        let val = val | (0xFF << 16) | (0xFF << 24);
        core::ptr::write_volatile(shpr3, val);
    }
}

// ---------------------------------------------------------------------------
// First task launch
// ---------------------------------------------------------------------------

/// Switch to PSP and branch into the first task. Called once from
/// `kernel::start` and never returns.
///
/// # Safety
/// Must only be called once, with a stack pointer prepared by the stack
/// initializer used on `fork`/`userinit`.
pub unsafe fn start_first_task(psp: Context) -> ! {
    asm!(
        "adds r0, #32",
        "msr psp, r0",
        "movs r0, #2",
        "msr control, r0",
        "isb",
        "pop {{r0-r3, r12}}",
        "pop {{r4}}",
        "pop {{r5}}",
        "pop {{r6}}",
        "cpsie i",
        "bx r5",
        in("r0") psp,
        options(noreturn)
    );
}

// ---------------------------------------------------------------------------
// PendSV handler (context switch)
// ---------------------------------------------------------------------------

/// PendSV exception handler. Saves R4-R11 to the outgoing task's stack,
/// asks the scheduler to pick the next task, and restores R4-R11 from
/// the incoming task's stack before returning from exception.
///
/// # Safety
/// Naked function invoked directly by the NVIC; must follow the exact
/// Cortex-M4 exception entry/exit convention.
#[no_mangle]
#[naked]
pub unsafe extern "C" fn PendSV() {
    asm!(
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {save_context}",
        "bl {do_schedule}",
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        "ldr r0, =0xFFFFFFFD",
        "bx r0",
        save_context = sym save_current_context,
        do_schedule = sym do_context_switch,
        options(noreturn)
    );
}

/// Save the outgoing task's stack pointer into its TCB. Called from
/// `PendSV`.
///
/// # Safety
/// Called from assembly context with interrupts disabled.
#[no_mangle]
unsafe extern "C" fn save_current_context(psp: *mut u32) {
    let mut table = TABLE.lock();
    if let Some(pid) = table.current {
        if let Some(tcb) = table.find_by_pid_mut(pid) {
            tcb.stack_pointer = psp;
        }
    }
}

/// Run one scheduler round and hand back the incoming task's stack
/// pointer. Called from `PendSV`.
///
/// # Safety
/// Called from assembly context.
#[no_mangle]
unsafe extern "C" fn do_context_switch() -> *mut u32 {
    let mut table = TABLE.lock();
    let now = TICKS.load(Ordering::Relaxed) as u64;
    loop {
        if let Some(pid) = scheduler::schedule_one(&mut table, now) {
            return table
                .find_by_pid(pid)
                .expect("just-dispatched pid is allocated")
                .stack_pointer;
        }
        // Nothing runnable: release the lock and spin with interrupts on
        // (spec.md §4.4 step 3). In the naked-handler context we cannot
        // actually drop back to Thread mode here, so busy-poll.
        core::hint::spin_loop();
    }
}

// ---------------------------------------------------------------------------
// Stack initialization
// ---------------------------------------------------------------------------

/// Initialize a task's stack frame for its first context switch.
///
/// The Cortex-M4 hardware automatically pushes an exception frame on
/// interrupt entry; this pre-populates that frame on the task's own
/// stack so that the first PendSV "return" (or `start_first_task`)
/// starts executing `entry`.
///
/// ## Stack Layout (top = high address, growing down)
///
/// ```text
/// [Hardware stacked frame]   <- initial PSP points here
///   xPSR  (Thumb bit set)
///   PC    (task entry point)
///   LR    (task_exit)
///   R12, R3, R2, R1, R0 (0)
/// [Software saved context]
///   R11..R4 (0)              <- stack_pointer after init
/// ```
pub fn init_task_stack(tcb: &mut TaskControlBlock, entry: extern "C" fn() -> !) {
    let stack_top = tcb.stack.as_ptr() as usize + STACK_SIZE;
    let aligned_top = stack_top & !0x07;
    let frame_ptr = (aligned_top - 16 * 4) as *mut u32;

    unsafe {
        for i in 0..8 {
            *frame_ptr.add(i) = 0; // R4-R11
        }
        *frame_ptr.add(8) = 0; // R0
        *frame_ptr.add(9) = 0; // R1
        *frame_ptr.add(10) = 0; // R2
        *frame_ptr.add(11) = 0; // R3
        *frame_ptr.add(12) = 0; // R12
        *frame_ptr.add(13) = task_exit as u32; // LR
        *frame_ptr.add(14) = entry as u32; // PC
        *frame_ptr.add(15) = 0x0100_0000; // xPSR, Thumb bit set
    }

    tcb.stack_pointer = frame_ptr;
}

/// Fallback return address for a task whose `extern "C" fn() -> !` entry
/// returns anyway. Should be unreachable; spins rather than executing
/// garbage.
extern "C" fn task_exit() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler, called at `TICK_HZ`. Advances the tick
/// counter, decrements the running task's quantum, and requests a
/// context switch on exhaustion.
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    let now = TICKS.fetch_add(1, Ordering::Relaxed) as u64 + 1;

    let mut table = TABLE.lock();
    if let Some(pid) = table.current {
        if let Some(tcb) = table.find_by_pid_mut(pid) {
            if tcb.ticks_left > 0 {
                tcb.ticks_left -= 1;
            }
            if tcb.ticks_left == 0 {
                // Quantum exhausted: move the outgoing task Running ->
                // Runnable (renewing its deadline) before handing off to
                // PendSV, the same transition `yield_task` makes on the
                // voluntary path. Without this the task is left stuck in
                // Running and `reconcile` never re-ranks it.
                scheduler::yield_current(&mut table, now);
                drop(table);
                trigger_pendsv();
                return;
            }
        }
    }
    let _ = DEFAULT_QUANTUM;
}
