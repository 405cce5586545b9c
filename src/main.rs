//! # bfsched Demo Firmware
//!
//! Boots the scheduler with three tasks exercising the virtual-deadline
//! dispatch rule end to end on real hardware:
//!
//! | Task | Niceness | Behavior |
//! |------|----------|----------|
//! | `init_task`   | 0   | Spawns the other two, then waits for children forever |
//! | `favored_task`| -10 | Low niceness: shorter deadlines, dispatched more often |
//! | `background_task` | 10 | High niceness: longer deadlines, dispatched less often |
//!
//! Both workers busy-loop a fixed amount of work and then call
//! `kernel::yield_task`, so the scheduler's deadline ordering — not mere
//! preemption — decides who runs next.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use panic_halt as _;

use bfsched::arch::cortex_m4::CortexM4;
use bfsched::kernel;

extern "C" fn init_task() -> ! {
    kernel::spawn(&CortexM4, favored_task, -10, b"favored").expect("spawn favored_task");
    kernel::spawn(&CortexM4, background_task, 10, b"background").expect("spawn background_task");
    loop {
        let _ = kernel::wait(&CortexM4, kernel::getpid().unwrap_or(1));
    }
}

extern "C" fn favored_task() -> ! {
    loop {
        let mut work: u32 = 0;
        for _ in 0..2000 {
            work = work.wrapping_add(1);
        }
        let _ = work;
        kernel::yield_task(&CortexM4);
    }
}

extern "C" fn background_task() -> ! {
    loop {
        let mut work: u32 = 0;
        for _ in 0..2000 {
            work = work.wrapping_add(1);
        }
        let _ = work;
        kernel::yield_task(&CortexM4);
    }
}

/// Firmware entry point. Spawns `init_task` and starts the scheduler.
/// Does not return.
#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();

    kernel::init(&CortexM4, init_task);

    unsafe { kernel::start(cp, &CortexM4) }
}
