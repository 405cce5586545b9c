//! # Mock Backend
//!
//! Hosted-target implementation of the four `arch` traits, compiled
//! whenever `target_os != "none"` — both `#[cfg(test)]` unit tests and
//! the `tests/` integration suite land here, since neither ever builds
//! for the bare-metal firmware target. There is no real register
//! save/restore here — tests drive the scheduler's bookkeeping directly
//! rather than actually transferring control, so `ContextSwitch::switch`
//! just records which `Context` is "current".

use core::cell::{Cell, RefCell};

use crate::arch::{AddressSpace, Context, ContextSwitch, FileTable, TickSource};
use crate::config::NPROC;
use crate::task::Pid;

/// A tick source the test advances manually with [`MockClock::advance`].
pub struct MockClock {
    ticks: Cell<u64>,
}

impl MockClock {
    pub const fn new() -> Self {
        Self { ticks: Cell::new(0) }
    }

    pub fn advance(&self, by: u64) {
        self.ticks.set(self.ticks.get() + by);
    }

    pub fn set(&self, to: u64) {
        self.ticks.set(to);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for MockClock {
    fn ticks(&self) -> u64 {
        self.ticks.get()
    }
}

/// Records the last `to` context passed to `switch`/`enter_first`, and how
/// many switches have happened, without touching any real stack memory.
pub struct MockSwitch {
    current: RefCell<Option<Context>>,
    switch_count: Cell<u32>,
}

impl MockSwitch {
    pub const fn new() -> Self {
        Self {
            current: RefCell::new(None),
            switch_count: Cell::new(0),
        }
    }

    pub fn current(&self) -> Option<Context> {
        *self.current.borrow()
    }

    pub fn switch_count(&self) -> u32 {
        self.switch_count.get()
    }
}

impl Default for MockSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextSwitch for MockSwitch {
    unsafe fn switch(&self, _from: *mut Context, to: *mut Context) {
        *self.current.borrow_mut() = Some(*to);
        self.switch_count.set(self.switch_count.get() + 1);
    }

    unsafe fn enter_first(&self, to: Context) -> ! {
        *self.current.borrow_mut() = Some(to);
        self.switch_count.set(self.switch_count.get() + 1);
        // Tests never actually want to diverge; this backend is only
        // reachable from code paths that don't call `enter_first` under
        // test (kernel::start is exercised by asserting on MockSwitch's
        // recorded state instead).
        panic!("MockSwitch::enter_first is not meant to be called under test");
    }
}

/// Records which pid's address space is "active"; there is no real
/// MMU/MPU on the host.
pub struct MockAddressSpace {
    active: Cell<Option<Pid>>,
}

impl MockAddressSpace {
    pub const fn new() -> Self {
        Self { active: Cell::new(None) }
    }

    pub fn active(&self) -> Option<Pid> {
        self.active.get()
    }
}

impl Default for MockAddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSpace for MockAddressSpace {
    fn switch_to(&self, pid: Pid) {
        self.active.set(Some(pid));
    }

    fn switch_to_kernel(&self) {
        self.active.set(None);
    }
}

/// Records which pids have had their files closed; there is no real file
/// table on the host. Fixed-capacity to match the rest of the crate's
/// no-heap style rather than reaching for `std::vec::Vec`.
pub struct MockFileTable {
    closed: RefCell<[Option<Pid>; NPROC]>,
}

impl MockFileTable {
    pub const fn new() -> Self {
        Self {
            closed: RefCell::new([None; NPROC]),
        }
    }

    pub fn was_closed(&self, pid: Pid) -> bool {
        self.closed.borrow().iter().any(|&p| p == Some(pid))
    }
}

impl Default for MockFileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTable for MockFileTable {
    fn close_all(&self, pid: Pid) {
        let mut closed = self.closed.borrow_mut();
        if let Some(slot) = closed.iter_mut().find(|p| p.is_none()) {
            *slot = Some(pid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances() {
        let clock = MockClock::new();
        assert_eq!(clock.ticks(), 0);
        clock.advance(50);
        assert_eq!(clock.ticks(), 50);
    }

    #[test]
    fn switch_records_current() {
        let sw = MockSwitch::new();
        let mut a: Context = core::ptr::null_mut();
        let mut b: Context = 0x1000 as Context;
        unsafe { sw.switch(&mut a, &mut b) };
        assert_eq!(sw.current(), Some(b));
        assert_eq!(sw.switch_count(), 1);
    }

    #[test]
    fn address_space_tracks_active_pid() {
        let a = MockAddressSpace::new();
        a.switch_to(7);
        assert_eq!(a.active(), Some(7));
        a.switch_to_kernel();
        assert_eq!(a.active(), None);
    }

    #[test]
    fn file_table_tracks_closed_pids() {
        let f = MockFileTable::new();
        assert!(!f.was_closed(3));
        f.close_all(3);
        assert!(f.was_closed(3));
    }
}
