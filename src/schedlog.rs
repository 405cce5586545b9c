//! # Schedlog
//!
//! The debug trace emitter of `spec.md` §6: one line per scheduler
//! dispatch, built without heap allocation and handed to the `log`
//! facade at `trace!` level. A real deployment wires a `log` backend
//! (e.g. semihosting or a UART logger) to actually print these; this
//! crate only owns the line's content and format.

use core::fmt::{self, Write};

use crate::config::NPROC;
use crate::table::TaskTable;
use crate::task::TaskState;

/// Fixed-capacity string buffer big enough for one schedlog line: up to
/// `NPROC` entries of the form `[pid]name:state:nice(maxlevel)(vdl)(ticks)`
/// joined by commas. Sized generously; `write!` truncation is not
/// possible with `core::fmt::Write` so the buffer must not overflow in
/// practice — `NPROC` is small (64) and entries are short.
pub struct LineBuf {
    buf: [u8; Self::CAPACITY],
    len: usize,
}

impl LineBuf {
    const CAPACITY: usize = 64 * NPROC;

    const fn new() -> Self {
        Self {
            buf: [0u8; Self::CAPACITY],
            len: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        if self.len + bytes.len() > Self::CAPACITY {
            return Err(fmt::Error);
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }
}

fn state_tag(state: TaskState) -> &'static str {
    match state {
        TaskState::Unused => "UNUSED",
        TaskState::Embryo => "EMBRYO",
        TaskState::Sleeping => "SLEEPING",
        TaskState::Runnable => "RUNNABLE",
        TaskState::Running => "RUNNING",
        TaskState::Zombie => "ZOMBIE",
    }
}

/// Render one schedlog line for the current table state at tick `now`,
/// per the exact field layout in `spec.md` §6.
pub fn render_line(table: &TaskTable, now: u64) -> LineBuf {
    let mut out = LineBuf::new();
    let _ = write!(out, "{now}|");

    let Some(highest) = table.highest_used_index() else {
        let _ = out.write_str("\n");
        return out;
    };

    for k in 0..=highest {
        if k > 0 {
            let _ = out.write_str(",");
        }
        let tcb = &table.tasks[k];
        if !tcb.is_used() {
            let _ = out.write_str("[-]---:0:-(-)(-)(-)");
            continue;
        }
        let name_len = tcb.name.iter().position(|&b| b == 0).unwrap_or(tcb.name.len());
        let name = core::str::from_utf8(&tcb.name[..name_len]).unwrap_or("?");
        let _ = write!(
            out,
            "[{}]{}:{}:{}({})({})({})",
            tcb.pid,
            name,
            state_tag(tcb.state),
            tcb.niceness,
            tcb.maxlevel,
            tcb.virtual_deadline,
            tcb.ticks_left,
        );
    }
    let _ = out.write_str("\n");
    out
}

/// Emit the schedlog line for this dispatch round via the `log` facade,
/// if logging is currently active (`table.schedlog_remaining > 0`).
/// Decrements the remaining-ticks counter.
pub fn maybe_emit(table: &mut TaskTable, now: u64) {
    if table.schedlog_remaining == 0 {
        return;
    }
    table.schedlog_remaining -= 1;
    let line = render_line(table, now);
    log::trace!("{}", line.as_str().trim_end_matches('\n'));
}

/// Enable schedlog output for the next `n` ticks (the `schedlog` syscall
/// of `spec.md` §6).
pub fn enable(table: &mut TaskTable, n: u32) {
    table.schedlog_remaining = n;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler;

    #[test]
    fn empty_table_renders_bare_newline() {
        let table = TaskTable::new();
        let line = render_line(&table, 0);
        assert_eq!(line.as_str(), "0|\n");
    }

    #[test]
    fn unused_slot_renders_placeholder() {
        let mut table = TaskTable::new();
        table.allocate().unwrap();
        table.allocate().unwrap();
        table.tasks[0] = crate::task::TaskControlBlock::empty();
        let line = render_line(&table, 5);
        assert!(line.as_str().starts_with("5|[-]---:0:-(-)(-)(-),"));
    }

    #[test]
    fn dispatched_task_renders_its_fields() {
        let mut table = TaskTable::new();
        let pid = scheduler::fork(&mut table, 0).unwrap();
        table.find_by_pid_mut(pid).unwrap().set_name(b"init");
        scheduler::schedule_one(&mut table, 0);
        let line = render_line(&table, 0);
        assert!(line.as_str().contains(&alloc_free_pid_tag(pid)));
        assert!(line.as_str().contains("init"));
        assert!(line.as_str().contains("RUNNING"));
    }

    fn alloc_free_pid_tag(pid: i32) -> std::string::String {
        std::format!("[{pid}]")
    }

    #[test]
    fn enable_then_maybe_emit_counts_down() {
        let mut table = TaskTable::new();
        enable(&mut table, 2);
        maybe_emit(&mut table, 0);
        assert_eq!(table.schedlog_remaining, 1);
        maybe_emit(&mut table, 1);
        assert_eq!(table.schedlog_remaining, 0);
        maybe_emit(&mut table, 2);
        assert_eq!(table.schedlog_remaining, 0);
    }
}
