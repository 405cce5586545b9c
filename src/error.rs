//! # Error Taxonomy
//!
//! Plain `Copy` enums for the recoverable failure modes named in the
//! scheduler's error handling design. Capacity and not-found failures are
//! absorbed locally by callers that can tolerate them (the scheduler's
//! reconcile pass); the syscall-shaped entry points in `kernel` turn the
//! rest into a negative return value for user space.

/// Failure to insert a node into the skiplist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// A valid node for this pid already exists in the skiplist.
    DuplicatePid,
    /// No free node slot remained.
    Full,
}

/// Failure to delete a node from the skiplist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteError {
    /// No node matched `(value, pid)`.
    NotFound,
}

/// Failure to create a new process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkError {
    /// The requested niceness fell outside `[NICE_FIRST, NICE_LAST]`.
    NiceOutOfRange,
    /// The task table has no free slot.
    TableFull,
}

/// Failure to reap a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// The calling process has no children, living or zombie.
    NoChildren,
}

/// Failure to signal a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillError {
    /// No live process has the given pid.
    NoSuchPid,
}
