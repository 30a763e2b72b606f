//! Process Records
//!
//! Kernel-side bookkeeping for user processes: identity, name, the
//! address-space handle, the parent link, the set of children the process
//! may still wait on, and the exit record shared with the parent.
//!
//! # Ownership
//! - The process table owns each `Process` while it runs
//! - A child refers to its parent by pid only; it never keeps it alive
//! - The `ExitRecord` is shared between the child and the parent's
//!   `ChildSet`, so a status survives the child's teardown

mod exit;
mod table;

use core::fmt;

pub use exit::{ExitRecord, ExitStatus};
pub use table::{ChildSet, Process, ProcessTable};

/// Process limits.
pub mod limits {
    /// Longest process name kept, in bytes (16-byte buffer with terminator).
    pub const NAME_MAX: usize = 15;

    /// Longest command line accepted by exec, in bytes.
    pub const CMDLINE_MAX: usize = crate::mm::PAGE_SIZE - 1;
}

/// Process identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Pid(u32);

impl Pid {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Interpret a raw argument register as a pid.
    ///
    /// Values that do not fit (including negatives) name no process.
    pub fn from_arg(raw: u64) -> Option<Self> {
        u32::try_from(raw as i64).ok().filter(|&pid| pid != 0).map(Self)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Clip a name to [`limits::NAME_MAX`] bytes on a character boundary.
pub(crate) fn clip_name(name: &str) -> &str {
    if name.len() <= limits::NAME_MAX {
        return name;
    }
    let mut end = limits::NAME_MAX;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
