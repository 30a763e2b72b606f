//! System call errors
//!
//! Two classes: fatal errors terminate the caller with status -1 and never
//! return to user mode; every other error is reported as -1 in `rax` and
//! leaves the caller's state as it was before the call.

use core::fmt;

use super::validate::{CopyError, InvalidAccess};
use crate::services::{LoadError, ResourceExhausted};

/// Value written to `rax` for a recoverable failure.
pub const ERROR_RESULT: i64 = -1;

/// Exit status given to a process terminated by the kernel.
pub const KILLED_STATUS: i32 = -1;

pub type SysResult<T> = Result<T, SyscallError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// A pointer argument failed validation.
    BadAddress(InvalidAccess),
    /// The call number is not in the table.
    UnknownCall(u64),
    /// A collaborator ran out of memory or contexts.
    OutOfResources,
    /// Exec could not load the requested program.
    Load(LoadError),
    /// Exec command line has no terminator within the limit.
    CmdlineTooLong,
    /// Wait target is not an uncollected child of the caller.
    NotChild(u64),
}

impl SyscallError {
    /// Whether the caller must be terminated instead of seeing -1.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::BadAddress(_) | Self::UnknownCall(_))
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadAddress(fault) => write!(f, "{}", fault),
            Self::UnknownCall(num) => write!(f, "unknown system call {}", num),
            Self::OutOfResources => write!(f, "out of kernel resources"),
            Self::Load(err) => write!(f, "load failed: {}", err),
            Self::CmdlineTooLong => write!(f, "command line too long"),
            Self::NotChild(pid) => write!(f, "{} is not a waitable child", *pid as i64),
        }
    }
}

impl From<InvalidAccess> for SyscallError {
    fn from(fault: InvalidAccess) -> Self {
        Self::BadAddress(fault)
    }
}

impl From<CopyError> for SyscallError {
    fn from(err: CopyError) -> Self {
        match err {
            CopyError::Fault(fault) => Self::BadAddress(fault),
            CopyError::TooLong => Self::CmdlineTooLong,
        }
    }
}

impl From<LoadError> for SyscallError {
    fn from(err: LoadError) -> Self {
        Self::Load(err)
    }
}

impl From<ResourceExhausted> for SyscallError {
    fn from(_: ResourceExhausted) -> Self {
        Self::OutOfResources
    }
}
