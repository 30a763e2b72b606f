//! System Call Interface
//!
//! The trust boundary between user programs and the kernel.
//!
//! # Security Model
//! - Whitelist approach: only the calls in [`numbers`] exist; anything else
//!   terminates the caller
//! - Every pointer is validated, page by page, before it is read
//! - Bad pointers are fatal; resource and lookup failures are reported
//!
//! # Current Syscalls
//! - 0: halt() - power off the machine
//! - 1: exit(status) - terminate the current process
//! - 2: fork(name) - clone the current process
//! - 3: exec(cmdline) - replace the current program image
//! - 4: wait(pid) - collect a child's exit status

mod error;
mod handler;
mod lifecycle;
pub mod numbers;
mod validate;

pub use error::{SysResult, SyscallError, ERROR_RESULT, KILLED_STATUS};
pub use handler::{Caller, Syscall};
pub use validate::{CopyError, InvalidAccess, UserMemory, UserPage};
