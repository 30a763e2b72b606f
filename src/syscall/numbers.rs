//! System call numbers
//!
//! Shared with the user-side library; values are ABI.

/// Power off the machine.
pub const SYS_HALT: u64 = 0;
/// Terminate the calling process.
pub const SYS_EXIT: u64 = 1;
/// Clone the calling process.
pub const SYS_FORK: u64 = 2;
/// Replace the calling process's program image.
pub const SYS_EXEC: u64 = 3;
/// Wait for a child to exit.
pub const SYS_WAIT: u64 = 4;
