//! x86-64 system-call entry support
//!
//! - `msr`: model-specific register access
//! - `rflags`: RFLAGS bits masked on entry
//! - `entry`: one-time `syscall`/`sysret` configuration

pub mod entry;
pub mod msr;
pub mod rflags;

pub use entry::selectors;
#[cfg(target_arch = "x86_64")]
pub use msr::Cpu;
pub use msr::ModelSpecificRegisters;
