//! System Call Handler
//!
//! Decodes the register frame into a typed [`Syscall`] and routes it to its
//! handler.
//!
//! # Security Considerations
//! - Decoding is total: every number maps to one variant or to
//!   `UnknownCall`, which terminates the caller
//! - Each match arm finishes its own call; there is no fallthrough
//! - HALT and EXIT have type `!`, so no result is ever written for them

use alloc::sync::Arc;

use super::error::{SysResult, SyscallError, ERROR_RESULT, KILLED_STATUS};
use super::numbers::*;
use crate::mm::VirtAddr;
use crate::process::{ExitStatus, Process};
use crate::trap::{RegisterFrame, SyscallArgs};
use crate::Kernel;

/// The process a system call runs on behalf of.
///
/// Resolved once at entry and handed to each handler.
pub struct Caller {
    process: Arc<Process>,
}

impl Caller {
    pub fn new(process: Arc<Process>) -> Self {
        Self { process }
    }

    pub fn process(&self) -> &Process {
        &self.process
    }

    pub fn into_process(self) -> Arc<Process> {
        self.process
    }
}

/// A decoded system call with typed arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Halt,
    Exit { status: ExitStatus },
    Fork { name: VirtAddr },
    Exec { cmdline: VirtAddr },
    Wait { pid: u64 },
}

impl Syscall {
    /// Decode the call number and its arguments.
    pub fn decode(args: &SyscallArgs) -> SysResult<Self> {
        let arg1 = args.args[0];
        let call = match args.num {
            SYS_HALT => Self::Halt,
            SYS_EXIT => Self::Exit {
                status: arg1 as ExitStatus,
            },
            SYS_FORK => Self::Fork {
                name: VirtAddr::new(arg1 as usize),
            },
            SYS_EXEC => Self::Exec {
                cmdline: VirtAddr::new(arg1 as usize),
            },
            SYS_WAIT => Self::Wait { pid: arg1 },
            other => return Err(SyscallError::UnknownCall(other)),
        };
        Ok(call)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Halt => "halt",
            Self::Exit { .. } => "exit",
            Self::Fork { .. } => "fork",
            Self::Exec { .. } => "exec",
            Self::Wait { .. } => "wait",
        }
    }
}

impl Kernel<'_> {
    /// Dispatch a system call
    ///
    /// # Returns
    /// With the result in `rax` for FORK and WAIT, with a new image in
    /// `frame` after a successful EXEC, or -1 in `rax` after a recoverable
    /// failure. Never returns for HALT, EXIT, or fatal failures.
    pub fn dispatch(&self, caller: Caller, frame: &mut RegisterFrame) {
        let call = match Syscall::decode(&frame.syscall_args()) {
            Ok(call) => call,
            Err(err) => self.terminate(caller, err),
        };
        log::trace!("[SYSCALL] pid {}: {:?}", caller.process().pid(), call);

        let result: SysResult<Option<i64>> = match call {
            Syscall::Halt => self.halt(),
            Syscall::Exit { status } => self.exit(caller, status),
            Syscall::Fork { name } => self
                .fork(&caller, name, frame)
                .map(|pid| Some(i64::from(pid.as_u32()))),
            Syscall::Exec { cmdline } => self.exec(&caller, cmdline, frame).map(|()| None),
            Syscall::Wait { pid } => self
                .wait(&caller, pid)
                .map(|status| Some(i64::from(status))),
        };

        match result {
            Ok(Some(value)) => frame.set_result(value),
            Ok(None) => {}
            Err(err) if err.is_fatal() => self.terminate(caller, err),
            Err(err) => {
                log::debug!(
                    "[SYSCALL] pid {}: {} failed: {}",
                    caller.process().pid(),
                    call.name(),
                    err
                );
                frame.set_result(ERROR_RESULT);
            }
        }
    }

    /// Kill the caller for a protocol violation.
    fn terminate(&self, caller: Caller, err: SyscallError) -> ! {
        log::warn!(
            "[SYSCALL] pid {}: {}, terminating",
            caller.process().pid(),
            err
        );
        self.exit(caller, KILLED_STATUS)
    }
}
