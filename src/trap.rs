//! System Call Trap Frame
//!
//! The trampoline (`syscall_entry`, installed in LSTAR) switches to the
//! kernel stack, pushes the user registers in the order below, and calls
//! [`syscall_handler`]. On return it restores the frame and executes
//! `sysretq`, so whatever the core leaves in the frame is what user mode
//! sees.
//!
//! # Calling Convention
//! - `rax`: call number on entry, result on return
//! - `rdi`, `rsi`, `rdx`, `r10`, `r8`, `r9`: arguments 1-6
//!
//! # Security Considerations
//! - The frame is borrowed for a single call and never retained
//! - Argument registers are raw user data; nothing here interprets them

use spin::Once;

use crate::Kernel;

/// User register state saved by the trampoline.
///
/// Layout must match the push order in `syscall_entry` exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterFrame {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub rbp: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub es: u64,
    pub ds: u64,
    pub vec_no: u64,
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

const _: () = assert!(core::mem::size_of::<RegisterFrame>() == 24 * 8);

/// Call number and arguments captured from a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallArgs {
    pub num: u64,
    pub args: [u64; 6],
}

impl RegisterFrame {
    /// Snapshot the call number and argument registers.
    pub fn syscall_args(&self) -> SyscallArgs {
        SyscallArgs {
            num: self.rax,
            args: [self.rdi, self.rsi, self.rdx, self.r10, self.r8, self.r9],
        }
    }

    /// Store a call's return value in `rax`.
    #[inline]
    pub fn set_result(&mut self, value: i64) {
        self.rax = value as u64;
    }
}

/// Kernel instance the trampoline dispatches into, set once at boot.
static KERNEL: Once<Kernel<'static>> = Once::new();

/// Register the kernel that [`syscall_handler`] serves.
///
/// Later calls are ignored; the first registration wins.
pub fn install(kernel: Kernel<'static>) {
    KERNEL.call_once(|| kernel);
}

/// Entry point called by the trampoline with interrupts re-enabled and the
/// kernel stack active.
#[no_mangle]
pub extern "C" fn syscall_handler(frame: &mut RegisterFrame) {
    match KERNEL.get() {
        Some(kernel) => kernel.handle(frame),
        None => {
            log::error!("syscall {} before kernel install", frame.rax);
            frame.set_result(-1);
        }
    }
}
