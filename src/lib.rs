//! PantherOS userprog - System-Call Boundary for x86-64
//!
//! The layer between untrusted user programs and the kernel: it receives
//! the register frame captured by the `syscall` trampoline, validates every
//! user pointer before touching it, dispatches to the process-lifecycle
//! services, and writes the result back into the frame.
//!
//! # Security Features
//! - Capability-checked user memory access (`UserPage`)
//! - Total dispatch: unknown calls terminate the caller
//! - Fatal vs. recoverable failures are separate error classes
//! - Interrupts stay masked until the trampoline is on the kernel stack
//!
//! # Collaborators
//! Scheduling, page tables, program loading, console, and power control are
//! provided by the rest of the kernel through the traits in [`services`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod arch;
pub mod logger;
pub mod mm;
pub mod process;
pub mod services;
pub mod syscall;
pub mod trap;

#[cfg(test)]
mod testing;

use alloc::sync::Arc;

use process::{Pid, Process, ProcessTable};
use services::{AddressSpaces, Console, Loader, Machine, ResourceExhausted, SpaceId, Threads};
use syscall::Caller;
use trap::RegisterFrame;

/// Kernel subsystems the system-call core calls into.
#[derive(Clone, Copy)]
pub struct Services<'k> {
    pub threads: &'k dyn Threads,
    pub memory: &'k dyn AddressSpaces,
    pub loader: &'k dyn Loader,
    pub console: &'k dyn Console,
    pub machine: &'k dyn Machine,
}

/// The system-call core: collaborators plus the process table.
pub struct Kernel<'k> {
    services: Services<'k>,
    processes: ProcessTable,
}

impl<'k> Kernel<'k> {
    pub fn new(services: Services<'k>) -> Self {
        Self {
            services,
            processes: ProcessTable::new(),
        }
    }

    pub fn services(&self) -> &Services<'k> {
        &self.services
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    /// Register the first user process, which has no parent.
    ///
    /// The caller starts its context once the process is registered.
    pub fn spawn_initial(&self, name: &str, space: SpaceId) -> Result<Pid, ResourceExhausted> {
        let pid = self.processes.allocate_pid()?;
        self.processes
            .insert(Arc::new(Process::new(pid, name, space, None)));
        log::info!("initial process {} ({})", pid, name);
        Ok(pid)
    }

    /// Handle one system call from the current context.
    ///
    /// Returns with the result in `frame`, unless the call ended the
    /// context or the machine.
    pub fn handle(&self, frame: &mut RegisterFrame) {
        let pid = self.services.threads.current();
        match self.processes.get(pid) {
            Some(process) => self.dispatch(Caller::new(process), frame),
            None => {
                log::error!("syscall from pid {} with no process record", pid);
                self.services.threads.exit_current()
            }
        }
    }
}

/// Boot-time setup of the system-call path.
///
/// Brings up the heap and the console logger, programs the `syscall` MSRs,
/// and registers `kernel` with the trap entry. Runs once on the boot CPU.
///
/// # Safety
/// `entry` must be the address of the `syscall` trampoline, and the GDT
/// must already hold the selectors in [`arch::x86_64::selectors`].
#[cfg(target_arch = "x86_64")]
pub unsafe fn init(kernel: Kernel<'static>, entry: u64) {
    mm::init_heap();
    if logger::init(kernel.services().console, log::LevelFilter::Info).is_err() {
        log::warn!("[BOOT] logger already installed");
    }

    let mut msrs = arch::x86_64::Cpu;
    // SAFETY: forwarded from this function's contract
    unsafe { arch::x86_64::entry::configure(&mut msrs, entry) };

    trap::install(kernel);
    log::info!("syscall entry ready ({} KiB heap)", mm::heap_size() / 1024);
}
