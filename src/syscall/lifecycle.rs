//! Process Lifecycle
//!
//! halt, exit, fork, exec, wait

use alloc::format;
use alloc::sync::Arc;

use super::error::{SysResult, SyscallError};
use super::handler::Caller;
use super::validate::UserMemory;
use crate::mm::VirtAddr;
use crate::process::{limits, ExitStatus, Pid, Process};
use crate::trap::RegisterFrame;
use crate::Kernel;

impl Kernel<'_> {
    /// User memory of `process` for the duration of one call.
    fn user_memory(&self, process: &Process) -> UserMemory<'_> {
        UserMemory::new(self.services.memory, process.space())
    }

    /// Power off the machine.
    ///
    /// No process cleanup: this stops everything.
    pub fn halt(&self) -> ! {
        log::info!("[SYSCALL] halt: powering off");
        self.services.machine.power_off()
    }

    /// Terminate the caller with `status`.
    ///
    /// Prints the termination line, publishes the status to the parent,
    /// releases the address space, and ends the context. The caller's
    /// handle is dropped before the context goes away so the process record
    /// is freed.
    pub fn exit(&self, caller: Caller, status: ExitStatus) -> ! {
        let process = caller.into_process();
        let pid = process.pid();

        self.services
            .console
            .write_str(&format!("{}: exit({})\n", process.name(), status));
        process.exit_record().publish(status, self.services.threads);

        // Orphaned children keep their own records alive.
        process.children().clear();
        self.services.memory.release(process.space());
        self.processes.remove(pid);
        drop(process);

        log::debug!("[PROCESS] {} exited with status {}", pid, status);
        self.services.threads.exit_current()
    }

    /// Clone the caller into a new child process.
    ///
    /// # Returns
    /// The child's pid. The child resumes from a copy of `frame` with 0 in
    /// `rax`. On allocation failure nothing of the child remains.
    pub fn fork(&self, caller: &Caller, name: VirtAddr, frame: &RegisterFrame) -> SysResult<Pid> {
        let parent = caller.process();
        let name = self.user_memory(parent).read_cstr(name, limits::NAME_MAX)?;

        let pid = self.processes.allocate_pid()?;
        let space = self
            .services
            .memory
            .duplicate(parent.space())
            .ok_or(SyscallError::OutOfResources)?;

        let child = Arc::new(Process::new(pid, &name, space, Some(parent.pid())));
        parent.children().insert(Arc::clone(child.exit_record()));
        self.processes.insert(child);

        let mut child_frame = *frame;
        child_frame.set_result(0);

        if let Err(err) = self.services.threads.spawn(pid, child_frame) {
            log::warn!("[PROCESS] fork {} -> {}: {}", parent.pid(), pid, err);
            parent.children().claim(pid);
            self.processes.remove(pid);
            self.services.memory.release(space);
            return Err(err.into());
        }

        log::debug!("[PROCESS] fork {} -> {} ({})", parent.pid(), pid, name);
        Ok(pid)
    }

    /// Replace the caller's program image.
    ///
    /// The new program is loaded into a fresh address space; the old one is
    /// released only after the load succeeded, so a failed exec leaves the
    /// caller running its current image. On success `frame` holds the new
    /// image's entry state and the process takes the program's name.
    pub fn exec(&self, caller: &Caller, cmdline: VirtAddr, frame: &mut RegisterFrame) -> SysResult<()> {
        let process = caller.process();
        let cmdline = self
            .user_memory(process)
            .read_cstr_bounded(cmdline, limits::CMDLINE_MAX)?;

        let memory = self.services.memory;
        let space = memory.create().ok_or(SyscallError::OutOfResources)?;

        let mut entry = RegisterFrame::default();
        if let Err(err) = self.services.loader.load(space, &cmdline, &mut entry) {
            memory.release(space);
            return Err(err.into());
        }

        let old = process.replace_space(space);
        memory.activate(space);
        memory.release(old);

        if let Some(program) = cmdline.split_whitespace().next() {
            process.rename(program);
        }
        *frame = entry;

        log::debug!("[PROCESS] {} exec '{}'", process.pid(), cmdline);
        Ok(())
    }

    /// Wait for child `pid` to exit and collect its status.
    ///
    /// Fails at once if `pid` is not a child of the caller or was already
    /// collected. A child that exited earlier is collected without blocking.
    pub fn wait(&self, caller: &Caller, pid: u64) -> SysResult<ExitStatus> {
        let parent = caller.process();
        let record = Pid::from_arg(pid)
            .and_then(|child| parent.children().claim(child))
            .ok_or(SyscallError::NotChild(pid))?;

        let status = record.wait(parent.pid(), self.services.threads);
        log::debug!(
            "[PROCESS] {} collected {} (status {})",
            parent.pid(),
            record.pid(),
            status
        );
        Ok(status)
    }
}
