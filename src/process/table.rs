//! Process Table and Child Sets

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use spin::Mutex;

use super::{clip_name, ExitRecord, Pid};
use crate::services::{ResourceExhausted, SpaceId};

/// Children a process may still wait on, keyed by pid.
#[derive(Debug, Default)]
pub struct ChildSet {
    entries: Mutex<BTreeMap<Pid, Arc<ExitRecord>>>,
}

impl ChildSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `record`'s process waitable by the owner of this set.
    pub fn insert(&self, record: Arc<ExitRecord>) {
        self.entries.lock().insert(record.pid(), record);
    }

    /// Claim `pid` for a wait.
    ///
    /// The entry is removed, so of any number of concurrent claims on the
    /// same pid exactly one succeeds.
    pub fn claim(&self, pid: Pid) -> Option<Arc<ExitRecord>> {
        self.entries.lock().remove(&pid)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry; used when the owner exits.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// A user process.
#[derive(Debug)]
pub struct Process {
    pid: Pid,
    name: Mutex<String>,
    space: Mutex<SpaceId>,
    parent: Option<Pid>,
    exit: Arc<ExitRecord>,
    children: ChildSet,
}

impl Process {
    pub fn new(pid: Pid, name: &str, space: SpaceId, parent: Option<Pid>) -> Self {
        Self {
            pid,
            name: Mutex::new(String::from(clip_name(name))),
            space: Mutex::new(space),
            parent,
            exit: Arc::new(ExitRecord::new(pid)),
            children: ChildSet::new(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub fn rename(&self, name: &str) {
        *self.name.lock() = String::from(clip_name(name));
    }

    pub fn space(&self) -> SpaceId {
        *self.space.lock()
    }

    /// Install a new address space, returning the one it replaces.
    pub fn replace_space(&self, space: SpaceId) -> SpaceId {
        core::mem::replace(&mut *self.space.lock(), space)
    }

    /// Pid of the process that forked this one, for lookup only.
    pub fn parent(&self) -> Option<Pid> {
        self.parent
    }

    /// This process's own exit record.
    pub fn exit_record(&self) -> &Arc<ExitRecord> {
        &self.exit
    }

    pub fn children(&self) -> &ChildSet {
        &self.children
    }
}

/// All live processes, indexed by pid.
#[derive(Debug)]
pub struct ProcessTable {
    procs: Mutex<BTreeMap<Pid, Arc<Process>>>,
    next_pid: AtomicU32,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    pub const fn new() -> Self {
        Self {
            procs: Mutex::new(BTreeMap::new()),
            next_pid: AtomicU32::new(1),
        }
    }

    /// Hand out a fresh pid. Pids are never reused, so once the space is
    /// used up every further allocation fails.
    pub fn allocate_pid(&self) -> Result<Pid, ResourceExhausted> {
        self.next_pid
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| next.checked_add(1))
            .map(Pid::new)
            .map_err(|_| ResourceExhausted)
    }

    /// Move the pid counter forward to `next`.
    #[cfg(test)]
    pub(crate) fn skip_to(&self, next: u32) {
        self.next_pid.store(next, Ordering::Relaxed);
    }

    pub fn insert(&self, process: Arc<Process>) {
        self.procs.lock().insert(process.pid(), process);
    }

    pub fn get(&self, pid: Pid) -> Option<Arc<Process>> {
        self.procs.lock().get(&pid).cloned()
    }

    pub fn remove(&self, pid: Pid) -> Option<Arc<Process>> {
        self.procs.lock().remove(&pid)
    }

    pub fn len(&self) -> usize {
        self.procs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
