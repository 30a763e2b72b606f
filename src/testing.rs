//! Host-side mock collaborators for unit tests.
//!
//! Each simulated process runs on a std thread bound to its pid. `park` and
//! `unpark` map onto `std::thread::park`/`Thread::unpark`, which keep a
//! pending wakeup the same way the kernel scheduler must. Non-returning
//! collaborator calls unwind with a marker payload that `call_as` turns into
//! an [`Outcome`].

use std::boxed::Box;
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::string::String;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, Thread};
use std::time::Duration;
use std::vec::Vec;

use crate::mm::{VirtAddr, PAGE_SIZE};
use crate::process::{ExitRecord, ExitStatus, Pid};
use crate::services::{
    AddressSpaces, Console, LoadError, Loader, Machine, ResourceExhausted, SpaceId, Threads,
};
use crate::trap::RegisterFrame;
use crate::{Kernel, Services};

/// Entry point the mock loader puts in `rip`.
pub const ENTRY_POINT: u64 = 0x40_00e8;

/// Where `Harness::string` places user strings.
const STRING_AREA: usize = 0x4000_0000;

thread_local! {
    static CURRENT: Cell<Option<Pid>> = const { Cell::new(None) };
}

/// Unwind payload for `Threads::exit_current`.
struct Terminated;

/// Unwind payload for `Machine::power_off`.
struct PoweredOff;

#[derive(Default)]
pub struct MockThreads {
    handles: Mutex<BTreeMap<Pid, Vec<Thread>>>,
    parks: Mutex<BTreeMap<Pid, usize>>,
    spawned: Mutex<Vec<(Pid, RegisterFrame)>>,
    fail_spawn: AtomicBool,
}

impl MockThreads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the calling std thread run as `pid`.
    pub fn bind(&self, pid: Pid) {
        CURRENT.with(|current| current.set(Some(pid)));
        let me = thread::current();
        let mut handles = self.handles.lock().unwrap();
        let threads = handles.entry(pid).or_default();
        if !threads.iter().any(|t| t.id() == me.id()) {
            threads.push(me);
        }
    }

    /// Run `f` on a new std thread bound to `pid`.
    pub fn start<T, F>(self: &Arc<Self>, pid: Pid, f: F) -> JoinHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&MockThreads) -> T + Send + 'static,
    {
        let threads = Arc::clone(self);
        let handle = thread::spawn(move || {
            CURRENT.with(|current| current.set(Some(pid)));
            f(&threads)
        });
        self.handles
            .lock()
            .unwrap()
            .entry(pid)
            .or_default()
            .push(handle.thread().clone());
        handle
    }

    /// Spin until `pid` has parked at least once.
    pub fn wait_until_parked(&self, pid: Pid) {
        while self.parks.lock().unwrap().get(&pid).copied().unwrap_or(0) == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    pub fn spawned(&self) -> Vec<(Pid, RegisterFrame)> {
        self.spawned.lock().unwrap().clone()
    }

    pub fn fail_next_spawn(&self) {
        self.fail_spawn.store(true, Ordering::SeqCst);
    }
}

impl Threads for MockThreads {
    fn current(&self) -> Pid {
        CURRENT
            .with(|current| current.get())
            .expect("std thread not bound to a pid")
    }

    fn spawn(&self, pid: Pid, frame: RegisterFrame) -> Result<(), ResourceExhausted> {
        if self.fail_spawn.swap(false, Ordering::SeqCst) {
            return Err(ResourceExhausted);
        }
        self.spawned.lock().unwrap().push((pid, frame));
        Ok(())
    }

    fn park(&self) {
        let pid = self.current();
        *self.parks.lock().unwrap().entry(pid).or_default() += 1;
        thread::park();
    }

    fn unpark(&self, pid: Pid) {
        if let Some(threads) = self.handles.lock().unwrap().get(&pid) {
            for t in threads {
                t.unpark();
            }
        }
    }

    fn exit_current(&self) -> ! {
        panic::resume_unwind(Box::new(Terminated))
    }
}

/// Address spaces backed by boxed pages.
#[derive(Default)]
pub struct MockMemory {
    pages: Mutex<BTreeMap<(SpaceId, usize), Box<[u8; PAGE_SIZE]>>>,
    live: Mutex<BTreeSet<SpaceId>>,
    active: Mutex<Option<SpaceId>>,
    next_space: AtomicUsize,
    fail_duplicate: AtomicBool,
    fail_create: AtomicBool,
}

impl MockMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_space(&self) -> SpaceId {
        let space = SpaceId(self.next_space.fetch_add(1, Ordering::SeqCst) + 1);
        self.live.lock().unwrap().insert(space);
        space
    }

    /// Map a zeroed page containing `addr`.
    pub fn map(&self, space: SpaceId, addr: usize) {
        let base = VirtAddr::new(addr).page_base().as_usize();
        self.pages
            .lock()
            .unwrap()
            .entry((space, base))
            .or_insert_with(|| Box::new([0; PAGE_SIZE]));
    }

    pub fn unmap(&self, space: SpaceId, addr: usize) {
        let base = VirtAddr::new(addr).page_base().as_usize();
        self.pages.lock().unwrap().remove(&(space, base));
    }

    /// Store `bytes` at `addr`, mapping pages as needed.
    pub fn write(&self, space: SpaceId, addr: usize, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            let va = VirtAddr::new(addr + i);
            self.map(space, va.as_usize());
            let mut pages = self.pages.lock().unwrap();
            let page = pages.get_mut(&(space, va.page_base().as_usize())).unwrap();
            page[va.page_offset()] = byte;
        }
    }

    /// Read a NUL-terminated string without any validation.
    pub fn read_string(&self, space: SpaceId, addr: usize) -> String {
        let pages = self.pages.lock().unwrap();
        let mut out = String::new();
        for i in 0.. {
            let va = VirtAddr::new(addr + i);
            let byte = pages[&(space, va.page_base().as_usize())][va.page_offset()];
            if byte == 0 {
                break;
            }
            out.push(byte as char);
        }
        out
    }

    pub fn is_live(&self, space: SpaceId) -> bool {
        self.live.lock().unwrap().contains(&space)
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn active(&self) -> Option<SpaceId> {
        *self.active.lock().unwrap()
    }

    pub fn fail_next_duplicate(&self) {
        self.fail_duplicate.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }
}

impl AddressSpaces for MockMemory {
    fn translate(&self, space: SpaceId, page: VirtAddr) -> Option<NonNull<u8>> {
        let mut pages = self.pages.lock().unwrap();
        pages
            .get_mut(&(space, page.as_usize()))
            .and_then(|frame| NonNull::new(frame.as_mut_ptr()))
    }

    fn create(&self) -> Option<SpaceId> {
        if self.fail_create.swap(false, Ordering::SeqCst) {
            return None;
        }
        Some(self.fresh_space())
    }

    fn duplicate(&self, space: SpaceId) -> Option<SpaceId> {
        if self.fail_duplicate.swap(false, Ordering::SeqCst) {
            return None;
        }
        let copy = self.fresh_space();
        let mut pages = self.pages.lock().unwrap();
        let cloned: Vec<_> = pages
            .iter()
            .filter(|((owner, _), _)| *owner == space)
            .map(|((_, base), frame)| ((copy, *base), frame.clone()))
            .collect();
        pages.extend(cloned);
        Some(copy)
    }

    fn activate(&self, space: SpaceId) {
        *self.active.lock().unwrap() = Some(space);
    }

    fn release(&self, space: SpaceId) {
        self.pages
            .lock()
            .unwrap()
            .retain(|(owner, _), _| *owner != space);
        self.live.lock().unwrap().remove(&space);
    }
}

/// Loader that knows a fixed set of program names.
#[derive(Default)]
pub struct MockLoader {
    programs: Mutex<BTreeSet<String>>,
}

impl MockLoader {
    pub fn install(&self, program: &str) {
        self.programs.lock().unwrap().insert(program.into());
    }
}

impl Loader for MockLoader {
    fn load(&self, _space: SpaceId, cmdline: &str, frame: &mut RegisterFrame) -> Result<(), LoadError> {
        let program = cmdline.split_whitespace().next().ok_or(LoadError::NotFound)?;
        if !self.programs.lock().unwrap().contains(program) {
            return Err(LoadError::NotFound);
        }
        *frame = RegisterFrame {
            rip: ENTRY_POINT,
            rsp: 0x4747_ffd0,
            rdi: cmdline.split_whitespace().count() as u64,
            ..Default::default()
        };
        Ok(())
    }
}

#[derive(Default)]
pub struct MockConsole {
    output: Mutex<String>,
}

impl MockConsole {
    pub fn output(&self) -> String {
        self.output.lock().unwrap().clone()
    }
}

impl Console for MockConsole {
    fn write_str(&self, s: &str) {
        self.output.lock().unwrap().push_str(s);
    }
}

pub struct MockMachine;

impl Machine for MockMachine {
    fn power_off(&self) -> ! {
        panic::resume_unwind(Box::new(PoweredOff))
    }
}

/// How a system call ended for its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Returned,
    Exited,
    PoweredOff,
}

/// A kernel wired to fresh mocks. Everything is leaked so simulated
/// processes can run on their own threads.
#[derive(Clone, Copy)]
pub struct Harness {
    pub kernel: &'static Kernel<'static>,
    pub threads: &'static Arc<MockThreads>,
    pub memory: &'static MockMemory,
    pub loader: &'static MockLoader,
    console: &'static MockConsole,
    records: &'static Mutex<BTreeMap<Pid, Arc<ExitRecord>>>,
    next_string: &'static AtomicUsize,
}

impl Harness {
    pub fn new() -> Self {
        let threads: &'static Arc<MockThreads> =
            Box::leak(Box::new(Arc::new(MockThreads::new())));
        let memory: &'static MockMemory = Box::leak(Box::new(MockMemory::new()));
        let loader: &'static MockLoader = Box::leak(Box::new(MockLoader::default()));
        let console: &'static MockConsole = Box::leak(Box::new(MockConsole::default()));
        let machine: &'static MockMachine = Box::leak(Box::new(MockMachine));

        let kernel = Box::leak(Box::new(Kernel::new(Services {
            threads: &**threads,
            memory,
            loader,
            console,
            machine,
        })));

        Self {
            kernel,
            threads,
            memory,
            loader,
            console,
            records: Box::leak(Box::new(Mutex::new(BTreeMap::new()))),
            next_string: Box::leak(Box::new(AtomicUsize::new(STRING_AREA))),
        }
    }

    /// Create a parentless process with a fresh address space.
    pub fn initial(&self, name: &str) -> Pid {
        let pid = self
            .kernel
            .spawn_initial(name, self.memory.fresh_space())
            .expect("pid space exhausted");
        self.track(pid);
        pid
    }

    /// Remember `pid`'s exit record so its status stays observable.
    pub fn track(&self, pid: Pid) {
        let process = self.kernel.processes().get(pid).expect("no such process");
        self.records
            .lock()
            .unwrap()
            .insert(pid, Arc::clone(process.exit_record()));
    }

    pub fn exit_status(&self, pid: Pid) -> Option<ExitStatus> {
        self.records.lock().unwrap().get(&pid).and_then(|r| r.status())
    }

    pub fn space(&self, pid: Pid) -> SpaceId {
        self.kernel.processes().get(pid).expect("no such process").space()
    }

    /// Place a NUL-terminated copy of `s` in `pid`'s memory.
    pub fn string(&self, pid: Pid, s: &str) -> u64 {
        let addr = self.next_string.fetch_add(0x100, Ordering::SeqCst);
        let mut bytes = Vec::from(s.as_bytes());
        bytes.push(0);
        self.memory.write(self.space(pid), addr, &bytes);
        addr as u64
    }

    pub fn read_string(&self, pid: Pid, addr: u64) -> String {
        self.memory.read_string(self.space(pid), addr as usize)
    }

    pub fn console(&self) -> String {
        self.console.output()
    }

    /// Issue the call in `frame` as `pid` on the current std thread.
    pub fn call_as(&self, pid: Pid, frame: &mut RegisterFrame) -> Outcome {
        self.threads.bind(pid);
        let kernel = self.kernel;
        match panic::catch_unwind(AssertUnwindSafe(|| kernel.handle(frame))) {
            Ok(()) => Outcome::Returned,
            Err(payload) if payload.is::<Terminated>() => Outcome::Exited,
            Err(payload) if payload.is::<PoweredOff>() => Outcome::PoweredOff,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Issue the call in `frame` as `pid` on a new std thread.
    pub fn run_as(&self, pid: Pid, mut frame: RegisterFrame) -> JoinHandle<(Outcome, RegisterFrame)> {
        let harness = *self;
        self.threads.start(pid, move |_| {
            let outcome = harness.call_as(pid, &mut frame);
            (outcome, frame)
        })
    }
}
