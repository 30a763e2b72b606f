//! Kernel Collaborators
//!
//! The system-call core does not schedule threads, walk page tables, load
//! executables, or drive hardware. It reaches the subsystems that do through
//! the traits below, bundled into a [`Kernel`](crate::Kernel) that every
//! handler receives explicitly.
//!
//! # Contracts
//! - `Threads::park` must not lose a wakeup: an `unpark` delivered before
//!   `park` makes the next `park` return immediately
//! - Operations returning `!` never schedule further code in the caller's
//!   context

use core::fmt;
use core::ptr::NonNull;

use crate::mm::VirtAddr;
use crate::process::Pid;
use crate::trap::RegisterFrame;

/// Opaque handle to an address space owned by the memory subsystem.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct SpaceId(pub usize);

/// An allocation inside a collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceExhausted;

impl fmt::Display for ResourceExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("out of kernel resources")
    }
}

/// Reasons a program image could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// No executable with that name.
    NotFound,
    /// The file is not a loadable executable.
    BadImage,
    /// Memory for segments or stack could not be allocated.
    OutOfMemory,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "executable not found"),
            Self::BadImage => write!(f, "not a loadable image"),
            Self::OutOfMemory => write!(f, "out of memory while loading"),
        }
    }
}

/// Thread and scheduling subsystem.
pub trait Threads: Sync {
    /// Pid of the context executing right now.
    fn current(&self) -> Pid;

    /// Start a new context for `pid` that enters user mode with `frame`.
    fn spawn(&self, pid: Pid, frame: RegisterFrame) -> Result<(), ResourceExhausted>;

    /// Block the current context until it is unparked.
    ///
    /// May return spuriously; callers re-check their condition.
    fn park(&self);

    /// Wake `pid` if parked, or arm its next `park` to return at once.
    fn unpark(&self, pid: Pid);

    /// Destroy the current context. Never returns.
    fn exit_current(&self) -> !;
}

/// Virtual-memory subsystem.
pub trait AddressSpaces: Sync {
    /// Kernel-accessible pointer to the frame backing `page` in `space`.
    ///
    /// `page` is page-aligned. Returns `None` when the page is not mapped.
    fn translate(&self, space: SpaceId, page: VirtAddr) -> Option<NonNull<u8>>;

    /// Create an empty user address space.
    fn create(&self) -> Option<SpaceId>;

    /// Clone `space` into a new address space.
    fn duplicate(&self, space: SpaceId) -> Option<SpaceId>;

    /// Make `space` the one user mode runs in on return from this call.
    fn activate(&self, space: SpaceId);

    /// Tear down `space` and every frame it owns.
    fn release(&self, space: SpaceId);
}

/// Program loader.
pub trait Loader: Sync {
    /// Load the program named by `cmdline` into `space` and fill `frame`
    /// with its entry register state (instruction and stack pointers,
    /// argument registers).
    fn load(&self, space: SpaceId, cmdline: &str, frame: &mut RegisterFrame)
        -> Result<(), LoadError>;
}

/// User-visible console.
pub trait Console: Sync {
    fn write_str(&self, s: &str);
}

/// Whole-machine control.
pub trait Machine: Sync {
    fn power_off(&self) -> !;
}
