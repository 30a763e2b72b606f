//! System Call Pointer Validation
//!
//! Every pointer a user program hands to the kernel goes through here before
//! a single byte behind it is read.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: null, kernel-half, and unmapped addresses are rejected
//! - A [`UserPage`] can only be obtained from [`UserMemory::validate`], so
//!   there is no way to read user memory without the check
//! - Handles borrow the per-call [`UserMemory`]; nothing validated survives
//!   into the next system call, where the user may have unmapped it
//! - TOCTOU: strings are copied into kernel memory before use

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::mm::{VirtAddr, PAGE_SIZE};
use crate::services::{AddressSpaces, SpaceId};

/// A user address the kernel must not touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidAccess {
    pub addr: VirtAddr,
}

impl fmt::Display for InvalidAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid user access at {}", self.addr)
    }
}

/// Failure to copy a string in from user memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyError {
    /// A byte of the string lies on an invalid page.
    Fault(InvalidAccess),
    /// No terminator within the allowed length.
    TooLong,
}

impl From<InvalidAccess> for CopyError {
    fn from(fault: InvalidAccess) -> Self {
        Self::Fault(fault)
    }
}

/// The calling process's view of user memory for one system call.
pub struct UserMemory<'k> {
    mm: &'k dyn AddressSpaces,
    space: SpaceId,
}

/// A user page proven mapped at validation time.
///
/// Reads go through the kernel mapping of the backing frame.
pub struct UserPage<'a> {
    base: VirtAddr,
    frame: NonNull<u8>,
    _call: PhantomData<&'a UserMemory<'a>>,
}

impl<'a> UserPage<'a> {
    /// First address of the page.
    #[inline]
    pub fn base(&self) -> VirtAddr {
        self.base
    }

    /// Read the byte at `offset` within the page.
    ///
    /// # Panics
    /// Panics if `offset >= PAGE_SIZE`.
    pub fn read(&self, offset: usize) -> u8 {
        assert!(offset < PAGE_SIZE, "offset {offset:#x} outside page");
        // SAFETY:
        // - `frame` came from the memory subsystem's translation of a
        //   mapped page of the calling process during this call
        // - offset is bounds-checked against the page size above
        // - Volatile: the user may write the page concurrently
        unsafe { self.frame.as_ptr().add(offset).read_volatile() }
    }
}

impl<'k> UserMemory<'k> {
    pub fn new(mm: &'k dyn AddressSpaces, space: SpaceId) -> Self {
        Self { mm, space }
    }

    /// Check that `addr` may be dereferenced on behalf of the caller.
    ///
    /// # Security Checks
    /// 1. Address is not null
    /// 2. Address is below the kernel base
    /// 3. The containing page is mapped in the caller's address space
    pub fn validate(&self, addr: VirtAddr) -> Result<UserPage<'_>, InvalidAccess> {
        if !addr.is_user() {
            return Err(InvalidAccess { addr });
        }

        let base = addr.page_base();
        let frame = self
            .mm
            .translate(self.space, base)
            .ok_or(InvalidAccess { addr })?;

        Ok(UserPage {
            base,
            frame,
            _call: PhantomData,
        })
    }

    /// Copy a NUL-terminated string, keeping at most `limit` bytes.
    ///
    /// Longer strings are truncated; bytes past `limit` are never read.
    pub fn read_cstr(&self, addr: VirtAddr, limit: usize) -> Result<String, InvalidAccess> {
        let (bytes, _) = self.scan_cstr(addr, limit)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Copy a NUL-terminated string of at most `limit` bytes.
    pub fn read_cstr_bounded(&self, addr: VirtAddr, limit: usize) -> Result<String, CopyError> {
        let (bytes, terminated) = self.scan_cstr(addr, limit + 1)?;
        if !terminated {
            return Err(CopyError::TooLong);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read up to `max` bytes or the terminator, validating each page as
    /// the scan enters it.
    fn scan_cstr(&self, addr: VirtAddr, max: usize) -> Result<(Vec<u8>, bool), InvalidAccess> {
        let mut bytes = Vec::new();
        let mut cursor = addr;
        let mut remaining = max;

        while remaining > 0 {
            let page = self.validate(cursor)?;
            let start = cursor.page_offset();
            let span = (PAGE_SIZE - start).min(remaining);

            for offset in start..start + span {
                let byte = page.read(offset);
                if byte == 0 {
                    return Ok((bytes, true));
                }
                bytes.push(byte);
            }

            remaining -= span;
            cursor = page
                .base()
                .checked_add(PAGE_SIZE)
                .ok_or(InvalidAccess { addr: cursor })?;
        }

        Ok((bytes, false))
    }
}
