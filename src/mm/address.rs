//! Virtual Address Type
//!
//! Type-safe wrapper for user-supplied virtual addresses on x86-64.
//!
//! # Security Properties
//! - Kernel-half and non-canonical addresses are classified before any use
//! - Addresses cannot be dereferenced directly; the kernel only reads user
//!   memory through pages translated by the memory subsystem

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// Virtual memory layout shared with the memory subsystem.
pub mod layout {
    /// First kernel virtual address. Everything at or above it is reserved
    /// for the kernel and never accessible from user mode.
    pub const KERN_BASE: usize = 0x0000_0080_0400_0000;
}

/// A virtual memory address as supplied by user code.
///
/// Construction never fails: user code may pass any 64-bit value, and the
/// classification methods decide what the kernel may do with it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtAddr(usize);

impl VirtAddr {
    /// Wrap a raw address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check for the null address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Check if this address lies in the kernel-reserved range.
    ///
    /// Non-canonical addresses count as kernel addresses: user mode can
    /// never map them either.
    #[inline]
    pub const fn is_kernel(self) -> bool {
        self.0 >= layout::KERN_BASE
    }

    /// Check if this address may name user memory at all.
    #[inline]
    pub const fn is_user(self) -> bool {
        !self.is_null() && !self.is_kernel()
    }

    /// Align the address down to the start of its page.
    #[inline]
    pub const fn page_base(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Add an offset, failing on wrap-around.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#018x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
