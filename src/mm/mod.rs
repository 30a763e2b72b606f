//! Memory management module
//!
//! Provides:
//! - Kernel heap allocation
//! - User virtual address classification
//!
//! Page tables themselves belong to the memory subsystem behind
//! [`AddressSpaces`](crate::services::AddressSpaces).

mod address;
mod allocator;

pub use address::{layout, VirtAddr, PAGE_MASK, PAGE_SIZE};
pub use allocator::{heap_size, init_heap};
