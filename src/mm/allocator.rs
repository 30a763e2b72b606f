//! Kernel Heap Allocator
//!
//! Uses `linked_list_allocator` for heap management on bare-metal builds.
//! Process records, child sets, and copied-in user strings all live here.
//!
//! Host builds (unit tests, tooling) use the platform allocator instead.
//!
//! # Security Considerations
//! - Heap is initialized once during boot, before the first process exists
//! - linked_list_allocator provides bounds checking

/// Maximum heap size (256 KiB)
const HEAP_SIZE: usize = 256 * 1024;

#[cfg(target_os = "none")]
mod global {
    use linked_list_allocator::LockedHeap;

    use super::HEAP_SIZE;

    /// Global heap allocator instance
    #[global_allocator]
    pub(super) static ALLOCATOR: LockedHeap = LockedHeap::empty();

    /// Static heap memory region
    pub(super) static mut HEAP_MEMORY: [u8; HEAP_SIZE] = [0; HEAP_SIZE];
}

/// Initialize the kernel heap
///
/// Must be called exactly once during kernel initialization, before any
/// heap allocations are made. A no-op on hosted builds.
pub fn init_heap() {
    install();
    log::debug!("heap: {} KiB", HEAP_SIZE / 1024);
}

#[cfg(target_os = "none")]
fn install() {
    // SAFETY:
    // - HEAP_MEMORY is a valid static array only touched here
    // - init_heap is only called once during boot
    unsafe {
        let heap_start = (&raw mut global::HEAP_MEMORY).cast::<u8>();
        global::ALLOCATOR.lock().init(heap_start, HEAP_SIZE);
    }
}

#[cfg(not(target_os = "none"))]
fn install() {}

/// Get the size of the kernel heap
pub fn heap_size() -> usize {
    HEAP_SIZE
}
