//! Kernel heap (C9): a free-list allocator over pages mapped by
//! [`crate::memory::paging`].
//!
//! Mapped through the hand-rolled paging module rather than a
//! `Mapper`/`FrameAllocator` trait pair, keeping
//! `linked_list_allocator::LockedHeap` installed as the
//! `#[global_allocator]` unchanged.

use linked_list_allocator::LockedHeap;

use crate::config::{HEAP_SIZE, HEAP_START};
use crate::error::KernelResult;
use crate::memory::paging;

/// Map and hand the heap region to the global allocator.
///
/// # Errors
/// Propagates [`crate::error::KernelError::OutOfFrames`] if the frame
/// allocator cannot satisfy every page in the heap range.
///
/// # Safety
/// Must run exactly once, after paging is enabled, and before any
/// allocation is attempted.
pub unsafe fn init_heap() -> KernelResult<()> {
    // SAFETY: forwarded from this function's contract; the heap range
    // is reserved for this purpose and mapped nowhere else.
    unsafe {
        paging::identity_map_region(
            HEAP_START as u32,
            (HEAP_START + HEAP_SIZE) as u32,
        )?;
        ALLOCATOR.lock().init(HEAP_START as *mut u8, HEAP_SIZE);
    }
    Ok(())
}

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();
