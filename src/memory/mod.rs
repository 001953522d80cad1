//! Physical memory management (C7) and paging (C8).
//!
//! Split into two submodules the way `original_source/src/managers/memory/`
//! splits `pmm.c` and `paging.c`: the frame allocator owns the bitmap and
//! knows nothing about page tables, and paging is built entirely in terms
//! of the frame allocator's `alloc`/`free`/`mark_region_used` contract.

pub mod frame;
pub mod paging;
