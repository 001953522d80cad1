//! Two-level paging (C8): page directory + page tables, identity-mapped
//! up to `config::IDENTITY_MAP_CAP`.
//!
//! Grounded on `original_source/src/managers/memory/paging.c`'s
//! `paging_map_page`/`identity_map_region`/`paging_enable`. The source
//! computes its identity-map ceiling from the kernel/module/bitmap
//! layout at runtime; this rewrite uses the static `IDENTITY_MAP_CAP`
//! from `config` instead, consistent with `frame`'s statically-sized
//! bitmap.

use super::frame;
use crate::config::{IDENTITY_MAP_CAP, PAGE_SIZE};
use crate::error::{KernelError, KernelResult};

const ENTRIES_PER_TABLE: usize = 1024;

const PAGE_PRESENT: u32 = 1 << 0;
const PAGE_WRITE: u32 = 1 << 1;
const PAGE_USER: u32 = 1 << 2;

/// Flags every identity-mapped page is installed with: present,
/// writable, and user-accessible so ring-3 code can dereference the
/// flat physical-address view (§4.8).
pub const FLAGS_PRESENT_WRITE_USER: u32 = PAGE_PRESENT | PAGE_WRITE | PAGE_USER;

static mut PAGE_DIRECTORY: *mut u32 = core::ptr::null_mut();

fn directory() -> &'static mut [u32; ENTRIES_PER_TABLE] {
    // SAFETY: `PAGE_DIRECTORY` is set once by `init` before any other
    // paging call and never reassigned afterward.
    unsafe { &mut *(PAGE_DIRECTORY as *mut [u32; ENTRIES_PER_TABLE]) }
}

/// Map one 4 KiB page. Allocates a new page table from [`frame`] on
/// first use of a given directory entry.
///
/// # Safety
/// Must run after [`init`] and before [`enable`], or with paging
/// already enabled and `virt`/`phys` chosen so as not to corrupt a
/// live mapping the caller depends on.
pub unsafe fn map_page(virt: u32, phys: u32, flags: u32) -> KernelResult<()> {
    let dir_index = (virt >> 22) as usize;
    let table_index = ((virt >> 12) & 0x3FF) as usize;

    let dir = directory();
    let table_ptr = if dir[dir_index] & PAGE_PRESENT == 0 {
        let table_phys = frame::alloc()?;
        let table = table_phys as *mut u32;
        // SAFETY: `table_phys` was just allocated and is identity-mapped
        // or directly addressable before paging is enabled.
        unsafe {
            for i in 0..ENTRIES_PER_TABLE {
                table.add(i).write(0);
            }
        }
        dir[dir_index] = table_phys | PAGE_PRESENT | PAGE_WRITE | PAGE_USER;
        table
    } else {
        (dir[dir_index] & 0xFFFF_F000) as *mut u32
    };

    // SAFETY: `table_ptr` names a valid, zeroed or previously-installed
    // page table with at least `ENTRIES_PER_TABLE` entries.
    unsafe {
        table_ptr
            .add(table_index)
            .write((phys & 0xFFFF_F000) | flags);
    }
    Ok(())
}

/// Identity-map `[start, end)`, page-aligned outward.
///
/// # Safety
/// Same as [`map_page`], applied once per page in the range.
pub unsafe fn identity_map_region(start: u32, end: u32) -> KernelResult<()> {
    let start = start & !(PAGE_SIZE - 1);
    let end = (end + PAGE_SIZE - 1) & !(PAGE_SIZE - 1);
    let mut addr = start;
    while addr < end {
        // SAFETY: forwarded from this function's contract.
        unsafe {
            map_page(addr, addr, FLAGS_PRESENT_WRITE_USER)?;
        }
        addr += PAGE_SIZE;
    }
    Ok(())
}

/// Allocate the page directory and identity-map `0..IDENTITY_MAP_CAP`.
/// Does not enable paging; call [`enable`] once this returns.
pub fn init() -> KernelResult<()> {
    let dir_phys = frame::alloc()?;
    // SAFETY: `dir_phys` was just allocated; nothing else can observe it
    // until this function finishes installing `PAGE_DIRECTORY`.
    unsafe {
        let dir = dir_phys as *mut u32;
        for i in 0..ENTRIES_PER_TABLE {
            dir.add(i).write(0);
        }
        PAGE_DIRECTORY = dir;
        identity_map_region(0, IDENTITY_MAP_CAP)?;
    }
    Ok(())
}

/// Load `CR3` with the page directory and set `CR0.PG`/`CR0.WP`.
///
/// # Safety
/// [`init`] must have run. The identity map must cover every address
/// the kernel touches from this point forward, including its own code
/// and the stack currently in use.
pub unsafe fn enable() -> KernelResult<()> {
    if PAGE_DIRECTORY.is_null() {
        return Err(KernelError::OutOfFrames);
    }
    // SAFETY: caller-asserted per function contract; mirrors
    // `paging_enable`'s CR3 load, CR0.PG|WP set, and CR3 reload to
    // flush stale TLB entries.
    unsafe {
        core::arch::asm!(
            "mov cr3, {dir}",
            "mov {tmp}, cr0",
            "or {tmp}, 0x8001_0001",
            "mov cr0, {tmp}",
            "mov {tmp}, cr3",
            "mov cr3, {tmp}",
            dir = in(reg) PAGE_DIRECTORY as u32,
            tmp = out(reg) _,
            options(nostack),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn flags_are_present_write_user() {
        assert_eq!(FLAGS_PRESENT_WRITE_USER, 0b111);
    }
}
