//! Bitmap physical frame allocator (C7).
//!
//! Grounded on `original_source/src/managers/memory/pmm.c`: one bit per
//! 4 KiB frame (1 = used), first-fit allocation, idempotent
//! `mark_region_used`. The source places its bitmap just past the kernel
//! and module images at a runtime-computed address; this rewrite instead
//! sizes the bitmap statically for the whole identity-mapped region
//! (`config::IDENTITY_MAP_CAP`), avoiding the linker-script bookkeeping
//! the source needs to locate `kernel_end` — the corpus has no precedent
//! for a custom linker script, so this keeps bringup free of one.

use spin::Mutex;

use crate::config::{IDENTITY_MAP_CAP, PAGE_SIZE, PHYSICAL_MEMORY_START};
use crate::error::{KernelError, KernelResult};
use crate::multiboot::MachineInfo;

/// Upper bound on tracked frames, sized for the whole identity-mapped
/// region. [`init`] narrows the live count down to what the machine
/// description actually reports; until [`init`] runs, the full capacity
/// is tracked (matches this module's pre-bringup unit tests).
const CAPACITY_FRAMES: usize = (IDENTITY_MAP_CAP / PAGE_SIZE) as usize;
const BITMAP_WORDS: usize = CAPACITY_FRAMES.div_ceil(32);

struct Bitmap {
    words: [u32; BITMAP_WORDS],
    used: usize,
    total: usize,
}

impl Bitmap {
    const fn new() -> Self {
        Self {
            words: [0; BITMAP_WORDS],
            used: 0,
            total: CAPACITY_FRAMES,
        }
    }

    fn test(&self, frame: usize) -> bool {
        self.words[frame / 32] & (1 << (frame % 32)) != 0
    }

    fn set(&mut self, frame: usize) {
        if !self.test(frame) {
            self.words[frame / 32] |= 1 << (frame % 32);
            self.used += 1;
        }
    }

    fn clear(&mut self, frame: usize) {
        if self.test(frame) {
            self.words[frame / 32] &= !(1 << (frame % 32));
            self.used -= 1;
        }
    }
}

static BITMAP: Mutex<Bitmap> = Mutex::new(Bitmap::new());

/// Derive the tracked frame count from the machine description
/// (§4.7's "compute total pages from the machine description") and
/// narrow the allocator/`stats` view to it. `mem_upper_kb` is the
/// amount of memory above 1 MiB per the multiboot v1 contract, which is
/// exactly the region this allocator tracks (`PHYSICAL_MEMORY_START`
/// onward), so the frame count is `mem_upper_kb * 1024 / PAGE_SIZE`,
/// clamped to the bitmap's fixed capacity. Call once, before paging
/// init, so `alloc` never hands out a frame past the machine's real RAM
/// ceiling.
pub fn init(machine: &MachineInfo) {
    let reported = (machine.mem_upper_kb as u64 * 1024 / u64::from(PAGE_SIZE)) as usize;
    let mut bitmap = BITMAP.lock();
    bitmap.total = reported.min(CAPACITY_FRAMES);
}

fn addr_to_frame(addr: u32) -> usize {
    ((addr - PHYSICAL_MEMORY_START) / PAGE_SIZE) as usize
}

fn frame_to_addr(frame: usize) -> u32 {
    PHYSICAL_MEMORY_START + (frame as u32) * PAGE_SIZE
}

/// Mark every frame in `[start, end)` as used. Out-of-range frames are
/// silently clamped to the tracked region; already-used frames are a
/// no-op, matching `pmm_mark_region_used`'s idempotence.
pub fn mark_region_used(start: u32, end: u32) {
    if end <= PHYSICAL_MEMORY_START {
        return;
    }
    let start = start.max(PHYSICAL_MEMORY_START) & !(PAGE_SIZE - 1);
    let end = (end + PAGE_SIZE - 1) & !(PAGE_SIZE - 1);

    let start_frame = addr_to_frame(start);

    let mut bitmap = BITMAP.lock();
    let end_frame = addr_to_frame(end).min(bitmap.total);
    for frame in start_frame..end_frame {
        bitmap.set(frame);
    }
}

/// Allocate a single physical frame, first-fit.
pub fn alloc() -> KernelResult<u32> {
    let mut bitmap = BITMAP.lock();
    for frame in 0..bitmap.total {
        if !bitmap.test(frame) {
            bitmap.set(frame);
            return Ok(frame_to_addr(frame));
        }
    }
    Err(KernelError::OutOfFrames)
}

/// Free a previously allocated frame. A double-free or an out-of-range
/// address is silently ignored, matching `pmm_free_page`'s behavior.
pub fn free(addr: u32) {
    if addr < PHYSICAL_MEMORY_START {
        return;
    }
    let frame = addr_to_frame(addr);
    let mut bitmap = BITMAP.lock();
    if frame < bitmap.total {
        bitmap.clear(frame);
    }
}

/// `(free_frames, total_frames)`, surfaced for diagnostics and tests.
pub fn stats() -> (usize, usize) {
    let bitmap = BITMAP.lock();
    (bitmap.total - bitmap.used, bitmap.total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn alloc_then_free_returns_same_frame() {
        let (free_before, _) = stats();
        let frame = alloc().expect("allocation should succeed");
        let (free_after, _) = stats();
        assert_eq!(free_after, free_before - 1);
        free(frame);
        let (free_restored, _) = stats();
        assert_eq!(free_restored, free_before);
    }

    #[test_case]
    fn mark_region_used_is_idempotent() {
        let (free_before, _) = stats();
        mark_region_used(PHYSICAL_MEMORY_START, PHYSICAL_MEMORY_START + PAGE_SIZE);
        let (free_once, _) = stats();
        mark_region_used(PHYSICAL_MEMORY_START, PHYSICAL_MEMORY_START + PAGE_SIZE);
        let (free_twice, _) = stats();
        assert_eq!(free_once, free_before - 1);
        assert_eq!(free_twice, free_once);
        free(PHYSICAL_MEMORY_START);
    }
}
