//! Descriptor tables (C4): GDT, TSS, and the selectors derived from them.
//!
//! A 32-bit kernel needs 8-byte GDT entries with a different bit layout
//! and a 32-bit TSS with no interrupt-stack-table field at all, so both
//! are hand-rolled here, grounded on
//! `original_source/src/managers/gdt/gdt.c`'s `gdt_entry`/`tss_entry`
//! layouts and access-byte values, in the style
//! `other_examples/c7876431_TitanHZZ-rsos__src-main.rs.rs` hand-rolls its
//! own descriptor types instead of reaching for a 64-bit-only crate.

use core::mem::size_of;

use bitflags::bitflags;
use lazy_static::lazy_static;
use spin::Mutex;

bitflags! {
    /// GDT access byte (bits 0-7 of the third dword), matching the
    /// layout `gdt.c`'s `gdt_set_entry` writes verbatim.
    #[derive(Clone, Copy)]
    struct Access: u8 {
        const ACCESSED    = 1 << 0;
        const READ_WRITE  = 1 << 1;
        const EXECUTABLE  = 1 << 3;
        const DESCRIPTOR  = 1 << 4; // 1 = code/data, 0 = system
        const DPL_RING3   = 0b11 << 5;
        const PRESENT     = 1 << 7;
    }
}

const GRANULARITY_4K_32BIT: u8 = 0xC0; // G=1 (4 KiB granularity), D/B=1 (32-bit)
const GRANULARITY_TSS: u8 = 0x40; // no scaling for the TSS limit

/// Ring-0 code segment selector.
pub const KERNEL_CODE_SELECTOR: u16 = 0x08;
/// Ring-0 data segment selector.
pub const KERNEL_DATA_SELECTOR: u16 = 0x10;
/// Ring-3 code segment selector (RPL=3 baked into the low bits).
pub const USER_CODE_SELECTOR: u16 = 0x18 | 3;
/// Ring-3 data segment selector (RPL=3 baked into the low bits).
pub const USER_DATA_SELECTOR: u16 = 0x20 | 3;
/// TSS selector.
pub const TSS_SELECTOR: u16 = 0x28;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct GdtEntry {
    limit_low: u16,
    base_low: u16,
    base_mid: u8,
    access: u8,
    granularity: u8,
    base_high: u8,
}

impl GdtEntry {
    const fn new(base: u32, limit: u32, access: u8, granularity: u8) -> Self {
        Self {
            limit_low: (limit & 0xFFFF) as u16,
            base_low: (base & 0xFFFF) as u16,
            base_mid: ((base >> 16) & 0xFF) as u8,
            access,
            granularity: (((limit >> 16) & 0x0F) as u8) | (granularity & 0xF0),
            base_high: ((base >> 24) & 0xFF) as u8,
        }
    }

    const fn null() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

#[repr(C, packed)]
struct GdtPointer {
    limit: u16,
    base: u32,
}

/// 32-bit Task State Segment (104 bytes). Every field but `ss0`/`esp0` is
/// dead weight the CPU never reads outside a hardware task switch, which
/// this kernel never performs (§3: "only two fields are semantically
/// live").
#[repr(C, packed)]
pub struct Tss {
    prev_tss: u32,
    pub esp0: u32,
    pub ss0: u32,
    esp1: u32,
    ss1: u32,
    esp2: u32,
    ss2: u32,
    cr3: u32,
    eip: u32,
    eflags: u32,
    eax: u32,
    ecx: u32,
    edx: u32,
    ebx: u32,
    esp: u32,
    ebp: u32,
    esi: u32,
    edi: u32,
    es: u32,
    cs: u32,
    ss: u32,
    ds: u32,
    fs: u32,
    gs: u32,
    ldt: u32,
    trap: u16,
    iomap_base: u16,
}

impl Tss {
    const fn new() -> Self {
        Self {
            prev_tss: 0,
            esp0: 0,
            ss0: KERNEL_DATA_SELECTOR as u32,
            esp1: 0,
            ss1: 0,
            esp2: 0,
            ss2: 0,
            cr3: 0,
            eip: 0,
            eflags: 0,
            eax: 0,
            ecx: 0,
            edx: 0,
            ebx: 0,
            esp: 0,
            ebp: 0,
            esi: 0,
            edi: 0,
            es: 0,
            cs: 0,
            ss: 0,
            ds: 0,
            fs: 0,
            gs: 0,
            ldt: 0,
            trap: 0,
            iomap_base: size_of::<Tss>() as u16,
        }
    }
}

lazy_static! {
    static ref TSS: Mutex<Tss> = Mutex::new(Tss::new());
}

static mut GDT: [GdtEntry; 6] = [GdtEntry::null(); 6];

/// Build the six GDT entries (§3) and the TSS descriptor pointing at
/// `TSS`. Does not load anything onto the CPU; call [`load`] after.
pub fn init() {
    let kernel_code = (Access::PRESENT
        | Access::DESCRIPTOR
        | Access::EXECUTABLE
        | Access::READ_WRITE)
        .bits();
    let kernel_data = (Access::PRESENT | Access::DESCRIPTOR | Access::READ_WRITE).bits();
    let user_code = (Access::PRESENT
        | Access::DPL_RING3
        | Access::DESCRIPTOR
        | Access::EXECUTABLE
        | Access::READ_WRITE)
        .bits();
    let user_data =
        (Access::PRESENT | Access::DPL_RING3 | Access::DESCRIPTOR | Access::READ_WRITE).bits();
    let tss_access = (Access::PRESENT | Access::ACCESSED | Access::EXECUTABLE).bits(); // 0x89

    let tss_base = {
        let guard = TSS.lock();
        &raw const *guard as u32
    };
    let tss_limit = size_of::<Tss>() as u32 - 1;

    // SAFETY: only this function writes `GDT`, and it runs once during
    // single-threaded bringup before interrupts are enabled.
    unsafe {
        let table = &raw mut GDT;
        (*table)[0] = GdtEntry::null();
        (*table)[1] = GdtEntry::new(0, 0xFFFF_FFFF, kernel_code, GRANULARITY_4K_32BIT);
        (*table)[2] = GdtEntry::new(0, 0xFFFF_FFFF, kernel_data, GRANULARITY_4K_32BIT);
        (*table)[3] = GdtEntry::new(0, 0xFFFF_FFFF, user_code, GRANULARITY_4K_32BIT);
        (*table)[4] = GdtEntry::new(0, 0xFFFF_FFFF, user_data, GRANULARITY_4K_32BIT);
        (*table)[5] = GdtEntry::new(tss_base, tss_limit, tss_access, GRANULARITY_TSS);
    }
}

/// Load the GDT register, reload every segment selector, and load the
/// task register with the TSS selector.
///
/// # Safety
/// [`init`] must have run first so the GDT content is valid, and the six
/// descriptors must describe the flat-memory layout this kernel assumes.
pub unsafe fn load() {
    let pointer = GdtPointer {
        limit: (size_of::<GdtEntry>() * 6 - 1) as u16,
        // SAFETY: `&raw const GDT` never aliases a mutable reference here.
        base: unsafe { &raw const GDT } as u32,
    };

    // SAFETY: caller-asserted per function contract; this is the
    // textbook lgdt/far-jump/segment-reload/ltr sequence from
    // `gdt.c`'s `gdt_load`.
    unsafe {
        core::arch::asm!(
            "lgdt [{ptr}]",
            "push {code_sel}",
            "lea {tmp}, [2f]",
            "push {tmp}",
            "retf",
            "2:",
            "mov ax, {data_sel:x}",
            "mov ds, ax",
            "mov es, ax",
            "mov fs, ax",
            "mov gs, ax",
            "mov ss, ax",
            "mov ax, {tss_sel:x}",
            "ltr ax",
            ptr = in(reg) &pointer,
            code_sel = in(reg) u32::from(KERNEL_CODE_SELECTOR),
            data_sel = in(reg) KERNEL_DATA_SELECTOR,
            tss_sel = in(reg) TSS_SELECTOR,
            tmp = out(reg) _,
            out("ax") _,
            options(nostack),
        );
    }
}

/// Rewrite the TSS's ring-0 stack (§4.4). Safe to call from any
/// interrupts-disabled context; per §4.4 the effect is observed atomically
/// by the next privilege transition because the CPU only reads `esp0` at
/// the moment of a ring-3 → ring-0 transition, which cannot race a plain
/// store on a uniprocessor.
pub fn set_kernel_stack(esp0: u32) {
    let mut tss = TSS.lock();
    tss.esp0 = esp0;
}
