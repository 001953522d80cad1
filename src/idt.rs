//! Interrupt table (C5): 256 hand-rolled 32-bit IDT gates.
//!
//! Built the same way [`crate::gdt`] is: the `x86_64` crate's
//! `InterruptDescriptorTable` is 64-bit-width and doesn't exist in this
//! form on a 32-bit target, so the gates are hand-rolled here, grounded on
//! `original_source/src/managers/interrupt/idt.c`'s `idt_entry` layout and
//! exact gate-type bytes (0x8F exception trap gates, 0x8E IRQ interrupt
//! gates, 0xEE the DPL=3 syscall gate).

use core::mem::size_of;

use crate::{config, exception, gdt::KERNEL_CODE_SELECTOR, pit, scheduler, syscall};

const PRESENT_RING0_TRAP: u8 = 0x8F;
const PRESENT_RING0_INTERRUPT: u8 = 0x8E;
const PRESENT_RING3_INTERRUPT: u8 = 0xEE;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct IdtEntry {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl IdtEntry {
    const fn missing() -> Self {
        Self {
            offset_low: 0,
            selector: 0,
            zero: 0,
            type_attr: 0,
            offset_high: 0,
        }
    }

    fn set(&mut self, handler: u32, type_attr: u8) {
        self.offset_low = (handler & 0xFFFF) as u16;
        self.offset_high = ((handler >> 16) & 0xFFFF) as u16;
        self.selector = KERNEL_CODE_SELECTOR;
        self.zero = 0;
        self.type_attr = type_attr;
    }
}

#[repr(C, packed)]
struct IdtPointer {
    limit: u16,
    base: u32,
}

static mut IDT: [IdtEntry; 256] = [IdtEntry::missing(); 256];

/// Zero every entry. Idempotent; safe to call once during bringup.
pub fn init() {
    // SAFETY: single-threaded bringup, before `load`.
    unsafe {
        let table = &raw mut IDT;
        for entry in (*table).iter_mut() {
            *entry = IdtEntry::missing();
        }
    }
}

/// Install the CPU exception handlers (vectors 0-19), the syscall gate
/// (vector 0x80, DPL=3 — §3's critical invariant), and the timer and
/// mouse IRQ gates. Must run after [`init`] and before [`load`].
pub fn install_exception_handlers() {
    // SAFETY: single-threaded bringup, before `load`; each stub below is
    // a `naked` `extern "C"` function with a stable address.
    unsafe {
        let table = &raw mut IDT;

        macro_rules! exception_gate {
            ($vector:expr, $stub:expr) => {
                (*table)[$vector].set($stub as u32, PRESENT_RING0_TRAP);
            };
        }

        exception_gate!(0, exception::stub_divide_by_zero);
        exception_gate!(1, exception::stub_debug);
        exception_gate!(2, exception::stub_nmi);
        exception_gate!(3, exception::stub_breakpoint);
        exception_gate!(4, exception::stub_overflow);
        exception_gate!(5, exception::stub_bound_range);
        exception_gate!(6, exception::stub_invalid_opcode);
        exception_gate!(7, exception::stub_device_not_available);
        exception_gate!(8, exception::stub_double_fault);
        exception_gate!(9, exception::stub_coprocessor_overrun);
        exception_gate!(10, exception::stub_invalid_tss);
        exception_gate!(11, exception::stub_segment_not_present);
        exception_gate!(12, exception::stub_stack_segment_fault);
        exception_gate!(13, exception::stub_general_protection_fault);
        exception_gate!(14, exception::stub_page_fault);
        exception_gate!(15, exception::stub_reserved);
        exception_gate!(16, exception::stub_x87_fp);
        exception_gate!(17, exception::stub_alignment_check);
        exception_gate!(18, exception::stub_machine_check);
        exception_gate!(19, exception::stub_simd_fp);

        (*table)[config::SYSCALL_VECTOR as usize].set(syscall::stub_entry as u32, PRESENT_RING3_INTERRUPT);
        (*table)[(config::PIC_1_OFFSET + config::IRQ_TIMER) as usize]
            .set(pit::stub_irq0 as u32, PRESENT_RING0_INTERRUPT);
        (*table)[(config::PIC_2_OFFSET + (config::IRQ_MOUSE - 8)) as usize]
            .set(scheduler::stub_irq12_mouse as u32, PRESENT_RING0_INTERRUPT);
    }
}

/// Load the IDT register.
///
/// # Safety
/// [`init`] and [`install_exception_handlers`] must have already run.
pub unsafe fn load() {
    let pointer = IdtPointer {
        limit: (size_of::<IdtEntry>() * 256 - 1) as u16,
        // SAFETY: `&raw const IDT` is only read here.
        base: unsafe { &raw const IDT } as u32,
    };

    // SAFETY: caller-asserted per function contract.
    unsafe {
        core::arch::asm!("lidt [{ptr}]", ptr = in(reg) &pointer, options(nostack, readonly));
    }
}
