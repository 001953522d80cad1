//! Test for stack overflow handling in the kernel.
//! Should trigger a double fault and be handled by the kernel.
//!
//! This kernel's own double-fault path (`exception::handle`, reached via
//! `idt::install_exception_handlers`) always halts forever on a
//! kernel-mode fault (§7) instead of returning, so it can't itself
//! report success back to the harness. This test installs a single
//! private gate over vector 8 instead, hand-rolled the same way
//! `idt.rs` builds its own gates (32-bit IDT entries have no
//! interrupt-stack-table field to switch to, unlike a 64-bit
//! `x86_64::structures::idt` gate).

#![no_std]
#![no_main]
#![feature(naked_functions)]

use core::arch::naked_asm;
use core::mem::size_of;
use core::panic::PanicInfo;

use maahi_os::gdt::KERNEL_CODE_SELECTOR;
use maahi_os::{exit_qemu, gdt, serial_print, serial_println, QemuExitCode};

const PRESENT_RING0_TRAP: u8 = 0x8F;

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

static mut TEST_IDT: [IdtEntry; 9] = [IdtEntry::missing(); 9];

/// This test check if stack overflow is handled with a double fault.
/// # Panics
/// This test should panic if the stack overflows.
#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    serial_print!("stack_overflow::stack_overflow...\t");

    gdt::init();
    // SAFETY: single-threaded test bringup.
    unsafe {
        gdt::load();
    }
    init_test_idt();

    stack_overflow();

    panic!("Execution should not reach here");
}

#[expect(
    unconditional_recursion,
    reason = "This function is expected to cause a stack overflow."
)]
fn stack_overflow() {
    stack_overflow();
    volatile::Volatile::new(0).read();
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    maahi_os::test_panic_handler(info)
}

/// Install a one-gate IDT over vector 8 (double fault), leaving every
/// other vector absent.
fn init_test_idt() {
    // SAFETY: single-threaded test bringup; `TEST_IDT` is touched only
    // here and by the `lidt` instruction that follows.
    unsafe {
        let table = &raw mut TEST_IDT;
        (*table)[8].set(test_double_fault_stub as u32, PRESENT_RING0_TRAP);

        let pointer = IdtPointer {
            limit: (size_of::<IdtEntry>() * 9 - 1) as u16,
            base: &raw const TEST_IDT as u32,
        };
        core::arch::asm!(
            "lidt [{ptr}]",
            ptr = in(reg) &pointer,
            options(readonly, nostack, preserves_flags),
        );
    }
}

#[naked]
unsafe extern "C" fn test_double_fault_stub() {
    // SAFETY: naked trampoline into an ordinary Rust function; the
    // handler never returns, so the CPU-pushed error code and frame are
    // left on the stack untouched.
    unsafe {
        naked_asm!(
            "call {handler}",
            "2:",
            "jmp 2b",
            handler = sym test_double_fault_handler,
        );
    }
}

extern "C" fn test_double_fault_handler() {
    serial_println!("[ok]");
    exit_qemu(QemuExitCode::Success);
}
