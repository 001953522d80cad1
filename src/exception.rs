//! Exception handler (C6).
//!
//! The source reads registers via inline-assembly tricks and stack-frame
//! math, redone slightly differently in every `exception_handler.c`
//! variant. Per §9 this rewrite authors the assembly prologue once: every
//! vector's naked stub normalizes its stack (pushing a dummy error code
//! for the vectors that don't get one from the CPU) then jumps to one
//! shared `pushad`-based prologue that calls [`handle`] with a typed,
//! by-name [`ExceptionFrame`]. No per-exception stack arithmetic.

use core::arch::naked_asm;

use crate::{gdt, process, serial_println, trampoline};

/// Register frame captured by the shared exception prologue.
///
/// Field order matches ascending stack address starting at `ESP` when
/// [`handle`] is entered: the `pushad` group first, then the vector
/// number and error code pushed by the per-vector stub, then whatever
/// the CPU itself pushed (`EIP`, `CS`, `EFLAGS`, and — only on a
/// privilege-level change — the user `ESP`/`SS`, which this struct does
/// not need to name because `iret` restores them unconditionally from
/// whatever the CPU originally pushed).
#[repr(C)]
pub struct ExceptionFrame {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    esp_dummy: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub vector: u32,
    pub error_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

const EXCEPTION_NAMES: [&str; 20] = [
    "Divide-by-zero",
    "Debug",
    "Non-maskable interrupt",
    "Breakpoint",
    "Overflow",
    "Bound range exceeded",
    "Invalid opcode",
    "Device not available",
    "Double fault",
    "Coprocessor segment overrun",
    "Invalid TSS",
    "Segment not present",
    "Stack-segment fault",
    "General protection fault",
    "Page fault",
    "Reserved",
    "x87 floating-point exception",
    "Alignment check",
    "Machine check",
    "SIMD floating-point exception",
];

/// Reads `cr2`: the faulting linear address on a page fault (vector 14).
fn read_cr2() -> u32 {
    let value: u32;
    // SAFETY: reading CR2 has no side effect.
    unsafe {
        core::arch::asm!("mov {}, cr2", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}

fn read_cr0() -> u32 {
    let value: u32;
    // SAFETY: reading CR0 has no side effect.
    unsafe {
        core::arch::asm!("mov {}, cr0", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}

fn read_cr3() -> u32 {
    let value: u32;
    // SAFETY: reading CR3 has no side effect.
    unsafe {
        core::arch::asm!("mov {}, cr3", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}

fn read_cr4() -> u32 {
    let value: u32;
    // SAFETY: reading CR4 has no side effect.
    unsafe {
        core::arch::asm!("mov {}, cr4", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}

/// Renders the kernel-origin diagnostic panel (§4.6) and halts forever.
fn kernel_panel(frame: &ExceptionFrame) -> ! {
    let name = EXCEPTION_NAMES
        .get(frame.vector as usize)
        .copied()
        .unwrap_or("Unknown exception");

    serial_println!("=== KERNEL EXCEPTION ===");
    serial_println!("vector={} ({name}) error_code={:#x}", frame.vector, frame.error_code);
    serial_println!("eip={:#010x} cs={:#06x} eflags={:#010x}", frame.eip, frame.cs, frame.eflags);
    if frame.vector == 14 {
        serial_println!("cr2 (faulting address)={:#010x}", read_cr2());
    }
    serial_println!(
        "eax={:#010x} ebx={:#010x} ecx={:#010x} edx={:#010x}",
        frame.eax, frame.ebx, frame.ecx, frame.edx
    );
    serial_println!(
        "esi={:#010x} edi={:#010x} ebp={:#010x}",
        frame.esi, frame.edi, frame.ebp
    );
    serial_println!(
        "cr0={:#010x} cr3={:#010x} cr4={:#010x}",
        read_cr0(), read_cr3(), read_cr4()
    );
    serial_println!("=== HALT ===");

    // SAFETY: halting forever is the documented §7 policy for a
    // ring-0 fault; no further kernel invariant needs to hold.
    unsafe {
        core::arch::asm!("cli", options(nomem, nostack));
    }
    loop {
        // SAFETY: interrupts are disabled above, so `hlt` is the
        // designated resting state for the rest of the kernel's life.
        unsafe {
            core::arch::asm!("hlt", options(nomem, nostack));
        }
    }
}

/// Shared exception dispatch (§4.6). Classifies origin by the saved code
/// selector's RPL and either restarts the current user process or renders
/// the kernel diagnostic panel.
///
/// # Safety
/// Must only be called by [`common_prologue`] with a frame built by the
/// per-vector naked stubs.
unsafe extern "C" fn handle(frame: *mut ExceptionFrame) {
    // SAFETY: `frame` was constructed by `common_prologue` immediately
    // before this call and is valid for the duration of this function.
    let frame = unsafe { &*frame };

    if frame.cs & 0x3 == 3 {
        let name = EXCEPTION_NAMES
            .get(frame.vector as usize)
            .copied()
            .unwrap_or("Unknown exception");
        serial_println!(
            "[exception] user-mode {name} (vector={}, error_code={:#x}) at eip={:#010x}; restarting process",
            frame.vector, frame.error_code, frame.eip
        );

        if let Some(current) = process::current() {
            // SAFETY: the process table entry for the currently running
            // process names a valid entry point and user stack that were
            // established when it was first scheduled.
            unsafe {
                trampoline::enter_ring3(current.entry, current.user_stack_top);
            }
        }
        kernel_panel(frame);
    } else {
        kernel_panel(frame);
    }
}

macro_rules! exception_stub {
    ($name:ident, $vector:expr, has_error_code: $has_error_code:expr) => {
        #[naked]
        pub unsafe extern "C" fn $name() {
            // SAFETY: naked stub; see module docs for the shared frame
            // layout this builds before jumping into the common prologue.
            unsafe {
                if $has_error_code {
                    naked_asm!(
                        "push {vector}",
                        "jmp {common}",
                        vector = const $vector,
                        common = sym common_prologue,
                    );
                } else {
                    naked_asm!(
                        "push 0",
                        "push {vector}",
                        "jmp {common}",
                        vector = const $vector,
                        common = sym common_prologue,
                    );
                }
            }
        }
    };
}

exception_stub!(stub_divide_by_zero, 0, has_error_code: false);
exception_stub!(stub_debug, 1, has_error_code: false);
exception_stub!(stub_nmi, 2, has_error_code: false);
exception_stub!(stub_breakpoint, 3, has_error_code: false);
exception_stub!(stub_overflow, 4, has_error_code: false);
exception_stub!(stub_bound_range, 5, has_error_code: false);
exception_stub!(stub_invalid_opcode, 6, has_error_code: false);
exception_stub!(stub_device_not_available, 7, has_error_code: false);
exception_stub!(stub_double_fault, 8, has_error_code: true);
exception_stub!(stub_coprocessor_overrun, 9, has_error_code: false);
exception_stub!(stub_invalid_tss, 10, has_error_code: true);
exception_stub!(stub_segment_not_present, 11, has_error_code: true);
exception_stub!(stub_stack_segment_fault, 12, has_error_code: true);
exception_stub!(stub_general_protection_fault, 13, has_error_code: true);
exception_stub!(stub_page_fault, 14, has_error_code: true);
exception_stub!(stub_reserved, 15, has_error_code: false);
exception_stub!(stub_x87_fp, 16, has_error_code: false);
exception_stub!(stub_alignment_check, 17, has_error_code: true);
exception_stub!(stub_machine_check, 18, has_error_code: false);
exception_stub!(stub_simd_fp, 19, has_error_code: false);

/// Shared prologue: save every general-purpose register, call [`handle`]
/// with a pointer to the resulting frame, then unwind back to `iret`.
///
/// Entered only via `jmp` from an `exception_stub!`, never `call`ed, so it
/// has no prologue/epilogue of its own to fight with.
#[naked]
unsafe extern "C" fn common_prologue() {
    // SAFETY: invoked only via `jmp` from the per-vector stubs above,
    // which have already pushed `vector` and `error_code`.
    unsafe {
        naked_asm!(
            "pushad",
            "push esp",
            "call {handler}",
            "add esp, 4",
            "popad",
            "add esp, 8", // discard vector, error_code
            "iretd",
            handler = sym handle,
        );
    }
}

#[allow(dead_code)]
const fn assert_kernel_code_selector_is_08() {
    assert!(gdt::KERNEL_CODE_SELECTOR == 0x08);
}
