//! Ring-transition trampoline (C11).
//!
//! Builds an `iret` frame in a `#[naked]` function, retargeted at the
//! 32-bit frame (`SS`, `ESP`, `EFLAGS`, `CS`, `EIP` — five fields, no
//! `rip`-relative addressing).
//!
//! `original_source/src/managers/ring3/ring3.c`'s `ring3_switch` clears
//! `EFLAGS.IF` before the `iret`, which leaves ring 3 running with
//! interrupts disabled — the timer can never tick and nothing can ever
//! preempt or schedule again. That is the design notes' other flagged
//! source bug; this rewrite sets `IF` instead, matching the syscall
//! dispatcher's own `sti` on entry (§4.13) and the requirement that the
//! timer interrupt keeps firing while a process runs in ring 3.

use core::arch::naked_asm;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::gdt::{KERNEL_DATA_SELECTOR, USER_CODE_SELECTOR, USER_DATA_SELECTOR};

/// Kernel `ESP` captured just before the most recent ring-3 transition,
/// restored by the syscall exit path (`syscall::stub_entry`'s exit arm)
/// to resume `process::create_sysman`/`scheduler::run_next`'s caller
/// without ever unwinding through the abandoned user-mode call stack.
pub static KERNEL_ESP: AtomicU32 = AtomicU32::new(0);

/// Build an `iret` frame for `(entry, user_stack)` and transition to
/// ring 3. Never returns to its caller directly; the only way back into
/// kernel code is through an interrupt, exception, or syscall gate.
///
/// # Safety
/// `entry` must be a valid, executable ring-3 code address and
/// `user_stack` a valid, writable ring-3 stack top; both must already be
/// identity-mapped with `PAGE_USER` set. The caller's kernel stack
/// pointer is saved to [`KERNEL_ESP`] before the transition so a later
/// process exit can restore it.
#[naked]
pub unsafe extern "C" fn enter_ring3(entry: u32, user_stack: u32) -> ! {
    // SAFETY: naked function; every register this touches is restored
    // or consumed by the `iretd` at the end, and nothing here returns.
    unsafe {
        naked_asm!(
            "mov eax, [esp + 4]",  // entry
            "mov ecx, [esp + 8]",  // user_stack

            "mov [{kernel_esp}], esp",

            "push {user_data_sel}",
            "push ecx",
            "pushfd",
            "pop edx",
            "or edx, 0x200", // force IF=1: ring 3 keeps the timer alive
            "push edx",
            "push {user_code_sel}",
            "push eax",

            "mov dx, {user_data_sel:x}",
            "mov ds, dx",
            "mov es, dx",
            "mov fs, dx",
            "mov gs, dx",

            "iretd",

            kernel_esp = sym KERNEL_ESP,
            user_code_sel = const USER_CODE_SELECTOR,
            user_data_sel = const USER_DATA_SELECTOR,
        );
    }
}

/// Restore the kernel stack saved by the last [`enter_ring3`] call and
/// reload kernel data selectors. Used by the syscall exit-process path;
/// never returns to its own caller, it jumps back into whichever kernel
/// context called `enter_ring3`.
///
/// # Safety
/// Must only be reached from the syscall gate's exit arm, after the
/// process that called `enter_ring3` has fully abandoned its ring-3
/// execution (`sys_exit`/scheduler hand-off).
#[naked]
pub unsafe extern "C" fn return_to_kernel() -> ! {
    // SAFETY: naked function; restores the exact context `enter_ring3`
    // saved and returns to it.
    unsafe {
        naked_asm!(
            "mov esp, [{kernel_esp}]",
            "mov dx, {kernel_data_sel:x}",
            "mov ds, dx",
            "mov es, dx",
            "mov fs, dx",
            "mov gs, dx",
            "ret",
            kernel_esp = sym KERNEL_ESP,
            kernel_data_sel = const KERNEL_DATA_SELECTOR,
        );
    }
}
