//! Tests for heap allocation in a `no_std` environment using a custom allocator.
#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(maahi_os::test_runner)]
#![reexport_test_harness_main = "test_main"]
#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_assert_message)]
extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;

use core::panic::PanicInfo;
use maahi_os::config::HEAP_SIZE;
use maahi_os::{allocator, gdt, idt, memory};

/// Entry point for the test: enough bringup to reach a working heap,
/// without needing a multiboot handoff (no module/frame region marking
/// is required for a bare identity-mapped heap test).
#[unsafe(no_mangle)]
#[expect(clippy::expect_used)]
pub extern "C" fn _start() -> ! {
    gdt::init();
    // SAFETY: single-threaded test bringup.
    unsafe {
        gdt::load();
    }

    idt::init();
    idt::install_exception_handlers();
    // SAFETY: the exception gates installed above are the only ones
    // this test relies on.
    unsafe {
        idt::load();
    }

    if let Err(err) = memory::paging::init() {
        panic!("paging init failed: {err}");
    }
    // SAFETY: paging has just been built and nothing else touches it
    // concurrently in this single-threaded test.
    unsafe {
        memory::paging::enable().expect("paging enable failed");
    }

    // SAFETY: paging is enabled and the heap range is reserved for this
    // purpose alone.
    unsafe {
        allocator::init_heap().expect("heap initialization failed");
    }

    test_main();
    #[expect(clippy::empty_loop)]
    loop {}
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    maahi_os::test_panic_handler(info)
}

#[test_case]
fn when_creating_simple_allocation_then_memory_is_allocated() {
    let heap_value_1 = Box::new(41);
    let heap_value_2 = Box::new(42);

    assert_eq!(*heap_value_1, 41);
    assert_eq!(*heap_value_2, 42);
}

#[test_case]
fn when_creating_large_vec_then_memory_is_allocated() {
    let mut vec = Vec::new();
    for i in 0..1000 {
        vec.push(i);
    }
    assert_eq!(vec.iter().sum::<u64>(), (0..1000).sum());
}

#[test_case]
fn when_many_boxes_are_allocated_then_memory_is_allocated() {
    for i in 0..HEAP_SIZE {
        let x = Box::new(i);
        assert_eq!(*x, i);
    }
}
