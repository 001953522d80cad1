//! MaahiOS: a 32-bit protected-mode x86 kernel, learning project.
//! Houses every subsystem so the kernel binary (`entry_point.rs`) and the
//! in-QEMU integration tests under `tests/` share the same code.
//! Refer to `DESIGN.md` for how each module is grounded.

#![no_std]
#![cfg_attr(test, no_main)]
#![feature(custom_test_frameworks)]
#![test_runner(crate::test_runner)]
#![reexport_test_harness_main = "test_main"]
#![feature(abi_x86_interrupt)]
#![feature(naked_functions)]

extern crate alloc;

use core::panic::PanicInfo;

pub mod allocator;
pub mod config;
pub mod drivers;
pub mod error;
pub mod exception;
pub mod gdt;
pub mod identity_map;
pub mod idt;
pub mod kernel;
pub mod logger;
pub mod memory;
pub mod multiboot;
pub mod pic;
pub mod pit;
pub mod port;
pub mod process;
pub mod scheduler;
pub mod serial;
pub mod syscall;
pub mod trampoline;
pub mod vga_buffer;

const QEMU_EXIT_PORT: u16 = 0xf4;

/// Test entry point for cargo test.
#[cfg(test)]
#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    test_main();

    #[expect(
        clippy::empty_loop,
        reason = "Infinite loop after the test main function is done."
    )]
    loop {}
}

/// Define possible exit code for qemu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum QemuExitCode {
    /// Define a successfull exit status
    Success = 0x10,
    /// Define a failure exit status
    Failure = 0x11,
}

/// Exit qemu with a specific exit code.
/// Connect to an IO Port to exit qemu.
/// Configuration for the exit port is in the config.toml file.
pub fn exit_qemu(exit_code: QemuExitCode) {
    // SAFETY:
    // Port 0xf4 is only present under `-device isa-debug-exit`, which
    // every test invocation configures (see `Cargo.toml`).
    unsafe {
        port::outl(QEMU_EXIT_PORT, exit_code as u32);
    }
}

/// Panic handler for external (functional) tests.
pub fn test_panic_handler(info: &PanicInfo) -> ! {
    serial_println!("[failed]\n");
    serial_println!("Error: {}\n", info);
    exit_qemu(QemuExitCode::Failure);

    #[expect(
        clippy::empty_loop,
        reason = "Endless loop if a test panics. It should not be possible as we exit_qemu before."
    )]
    loop {}
}

/// Custom test runner for `no_std` testing.
pub fn test_runner(tests: &[&dyn Testable]) {
    serial_println!("Running {} tests", tests.len());
    for test in tests {
        test.run();
    }

    exit_qemu(QemuExitCode::Success);
}

/// Panic handler for unit tests.
#[cfg(test)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial_println!("[failed]\n");
    serial_println!("Error: {}\n", info);
    exit_qemu(QemuExitCode::Failure);
    loop {}
}

/// Trait to generalize tests cases.
/// Encapsulate the prints
pub trait Testable {
    /// Function that encapsulate the test run function.
    fn run(&self);
}

impl<T> Testable for T
where
    T: Fn(),
{
    fn run(&self) {
        use core::any::type_name;

        serial_print!("{}...\t", type_name::<T>());
        self();
        serial_println!("[ok]");
    }
}
