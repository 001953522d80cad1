//! Kernel entry / bringup (C14): the ordered initialization sequence
//! GRUB hands off into, ending by handing module 0 to the process
//! manager as `sysman`.
//!
//! `_start` itself is `#[naked]`: the multiboot v1 boot protocol leaves
//! the info structure's physical address in `ebx`, which an `extern "C"`
//! function signature has no way to receive (there is no argument-0
//! register on a fresh boot, and no caller stack frame to read one
//! from). The rest of the sequence mirrors
//! `original_source/src/kernel.c`'s `kernel_main` ordering: GDT, IDT and
//! the PIC before paging (nothing needs virtual memory yet), then the
//! frame allocator and paging, then the heap (needs paging), then
//! drivers, then the scheduler, then the first process. Assembling a
//! bootable multiboot image (a `.s` stub establishing a stack before
//! `_start` runs, and the linker script/header placing it) is out of
//! scope for the same reason the frame allocator avoids one (§9): no
//! linker script appears anywhere in the reference pack, and a loader
//! stub ahead of `_start` is assumed to have already set up a valid
//! stack pointer, matching multiboot's own contract that GRUB sets
//! `ebx` but makes no promise about `esp` beyond "valid".

#![no_std]
#![no_main]
#![feature(naked_functions)]

use core::arch::naked_asm;
use core::panic::PanicInfo;
use core::sync::atomic::{AtomicU32, Ordering};

use maahi_os::drivers::Console;
use maahi_os::{
    allocator, config, drivers, idt, gdt, memory, multiboot, pic, pit, process, scheduler,
    serial_println, syscall,
};

static MULTIBOOT_INFO_ADDR: AtomicU32 = AtomicU32::new(0);

/// Entry point. The linker looks for this symbol; GRUB jumps here with
/// `ebx` holding the multiboot info structure's physical address.
#[no_mangle]
#[naked]
pub unsafe extern "C" fn _start() -> ! {
    // SAFETY: the very first instructions to run after GRUB's handoff;
    // `ebx` still holds the multiboot info pointer exactly as the
    // multiboot v1 spec leaves it, before anything else can clobber it.
    unsafe {
        naked_asm!(
            "mov [{info}], ebx",
            "jmp {main}",
            info = sym MULTIBOOT_INFO_ADDR,
            main = sym kernel_main,
        );
    }
}

extern "C" fn kernel_main() -> ! {
    maahi_os::logger::init();
    log::info!("MaahiOS bringup starting");

    gdt::init();
    // SAFETY: `gdt::init` has just built the six descriptors; nothing
    // else touches the GDT/IDT/TSS concurrently during single-threaded
    // bringup.
    unsafe {
        gdt::load();
    }
    log::info!("gdt loaded");

    idt::init();
    idt::install_exception_handlers();
    // SAFETY: `idt::init`/`install_exception_handlers` have populated
    // every gate this kernel uses.
    unsafe {
        idt::load();
    }
    log::info!("idt loaded");

    pic::init();
    pit::init(config::PIT_FREQUENCY_HZ);
    log::info!(
        "pic remapped, pit programmed for {} Hz",
        config::PIT_FREQUENCY_HZ
    );

    let info_addr = MULTIBOOT_INFO_ADDR.load(Ordering::Relaxed);
    // SAFETY: `info_addr` is the physical address GRUB left in `ebx`,
    // captured verbatim by `_start` before anything else ran.
    let (machine, modules) = match unsafe { multiboot::parse(info_addr) } {
        Ok(parsed) => parsed,
        Err(err) => {
            serial_println!("[kernel] multiboot parse failed: {err}");
            halt_forever();
        }
    };
    log::info!(
        "multiboot: {} KiB lower, {} KiB upper, {} module(s)",
        machine.mem_lower_kb,
        machine.mem_upper_kb,
        machine.module_count
    );

    let Some(sysman) = modules.get(0) else {
        serial_println!("[kernel] no module 0 (sysman) reported");
        halt_forever();
    };

    memory::frame::init(&machine);
    log::info!(
        "frame allocator sized to {} KiB reported upper memory",
        machine.mem_upper_kb
    );

    memory::frame::mark_region_used(0, config::PHYSICAL_MEMORY_START);
    memory::frame::mark_region_used(sysman.start, sysman.end);
    if let Some(orbit) = modules.get(1) {
        memory::frame::mark_region_used(orbit.start, orbit.end);
        syscall::set_orbit_address(orbit.start);
    }

    if let Err(err) = memory::paging::init() {
        serial_println!("[kernel] paging init failed: {err}");
        halt_forever();
    }
    // SAFETY: `memory::paging::init` has just built and identity-mapped
    // the initial page directory.
    unsafe {
        if let Err(err) = memory::paging::enable() {
            serial_println!("[kernel] paging enable failed: {err}");
            halt_forever();
        }
    }
    log::info!(
        "paging enabled, identity-mapped 0..{:#x}",
        config::IDENTITY_MAP_CAP
    );

    // SAFETY: paging is enabled and the heap region is reserved for
    // this purpose alone.
    unsafe {
        if let Err(err) = allocator::init_heap() {
            serial_println!("[kernel] heap init failed: {err}");
            halt_forever();
        }
    }
    log::info!(
        "heap ready: {:#x}..{:#x}",
        config::HEAP_START,
        config::HEAP_START + config::HEAP_SIZE
    );

    drivers::console::VgaConsole.clear();
    drivers::console::VgaConsole.puts("MaahiOS\n");
    drivers::mouse::init();
    log::info!("console cleared, ps/2 mouse initialized");

    process::init();
    scheduler::init();
    scheduler::enable();
    drivers::mouse::drain_and_enable_irq();
    pic::enable(config::IRQ_TIMER);
    log::info!("scheduler enabled, timer and mouse irqs unmasked");

    log::info!("handing off to sysman at {:#x}", sysman.start);
    process::create_sysman(sysman.start);
}

fn halt_forever() -> ! {
    loop {
        // SAFETY: parking the CPU after an unrecoverable bringup
        // failure; nothing depends on this returning.
        unsafe {
            core::arch::asm!("cli", "hlt", options(nomem, nostack));
        }
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial_println!("[panic] {info}");
    halt_forever();
}
