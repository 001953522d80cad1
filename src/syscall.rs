//! Syscall dispatcher (C13): the `int 0x80` software-interrupt entry,
//! argument unpack, and the 36 numbered operations of §6.3.
//!
//! Grounded on `original_source/src/syscall_handler.c`'s register
//! convention (`eax`=number, `ebx`/`ecx`/`edx`=args 1-3, `esi`=arg 4), with
//! a naked-`pushad`-then-dispatch stub shape retargeted at the 32-bit
//! gate (no `r8`-`r15`, a five-field `iret` frame, and a syscall gate
//! that is an *interrupt* gate here rather than a trap gate, so `sti` on
//! entry is load-bearing: the source's syscall ISR enables interrupts
//! for the same reason before doing any real work).
//!
//! The `exit` arm is the one case that never returns to this file's own
//! `iretd`: it hands off to [`process::exit_current`] and
//! [`scheduler::run_next`] directly, matching [`trampoline`]'s
//! documented exit path rather than a sentinel-return dance (there is no
//! caller-side `eax` comparison to thread through a 5-field 32-bit
//! frame; diverging inside the dispatcher is simpler and exact).

use core::arch::naked_asm;
use core::sync::atomic::{AtomicU32, Ordering};

use spin::Mutex;

use crate::drivers::console::VgaConsole;
use crate::drivers::framebuffer::BgaFramebuffer;
use crate::drivers::{self, bmp, Console, Framebuffer, Mouse};
use crate::memory::frame;
use crate::{identity_map, pic, process, scheduler, serial_println};

#[repr(C)]
struct SyscallFrame {
    edi: u32,
    esi: u32,
    ebp: u32,
    esp_dummy: u32,
    ebx: u32,
    edx: u32,
    ecx: u32,
    eax: u32,
    eip: u32,
    cs: u32,
    eflags: u32,
    esp_user: u32,
    ss_user: u32,
}

/// Naked `int 0x80` gate. Per §3, the gate is installed with DPL=3 as an
/// *interrupt* gate, so `IF` is clear on entry; `sti` is the first thing
/// this does, matching the source's own ordering.
#[naked]
pub unsafe extern "C" fn stub_entry() {
    // SAFETY: installed directly as the syscall-vector interrupt-gate
    // handler; every register this touches is restored by `popad`
    // before `iretd`, except `eax`, which is deliberately overwritten
    // with the dispatcher's return value.
    unsafe {
        naked_asm!(
            "sti",
            "pushad",
            "push esp",
            "call {dispatch}",
            "add esp, 4",
            "mov [esp + 28], eax",
            "popad",
            "iretd",
            dispatch = sym dispatch_frame,
        );
    }
}

extern "C" fn dispatch_frame(frame_ptr: *mut SyscallFrame) -> u32 {
    // SAFETY: `frame_ptr` points at the `pushad` region `stub_entry`
    // just built on its own stack; it is live for the duration of this
    // call.
    let frame = unsafe { &*frame_ptr };
    dispatch(
        frame.eax,
        frame.ebx,
        frame.ecx,
        frame.edx,
        frame.esi,
        frame.esp_user,
    )
}

/// A syscall argument beyond the four register slots, pushed by the
/// user-space shim onto its own stack just before `int 0x80`.
fn extra_arg(esp_user: u32, index: u32) -> u32 {
    // SAFETY: read-only access to the calling process's own stack,
    // range- and alignment-checked by `identity_map::reference`.
    unsafe { identity_map::reference::<u32>(esp_user + index * 4) }
        .copied()
        .unwrap_or(0)
}

const MAX_CSTR_LEN: u32 = 256;

fn read_cstr(ptr: u32) -> Option<&'static str> {
    // SAFETY: `identity_map::bytes` range-checks `ptr` before this ever
    // dereferences it.
    let bytes = unsafe { identity_map::bytes(ptr, MAX_CSTR_LEN) }?;
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..len]).ok()
}

static ORBIT_ADDR: AtomicU32 = AtomicU32::new(0);

/// Record module 1's ("orbit") load address, read back by the
/// `get_orbit_address` syscall. Called once during bringup.
pub fn set_orbit_address(addr: u32) {
    ORBIT_ADDR.store(addr, Ordering::Relaxed);
}

static GRAPHICS: Mutex<Option<BgaFramebuffer>> = Mutex::new(None);

fn with_graphics(f: impl FnOnce(&mut BgaFramebuffer)) {
    if let Some(fb) = GRAPHICS.lock().as_mut() {
        f(fb);
    }
}

fn unpack_wh(packed: u32) -> (u32, u32) {
    (packed >> 16, packed & 0xFFFF)
}

fn halt_forever() -> ! {
    loop {
        // SAFETY: parking the CPU; nothing depends on this returning.
        unsafe {
            core::arch::asm!("cli", "hlt", options(nomem, nostack));
        }
    }
}

fn dispatch(num: u32, arg1: u32, arg2: u32, arg3: u32, arg4: u32, esp_user: u32) -> u32 {
    match num {
        1 => {
            VgaConsole.putc(arg1 as u8);
            0
        }
        2 => {
            if let Some(s) = read_cstr(arg1) {
                VgaConsole.puts(s);
            }
            0
        }
        3 => {
            sys_putint(arg1 as i32);
            0
        }
        4 => {
            process::exit_current();
            scheduler::run_next();
            // `run_next` only returns if the ready queue was empty; the
            // trampoline's `return_to_kernel` path (used for an already
            // trampolined-into process) does not apply at bringup's
            // very first exit, when nothing ever scheduled back into
            // this call stack. There is nothing left to resume.
            halt_forever()
        }
        5 => sys_write(arg1, arg2, arg3),
        6 => frame::alloc().unwrap_or(0),
        7 => {
            frame::free(arg1);
            0
        }
        8 => {
            VgaConsole.clear();
            0
        }
        9 => {
            VgaConsole.set_color(arg1 as u8, arg2 as u8);
            0
        }
        10 => {
            let (width, height) = unpack_wh(arg3);
            VgaConsole.draw_rect(arg2 as usize, arg1 as usize, width as usize, height as usize);
            0
        }
        11 => {
            sys_graphics_mode();
            0
        }
        12 => {
            with_graphics(|fb| fb.put_pixel(arg1, arg2, arg3));
            0
        }
        13 => {
            with_graphics(|fb| fb.clear(arg1));
            0
        }
        14 => {
            if let Some(s) = read_cstr(arg3) {
                VgaConsole.set_color(arg4 as u8, extra_arg(esp_user, 0) as u8);
                VgaConsole.print_at(arg2 as usize, arg1 as usize, s);
            }
            0
        }
        15 => {
            VgaConsole.set_cursor(arg2 as usize, arg1 as usize);
            0
        }
        16 => {
            let (width, height) = unpack_wh(arg3);
            VgaConsole.draw_box(arg2 as usize, arg1 as usize, width as usize, height as usize);
            0
        }
        17 => scheduler::spawn(arg1).unwrap_or(u32::MAX),
        18 => ORBIT_ADDR.load(Ordering::Relaxed),
        19 => {
            // gfx_putc(ch, x, y): no font renderer in the reference
            // pack, so a character cell is drawn as a filled block of
            // the current color — enough for user programs to place
            // markers on the graphics surface.
            with_graphics(|fb| fb.draw_rect(arg2, arg3, 8, 8, fb_color(&*fb)));
            0
        }
        20 => {
            if let Some(s) = read_cstr(arg1) {
                with_graphics(|fb| {
                    let color = fb_color(&*fb);
                    for (i, _) in s.bytes().enumerate() {
                        fb.draw_rect(arg3 + (i as u32) * 8, arg4, 8, 8, color);
                    }
                });
            }
            0
        }
        21 => {
            with_graphics(|fb| fb.clear(0));
            0
        }
        22 => {
            with_graphics(|fb| fb.set_color(arg1));
            0
        }
        23 => {
            with_graphics(|fb| {
                let color = fb_color(&*fb);
                fb.draw_rect(arg1, arg2, arg3, arg4, color);
            });
            0
        }
        24 => {
            with_graphics(|fb| {
                let color = fb_color(&*fb);
                draw_rect_outline(fb, arg1, arg2, arg3, arg4, color);
            });
            0
        }
        25 => {
            if let Some(s) = read_cstr(arg1) {
                with_graphics(|fb| {
                    let color = fb_color(&*fb);
                    for (i, _) in s.bytes().enumerate() {
                        fb.draw_rect(arg3 + (i as u32) * 8, arg4, 8, 8, color);
                    }
                });
            }
            0
        }
        26 => {
            with_graphics(|fb| fb.clear(arg1));
            0
        }
        27 => {
            if let Some(bytes) = unsafe { identity_map::bytes(arg1, arg2) } {
                with_graphics(|fb| bmp::draw(fb, bytes, arg3, arg4));
            }
            0
        }
        28 => drivers::mouse::Ps2Mouse.x() as u32,
        29 => drivers::mouse::Ps2Mouse.y() as u32,
        30 => u32::from(drivers::mouse::Ps2Mouse.buttons()),
        31 => {
            scheduler::on_timer_tick();
            0
        }
        32 => drivers::mouse::Ps2Mouse.irq_total(),
        33 => u32::from(pic::read_mask()),
        34 => {
            drivers::mouse::drain_and_enable_irq();
            0
        }
        35 => u32::from(drivers::mouse::poll()),
        36 => with_graphics_read_pixel(arg1, arg2),
        other => {
            serial_println!("[syscall] unknown syscall number {other}");
            0
        }
    }
}

fn fb_color(fb: &BgaFramebuffer) -> u32 {
    fb.color()
}

fn draw_rect_outline(fb: &mut BgaFramebuffer, x: u32, y: u32, width: u32, height: u32, color: u32) {
    if width == 0 || height == 0 {
        return;
    }
    fb.draw_rect(x, y, width, 1, color);
    fb.draw_rect(x, y + height - 1, width, 1, color);
    fb.draw_rect(x, y, 1, height, color);
    fb.draw_rect(x + width - 1, y, 1, height, color);
}

fn with_graphics_read_pixel(x: u32, y: u32) -> u32 {
    let mut result = 0;
    with_graphics(|fb| result = fb.read_pixel(x, y));
    result
}

fn sys_putint(value: i32) {
    let mut buf = [0u8; 11]; // sign + 10 digits
    let mut i = buf.len();
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    loop {
        i -= 1;
        buf[i] = b'0' + (magnitude % 10) as u8;
        magnitude /= 10;
        if magnitude == 0 {
            break;
        }
    }
    if negative {
        i -= 1;
        buf[i] = b'-';
    }
    // SAFETY: every byte written above is ASCII.
    let s = unsafe { core::str::from_utf8_unchecked(&buf[i..]) };
    VgaConsole.puts(s);
}

fn sys_write(fd: u32, buf_ptr: u32, size: u32) -> u32 {
    // SAFETY: range- and bounds-checked by `identity_map::bytes`.
    let Some(bytes) = (unsafe { identity_map::bytes(buf_ptr, size) }) else {
        return 0;
    };
    match fd {
        1 => {
            match core::str::from_utf8(bytes) {
                Ok(s) => VgaConsole.puts(s),
                Err(_) => {
                    for &byte in bytes {
                        let ch = if byte.is_ascii_graphic() || byte == b' ' || byte == b'\n' {
                            byte
                        } else {
                            b'.'
                        };
                        VgaConsole.putc(ch);
                    }
                }
            }
            size
        }
        2 => {
            if let Ok(s) = core::str::from_utf8(bytes) {
                serial_println!("{s}");
            }
            size
        }
        _ => 0,
    }
}

fn sys_graphics_mode() {
    let mut guard = GRAPHICS.lock();
    if guard.is_none() {
        match BgaFramebuffer::init(1024, 768) {
            Ok(fb) => *guard = Some(fb),
            Err(err) => serial_println!("[syscall] graphics_mode init failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn unknown_syscall_returns_zero() {
        let result = dispatch(999, 0, 0, 0, 0, 0);
        assert_eq!(result, 0);
    }

    #[test_case]
    fn unpack_wh_splits_high_and_low_words() {
        assert_eq!(unpack_wh(0x0014_000A), (0x14, 0x0A));
    }

    #[test_case]
    fn get_orbit_address_reads_back_what_was_set() {
        set_orbit_address(0x0040_0000);
        let result = dispatch(18, 0, 0, 0, 0, 0);
        assert_eq!(result, 0x0040_0000);
    }

    #[test_case]
    fn alloc_page_then_free_page_round_trips() {
        let addr = dispatch(6, 0, 0, 0, 0, 0);
        assert_ne!(addr, 0);
        let result = dispatch(7, addr, 0, 0, 0, 0);
        assert_eq!(result, 0);
    }

    #[test_case]
    fn create_process_returns_max_on_table_full() {
        process::init();
        scheduler::init();
        for _ in 0..crate::config::MAX_PROCESSES {
            let _ = dispatch(17, 0x1000, 0, 0, 0, 0);
        }
        let result = dispatch(17, 0x1000, 0, 0, 0, 0);
        assert_eq!(result, u32::MAX);
    }
}
