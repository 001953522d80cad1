//! PS/2 mouse driver [`super::Mouse`] implementation.
//!
//! Grounded on `original_source/src/drivers/mouse.c`: controller ports
//! `0x60`/`0x64`, the disable-both/flush/enable-both/enable-reporting
//! init sequence, 3-byte packet assembly with the first byte's bit 3 as
//! the packet-alignment check, signed `dx`/`dy`, and position clamped to
//! the 1024x768 mode this kernel's graphics boots into. The source's
//! copious inline retry/readback logging around each port write is a
//! workaround for flaky emulators, not a documented invariant, and is
//! not reproduced here.

use core::sync::atomic::{AtomicI32, AtomicU32, AtomicU8, Ordering};

use crate::config::MOUSE_SCREEN_BOUNDS;
use crate::pic;
use crate::port::{inb, outb};

const DATA_PORT: u16 = 0x60;
const STATUS_PORT: u16 = 0x64;
const COMMAND_PORT: u16 = 0x64;

const STATUS_OUTPUT_FULL: u8 = 0x01;
const STATUS_INPUT_FULL: u8 = 0x02;

const CMD_DISABLE_PORT2: u8 = 0xA7;
const CMD_ENABLE_PORT2: u8 = 0xA8;
const CMD_DISABLE_PORT1: u8 = 0xAD;
const CMD_READ_CONFIG: u8 = 0x20;
const CMD_WRITE_CONFIG: u8 = 0x60;
const CMD_WRITE_PORT2: u8 = 0xD4;

const MOUSE_ENABLE_REPORTING: u8 = 0xF4;
const MOUSE_ACK: u8 = 0xFA;

static POSITION_X: AtomicI32 = AtomicI32::new(0);
static POSITION_Y: AtomicI32 = AtomicI32::new(0);
static BUTTONS: AtomicU8 = AtomicU8::new(0);
static IRQ_TOTAL: AtomicU32 = AtomicU32::new(0);
static PACKET: [AtomicU8; 3] = [AtomicU8::new(0), AtomicU8::new(0), AtomicU8::new(0)];
static PACKET_INDEX: AtomicU8 = AtomicU8::new(0);

fn wait_for_write() {
    // SAFETY: only polls the controller's own status port.
    while unsafe { inb(STATUS_PORT) } & STATUS_INPUT_FULL != 0 {}
}

fn wait_for_read() {
    // SAFETY: only polls the controller's own status port.
    while unsafe { inb(STATUS_PORT) } & STATUS_OUTPUT_FULL == 0 {}
}

fn write_command(command: u8) {
    wait_for_write();
    // SAFETY: the controller's command port accepts a byte once input
    // is not full, as just confirmed.
    unsafe {
        outb(COMMAND_PORT, command);
    }
}

fn write_data(data: u8) {
    wait_for_write();
    // SAFETY: the controller's data port accepts a byte once input is
    // not full, as just confirmed.
    unsafe {
        outb(DATA_PORT, data);
    }
}

fn read_data() -> u8 {
    wait_for_read();
    // SAFETY: the controller's data port has a byte ready, as just
    // confirmed.
    unsafe { inb(DATA_PORT) }
}

/// Run the PS/2 controller init sequence and enable mouse reporting.
pub fn init() {
    write_command(CMD_DISABLE_PORT1);
    write_command(CMD_DISABLE_PORT2);

    while unsafe { inb(STATUS_PORT) } & STATUS_OUTPUT_FULL != 0 {
        // SAFETY: draining the controller's output buffer.
        unsafe {
            inb(DATA_PORT);
        }
    }

    write_command(CMD_READ_CONFIG);
    let mut config = read_data();
    config |= 0x02; // enable IRQ12
    config &= !0x20; // enable the second PS/2 port's clock
    write_command(CMD_WRITE_CONFIG);
    write_data(config);

    write_command(CMD_ENABLE_PORT2);

    write_command(CMD_WRITE_PORT2);
    write_data(MOUSE_ENABLE_REPORTING);
    let ack = read_data();
    debug_assert!(ack == MOUSE_ACK || ack == 0, "mouse did not ack enable-reporting");

    PACKET_INDEX.store(0, Ordering::Relaxed);
}

/// Re-enable the mouse IRQ line. Called once bringup has transitioned
/// to ring 3, matching `mouse_drain_buffer`'s role in the source: the
/// controller may have latched a byte while interrupts were masked, and
/// resuming from byte 0 keeps packet assembly aligned.
pub fn drain_and_enable_irq() {
    PACKET_INDEX.store(0, Ordering::Relaxed);
    pic::enable(crate::config::IRQ_MOUSE);
}

fn clamp(value: i32, max: i32) -> i32 {
    value.clamp(0, max - 1)
}

/// IRQ12 handler body, called from [`crate::scheduler::stub_irq12_mouse`].
pub fn on_irq() {
    IRQ_TOTAL.fetch_add(1, Ordering::Relaxed);

    // SAFETY: reads the controller's own data port; called only from
    // the IRQ12 handler, which the controller only raises once a byte
    // is ready.
    let byte = unsafe { inb(DATA_PORT) };

    let index = PACKET_INDEX.load(Ordering::Relaxed);
    if index == 0 && byte & 0x08 == 0 {
        // Not packet-aligned; drop until the next byte with the
        // alignment bit set.
        return;
    }

    PACKET[index as usize].store(byte, Ordering::Relaxed);
    let next = index + 1;

    if next < 3 {
        PACKET_INDEX.store(next, Ordering::Relaxed);
        return;
    }

    PACKET_INDEX.store(0, Ordering::Relaxed);

    let flags = PACKET[0].load(Ordering::Relaxed);
    let raw_dx = PACKET[1].load(Ordering::Relaxed) as i8 as i32;
    let raw_dy = PACKET[2].load(Ordering::Relaxed) as i8 as i32;

    const SENSITIVITY: i32 = 2;
    let dx = raw_dx * SENSITIVITY;
    let dy = -raw_dy * SENSITIVITY; // PS/2 Y is inverted relative to screen rows

    let x = clamp(POSITION_X.load(Ordering::Relaxed) + dx, MOUSE_SCREEN_BOUNDS.0);
    let y = clamp(POSITION_Y.load(Ordering::Relaxed) + dy, MOUSE_SCREEN_BOUNDS.1);
    POSITION_X.store(x, Ordering::Relaxed);
    POSITION_Y.store(y, Ordering::Relaxed);
    BUTTONS.store(flags & 0x07, Ordering::Relaxed);
}

/// Service the controller's data port if a byte is already waiting,
/// without blocking. Backs the `poll_mouse` syscall, for user programs
/// that run with the mouse IRQ masked and need to service it manually.
pub fn poll() -> bool {
    // SAFETY: reads only the controller's own status port.
    let pending = unsafe { inb(STATUS_PORT) } & STATUS_OUTPUT_FULL != 0;
    if pending {
        on_irq();
    }
    pending
}

pub struct Ps2Mouse;

impl super::Mouse for Ps2Mouse {
    fn x(&self) -> i32 {
        POSITION_X.load(Ordering::Relaxed)
    }

    fn y(&self) -> i32 {
        POSITION_Y.load(Ordering::Relaxed)
    }

    fn buttons(&self) -> u8 {
        BUTTONS.load(Ordering::Relaxed)
    }

    fn irq_total(&self) -> u32 {
        IRQ_TOTAL.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn clamp_keeps_position_in_bounds() {
        assert_eq!(clamp(-5, 1024), 0);
        assert_eq!(clamp(2000, 1024), 1023);
        assert_eq!(clamp(500, 1024), 500);
    }
}
