//! Programmable Interval Timer (C3): IRQ0 tick source.
//!
//! Grounded on `original_source/src/managers/timer/pit.c`: divisor
//! `1193182 / frequency`, rate-generator command byte `0x36`, channel-0
//! data port `0x40`, command port `0x43`.

use core::arch::naked_asm;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::IRQ_TIMER;
use crate::port::outb;
use crate::{pic, scheduler};

const CHANNEL0_DATA: u16 = 0x40;
const COMMAND: u16 = 0x43;
const COMMAND_RATE_GENERATOR: u8 = 0x36;
const BASE_FREQUENCY_HZ: u32 = 1_193_182;

static TICKS: AtomicU32 = AtomicU32::new(0);

/// Program channel 0 for `frequency_hz` ticks per second.
pub fn init(frequency_hz: u32) {
    let divisor = BASE_FREQUENCY_HZ / frequency_hz;
    // SAFETY: writes only the PIT's own ports, during single-threaded
    // bringup before the timer IRQ is unmasked.
    unsafe {
        outb(COMMAND, COMMAND_RATE_GENERATOR);
        outb(CHANNEL0_DATA, (divisor & 0xFF) as u8);
        outb(CHANNEL0_DATA, ((divisor >> 8) & 0xFF) as u8);
    }
}

/// Ticks observed since [`init`], wrapping at `u32::MAX`.
pub fn ticks() -> u32 {
    TICKS.load(Ordering::Relaxed)
}

/// Busy-wait for `count` ticks. Only meaningful with interrupts enabled.
pub fn wait(count: u32) {
    let target = TICKS.load(Ordering::Relaxed).wrapping_add(count);
    while TICKS.load(Ordering::Relaxed) < target {
        // SAFETY: `pause` is a no-op hint with no memory effects.
        unsafe {
            core::arch::asm!("pause", options(nomem, nostack));
        }
    }
}

/// Rust-side IRQ0 handler: advance the tick counter, let the scheduler
/// observe it, and acknowledge the interrupt.
extern "C" fn handle() {
    TICKS.fetch_add(1, Ordering::Relaxed);
    scheduler::on_timer_tick();
    pic::end_of_interrupt(IRQ_TIMER);
}

/// Naked IRQ0 gate: save every GPR, call [`handle`], restore, `iret`.
#[naked]
pub unsafe extern "C" fn stub_irq0() {
    // SAFETY: installed directly as the IRQ0 interrupt-gate handler;
    // the CPU has pushed `EFLAGS`/`CS`/`EIP` (no error code for an IRQ).
    unsafe {
        naked_asm!(
            "pushad",
            "call {handler}",
            "popad",
            "iretd",
            handler = sym handle,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn divisor_for_100hz_matches_source_constant() {
        assert_eq!(BASE_FREQUENCY_HZ / 100, 11_931);
    }
}
