//! COM1 debug/log sink (ambient stack, §2.1, §3.1).
//!
//! A 16550 UART driver is the right shape of thing to want, but this
//! kernel talks to the same ports directly through [`crate::port`]
//! instead, matching the ad hoc `inb`/`outb` serial debug helpers
//! scattered through `syscall_handler.c` and `mouse.c` in the original
//! source, generalized here into one owned driver instead of
//! copy-pasted static functions.

use core::fmt;

use lazy_static::lazy_static;
use spin::Mutex;

use crate::port::{inb, outb};

const COM1: u16 = 0x3F8;

/// Minimal 16550-compatible UART driver, COM1 only, polling writes.
pub struct SerialPort {
    base: u16,
}

impl SerialPort {
    /// Construct a driver for the UART at `base`. Does not touch hardware.
    const fn new(base: u16) -> Self {
        Self { base }
    }

    /// Program the UART: disable interrupts, set 38400 baud, 8N1, and
    /// enable the FIFO.
    fn init(&mut self) {
        // SAFETY: `self.base` is the fixed COM1 I/O range; these writes
        // follow the standard 16550 init sequence.
        unsafe {
            outb(self.base + 1, 0x00); // disable all UART interrupts
            outb(self.base + 3, 0x80); // enable DLAB to set baud divisor
            outb(self.base, 0x03); // divisor low byte (38400 baud)
            outb(self.base + 1, 0x00); // divisor high byte
            outb(self.base + 3, 0x03); // 8 bits, no parity, one stop bit
            outb(self.base + 2, 0xC7); // enable FIFO, clear, 14-byte threshold
            outb(self.base + 4, 0x0B); // IRQs disabled, RTS/DSR set
        }
    }

    fn line_status(&self) -> u8 {
        // SAFETY: reading the line status register has no side effect
        // beyond reflecting transmitter state.
        unsafe { inb(self.base + 5) }
    }

    fn write_byte(&mut self, byte: u8) {
        while self.line_status() & 0x20 == 0 {
            core::hint::spin_loop();
        }
        // SAFETY: transmitter holding register is confirmed empty above.
        unsafe {
            outb(self.base, byte);
        }
    }
}

impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

lazy_static! {
    pub static ref SERIAL1: Mutex<SerialPort> = {
        let mut serial_port = SerialPort::new(COM1);
        serial_port.init();
        Mutex::new(serial_port)
    };
}

#[doc(hidden)]
pub fn _print(args: ::core::fmt::Arguments) {
    use core::fmt::Write;

    #[expect(
        clippy::expect_used,
        reason = "Serial port should be correctly initialized."
    )]
    SERIAL1
        .lock()
        .write_fmt(args)
        .expect("Failed to print on serial port.");
}

/// Print to host machine through serial port interface.
#[macro_export]
macro_rules! serial_print {
    ($($args:tt)*) => {
        $crate::serial::_print(format_args!($($args)*));
    };
}

/// Print to host machine through serial port interface a line.
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($fmt:expr) => ($crate::serial_print!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => ($crate::serial_print!(
        concat!($fmt, "\n"), $($arg)*));
}
