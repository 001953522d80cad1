//! VGA text-mode [`super::Console`] implementation, built directly on
//! [`crate::vga_buffer`]'s `WRITER` rather than duplicating its buffer
//! access.

use crate::port::outb;
use crate::vga_buffer::colors::ColorCode;
use crate::vga_buffer::constants::{BUFFER_HEIGHT, BUFFER_WIDTH};
use crate::vga_buffer::writer::{ScreenChar, WRITER};

const CURSOR_COMMAND: u16 = 0x3D4;
const CURSOR_DATA: u16 = 0x3D5;

pub struct VgaConsole;

impl super::Console for VgaConsole {
    fn putc(&mut self, c: u8) {
        WRITER.lock().write_byte(c);
    }

    fn puts(&mut self, s: &str) {
        WRITER.lock().write_string(s);
    }

    fn clear(&mut self) {
        let mut writer = WRITER.lock();
        let blank = ScreenChar {
            ascii_character: b' ',
            color_code: writer.color_code,
        };
        for row in 0..BUFFER_HEIGHT {
            for col in 0..BUFFER_WIDTH {
                writer.buffer.chars[row][col].write(blank);
            }
        }
        writer.column_position = 0;
    }

    fn set_color(&mut self, foreground: u8, background: u8) {
        WRITER.lock().color_code = ColorCode::from_nibbles(foreground, background);
    }

    fn set_cursor(&mut self, row: usize, col: usize) {
        let position = (row * BUFFER_WIDTH + col) as u16;
        // SAFETY: writes only the VGA CRTC cursor-location registers.
        unsafe {
            outb(CURSOR_COMMAND, 0x0F);
            outb(CURSOR_DATA, (position & 0xFF) as u8);
            outb(CURSOR_COMMAND, 0x0E);
            outb(CURSOR_DATA, ((position >> 8) & 0xFF) as u8);
        }
    }

    fn print_at(&mut self, row: usize, col: usize, s: &str) {
        if row >= BUFFER_HEIGHT {
            return;
        }
        let mut writer = WRITER.lock();
        let color_code = writer.color_code;
        for (i, byte) in s.bytes().enumerate() {
            let c = col + i;
            if c >= BUFFER_WIDTH {
                break;
            }
            writer.buffer.chars[row][c].write(ScreenChar {
                ascii_character: byte,
                color_code,
            });
        }
    }

    fn draw_rect(&mut self, row: usize, col: usize, width: usize, height: usize) {
        let mut writer = WRITER.lock();
        let blank = ScreenChar {
            ascii_character: b' ',
            color_code: writer.color_code,
        };
        for r in row..(row + height).min(BUFFER_HEIGHT) {
            for c in col..(col + width).min(BUFFER_WIDTH) {
                writer.buffer.chars[r][c].write(blank);
            }
        }
    }

    fn draw_box(&mut self, row: usize, col: usize, width: usize, height: usize) {
        if width == 0 || height == 0 {
            return;
        }
        let mut writer = WRITER.lock();
        let color_code = writer.color_code;
        let mut put = |r: usize, c: usize, byte: u8| {
            if r < BUFFER_HEIGHT && c < BUFFER_WIDTH {
                writer.buffer.chars[r][c].write(ScreenChar {
                    ascii_character: byte,
                    color_code,
                });
            }
        };
        for c in col..col + width {
            put(row, c, b'-');
            put(row + height - 1, c, b'-');
        }
        for r in row..row + height {
            put(r, col, b'|');
            put(r, col + width - 1, b'|');
        }
    }
}

#[allow(dead_code)]
fn color_code_size_is_one_byte() -> usize {
    core::mem::size_of::<ColorCode>()
}
