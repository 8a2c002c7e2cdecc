//! # Render Sink
//!
//! Writes the menu below the input line without clearing the screen.
//!
//! A draw pass walks down one line per visible row, then moves the cursor
//! back up to the input line and over to the end of the typed text:
//!
//! ```text
//! typed text_                         <- input line, cursor parked here
//!  gpu_1x_a10    us-east-1   $0.75/hr
//!  gpu_8x_h100   us-west-2  $23.92/hr   <- selected, reverse video
//! ```
//!
//! Raw mode turns off output post-processing, so every line feed is
//! preceded by a carriage return.

use super::layout;
use std::io::{self, Write};

const RESET: &str = "\x1b[0m";
const REVERSE: &str = "\x1b[7m";
const NEW_LINE: &str = "\r\n\x1b[2K";
const CLEAR_BELOW: &str = "\x1b[J";
const CLEAR_MENU: &str = "\x1b[G\x1b[J";

/// Buffers one pass worth of control sequences and flushes it at once.
pub struct Renderer<W: Write> {
    out: W,
    buf: Vec<u8>,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            buf: Vec::with_capacity(4096),
        }
    }

    /// Reset colors before the first pass.
    pub fn begin(&mut self) -> io::Result<()> {
        self.buf.extend_from_slice(RESET.as_bytes());
        self.flush()
    }

    /// Draw `lines` under the input line, highlighting the one at
    /// `selected` (relative to the first line), and park the cursor after
    /// `input_cells` cells of typed text.
    pub fn draw(
        &mut self,
        lines: &[String],
        selected: Option<usize>,
        width: usize,
        input_cells: usize,
    ) -> io::Result<()> {
        let cells = layout::text_width(width);
        for (i, line) in lines.iter().enumerate() {
            let text = layout::fit(line, cells);
            self.buf.extend_from_slice(NEW_LINE.as_bytes());
            if selected == Some(i) {
                write!(self.buf, "{REVERSE} {text} {RESET}")?;
            } else {
                write!(self.buf, " {text} ")?;
            }
        }
        // Rows left over from a longer list.
        self.buf.extend_from_slice(CLEAR_BELOW.as_bytes());

        if !lines.is_empty() {
            write!(self.buf, "\x1b[{}F", lines.len())?;
        }
        write!(self.buf, "\x1b[{}G", input_cells + 1)?;
        self.flush()
    }

    pub fn echo(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
    }

    /// Blank the last `cells` cells of the input line.
    pub fn erase(&mut self, cells: usize) {
        for _ in 0..cells {
            self.buf.extend_from_slice(b"\x08");
        }
        for _ in 0..cells {
            self.buf.push(b' ');
        }
        for _ in 0..cells {
            self.buf.extend_from_slice(b"\x08");
        }
    }

    /// Wipe the menu from the input line down.
    pub fn clear(&mut self) -> io::Result<()> {
        self.buf.extend_from_slice(CLEAR_MENU.as_bytes());
        self.flush()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.write_all(&self.buf)?;
        self.buf.clear();
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
