//! Per-frame LZW decoding and scan-line assembly.
//!
//! `FrameDecoder` borrows the long-lived tables out of `GifDecoder` for the
//! duration of one frame: the 4096-entry dictionary, the pixel stack used to
//! unwind reversed prefix strings, and the single line buffer. Nothing here
//! allocates.

use log::warn;

use crate::decoder::FrameInfo;
use crate::error::GifError;
use crate::sink::{DrawLine, LineSink};
use crate::source::GifSource;
use crate::window::LzwWindow;

/// Codes are at most 12 bits wide.
pub(crate) const MAX_CODE: usize = 4096;
/// Scratch for unwinding one prefix chain; a chain can never exceed the
/// dictionary size, so this bound is only reachable through corruption.
pub(crate) const PIXEL_STACK_SIZE: usize = 4096;

// Link sentinels sit above any valid 12-bit code.
const LINK_UNUSED: u16 = 5911;
const LINK_END: u16 = 5912;

/// Dictionary and scratch shared across frames, owned by the decoder and
/// reset (not reallocated) for every frame.
pub(crate) struct LzwTables {
    /// Prefix pointer per code; `LINK_END` for roots, `LINK_UNUSED` for
    /// slots not yet filled since the last clear.
    pub link: [u16; MAX_CODE],
    /// First pixel of the string each code expands to.
    pub first: [u8; MAX_CODE],
    /// Last pixel of the string each code expands to.
    pub last: [u8; MAX_CODE],
    pub stack: [u8; PIXEL_STACK_SIZE],
}

impl LzwTables {
    pub fn new() -> Self {
        LzwTables {
            link: [0; MAX_CODE],
            first: [0; MAX_CODE],
            last: [0; MAX_CODE],
            stack: [0; PIXEL_STACK_SIZE],
        }
    }
}

/// Interlaced frames deliver rows in four passes: (first row, row stride).
const INTERLACE_PASSES: [(u16, u16); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

pub(crate) struct FrameDecoder<'a, S, R> {
    source: &'a mut S,
    sink: &'a mut R,
    frame: &'a FrameInfo,
    palette: &'a [u16; 256],
    background: u8,
    window: &'a mut LzwWindow,
    tables: &'a mut LzwTables,
    line: &'a mut [u8],

    clear_code: u16,
    end_code: u16,
    code_size: u32,
    mask: u16,
    next_code: u16,
    next_limit: u16,
    bits: u32,
    bitnum: u32,

    x_remaining: usize,
    y_remaining: usize,
    row_y: u16,
    pass: usize,
}

impl<'a, S, R> FrameDecoder<'a, S, R>
where
    S: GifSource,
    R: LineSink,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        source: &'a mut S,
        sink: &'a mut R,
        frame: &'a FrameInfo,
        palette: &'a [u16; 256],
        background: u8,
        window: &'a mut LzwWindow,
        tables: &'a mut LzwTables,
        line: &'a mut [u8],
    ) -> Self {
        let clear_code = 1u16 << frame.code_start;
        FrameDecoder {
            source,
            sink,
            frame,
            palette,
            background,
            window,
            tables,
            line,

            clear_code,
            end_code: clear_code + 1,
            code_size: 0,
            mask: 0,
            next_code: 0,
            next_limit: 0,
            bits: 0,
            bitnum: 0,

            x_remaining: frame.width as usize,
            y_remaining: frame.height as usize,
            row_y: 0,
            pass: 0,
        }
    }

    /// Consumes the frame's code stream until the end code arrives or the
    /// image is complete, feeding finished rows to the sink.
    pub(crate) fn decode(mut self) -> Result<(), GifError> {
        let cc = self.clear_code as usize;
        for c in 0..cc {
            self.tables.first[c] = c as u8;
            self.tables.last[c] = c as u8;
            self.tables.link[c] = LINK_END;
        }
        self.reset_tables();
        self.window.refill(self.source);
        self.bits = self.window.reload(0, self.source)?;

        let mut old_code = match self.first_code()? {
            Some(code) => code,
            None => return Ok(()),
        };
        self.emit(old_code)?;

        while self.y_remaining > 0 {
            let code = self.read_code()?;
            if code == self.clear_code {
                self.reset_tables();
                old_code = match self.first_code()? {
                    Some(code) => code,
                    None => return Ok(()),
                };
                self.emit(old_code)?;
                continue;
            }
            if code == self.end_code {
                break;
            }

            // Install the pending entry before expanding `code`; when the
            // stream refers to the slot being created (the KwKwK case) the
            // expansion below then finds a valid chain.
            if self.next_code < self.next_limit {
                let slot = self.next_code as usize;
                self.tables.link[slot] = old_code;
                self.tables.first[slot] = self.tables.first[old_code as usize];
                self.tables.last[slot] = if self.tables.link[code as usize] == LINK_UNUSED {
                    self.tables.first[old_code as usize]
                } else {
                    self.tables.first[code as usize]
                };
            }
            if self.next_code < MAX_CODE as u16 {
                self.next_code += 1;
                if self.next_code >= self.next_limit && self.code_size < 12 {
                    self.code_size += 1;
                    self.next_limit <<= 1;
                    self.mask = (self.mask << 1) | 1;
                }
            }

            self.emit(code)?;
            old_code = code;
        }
        Ok(())
    }

    /// Clear state: code width back to one past the root width, the
    /// non-root part of the dictionary emptied.
    fn reset_tables(&mut self) {
        self.code_size = self.frame.code_start as u32 + 1;
        self.mask = (1u16 << self.code_size) - 1;
        self.next_code = self.clear_code + 2;
        self.next_limit = 1u16 << self.code_size;
        self.tables.link[self.clear_code as usize..].fill(LINK_UNUSED);
    }

    /// Reads the code that seeds `old_code` after a reset, skipping any
    /// run of clear codes. `None` means the stream ended the frame before
    /// producing a pixel.
    fn first_code(&mut self) -> Result<Option<u16>, GifError> {
        loop {
            let code = self.read_code()?;
            if code == self.end_code {
                return Ok(None);
            }
            if code != self.clear_code {
                return Ok(Some(code));
            }
        }
    }

    fn read_code(&mut self) -> Result<u16, GifError> {
        if self.bitnum > 32 - self.code_size {
            self.bits = self
                .window
                .reload((self.bitnum >> 3) as usize, self.source)?;
            self.bitnum &= 7;
        }
        let code = (self.bits >> self.bitnum) as u16 & self.mask;
        self.bitnum += self.code_size;
        Ok(code)
    }

    /// Expands `code` by walking its prefix chain, then copies the string
    /// into the line buffer, flushing each completed row to the sink.
    fn emit(&mut self, code: u16) -> Result<(), GifError> {
        let mut top = PIXEL_STACK_SIZE;
        let mut c = code;
        while c < LINK_UNUSED {
            if top == 0 {
                warn!("pixel stack overflow, aborting frame");
                return Err(GifError::Decode);
            }
            top -= 1;
            self.tables.stack[top] = self.tables.last[c as usize];
            c = self.tables.link[c as usize];
        }
        if c == LINK_UNUSED {
            warn!("code {} refers to an empty dictionary slot", code);
            return Err(GifError::Decode);
        }

        let width = self.frame.width as usize;
        let mut count = PIXEL_STACK_SIZE - top;
        while count > 0 && self.y_remaining > 0 {
            let filled = width - self.x_remaining;
            if self.x_remaining > count {
                self.line[filled..filled + count]
                    .copy_from_slice(&self.tables.stack[top..top + count]);
                self.x_remaining -= count;
                return Ok(());
            }
            let take = self.x_remaining;
            self.line[filled..width].copy_from_slice(&self.tables.stack[top..top + take]);
            top += take;
            count -= take;
            self.x_remaining = width;
            self.flush_row();
            self.y_remaining -= 1;
            if self.y_remaining & 3 == 0 {
                self.window.refill(self.source);
            }
        }
        Ok(())
    }

    fn flush_row(&mut self) {
        let width = self.frame.width as usize;
        self.sink.draw_line(&DrawLine {
            frame_x: self.frame.x,
            frame_y: self.frame.y,
            frame_width: self.frame.width,
            frame_height: self.frame.height,
            row: self.row_y,
            pixels: &self.line[..width],
            palette: self.palette,
            transparent: self.frame.transparent,
            has_transparency: self.frame.has_transparency,
            disposal: self.frame.disposal,
            background: self.background,
        });
        if self.frame.interlaced {
            self.row_y += INTERLACE_PASSES[self.pass].1;
            while self.row_y >= self.frame.height && self.pass < 3 {
                self.pass += 1;
                self.row_y = INTERLACE_PASSES[self.pass].0;
            }
        } else {
            self.row_y += 1;
        }
    }
}
