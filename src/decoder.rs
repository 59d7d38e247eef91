//! The decoder instance: header and frame parsing, and the `play_frame`
//! driver that ties the byte source, the LZW stage and the draw sink
//! together.

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use crate::error::GifError;
use crate::frame::{FrameDecoder, LzwTables};
use crate::sink::{DisposalMethod, LineSink};
use crate::source::GifSource;
use crate::util::{rgb565, PaletteOrder};
use crate::window::LzwWindow;

/// Widest frame the single line buffer accommodates.
pub const MAX_WIDTH: usize = 320;

/// Scratch for parsing headers, palettes and extension chains. Large enough
/// for the screen descriptor plus a full 256-entry colour table.
const FILE_BUF_SIZE: usize = 1024;

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

// Extension labels.
const GRAPHIC_CONTROL: u8 = 0xF9;
const APPLICATION: u8 = 0xFF;
const PLAIN_TEXT: u8 = 0x01;
const COMMENT: u8 = 0xFE;

/// Per-frame state, rebuilt from scratch by every frame parse. A frame that
/// carries no graphic control extension has no transparency, disposal 0 and
/// no delay.
#[derive(Default)]
pub(crate) struct FrameInfo {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
    pub use_local_palette: bool,
    /// Initial LZW code size from the stream, 2..=8.
    pub code_start: u8,
    pub delay_ms: u32,
    pub control_bits: u8,
    pub transparent: u8,
    pub has_transparency: bool,
    pub disposal: DisposalMethod,
}

/// Streaming GIF decoder over a byte source `S`, delivering scan lines to a
/// sink `R`.
///
/// All working memory is inside the value: two 256-entry RGB565 palettes,
/// the 4096-entry LZW dictionary, the pixel stack, one line buffer and the
/// chunk window. Nothing is allocated while decoding; hosts short on stack
/// can box the decoder once and reuse it per input via [`GifDecoder::reset`].
pub struct GifDecoder<S, R> {
    source: S,
    sink: R,
    palette_order: PaletteOrder,
    last_error: Option<GifError>,
    opened: bool,

    canvas_width: u16,
    canvas_height: u16,
    bpp: u8,
    background: u8,

    frame: FrameInfo,
    global_palette: [u16; 256],
    local_palette: [u16; 256],

    comment_pos: usize,
    comment_len: u8,

    window: LzwWindow,
    tables: LzwTables,
    line: [u8; MAX_WIDTH],

    // Buffered block reader over `source`; `buf_pos` is the stream position
    // of `buf[0]`, so `buf_pos + buf_off` is the parser's logical position.
    buf: [u8; FILE_BUF_SIZE],
    buf_len: usize,
    buf_off: usize,
    buf_pos: usize,
}

impl<S, R> GifDecoder<S, R>
where
    S: GifSource,
    R: LineSink,
{
    pub fn new(source: S, sink: R) -> Self {
        Self::with_palette_order(source, sink, PaletteOrder::Native)
    }

    /// Like [`GifDecoder::new`], with the palette byte order chosen up
    /// front (it applies from the next palette load on).
    pub fn with_palette_order(source: S, sink: R, order: PaletteOrder) -> Self {
        GifDecoder {
            source,
            sink,
            palette_order: order,
            last_error: None,
            opened: false,

            canvas_width: 0,
            canvas_height: 0,
            bpp: 0,
            background: 0,

            frame: FrameInfo::default(),
            global_palette: [0; 256],
            local_palette: [0; 256],

            comment_pos: 0,
            comment_len: 0,

            window: LzwWindow::new(),
            tables: LzwTables::new(),
            line: [0; MAX_WIDTH],

            buf: [0; FILE_BUF_SIZE],
            buf_len: 0,
            buf_off: 0,
            buf_pos: 0,
        }
    }

    /// Validates the signature and records the canvas description, then
    /// rewinds so the first `play_frame` starts from the top of the stream.
    pub fn open(&mut self) -> Result<(), GifError> {
        self.source.seek(0);
        let r = self.parse_screen_descriptor(true);
        match r {
            Ok(()) => {
                self.opened = true;
                self.last_error = None;
                self.source.seek(0);
                debug!(
                    "opened GIF canvas {}x{} at {} bpp",
                    self.canvas_width, self.canvas_height, self.bpp
                );
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e);
                Err(e)
            }
        }
    }

    /// Parses and decodes the next frame, delivering every row to the sink.
    ///
    /// Returns `Ok(true)` when the frame was delivered and more data
    /// follows, `Ok(false)` when no more frames remain: either the frame
    /// just delivered was the last one, or the trailer was found straight
    /// away (then [`GifDecoder::last_error`] reports `EndOfStream`).
    /// Entering with the cursor at the end of the stream rewinds to the
    /// start, so a host looping an animation just keeps calling this.
    pub fn play_frame(&mut self) -> Result<bool, GifError> {
        match self.play_frame_inner() {
            Ok(more) => {
                self.last_error = None;
                Ok(more)
            }
            Err(GifError::EndOfStream) => {
                self.last_error = Some(GifError::EndOfStream);
                Ok(false)
            }
            Err(e) => {
                self.last_error = Some(e);
                Err(e)
            }
        }
    }

    fn play_frame_inner(&mut self) -> Result<bool, GifError> {
        if !self.opened {
            return Err(GifError::InvalidParameter);
        }
        if self.source.pos() >= self.source.size() {
            self.source.seek(0);
        }
        self.parse_frame()?;
        self.decode_frame()?;
        Ok(self.source.pos() + 1 < self.source.size())
    }

    /// Rewinds the stream to the first frame.
    pub fn reset(&mut self) {
        self.source.seek(0);
    }

    /// Kind of the most recent failure; cleared by a successful
    /// `play_frame` or `open`.
    pub fn last_error(&self) -> Option<GifError> {
        self.last_error
    }

    pub fn canvas_width(&self) -> u16 {
        self.canvas_width
    }

    pub fn canvas_height(&self) -> u16 {
        self.canvas_height
    }

    /// Default bits per pixel from the logical screen descriptor.
    pub fn bits_per_pixel(&self) -> u8 {
        self.bpp
    }

    pub fn background_index(&self) -> u8 {
        self.background
    }

    /// Delay of the most recently parsed frame in milliseconds. Raw values
    /// under 30 ms are reported as 100 ms; encoders use tiny delays to mean
    /// "as fast as possible", which would starve slow panels.
    pub fn frame_delay(&self) -> u32 {
        self.frame.delay_ms
    }

    /// Length in bytes of the first comment sub-block, 0 when none was seen
    /// while parsing so far.
    pub fn comment_len(&self) -> usize {
        self.comment_len as usize
    }

    /// Copies the first comment sub-block into `dst` with a
    /// seek-read-seek cycle on the source, returning the byte count.
    pub fn comment(&mut self, dst: &mut [u8]) -> Result<usize, GifError> {
        if self.comment_len == 0 {
            return Ok(0);
        }
        let n = (self.comment_len as usize).min(dst.len());
        let old = self.source.pos();
        self.source.seek(self.comment_pos);
        let got = self.source.read(&mut dst[..n]);
        self.source.seek(old);
        if got < n {
            return Err(GifError::ShortRead);
        }
        Ok(n)
    }

    /// Gives the source and sink back, e.g. so a callback source's handle
    /// can be closed.
    pub fn into_parts(self) -> (S, R) {
        (self.source, self.sink)
    }

    // === buffered block reader ===

    fn begin_buffer(&mut self) {
        self.buf_len = 0;
        self.buf_off = 0;
        self.buf_pos = self.source.pos();
    }

    /// Makes at least `n` bytes available at the current offset, compacting
    /// consumed bytes away and topping up from the source.
    fn ensure(&mut self, n: usize) -> Result<(), GifError> {
        debug_assert!(n <= FILE_BUF_SIZE);
        if self.buf_len - self.buf_off >= n {
            return Ok(());
        }
        if self.buf_off > 0 {
            self.buf.copy_within(self.buf_off..self.buf_len, 0);
            self.buf_pos += self.buf_off;
            self.buf_len -= self.buf_off;
            self.buf_off = 0;
        }
        while self.buf_len < n {
            let got = self.source.read(&mut self.buf[self.buf_len..]);
            if got == 0 {
                return Err(GifError::ShortRead);
            }
            self.buf_len += got;
        }
        Ok(())
    }

    fn take_u8(&mut self) -> Result<u8, GifError> {
        self.ensure(1)?;
        let b = self.buf[self.buf_off];
        self.buf_off += 1;
        Ok(b)
    }

    fn take_u16(&mut self) -> Result<u16, GifError> {
        self.ensure(2)?;
        let v = LittleEndian::read_u16(&self.buf[self.buf_off..self.buf_off + 2]);
        self.buf_off += 2;
        Ok(v)
    }

    fn skip(&mut self, n: usize) -> Result<(), GifError> {
        self.ensure(n)?;
        self.buf_off += n;
        Ok(())
    }

    /// Stream position of the next unconsumed byte.
    fn parser_pos(&self) -> usize {
        self.buf_pos + self.buf_off
    }

    /// Re-positions the source at the parser's logical position, undoing
    /// the reader's read-ahead.
    fn sync_source(&mut self) {
        let pos = self.parser_pos();
        self.source.seek(pos);
    }

    // === header parsing ===

    /// Logical screen descriptor, optionally followed by the global colour
    /// table. With `info_only` set, stops after the 12-byte prefix.
    fn parse_screen_descriptor(&mut self, info_only: bool) -> Result<(), GifError> {
        self.begin_buffer();
        self.ensure(12).map_err(|_| GifError::BadHeader)?;
        if &self.buf[..5] != b"GIF87" && &self.buf[..5] != b"GIF89" {
            return Err(GifError::BadHeader);
        }
        self.canvas_width = LittleEndian::read_u16(&self.buf[6..8]);
        self.canvas_height = LittleEndian::read_u16(&self.buf[8..10]);
        let packed = self.buf[10];
        self.bpp = ((packed >> 4) & 7) + 1;
        self.background = self.buf[11];
        if info_only {
            return Ok(());
        }
        self.skip(13)?; // includes the pixel aspect byte
        if packed & 0x80 != 0 {
            let entries = 1usize << ((packed & 7) + 1);
            self.load_palette(entries, false)?;
        }
        Ok(())
    }

    /// Converts `entries` RGB triplets to RGB565 in the configured byte
    /// order, into the local or global table.
    fn load_palette(&mut self, entries: usize, local: bool) -> Result<(), GifError> {
        self.ensure(entries * 3)?;
        let swap = self.palette_order == PaletteOrder::Swapped;
        let mut off = self.buf_off;
        for i in 0..entries {
            let c = rgb565(self.buf[off], self.buf[off + 1], self.buf[off + 2]);
            let c = if swap { c.swap_bytes() } else { c };
            if local {
                self.local_palette[i] = c;
            } else {
                self.global_palette[i] = c;
            }
            off += 3;
        }
        self.buf_off = off;
        Ok(())
    }

    // === frame parsing ===

    /// Walks extension blocks until an image descriptor starts the next
    /// frame, or the trailer ends the stream.
    fn parse_frame(&mut self) -> Result<(), GifError> {
        self.frame = FrameInfo::default();
        if self.source.pos() == 0 {
            self.parse_screen_descriptor(false)?;
        } else {
            self.begin_buffer();
        }
        loop {
            match self.take_u8()? {
                IMAGE_SEPARATOR => return self.parse_image_descriptor(),
                EXTENSION_INTRODUCER => self.parse_extension()?,
                TRAILER => {
                    debug!("GIF trailer reached");
                    return Err(GifError::EndOfStream);
                }
                _ => return Err(GifError::BadHeader),
            }
        }
    }

    fn parse_extension(&mut self) -> Result<(), GifError> {
        match self.take_u8()? {
            GRAPHIC_CONTROL => self.parse_graphic_control(),
            APPLICATION => self.parse_application(),
            PLAIN_TEXT => self.skip_sub_blocks(),
            COMMENT => self.parse_comment(),
            _ => Err(GifError::BadHeader),
        }
    }

    fn parse_graphic_control(&mut self) -> Result<(), GifError> {
        if self.take_u8()? != 4 {
            return Err(GifError::BadHeader);
        }
        self.ensure(5)?;
        let bits = self.buf[self.buf_off];
        let raw_delay = LittleEndian::read_u16(&self.buf[self.buf_off + 1..self.buf_off + 3]);
        let transparent = self.buf[self.buf_off + 3];
        let terminator = self.buf[self.buf_off + 4];
        self.buf_off += 5;
        if terminator != 0 {
            return Err(GifError::BadHeader);
        }
        self.frame.control_bits = bits;
        self.frame.disposal = DisposalMethod::from_raw((bits >> 2) & 7);
        self.frame.has_transparency = bits & 1 != 0;
        if self.frame.has_transparency {
            self.frame.transparent = transparent;
        }
        let mut delay_ms = raw_delay as u32 * 10;
        if delay_ms < 30 {
            delay_ms = 100;
        }
        self.frame.delay_ms = delay_ms;
        Ok(())
    }

    fn parse_application(&mut self) -> Result<(), GifError> {
        loop {
            let len = self.take_u8()? as usize;
            if len == 0 {
                return Ok(());
            }
            self.ensure(len)?;
            if len == 11 && &self.buf[self.buf_off..self.buf_off + 11] == b"NETSCAPE2.0" {
                // The loop count that may follow is deliberately not
                // surfaced; looping is the host's call.
                debug!("NETSCAPE2.0 application extension");
            }
            self.buf_off += len;
        }
    }

    /// Remembers where the first comment sub-block lives so
    /// [`GifDecoder::comment`] can fetch it later.
    fn parse_comment(&mut self) -> Result<(), GifError> {
        loop {
            let len = self.take_u8()?;
            if len == 0 {
                return Ok(());
            }
            if self.comment_pos == 0 {
                self.comment_pos = self.parser_pos();
                self.comment_len = len;
            }
            self.skip(len as usize)?;
        }
    }

    fn skip_sub_blocks(&mut self) -> Result<(), GifError> {
        loop {
            let len = self.take_u8()?;
            if len == 0 {
                return Ok(());
            }
            self.skip(len as usize)?;
        }
    }

    /// Image descriptor: frame rectangle, flags, optional local palette and
    /// the initial LZW code size. Leaves the source positioned at the first
    /// data sub-block.
    fn parse_image_descriptor(&mut self) -> Result<(), GifError> {
        let x = self.take_u16()?;
        let y = self.take_u16()?;
        let width = self.take_u16()?;
        let height = self.take_u16()?;
        let packed = self.take_u8()?;

        if width == 0 || height == 0 {
            return Err(GifError::BadHeader);
        }
        if x as u32 + width as u32 > self.canvas_width as u32
            || y as u32 + height as u32 > self.canvas_height as u32
        {
            return Err(GifError::BadHeader);
        }
        if width as usize > MAX_WIDTH {
            return Err(GifError::BadHeader);
        }

        self.frame.x = x;
        self.frame.y = y;
        self.frame.width = width;
        self.frame.height = height;
        self.frame.interlaced = packed & 0x40 != 0;

        if packed & 0x80 != 0 {
            let entries = 1usize << ((packed & 7) + 1);
            self.load_palette(entries, true)?;
            self.frame.use_local_palette = true;
        }

        let code_start = self.take_u8()?;
        if !(2..=8).contains(&code_start) {
            return Err(GifError::BadHeader);
        }
        self.frame.code_start = code_start;
        debug!(
            "frame {}x{} at ({},{}) interlaced={} local_palette={}",
            width, height, x, y, self.frame.interlaced, self.frame.use_local_palette
        );

        self.sync_source();
        Ok(())
    }

    // === frame decoding ===

    fn decode_frame(&mut self) -> Result<(), GifError> {
        self.window.restart();
        let result = {
            let GifDecoder {
                source,
                sink,
                frame,
                global_palette,
                local_palette,
                background,
                window,
                tables,
                line,
                ..
            } = self;
            let palette = if frame.use_local_palette {
                &*local_palette
            } else {
                &*global_palette
            };
            FrameDecoder::new(source, sink, frame, palette, *background, window, tables, line)
                .decode()
        };
        // Whether the frame decoded cleanly or died mid-stream, park the
        // source just past the chunk chain so the next frame parse starts
        // on a block boundary.
        self.skip_remaining_chunks();
        result
    }

    /// Walks the rest of the frame's sub-block chain without decoding it.
    /// No-op when the window already consumed the chain terminator.
    fn skip_remaining_chunks(&mut self) {
        if self.window.end_of_frame() {
            return;
        }
        let mut len = [0u8; 1];
        loop {
            if self.source.pos() >= self.source.size() {
                return;
            }
            if self.source.read(&mut len) == 0 {
                return;
            }
            if len[0] == 0 {
                return;
            }
            let target = self.source.pos() + len[0] as usize;
            if self.source.seek(target) < target {
                // Truncated chain: consume the final byte so the cursor
                // parks at end of stream and the next call rewinds.
                let _ = self.source.read(&mut len);
                return;
            }
        }
    }
}
