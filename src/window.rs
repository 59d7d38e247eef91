use byteorder::{ByteOrder, LittleEndian};

use crate::error::GifError;
use crate::source::GifSource;

/// A GIF data sub-block carries at most 255 payload bytes.
pub(crate) const MAX_CHUNK_SIZE: usize = 255;
/// Six chunks of de-chunked LZW data are kept buffered at a time.
pub(crate) const LZW_BUF_SIZE: usize = 6 * MAX_CHUNK_SIZE;
/// The bit reservoir reloads 32 bits at a time; padding keeps that load
/// inside the array even on the final bytes of a frame.
const PAD: usize = 4;

/// Sliding window of de-chunked LZW bytes.
///
/// The frame parser leaves the source positioned at the first sub-block
/// length byte; from there the window concatenates `(length, bytes)` chunks,
/// latching `end_of_frame` when the zero-length terminator is seen. Consumed
/// bytes are discarded by compaction on refill.
pub(crate) struct LzwWindow {
    buf: [u8; LZW_BUF_SIZE + PAD],
    size: usize,
    off: usize,
    end_of_frame: bool,
}

impl LzwWindow {
    pub fn new() -> Self {
        LzwWindow {
            buf: [0; LZW_BUF_SIZE + PAD],
            size: 0,
            off: 0,
            end_of_frame: false,
        }
    }

    /// Forgets buffered data ahead of a new frame's chunk chain.
    pub fn restart(&mut self) {
        self.size = 0;
        self.off = 0;
        self.end_of_frame = false;
    }

    pub fn end_of_frame(&self) -> bool {
        self.end_of_frame
    }

    /// Tops the window up from the source.
    ///
    /// Does nothing while at least one chunk's worth of unread bytes remains
    /// or the frame's terminator has been seen. Otherwise the consumed
    /// prefix is compacted away and whole sub-blocks are appended while a
    /// full chunk still fits. A source that dries up mid-chunk leaves the
    /// window holding whatever arrived; the bit reader detects the underrun.
    pub fn refill<S: GifSource>(&mut self, source: &mut S) {
        if self.end_of_frame || self.size - self.off >= MAX_CHUNK_SIZE {
            return;
        }
        if self.off > 0 {
            self.buf.copy_within(self.off..self.size, 0);
            self.size -= self.off;
            self.off = 0;
        }
        while LZW_BUF_SIZE - self.size >= MAX_CHUNK_SIZE && source.pos() < source.size() {
            let mut len = [0u8; 1];
            if source.read(&mut len) == 0 {
                break;
            }
            let len = len[0] as usize;
            if len == 0 {
                self.end_of_frame = true;
                break;
            }
            let got = source.read(&mut self.buf[self.size..self.size + len]);
            self.size += got;
            if got < len {
                break;
            }
        }
        self.buf[self.size..self.size + PAD].fill(0);
    }

    /// Advances the read offset by `consumed` bytes and returns the next
    /// 32 little-endian bits, refilling first if the reservoir would
    /// otherwise underrun. Running past the final chunk is a frame-local
    /// decode error.
    pub fn reload<S: GifSource>(
        &mut self,
        consumed: usize,
        source: &mut S,
    ) -> Result<u32, GifError> {
        self.off += consumed;
        if self.off + PAD > self.size && !self.end_of_frame {
            self.refill(source);
        }
        if self.off > self.size {
            return Err(GifError::Decode);
        }
        Ok(LittleEndian::read_u32(&self.buf[self.off..self.off + PAD]))
    }
}
