//! Byte stream access, either from a memory slice or through host callbacks.
//!
//! The decoder never trusts an implementation: every count a source returns
//! is clamped against the remaining stream size before it is believed.

/// Pull-style access to the raw GIF byte stream.
///
/// Contracts the decoder relies on:
/// - `read` returns the number of bytes placed in `dst`; partial reads are
///   legitimate only at end of stream, and reads past the end return 0.
/// - `seek` clamps the target into `[0, size - 1]` and returns the new
///   position.
pub trait GifSource {
    fn read(&mut self, dst: &mut [u8]) -> usize;
    fn seek(&mut self, pos: usize) -> usize;
    fn pos(&self) -> usize;
    fn size(&self) -> usize;
}

/// A GIF held entirely in memory.
pub struct MemSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MemSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        MemSource { data, pos: 0 }
    }
}

impl GifSource for MemSource<'_> {
    fn read(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.data.len() - self.pos);
        dst[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    fn seek(&mut self, pos: usize) -> usize {
        self.pos = pos.min(self.data.len().saturating_sub(1));
        self.pos
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn size(&self) -> usize {
        self.data.len()
    }
}

/// Reads the next bytes at the handle's own cursor, returning how many were
/// produced (0 at end of file).
pub type ReadFn<H> = fn(handle: &mut H, dst: &mut [u8]) -> usize;

/// Moves the handle's cursor and returns the resulting position.
pub type SeekFn<H> = fn(handle: &mut H, pos: usize) -> usize;

/// A GIF reached through a pair of host functions and an opaque handle,
/// for sources such as SD-card files that cannot be mapped into memory.
///
/// The host opens the file itself and passes the handle plus the total size
/// here; when decoding is done, [`CallbackSource::into_handle`] gives the
/// handle back so the host can close it. The cursor is tracked on this side
/// and re-clamped after every call, so a misbehaving callback can skew the
/// decoded output but never push the decoder out of bounds.
pub struct CallbackSource<H> {
    handle: H,
    read: ReadFn<H>,
    seek: SeekFn<H>,
    pos: usize,
    size: usize,
}

impl<H> CallbackSource<H> {
    pub fn new(handle: H, size: usize, read: ReadFn<H>, seek: SeekFn<H>) -> Self {
        CallbackSource {
            handle,
            read,
            seek,
            pos: 0,
            size,
        }
    }

    pub fn handle(&mut self) -> &mut H {
        &mut self.handle
    }

    pub fn into_handle(self) -> H {
        self.handle
    }
}

impl<H> GifSource for CallbackSource<H> {
    fn read(&mut self, dst: &mut [u8]) -> usize {
        let want = dst.len().min(self.size - self.pos);
        if want == 0 {
            return 0;
        }
        let got = (self.read)(&mut self.handle, &mut dst[..want]).min(want);
        self.pos += got;
        got
    }

    fn seek(&mut self, pos: usize) -> usize {
        let target = pos.min(self.size.saturating_sub(1));
        self.pos = (self.seek)(&mut self.handle, target).min(self.size.saturating_sub(1));
        self.pos
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn size(&self) -> usize {
        self.size
    }
}
