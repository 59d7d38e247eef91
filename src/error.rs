use thiserror::Error;

/// Everything that can go wrong while opening or playing a GIF stream.
///
/// `Decode` aborts the current frame only; the decoder instance stays
/// consistent and the next `play_frame` may continue or rewind.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GifError {
    /// Bad signature, unknown block label, truncated descriptor, or a frame
    /// rectangle that does not fit the canvas or the line buffer.
    #[error("malformed GIF header or block structure")]
    BadHeader,
    /// The caller configuration contradicts itself, e.g. playing frames
    /// before `open`, or a compositor canvas smaller than the screen.
    #[error("invalid decoder configuration")]
    InvalidParameter,
    /// The source returned fewer bytes than the format requires at a
    /// position where no legitimate end of file may occur.
    #[error("byte source ended mid-structure")]
    ShortRead,
    /// Corrupt LZW data: unknown code, pixel stack overflow, or a code
    /// stream running past the final chunk.
    #[error("corrupt LZW code stream")]
    Decode,
    /// The trailer byte or the real end of the source was reached. Not a
    /// failure for multi-frame playback; `play_frame` reports it as
    /// "no more frames".
    #[error("end of GIF stream")]
    EndOfStream,
}
