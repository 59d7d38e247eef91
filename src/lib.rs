//! Streaming scan-line GIF decoder for memory-constrained targets.
//!
//! Decodes GIF87a/GIF89a animations one scan line at a time: the host
//! drives playback frame by frame and receives each completed row of 8-bit
//! palette indices, plus an RGB565 palette, through a [`LineSink`], ready
//! to push straight to an LCD. All working memory is a fixed-size part of
//! the decoder value; nothing grows and nothing is heap-allocated.
//!
//! ```no_run
//! use scanline_gif::{DrawLine, GifDecoder, LineSink, MemSource};
//!
//! struct Display;
//! impl LineSink for Display {
//!     fn draw_line(&mut self, line: &DrawLine<'_>) {
//!         // push line.pixels through line.palette to the panel
//!     }
//! }
//!
//! let data: &[u8] = &[];
//! let mut gif = GifDecoder::new(MemSource::new(data), Display);
//! gif.open().unwrap();
//! while gif.play_frame().unwrap() {}
//! ```

#![no_std]

pub mod canvas;
pub mod decoder;
pub mod error;
mod frame;
pub mod sink;
pub mod source;
pub mod util;
mod window;

pub use canvas::GifCanvas;
pub use decoder::{GifDecoder, MAX_WIDTH};
pub use error::GifError;
pub use sink::{DisposalMethod, DrawLine, LineSink};
pub use source::{CallbackSource, GifSource, MemSource};
pub use util::{rgb565, rgb_from_565, PaletteOrder};
