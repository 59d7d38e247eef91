//! Optional "cooked" output: a sink that builds a full-canvas image from
//! raw row callbacks, applying transparency and inter-frame disposal.
//!
//! The decoder core only ever hands out rows; hosts that want a composited
//! picture (e.g. to blit whole frames to a windowing system) wire a
//! [`GifCanvas`] in as the sink and read the canvas after each
//! `play_frame`.

use crate::error::GifError;
use crate::sink::{DisposalMethod, DrawLine, LineSink};

/// Full-canvas compositor over a caller-supplied buffer of 8-bit palette
/// indices, `width * height` bytes. A second, equally sized history buffer
/// enables the "restore to previous" disposal method; without one that
/// method degrades to "leave in place".
pub struct GifCanvas<'a> {
    pixels: &'a mut [u8],
    history: Option<&'a mut [u8]>,
    width: u16,
    height: u16,
    palette: [u16; 256],

    prev_rect: (u16, u16, u16, u16),
    prev_disposal: DisposalMethod,
    prev_background: u8,
    has_prev: bool,
}

impl<'a> GifCanvas<'a> {
    pub fn new(pixels: &'a mut [u8], width: u16, height: u16) -> Result<Self, GifError> {
        Self::build(pixels, None, width, height)
    }

    /// Compositor with a snapshot buffer for the restore-to-previous
    /// disposal method.
    pub fn with_history(
        pixels: &'a mut [u8],
        history: &'a mut [u8],
        width: u16,
        height: u16,
    ) -> Result<Self, GifError> {
        Self::build(pixels, Some(history), width, height)
    }

    fn build(
        pixels: &'a mut [u8],
        history: Option<&'a mut [u8]>,
        width: u16,
        height: u16,
    ) -> Result<Self, GifError> {
        let area = width as usize * height as usize;
        if area == 0 || pixels.len() < area {
            return Err(GifError::InvalidParameter);
        }
        if let Some(ref h) = history {
            if h.len() < area {
                return Err(GifError::InvalidParameter);
            }
        }
        Ok(GifCanvas {
            pixels,
            history,
            width,
            height,
            palette: [0; 256],
            prev_rect: (0, 0, 0, 0),
            prev_disposal: DisposalMethod::Unspecified,
            prev_background: 0,
            has_prev: false,
        })
    }

    /// The composited 8-bit canvas, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels[..self.width as usize * self.height as usize]
    }

    /// RGB565 palette of the most recent frame.
    pub fn palette(&self) -> &[u16; 256] {
        &self.palette
    }

    /// Colour of one canvas pixel through the current palette.
    pub fn rgb565_at(&self, x: u16, y: u16) -> u16 {
        let idx = self.pixels[y as usize * self.width as usize + x as usize];
        self.palette[idx as usize]
    }

    /// Paints the whole canvas with one palette index.
    pub fn fill(&mut self, index: u8) {
        let area = self.width as usize * self.height as usize;
        self.pixels[..area].fill(index);
    }

    /// Disposes of the previous frame's rectangle and, if this frame will
    /// itself need restoring, snapshots the canvas first.
    fn begin_frame(&mut self, line: &DrawLine<'_>) {
        let area = self.width as usize * self.height as usize;
        if self.has_prev {
            match self.prev_disposal {
                DisposalMethod::RestoreBackground => {
                    let (x, y, w, h) = self.prev_rect;
                    let bg = self.prev_background;
                    for row in y..y.saturating_add(h).min(self.height) {
                        let start = row as usize * self.width as usize;
                        let x0 = (x as usize).min(self.width as usize);
                        let x1 = (x as usize + w as usize).min(self.width as usize);
                        self.pixels[start + x0..start + x1].fill(bg);
                    }
                }
                DisposalMethod::RestorePrevious => {
                    if let Some(ref h) = self.history {
                        self.pixels[..area].copy_from_slice(&h[..area]);
                    }
                }
                _ => {}
            }
        }
        if line.disposal == DisposalMethod::RestorePrevious {
            if let Some(ref mut h) = self.history {
                h[..area].copy_from_slice(&self.pixels[..area]);
            }
        }
        self.prev_rect = (line.frame_x, line.frame_y, line.frame_width, line.frame_height);
        self.prev_disposal = line.disposal;
        self.prev_background = line.background;
        self.has_prev = true;
        self.palette.copy_from_slice(line.palette);
    }

    fn blit_row(&mut self, line: &DrawLine<'_>) {
        let y = line.frame_y as usize + line.row as usize;
        let x = line.frame_x as usize;
        if y >= self.height as usize || x >= self.width as usize {
            return;
        }
        let w = (line.frame_width as usize)
            .min(self.width as usize - x)
            .min(line.pixels.len());
        let start = y * self.width as usize + x;
        let dst = &mut self.pixels[start..start + w];
        if line.has_transparency {
            for (d, &s) in dst.iter_mut().zip(&line.pixels[..w]) {
                if s != line.transparent {
                    *d = s;
                }
            }
        } else {
            dst.copy_from_slice(&line.pixels[..w]);
        }
    }
}

impl LineSink for GifCanvas<'_> {
    fn draw_line(&mut self, line: &DrawLine<'_>) {
        // Row 0 is always the first row a frame delivers, interlaced or not.
        if line.row == 0 {
            self.begin_frame(line);
        }
        self.blit_row(line);
    }
}
