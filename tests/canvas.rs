//! Cooked-mode compositing through `GifCanvas`.

mod common;

use common::*;
use image::{ImageBuffer, Rgba};
use scanline_gif::{rgb_from_565, GifCanvas, GifDecoder, GifError, MemSource};

/// Canvas 4x2, two frames: the second is a 2x1 patch at (1, 0) with a
/// transparent hole, drawn over the first.
fn two_frame_patch_gif(disposal: u8) -> Vec<u8> {
    let mut data = Vec::new();
    screen_header(&mut data, 4, 2, &grey_palette(8), 0);
    graphic_control(&mut data, disposal, 10, None);
    image_descriptor(&mut data, 0, 0, 4, 2, false, None);
    lzw_stream(&mut data, 3, &pack_codes(3, &literal_codes(3, &[1, 2, 3, 4, 5, 6, 7, 1])));
    graphic_control(&mut data, 0, 10, Some(6));
    image_descriptor(&mut data, 1, 0, 2, 1, false, None);
    lzw_stream(&mut data, 3, &pack_codes(3, &literal_codes(3, &[6, 5])));
    trailer(&mut data);
    data
}

#[test]
fn undersized_buffer_is_an_invalid_parameter() {
    let mut buf = [0u8; 7];
    assert!(matches!(
        GifCanvas::new(&mut buf, 4, 2),
        Err(GifError::InvalidParameter)
    ));
    let mut pixels = [0u8; 8];
    let mut history = [0u8; 4];
    assert!(matches!(
        GifCanvas::with_history(&mut pixels, &mut history, 4, 2),
        Err(GifError::InvalidParameter)
    ));
}

#[test]
fn transparent_pixels_leave_the_canvas_untouched() {
    let data = two_frame_patch_gif(1);
    let mut buf = [0u8; 8];
    let canvas = GifCanvas::new(&mut buf, 4, 2).unwrap();
    let mut gif = GifDecoder::new(MemSource::new(&data), canvas);
    gif.open().unwrap();

    assert_eq!(gif.play_frame(), Ok(true));
    {
        let (_, canvas) = gif.into_parts();
        assert_eq!(canvas.pixels(), &[1, 2, 3, 4, 5, 6, 7, 1]);
        let mut gif2 = GifDecoder::new(MemSource::new(&data), canvas);
        gif2.open().unwrap();
        gif2.play_frame().unwrap();
        gif2.play_frame().unwrap();
        let (_, canvas) = gif2.into_parts();
        // Patch pixels are [6, 5] with 6 transparent: index 1 keeps its old
        // value 2, index 2 becomes 5.
        assert_eq!(canvas.pixels(), &[1, 2, 5, 4, 5, 6, 7, 1]);
    }
}

#[test]
fn restore_background_disposal_clears_the_old_rectangle() {
    // First frame asks for restore-to-background; before the patch frame
    // is drawn the whole 4x2 rectangle refills with the background index.
    let data = two_frame_patch_gif(2);
    let mut buf = [0u8; 8];
    let canvas = GifCanvas::new(&mut buf, 4, 2).unwrap();
    let mut gif = GifDecoder::new(MemSource::new(&data), canvas);
    gif.open().unwrap();
    gif.play_frame().unwrap();
    gif.play_frame().unwrap();
    let (_, canvas) = gif.into_parts();
    assert_eq!(canvas.pixels(), &[0, 0, 5, 0, 0, 0, 0, 0]);
}

#[test]
fn restore_previous_disposal_needs_the_history_buffer() {
    // Middle frame paints everything and asks for restore-to-previous; the
    // third frame must see the first frame's canvas again.
    let mut data = Vec::new();
    screen_header(&mut data, 2, 1, &grey_palette(8), 0);
    image_descriptor(&mut data, 0, 0, 2, 1, false, None);
    lzw_stream(&mut data, 3, &pack_codes(3, &literal_codes(3, &[1, 2])));
    graphic_control(&mut data, 3, 10, None);
    image_descriptor(&mut data, 0, 0, 2, 1, false, None);
    lzw_stream(&mut data, 3, &pack_codes(3, &literal_codes(3, &[7, 7])));
    graphic_control(&mut data, 0, 10, Some(0));
    image_descriptor(&mut data, 0, 0, 1, 1, false, None);
    lzw_stream(&mut data, 3, &pack_codes(3, &literal_codes(3, &[0])));
    trailer(&mut data);

    let mut pixels = [0u8; 2];
    let mut history = [0u8; 2];
    let canvas = GifCanvas::with_history(&mut pixels, &mut history, 2, 1).unwrap();
    let mut gif = GifDecoder::new(MemSource::new(&data), canvas);
    gif.open().unwrap();
    gif.play_frame().unwrap();
    gif.play_frame().unwrap();
    {
        let (_, c) = gif.into_parts();
        assert_eq!(c.pixels(), &[7, 7]);
        let mut gif = GifDecoder::new(MemSource::new(&data), c);
        gif.open().unwrap();
        for _ in 0..3 {
            gif.play_frame().unwrap();
        }
        let (_, c) = gif.into_parts();
        // Third frame: canvas restored to [1, 2], then its transparent
        // single pixel leaves even (0,0) alone.
        assert_eq!(c.pixels(), &[1, 2]);
    }
}

#[test]
fn composited_canvas_converts_to_rgba() {
    let data = two_frame_patch_gif(1);
    let mut buf = [0u8; 8];
    let canvas = GifCanvas::new(&mut buf, 4, 2).unwrap();
    let mut gif = GifDecoder::new(MemSource::new(&data), canvas);
    gif.open().unwrap();
    gif.play_frame().unwrap();
    let (_, canvas) = gif.into_parts();

    let mut img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(4, 2);
    for y in 0..2u16 {
        for x in 0..4u16 {
            let (r, g, b) = rgb_from_565(canvas.rgb565_at(x, y));
            img.put_pixel(x as u32, y as u32, Rgba([r, g, b, 0xFF]));
        }
    }
    let grey = grey_palette(8);
    for y in 0..2u32 {
        for x in 0..4u32 {
            let idx = canvas.pixels()[(y * 4 + x) as usize] as usize;
            let expect = grey[idx][0] & 0xF8;
            assert_eq!(img.get_pixel(x, y).0[0], expect);
        }
    }
}
