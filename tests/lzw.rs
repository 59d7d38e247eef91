//! Code-stream level tests over hand-packed LZW sequences.

mod common;

use std::borrow::Cow;

use common::*;
use scanline_gif::{GifDecoder, GifError, MemSource};

fn single_frame_codes(w: u16, h: u16, min_code: u8, codes: &[u16]) -> Vec<u8> {
    let mut data = Vec::new();
    screen_header(&mut data, w, h, &grey_palette(1 << min_code), 0);
    image_descriptor(&mut data, 0, 0, w, h, false, None);
    lzw_stream(&mut data, min_code, &pack_codes(min_code, codes));
    trailer(&mut data);
    data
}

fn decode_rows(data: &[u8]) -> Result<RowCollector, GifError> {
    let mut gif = GifDecoder::new(MemSource::new(data), RowCollector::new());
    gif.open()?;
    gif.play_frame()?;
    Ok(gif.into_parts().1)
}

#[test]
fn kwkwk_code_expands_through_the_slot_being_created() {
    // cc=4, eoi=5: after the literal 1, code 6 names the entry the decoder
    // is about to install, which must expand to "1 1".
    let rows = decode_rows(&single_frame_codes(3, 1, 2, &[4, 1, 6, 5])).unwrap();
    assert_eq!(rows.rows[0].pixels, vec![1, 1, 1]);
}

#[test]
fn repeated_clear_codes_are_absorbed() {
    let rows = decode_rows(&single_frame_codes(2, 1, 2, &[4, 4, 1, 0, 5])).unwrap();
    assert_eq!(rows.rows[0].pixels, vec![1, 0]);
}

#[test]
fn end_code_before_any_pixel_yields_an_empty_frame() {
    let rows = decode_rows(&single_frame_codes(1, 1, 2, &[4, 5])).unwrap();
    assert!(rows.rows.is_empty());
}

#[test]
fn code_into_an_unused_slot_aborts_the_frame() {
    // Next free slot is 6; code 7 points into cleared dictionary space.
    let data = single_frame_codes(4, 1, 2, &[4, 1, 7, 5]);
    let mut gif = GifDecoder::new(MemSource::new(&data), RowCollector::new());
    gif.open().unwrap();
    assert_eq!(gif.play_frame(), Err(GifError::Decode));
    assert_eq!(gif.last_error(), Some(GifError::Decode));
}

#[test]
fn corrupt_frame_does_not_poison_the_next_one() {
    let mut data = Vec::new();
    screen_header(&mut data, 4, 1, &grey_palette(4), 0);
    image_descriptor(&mut data, 0, 0, 4, 1, false, None);
    lzw_stream(&mut data, 2, &pack_codes(2, &[4, 1, 7, 5]));
    image_descriptor(&mut data, 0, 0, 4, 1, false, None);
    lzw_stream(&mut data, 2, &pack_codes(2, &literal_codes(2, &[2, 2, 2, 2])));
    trailer(&mut data);

    let mut gif = GifDecoder::new(MemSource::new(&data), RowCollector::new());
    gif.open().unwrap();
    assert_eq!(gif.play_frame(), Err(GifError::Decode));
    assert_eq!(gif.play_frame(), Ok(false));
    assert_eq!(gif.last_error(), None);
    let (_, rows) = gif.into_parts();
    assert_eq!(rows.rows.last().unwrap().pixels, vec![2, 2, 2, 2]);
}

#[test]
fn deferred_clear_freezes_the_dictionary_until_the_next_clear() {
    // 8-bit roots: the dictionary fills after 3838 installs, the stream
    // keeps sending 12-bit codes against the frozen table, then clears and
    // resumes. 64x64 pixels in total.
    let cc = 256u16;
    let eoi = 257u16;
    let first_run: Vec<u8> = (0..4032u32).map(|i| (i % 251) as u8).collect();
    let second_run: Vec<u8> = (0..64u32).map(|i| (i % 7) as u8).collect();

    let mut codes = vec![cc];
    codes.extend(first_run.iter().map(|&p| p as u16));
    codes.push(cc);
    codes.extend(second_run.iter().map(|&p| p as u16));
    codes.push(eoi);

    let data = single_frame_codes(64, 64, 8, &codes);
    let rows = decode_rows(&data).unwrap();
    assert_full_coverage(&rows.rows, 64);

    let mut expected = first_run;
    expected.extend_from_slice(&second_run);
    for r in &rows.rows {
        let base = r.row as usize * 64;
        assert_eq!(r.pixels[..], expected[base..base + 64], "row {}", r.row);
    }
}

#[test]
fn ecosystem_encoder_output_round_trips() {
    // Real compressed data (not just literals) from the `gif` encoder:
    // noise is the worst case for the dictionary.
    let mut rng = XorShift::new(0x5EED);
    let pixels: Vec<u8> = (0..64 * 48).map(|_| (rng.next() % 16) as u8).collect();
    let palette: Vec<u8> = (0..16u8).flat_map(|i| [i * 16, i * 8, i * 4]).collect();

    let mut data = Vec::new();
    {
        let mut enc = gif::Encoder::new(&mut data, 64, 48, &palette).unwrap();
        let mut frame = gif::Frame::default();
        frame.width = 64;
        frame.height = 48;
        frame.buffer = Cow::Borrowed(&pixels);
        enc.write_frame(&frame).unwrap();
    }

    let rows = decode_rows(&data).unwrap();
    assert_full_coverage(&rows.rows, 48);
    for r in &rows.rows {
        let base = r.row as usize * 64;
        assert_eq!(r.pixels[..], pixels[base..base + 64], "row {}", r.row);
    }
}

#[test]
fn truncated_chunk_chain_is_a_frame_local_error() {
    let mut data = single_frame_codes(8, 8, 2, &literal_codes(2, &[1; 64]));
    // Cut deep into the single data chunk: 25 header + 10 descriptor + code
    // size byte + chunk length byte leave 10 of its payload bytes.
    assert!(data.len() > 60);
    data.truncate(47);
    let mut gif = GifDecoder::new(MemSource::new(&data), RowCollector::new());
    gif.open().unwrap();
    assert_eq!(gif.play_frame(), Err(GifError::Decode));
}
