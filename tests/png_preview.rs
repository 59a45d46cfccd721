#![cfg(feature = "host")]
#![allow(missing_docs)]
//! Host-level tests for the PNG and APNG previews.

use std::error::Error;
use std::fs::File;
use std::path::Path;

use dmd_kit::font::Font;
use dmd_kit::frame::{Frame, GraphicsMode};
use dmd_kit::to_png::{write_frame_png, write_frames_apng};
use png::{BitDepth, ColorType, Decoder};

#[rustfmt::skip]
static DIGITS_0_1: [u8; 16] = [
    0x00, 0x00, 5, 7, b'0', 2,
    0x3E, 0x51, 0x49, 0x45, 0x3E, // 0
    0x00, 0x42, 0x7F, 0x40, 0x00, // 1
];

fn decode(path: &Path) -> Result<(png::OutputInfo, Vec<u8>, Option<u32>), Box<dyn Error>> {
    let mut reader = Decoder::new(File::open(path)?).read_info()?;
    let frames = reader.info().animation_control.map(|control| control.num_frames);
    let mut buffer = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buffer)?;
    buffer.truncate(info.buffer_size());
    Ok((info, buffer, frames))
}

/// Red channel of the image pixel at `(x, y)` in a 16-bit RGB buffer.
fn red_at(info: &png::OutputInfo, buffer: &[u8], x: u32, y: u32) -> u16 {
    let index = ((y * info.width + x) * 6) as usize;
    u16::from_be_bytes([buffer[index], buffer[index + 1]])
}

#[test]
fn frame_png_has_one_led_per_pixel() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("panel.png");

    let mut frame = Frame::for_panels(1, 1)?;
    frame.set_pixel(0, 0, GraphicsMode::On);
    write_frame_png(&frame, &path, 200)?;

    let (info, buffer, frames) = decode(&path)?;
    assert_eq!(frames, None);
    assert_eq!((info.color_type, info.bit_depth), (ColorType::Rgb, BitDepth::Sixteen));
    // Six-pixel cells plus a two-pixel border: 32 * 6 + 4 by 16 * 6 + 4.
    assert_eq!((info.width, info.height), (196, 100));

    let lit = red_at(&info, &buffer, 2 + 2, 2 + 2);
    let dark = red_at(&info, &buffer, 2 + 6 + 2, 2 + 2);
    assert_eq!(lit, u16::MAX);
    assert!(dark > 0 && dark < lit / 4);
    // Cell corners fall between LEDs.
    assert_eq!(red_at(&info, &buffer, 2, 2), 0);
    Ok(())
}

#[test]
fn tiny_targets_keep_a_minimum_cell() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("tiny.png");
    let frame = Frame::for_panels(1, 1)?;
    write_frame_png(&frame, &path, 10)?;

    let (info, _, _) = decode(&path)?;
    assert_eq!((info.width, info.height), (32 * 4 + 2, 16 * 4 + 2));
    Ok(())
}

#[test]
fn scroll_animation_writes_every_step() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("marquee.png");
    let font = Font::new(&DIGITS_0_1);

    let mut frame = Frame::for_panels(1, 1)?;
    frame.draw_string(2, 4, "0101", GraphicsMode::On, &font);
    let mut steps = Vec::new();
    for _ in 0..4 {
        steps.push(frame.clone());
        frame.marquee_scroll_x(-8);
    }
    write_frames_apng(&steps, &path, 200, 100)?;

    let (info, _, frames) = decode(&path)?;
    assert_eq!(frames, Some(4));
    assert_eq!((info.width, info.height), (196, 100));
    Ok(())
}

#[test]
fn animation_rejects_empty_and_mixed_frames() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("bad.png");

    assert!(write_frames_apng(&[], &path, 200, 100).is_err());

    let mixed = [Frame::new(32, 16), Frame::new(64, 16)];
    assert!(write_frames_apng(&mixed, &path, 200, 100).is_err());
    assert!(!path.exists());
}
