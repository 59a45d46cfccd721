//! Host-side PNG previews of a [`Frame`], drawn as round red LEDs.
#![cfg(feature = "host")]

use crate::frame::Frame;
use png::{BitDepth, ColorType, Encoder, ScaledFloat};
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Colour of a lit LED.
pub const LIT_COLOR: [u8; 3] = [255, 40, 0];
/// Colour of a dark LED (unlit LEDs are still faintly visible on a real panel).
pub const DARK_COLOR: [u8; 3] = [40, 8, 0];

const PREVIEW_INVERSE_GAMMA: f32 = 2.2;

/// Render a `Frame` into a PNG file no larger than `target_max_dimension` on either side.
///
/// # Errors
///
/// Returns an error if the file cannot be created or encoded.
pub fn write_frame_png(
    frame: &Frame,
    output_path: impl AsRef<Path>,
    target_max_dimension: u32,
) -> Result<(), Box<dyn Error>> {
    let output_path = output_path.as_ref();
    let geometry = LedGeometry::fit(frame, target_max_dimension);
    let (width, height, pixels) = panel_pixels(frame, geometry);
    create_parent(output_path)?;

    let mut encoder = encoder(output_path, width, height)?;
    encoder.set_source_gamma(ScaledFloat::new(1.0));
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&pixels)?;
    println!("wrote PNG to {}", output_path.display());
    Ok(())
}

/// Render several `Frame`s (e.g. the steps of a scroll) into a looping APNG file.
///
/// # Errors
///
/// Returns an error if `frames` is empty, the frames differ in size, or the file cannot be
/// created or encoded.
pub fn write_frames_apng(
    frames: &[Frame],
    output_path: impl AsRef<Path>,
    target_max_dimension: u32,
    frame_delay_ms: u16,
) -> Result<(), Box<dyn Error>> {
    let output_path = output_path.as_ref();
    let first = frames.first().ok_or("frames must not be empty")?;
    if frames
        .iter()
        .any(|frame| frame.width() != first.width() || frame.height() != first.height())
    {
        return Err("all frames must have the same size".into());
    }
    let geometry = LedGeometry::fit(first, target_max_dimension);
    let rendered: Vec<_> = frames
        .iter()
        .map(|frame| panel_pixels(frame, geometry))
        .collect();
    let (width, height, _) = rendered[0];
    create_parent(output_path)?;

    let mut encoder = encoder(output_path, width, height)?;
    encoder.set_source_gamma(ScaledFloat::new(1.0));
    encoder.set_animated(u32::try_from(frames.len())?, 0)?;
    let mut writer = encoder.write_header()?;
    for (_, _, pixels) in rendered {
        writer.set_frame_delay(frame_delay_ms, 1000)?;
        writer.write_image_data(&pixels)?;
    }
    writer.finish()?;
    println!("wrote APNG to {}", output_path.display());
    Ok(())
}

fn create_parent(output_path: &Path) -> std::io::Result<()> {
    match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn encoder(
    output_path: &Path,
    width: u32,
    height: u32,
) -> std::io::Result<Encoder<'static, BufWriter<File>>> {
    let file = File::create(output_path)?;
    let mut encoder = Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(ColorType::Rgb);
    encoder.set_depth(BitDepth::Sixteen);
    Ok(encoder)
}

/// Cell and LED sizes for one preview.
#[derive(Clone, Copy)]
struct LedGeometry {
    cell_size: u32,
    led_radius: u32,
}

impl LedGeometry {
    /// Largest cell size whose image (cells plus a one-radius border) fits the target.
    fn fit(frame: &Frame, target_max_dimension: u32) -> Self {
        let longest_side = frame.width().max(frame.height()).max(1) as u32;
        let mut cell_size = target_max_dimension.max(4);
        loop {
            let geometry = Self::for_cell(cell_size);
            let image_side = longest_side * cell_size + geometry.led_radius * 2;
            if image_side <= target_max_dimension || cell_size <= 4 {
                return geometry;
            }
            cell_size -= 1;
        }
    }

    fn for_cell(cell_size: u32) -> Self {
        let led_margin = (cell_size / 8).max(1);
        Self {
            cell_size,
            led_radius: (cell_size - led_margin * 2) / 2,
        }
    }
}

fn panel_pixels(frame: &Frame, geometry: LedGeometry) -> (u32, u32, Vec<u8>) {
    let LedGeometry {
        cell_size,
        led_radius,
    } = geometry;
    let border = led_radius;
    let width = frame.width() as u32 * cell_size + border * 2;
    let height = frame.height() as u32 * cell_size + border * 2;
    let mut bytes = vec![0u8; (width * height * 3 * 2) as usize];
    let center = (cell_size - 1) as i32 / 2;
    let fade_width = (led_radius / 3).max(1);
    let led_radius_f = led_radius as f32;
    let inner_radius_f = led_radius.saturating_sub(fade_width) as f32;
    let radius_sq = (led_radius * led_radius) as i32;

    for row_index in 0..frame.height() {
        for column_index in 0..frame.width() {
            let color = if frame.get_pixel(column_index as i32, row_index as i32) {
                LIT_COLOR
            } else {
                DARK_COLOR
            };
            let cell_origin_x = border + column_index as u32 * cell_size;
            let cell_origin_y = border + row_index as u32 * cell_size;

            for local_y in 0..cell_size {
                let delta_y = local_y as i32 - center;
                for local_x in 0..cell_size {
                    let delta_x = local_x as i32 - center;
                    let distance_sq = delta_x * delta_x + delta_y * delta_y;
                    if distance_sq > radius_sq {
                        continue;
                    }
                    let distance = (distance_sq as f32).sqrt();
                    let intensity = if distance <= inner_radius_f {
                        1.0
                    } else {
                        (1.0 - (distance - inner_radius_f) / (led_radius_f - inner_radius_f))
                            .max(0.0)
                    };
                    let x = cell_origin_x + local_x;
                    let y = cell_origin_y + local_y;
                    let pixel_index = ((y * width + x) * 3 * 2) as usize;
                    for (channel_index, channel) in color.iter().enumerate() {
                        let value = linear_to_u16(inverse_gamma_to_linear(*channel) * intensity);
                        bytes[pixel_index + channel_index * 2..pixel_index + channel_index * 2 + 2]
                            .copy_from_slice(&value.to_be_bytes());
                    }
                }
            }
        }
    }

    (width, height, bytes)
}

fn inverse_gamma_to_linear(channel: u8) -> f32 {
    (f32::from(channel) / 255.0).powf(PREVIEW_INVERSE_GAMMA)
}

fn linear_to_u16(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * 65535.0).round() as u16
}
