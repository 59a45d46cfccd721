//! A device-independent 1-bit framebuffer laid out in panel-chain scan order.
//!
//! See [`Frame`] for the drawing API.
//!
//! Pixels are addressed in logical canvas coordinates (`(0, 0)` top-left, `x` to the right,
//! `y` downward). The bitmap underneath is in the "unified" order the chained shift
//! registers expect (see [`tiling`]), and stores a *set* bit for a *dark* pixel. Neither
//! detail leaks through [`Frame::set_pixel`] / [`Frame::get_pixel`].
//!
//! Every drawing call clips: coordinates outside the canvas are ignored, never an error.

pub mod text;
pub mod tiling;

use alloc::{boxed::Box, vec::Vec};
use core::{convert::Infallible, fmt};

use embedded_graphics::{
    Pixel,
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, OriginDimensions, Size},
};

use crate::{Error, Result};
use tiling::{BitIndex, PANEL_HEIGHT, Tiling};

/// How a drawing call combines with the pixel already on the canvas.
///
/// `Or`, `Nor` and `Xor` work on the logical (lit = `true`) value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GraphicsMode {
    /// Light the pixel.
    #[default]
    On,
    /// Darken the pixel.
    Off,
    /// Drawn pixels light up, background pixels darken. Resolved by the text layer.
    Inverse,
    /// Logical OR with the existing pixel.
    Or,
    /// Logical NOR with the existing pixel.
    Nor,
    /// Logical XOR with the existing pixel.
    Xor,
    /// Leave the pixel alone.
    Noop,
}

impl GraphicsMode {
    /// The mode used for the "background" of a glyph or the kerning column.
    ///
    /// `On` → `Off`, `Inverse` → `On`, everything else → `Noop`.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Inverse => Self::On,
            Self::Off | Self::Or | Self::Nor | Self::Xor | Self::Noop => Self::Noop,
        }
    }

    /// New logical value of a pixel currently at `lit`, or `None` to leave it untouched.
    const fn apply(self, lit: bool) -> Option<bool> {
        match self {
            // OR with a lit pixel is always lit, so NOR is always dark.
            Self::On | Self::Or => Some(true),
            Self::Off | Self::Nor => Some(false),
            Self::Xor => Some(!lit),
            Self::Inverse | Self::Noop => None,
        }
    }
}

/// Fill patterns for checking wiring and dead pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TestPattern {
    /// Checkerboard, lit where `x + y` is even.
    Alternate0,
    /// Checkerboard, lit where `x + y` is odd.
    Alternate1,
    /// Vertical stripes, lit where `x` is even.
    Stripe0,
    /// Vertical stripes, lit where `x` is odd.
    Stripe1,
}

impl TestPattern {
    const fn is_lit(self, x: usize, y: usize) -> bool {
        match self {
            Self::Alternate0 => (x + y) % 2 == 0,
            Self::Alternate1 => (x + y) % 2 == 1,
            Self::Stripe0 => x % 2 == 0,
            Self::Stripe1 => x % 2 == 1,
        }
    }
}

/// A monochrome framebuffer for a grid of 32×16 panels (or any sub-rectangle of one).
///
/// Cloning deep-copies the bitmap. The bitmap never changes size after construction.
///
/// # Example
///
/// ```rust
/// use dmd_kit::frame::{Frame, GraphicsMode};
///
/// # fn main() -> dmd_kit::Result<()> {
/// // Two panels across, one down: 64×16 pixels.
/// let mut frame = Frame::for_panels(2, 1)?;
///
/// frame.draw_box(0, 0, 63, 15, GraphicsMode::On);
/// frame.draw_circle(32, 8, 5, GraphicsMode::On);
/// assert!(frame.get_pixel(0, 0));
/// assert!(!frame.get_pixel(1, 1));
///
/// // Slide everything one pixel left, dropping the left edge.
/// frame.scroll_x(-1);
/// assert!(frame.get_pixel(62, 0));
/// assert!(!frame.get_pixel(63, 1));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    tiling: Tiling,
    bitmap: Box<[u8]>,
    flip_panels: bool,
}

impl Frame {
    /// Create a blank (all dark) frame of `width` × `height` pixels.
    ///
    /// Any size is accepted, including sizes that are not whole panels.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        let tiling = Tiling::new(width, height);
        Self {
            tiling,
            bitmap: alloc::vec![0xFF; tiling.bitmap_len()].into_boxed_slice(),
            flip_panels: false,
        }
    }

    /// Like [`Self::new`], but reports a failed bitmap allocation instead of aborting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the bitmap cannot be allocated.
    pub fn try_new(width: usize, height: usize) -> Result<Self> {
        let tiling = Tiling::new(width, height);
        let mut bitmap = Vec::new();
        bitmap
            .try_reserve_exact(tiling.bitmap_len())
            .map_err(|_| Error::OutOfMemory)?;
        bitmap.resize(tiling.bitmap_len(), 0xFF);
        Ok(Self {
            tiling,
            bitmap: bitmap.into_boxed_slice(),
            flip_panels: false,
        })
    }

    /// Create a blank frame covering `panels_wide` × `panels_high` whole panels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGeometry`] if either count is zero, or
    /// [`Error::OutOfMemory`] if the bitmap cannot be allocated.
    pub fn for_panels(panels_wide: usize, panels_high: usize) -> Result<Self> {
        if panels_wide == 0 || panels_high == 0 {
            return Err(Error::InvalidGeometry {
                panels_wide,
                panels_high,
            });
        }
        let tiling = Tiling::for_panels(panels_wide, panels_high);
        Self::try_new(tiling.width(), tiling.height())
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.tiling.width()
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.tiling.height()
    }

    /// Bitmap geometry.
    #[must_use]
    pub const fn tiling(&self) -> &Tiling {
        &self.tiling
    }

    /// Raw bitmap in scan order (set bit = dark pixel).
    #[must_use]
    pub fn bitmap(&self) -> &[u8] {
        &self.bitmap
    }

    /// One unified row of the raw bitmap.
    ///
    /// # Panics
    ///
    /// Panics if `row` is not below [`Tiling::bitmap_rows`].
    #[must_use]
    pub fn unified_row(&self, row: usize) -> &[u8] {
        let row_bytes = self.tiling.row_bytes();
        &self.bitmap[row * row_bytes..(row + 1) * row_bytes]
    }

    /// Treat alternate panel rows as mounted upside-down.
    ///
    /// Only has an effect on canvases more than one panel high. Panel row `r` of `n` is
    /// flipped when `r` and `n` have the same parity; inside a flipped panel row both axes
    /// are mirrored.
    pub fn set_flip_panels(&mut self, flip_panels: bool) {
        self.flip_panels = flip_panels;
    }

    /// Whether panel flipping is on.
    #[must_use]
    pub const fn flip_panels(&self) -> bool {
        self.flip_panels
    }

    fn flipping(&self) -> bool {
        self.flip_panels && self.tiling.height() / PANEL_HEIGHT > 1
    }

    fn bit_index(&self, x: i32, y: i32) -> Option<BitIndex> {
        let (Ok(mut x), Ok(mut y)) = (usize::try_from(x), usize::try_from(y)) else {
            return None;
        };
        if x >= self.width() || y >= self.height() {
            return None;
        }
        if self.flipping() {
            let panel_rows = self.height() / PANEL_HEIGHT;
            let panel_row = y / PANEL_HEIGHT;
            if panel_row % 2 == panel_rows % 2 {
                y = panel_row * PANEL_HEIGHT + (PANEL_HEIGHT - 1 - y % PANEL_HEIGHT);
                x = self.width() - 1 - x;
            }
        }
        self.tiling.index(x, y)
    }

    /// Set one pixel according to `mode`. Out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, mode: GraphicsMode) {
        let Some(BitIndex {
            byte_offset,
            bit_mask,
        }) = self.bit_index(x, y)
        else {
            return;
        };
        let byte = &mut self.bitmap[byte_offset];
        let lit = *byte & bit_mask == 0;
        match mode.apply(lit) {
            Some(true) => *byte &= !bit_mask,
            Some(false) => *byte |= bit_mask,
            None => {}
        }
    }

    /// Whether a pixel is lit; `false` outside the canvas.
    #[must_use]
    pub fn get_pixel(&self, x: i32, y: i32) -> bool {
        self.bit_index(x, y)
            .is_some_and(|index| self.bitmap[index.byte_offset] & index.bit_mask == 0)
    }

    /// Light or darken the whole canvas in one pass over the bitmap.
    pub fn fill_screen(&mut self, on: bool) {
        self.bitmap.fill(if on { 0x00 } else { 0xFF });
    }

    /// Darken the whole canvas.
    pub fn clear_screen(&mut self) {
        self.fill_screen(false);
    }

    /// Fill every pixel with a [`TestPattern`].
    pub fn draw_test_pattern(&mut self, pattern: TestPattern) {
        for y in 0..self.height() {
            for x in 0..self.width() {
                let mode = if pattern.is_lit(x, y) {
                    GraphicsMode::On
                } else {
                    GraphicsMode::Off
                };
                self.set_pixel(x as i32, y as i32, mode);
            }
        }
    }

    /// Integer Bresenham line from `(x1, y1)` to `(x2, y2)`, both ends included.
    ///
    /// Only the stretch of the line that can land on the frame is walked, so far
    /// off-canvas endpoints cost no more than a line across the frame.
    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, mode: GraphicsMode) {
        let (x1, y1, x2, y2) = (i64::from(x1), i64::from(y1), i64::from(x2), i64::from(y2));
        let (dy, step_y) = if y2 < y1 { (y1 - y2, -1) } else { (y2 - y1, 1) };
        let (dx, step_x) = if x2 < x1 { (x1 - x2, -1) } else { (x2 - x1, 1) };
        let (dx, dy) = (dx * 2, dy * 2);

        if dx > dy {
            let walk = LineWalk {
                major: x1,
                minor: y1,
                end: x2,
                step_major: step_x,
                step_minor: step_y,
                d_major: dx,
                d_minor: dy,
            };
            self.walk_line(walk, false, mode);
        } else {
            let walk = LineWalk {
                major: y1,
                minor: x1,
                end: y2,
                step_major: step_y,
                step_minor: step_x,
                d_major: dy,
                d_minor: dx,
            };
            self.walk_line(walk, true, mode);
        }
    }

    /// Bresenham walk along the major axis (`y` when `transposed`).
    fn walk_line(&mut self, walk: LineWalk, transposed: bool, mode: GraphicsMode) {
        let LineWalk {
            mut major,
            mut minor,
            end,
            step_major,
            step_minor,
            d_major,
            d_minor,
        } = walk;
        let limit = if transposed { self.height() } else { self.width() };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let initial = d_minor - d_major / 2;
        let mut fraction = initial;

        // Jump straight to the first major position on the frame.
        let skip = if step_major > 0 && major < 0 {
            -major
        } else if step_major < 0 && major >= limit {
            major - (limit - 1)
        } else {
            0
        };
        if skip > 0 {
            if skip > (end - major).abs() {
                return;
            }
            // After `skip` steps the minor axis has moved `floor((initial + (skip - 1) *
            // d_minor) / d_major) + 1` times; products can exceed `i64`.
            let (skip, initial, d_major, d_minor) = (
                i128::from(skip),
                i128::from(initial),
                i128::from(d_major),
                i128::from(d_minor),
            );
            let minor_steps = (initial + (skip - 1) * d_minor).div_euclid(d_major) + 1;
            major += (skip as i64) * step_major;
            minor += (minor_steps as i64) * step_minor;
            fraction = (initial + skip * d_minor - minor_steps * d_major) as i64;
        }

        self.plot(major, minor, transposed, mode);
        while major != end {
            if (step_major > 0 && major >= limit - 1) || (step_major < 0 && major <= 0) {
                break;
            }
            if fraction >= 0 {
                minor += step_minor;
                fraction -= d_major;
            }
            major += step_major;
            fraction += d_minor;
            self.plot(major, minor, transposed, mode);
        }
    }

    fn plot(&mut self, major: i64, minor: i64, transposed: bool, mode: GraphicsMode) {
        let (x, y) = if transposed { (minor, major) } else { (major, minor) };
        if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
            self.set_pixel(x, y, mode);
        }
    }

    /// Outline of the box with corners `(x1, y1)` and `(x2, y2)`.
    pub fn draw_box(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, mode: GraphicsMode) {
        self.draw_line(x1, y1, x2, y1, mode);
        self.draw_line(x2, y1, x2, y2, mode);
        self.draw_line(x2, y2, x1, y2, mode);
        self.draw_line(x1, y2, x1, y1, mode);
    }

    /// Solid box, drawn as one vertical line per column from `x1` to `x2`.
    ///
    /// Columns off the frame are skipped.
    pub fn draw_filled_box(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, mode: GraphicsMode) {
        let last_column = i32::try_from(self.width()).unwrap_or(i32::MAX) - 1;
        for column in x1.max(0)..=x2.min(last_column) {
            self.draw_line(column, y1, column, y2, mode);
        }
    }

    /// Integer midpoint circle outline of `radius` around `(x_center, y_center)`.
    pub fn draw_circle(&mut self, x_center: i32, y_center: i32, radius: i32, mode: GraphicsMode) {
        let (x_center, y_center, radius) =
            (i64::from(x_center), i64::from(y_center), i64::from(radius));
        if !self.ring_may_touch(x_center, y_center, radius) {
            return;
        }
        let mut x = -radius;
        let mut y = 0;
        let mut error = 2 - 2 * radius;
        while x < 0 {
            self.plot(x_center - x, y_center + y, false, mode);
            self.plot(x_center - y, y_center - x, false, mode);
            self.plot(x_center + x, y_center - y, false, mode);
            self.plot(x_center + y, y_center + x, false, mode);
            let previous = error;
            if previous <= y {
                y += 1;
                error += y * 2 + 1;
            }
            if previous > x || error > y {
                x += 1;
                error += x * 2 + 1;
            }
        }
    }

    /// `false` when no pixel of the ring can land on the frame: the ring's bounding box
    /// misses it, or the whole frame sits well inside the ring.
    fn ring_may_touch(&self, x_center: i64, y_center: i64, radius: i64) -> bool {
        let width = i64::try_from(self.width()).unwrap_or(i64::MAX);
        let height = i64::try_from(self.height()).unwrap_or(i64::MAX);
        if width == 0 || height == 0 {
            return false;
        }
        if x_center + radius < 0
            || x_center - radius >= width
            || y_center + radius < 0
            || y_center - radius >= height
        {
            return false;
        }
        let reach = |center: i64, size: i64| {
            let far = center.abs().max((center - (size - 1)).abs());
            i128::from(far) * i128::from(far)
        };
        let farthest = reach(x_center, width) + reach(y_center, height);
        let inner = i128::from(radius - 2);
        radius <= 2 || farthest >= inner * inner
    }

    /// Byte-copy fast paths are valid only when both frames use the plain transform.
    fn byte_copy_allowed(&self, other: &Self, left: i32, width: usize) -> bool {
        !self.flipping() && !other.flipping() && left >= 0 && left % 8 == 0 && width % 8 == 0
    }

    /// Copy a rectangle into a new, independently owned frame.
    ///
    /// Pixels outside this frame come back dark.
    #[must_use]
    pub fn sub_frame(&self, left: i32, top: i32, width: usize, height: usize) -> Self {
        let mut result = Self::new(width, height);
        let byte_aligned = self.byte_copy_allowed(&result, left, width)
            && top >= 0
            && left as usize + width <= self.width();
        if byte_aligned {
            let span = width / 8;
            for to_y in 0..height {
                let from_y = top as usize + to_y;
                let (Some(from), Some(to)) =
                    (self.tiling.index(left as usize, from_y), result.tiling.index(0, to_y))
                else {
                    continue;
                };
                result.bitmap[to.byte_offset..to.byte_offset + span]
                    .copy_from_slice(&self.bitmap[from.byte_offset..from.byte_offset + span]);
            }
        } else {
            for to_y in 0..height as i32 {
                for to_x in 0..width as i32 {
                    if self.get_pixel(left + to_x, top + to_y) {
                        result.set_pixel(to_x, to_y, GraphicsMode::On);
                    }
                }
            }
        }
        result
    }

    /// Paste `from` with its top-left corner at `(left, top)`, clipped to this frame.
    ///
    /// Every pasted pixel is written, dark ones included.
    pub fn copy_frame(&mut self, from: &Self, left: i32, top: i32) {
        let to_right = (left.max(0) as usize + from.width()).min(self.width());
        let byte_aligned = self.byte_copy_allowed(from, left, from.width())
            && top >= 0
            && (left as usize) < self.width()
            && (to_right - left as usize) % 8 == 0;
        if byte_aligned {
            let span = (to_right - left as usize) / 8;
            let to_bottom = (top as usize + from.height()).min(self.height());
            for (from_y, to_y) in (top as usize..to_bottom).enumerate() {
                let (Some(to), Some(source)) =
                    (self.tiling.index(left as usize, to_y), from.tiling.index(0, from_y))
                else {
                    continue;
                };
                self.bitmap[to.byte_offset..to.byte_offset + span]
                    .copy_from_slice(&from.bitmap[source.byte_offset..source.byte_offset + span]);
            }
        } else {
            for from_y in 0..from.height() as i32 {
                for from_x in 0..from.width() as i32 {
                    let mode = if from.get_pixel(from_x, from_y) {
                        GraphicsMode::On
                    } else {
                        GraphicsMode::Off
                    };
                    self.set_pixel(left + from_x, top + from_y, mode);
                }
            }
        }
    }

    /// Move a `width` × `height` rectangle, leaving its old location dark.
    ///
    /// Source and destination may overlap. Does nothing if either origin is off the canvas.
    pub fn move_region(
        &mut self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
        width: usize,
        height: usize,
    ) {
        if !self.contains(from_x, from_y) || !self.contains(to_x, to_y) {
            return;
        }
        if width == 0 || height == 0 {
            return;
        }
        let to_move = self.sub_frame(from_x, from_y, width, height);
        self.draw_filled_box(
            from_x,
            from_y,
            from_x + width as i32 - 1,
            from_y + height as i32 - 1,
            GraphicsMode::Off,
        );
        self.copy_frame(&to_move, to_x, to_y);
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        (0..self.width() as i32).contains(&x) && (0..self.height() as i32).contains(&y)
    }

    /// Shift everything `delta` pixels right (negative: left); vacated columns go dark.
    pub fn scroll_x(&mut self, delta: i32) {
        let (width, height) = (self.width() as i32, self.height() as i32);
        if delta == 0 {
            return;
        }
        if delta.unsigned_abs() as usize >= self.width() {
            self.clear_screen();
        } else if delta < 0 {
            self.move_region(-delta, 0, 0, 0, (width + delta) as usize, self.height());
            self.draw_filled_box(width + delta, 0, width - 1, height - 1, GraphicsMode::Off);
        } else {
            self.move_region(0, 0, delta, 0, (width - delta) as usize, self.height());
            self.draw_filled_box(0, 0, delta - 1, height - 1, GraphicsMode::Off);
        }
    }

    /// Shift everything `delta` pixels down (negative: up); vacated rows go dark.
    pub fn scroll_y(&mut self, delta: i32) {
        let (width, height) = (self.width() as i32, self.height() as i32);
        if delta == 0 {
            return;
        }
        if delta.unsigned_abs() as usize >= self.height() {
            self.clear_screen();
        } else if delta < 0 {
            self.move_region(0, -delta, 0, 0, self.width(), (height + delta) as usize);
            self.draw_filled_box(0, height + delta, width - 1, height - 1, GraphicsMode::Off);
        } else {
            self.move_region(0, 0, 0, delta, self.width(), (height - delta) as usize);
            self.draw_filled_box(0, 0, width - 1, delta - 1, GraphicsMode::Off);
        }
    }

    /// Like [`Self::scroll_x`], but columns leaving one edge re-enter at the other.
    pub fn marquee_scroll_x(&mut self, delta: i32) {
        if self.width() == 0 {
            return;
        }
        let width = self.width() as i32;
        let delta = delta % width;
        if delta < 0 {
            let strip = self.sub_frame(0, 0, delta.unsigned_abs() as usize, self.height());
            self.move_region(-delta, 0, 0, 0, (width + delta) as usize, self.height());
            self.copy_frame(&strip, width + delta, 0);
        } else if delta > 0 {
            let strip = self.sub_frame(width - delta, 0, delta as usize, self.height());
            self.move_region(0, 0, delta, 0, (width - delta) as usize, self.height());
            self.copy_frame(&strip, 0, 0);
        }
    }

    /// Like [`Self::scroll_y`], but rows leaving one edge re-enter at the other.
    pub fn marquee_scroll_y(&mut self, delta: i32) {
        if self.height() == 0 {
            return;
        }
        let height = self.height() as i32;
        let delta = delta % height;
        if delta < 0 {
            let strip = self.sub_frame(0, 0, self.width(), delta.unsigned_abs() as usize);
            self.move_region(0, -delta, 0, 0, self.width(), (height + delta) as usize);
            self.copy_frame(&strip, 0, height + delta);
        } else if delta > 0 {
            let strip = self.sub_frame(0, height - delta, self.width(), delta as usize);
            self.move_region(0, 0, 0, delta, self.width(), (height - delta) as usize);
            self.copy_frame(&strip, 0, 0);
        }
    }

    /// Exchange bitmaps with `other` without copying pixels.
    ///
    /// Only frames with the same geometry can swap; otherwise nothing happens and `false`
    /// is returned. To swap with a frame that is being scanned, use
    /// [`SharedDmd::swap_buffers`](crate::scheduler::SharedDmd::swap_buffers), which does
    /// this inside a critical section.
    pub fn swap_buffers(&mut self, other: &mut Self) -> bool {
        if self.tiling != other.tiling {
            return false;
        }
        core::mem::swap(&mut self.bitmap, &mut other.bitmap);
        true
    }
}

/// Text dump for debugging: one line per pixel row, `[]` lit and `__` dark.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height() as i32 {
            for x in 0..self.width() as i32 {
                f.write_str(if self.get_pixel(x, y) { "[]" } else { "__" })?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.width() as u32, self.height() as u32)
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let mode = if color.is_on() {
                GraphicsMode::On
            } else {
                GraphicsMode::Off
            };
            self.set_pixel(coord.x, coord.y, mode);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> core::result::Result<(), Self::Error> {
        self.fill_screen(color.is_on());
        Ok(())
    }
}

/// State of one Bresenham walk, in major/minor axis terms.
struct LineWalk {
    major: i64,
    minor: i64,
    end: i64,
    step_major: i64,
    step_minor: i64,
    d_major: i64,
    d_minor: i64,
}
