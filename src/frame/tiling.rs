//! Panel-tiling index transform: logical `(x, y)` to a byte and bit in the scan-order bitmap.
//!
//! Chained panels expect their row data end-to-end, as if every panel in the grid sat in
//! one long row. [`Tiling`] is the only place that knows this layout; the framebuffer's
//! pixel accessors and the scan multiplexer's row extraction both go through it.
//!
//! ```text
//! 2×2 panel grid (logical)          unified scan order (one bitmap row per panel row y')
//!
//!   +------+------+                 +------+------+------+------+
//!   |  P0  |  P1  |                 |  P0  |  P1  |  P2  |  P3  |
//!   +------+------+       ==>       +------+------+------+------+
//!   |  P2  |  P3  |                 x' = (x mod 32) + panel * 32
//!   +------+------+
//! ```

/// Width of one physical panel in pixels.
pub const PANEL_WIDTH: usize = 32;

/// Height of one physical panel in pixels.
pub const PANEL_HEIGHT: usize = 16;

/// Location of one pixel in the packed bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitIndex {
    /// Byte offset into the bitmap.
    pub byte_offset: usize,
    /// Single-bit mask within that byte (MSB is the leftmost pixel).
    pub bit_mask: u8,
}

/// Geometry of a tiled canvas and its bitmap layout.
///
/// Panel-aligned canvases (the ones a display drives) use exactly the panel-chain layout.
/// Smaller or unaligned canvases, such as sub-frames, round up to whole panels so the
/// transform stays injective:
///
/// - one panel row: the unified row is the canvas width rounded up to a byte and the
///   bitmap holds `height` rows;
/// - several panel rows: the unified row is `panels_per_row * 32 * height_in_panels`
///   pixels and the bitmap holds 16 rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tiling {
    width: usize,
    height: usize,
    panels_per_row: usize,
    height_in_panels: usize,
    row_bytes: usize,
    bitmap_rows: usize,
}

impl Tiling {
    /// Describe a canvas `width` × `height` pixels.
    #[must_use]
    pub const fn new(width: usize, height: usize) -> Self {
        let panels_per_row = width.div_ceil(PANEL_WIDTH);
        let height_in_panels = height.div_ceil(PANEL_HEIGHT);
        let (row_pixels, bitmap_rows) = if height_in_panels <= 1 {
            (width.next_multiple_of(8), height)
        } else {
            (panels_per_row * PANEL_WIDTH * height_in_panels, PANEL_HEIGHT)
        };
        Self {
            width,
            height,
            panels_per_row,
            height_in_panels,
            row_bytes: row_pixels / 8,
            bitmap_rows,
        }
    }

    /// Describe a display of `panels_wide` × `panels_high` whole panels.
    #[must_use]
    pub const fn for_panels(panels_wide: usize, panels_high: usize) -> Self {
        Self::new(panels_wide * PANEL_WIDTH, panels_high * PANEL_HEIGHT)
    }

    /// Canvas width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Canvas height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Panels across (rounded up).
    #[must_use]
    pub const fn panels_per_row(&self) -> usize {
        self.panels_per_row
    }

    /// Panels down (rounded up).
    #[must_use]
    pub const fn height_in_panels(&self) -> usize {
        self.height_in_panels
    }

    /// Bytes in one unified row.
    #[must_use]
    pub const fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    /// Rows in the bitmap.
    #[must_use]
    pub const fn bitmap_rows(&self) -> usize {
        self.bitmap_rows
    }

    /// Total bitmap size in bytes.
    #[must_use]
    pub const fn bitmap_len(&self) -> usize {
        self.row_bytes * self.bitmap_rows
    }

    /// Map an in-range pixel to its bitmap location; `None` outside the canvas.
    #[must_use]
    pub const fn index(&self, x: usize, y: usize) -> Option<BitIndex> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let panel = x / PANEL_WIDTH + self.panels_per_row * (y / PANEL_HEIGHT);
        let unified_x = x % PANEL_WIDTH + panel * PANEL_WIDTH;
        let unified_y = y % PANEL_HEIGHT;
        Some(BitIndex {
            byte_offset: unified_x / 8 + unified_y * self.row_bytes,
            bit_mask: 0x80 >> (unified_x % 8),
        })
    }

    /// Inverse of [`Self::index`]; `None` for locations no pixel maps to.
    #[must_use]
    pub const fn position(&self, bit_index: BitIndex) -> Option<(usize, usize)> {
        if self.row_bytes == 0 || bit_index.bit_mask.count_ones() != 1 {
            return None;
        }
        let unified_y = bit_index.byte_offset / self.row_bytes;
        let unified_x = (bit_index.byte_offset % self.row_bytes) * 8
            + bit_index.bit_mask.leading_zeros() as usize;
        if unified_y >= self.bitmap_rows {
            return None;
        }
        let panel = unified_x / PANEL_WIDTH;
        let x = unified_x % PANEL_WIDTH + (panel % self.panels_per_row) * PANEL_WIDTH;
        let y = unified_y + (panel / self.panels_per_row) * PANEL_HEIGHT;
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((x, y))
    }
}
