//! Read-only bitmap fonts in the classic "FontCreator" table layout.
//!
//! A font table is a byte blob:
//!
//! ```text
//! offset  size  field
//! 0       2     total_size (big-endian; 0 marks a fixed-width font)
//! 2       1     fixed_width
//! 3       1     height
//! 4       1     first_char
//! 5       1     char_count
//! 6       ...   variable width only: one width byte per character
//! ...     ...   glyph data
//! ```
//!
//! Glyphs are stored column by column. Each column is `ceil(height / 8)` bytes, least
//! significant bit at the top. When a glyph needs more than one byte per column, the
//! last byte is bottom aligned: its bit 7 is the glyph's last row.
//!
//! Tables are not validated. Missing bytes read as dark pixels and characters outside
//! the table have zero width.

/// Length of the fixed header at the start of every font table.
pub const HEADER_LEN: usize = 6;

/// The six-byte font table header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FontHeader {
    /// Total table size in bytes; `0` means fixed width.
    pub total_size: u16,
    /// Glyph width of a fixed-width font (and the space width of last resort).
    pub fixed_width: u8,
    /// Glyph height in pixels.
    pub height: u8,
    /// First character code in the table.
    pub first_char: u8,
    /// Number of characters in the table.
    pub char_count: u8,
}

/// A font table borrowed from (usually `static`) data.
///
/// ```rust
/// use dmd_kit::font::Font;
///
/// // Fixed width, 3 pixels wide, 5 high, one glyph: 'A'.
/// static TINY: [u8; 9] = [0, 0, 3, 5, b'A', 1, 0b11110, 0b00101, 0b11110];
/// let font = Font::new(&TINY);
///
/// assert_eq!(font.char_width('A'), 3);
/// assert_eq!(font.char_width('B'), 0);
/// assert_eq!(font.string_width("AA"), 7);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Font<'a> {
    header: FontHeader,
    data: &'a [u8],
}

impl<'a> Font<'a> {
    /// Wrap a font table. A table shorter than the header reads as an empty font.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        let header = match data {
            [size_high, size_low, fixed_width, height, first_char, char_count, ..] => FontHeader {
                total_size: u16::from_be_bytes([*size_high, *size_low]),
                fixed_width: *fixed_width,
                height: *height,
                first_char: *first_char,
                char_count: *char_count,
            },
            _ => FontHeader {
                total_size: 0,
                fixed_width: 0,
                height: 0,
                first_char: 0,
                char_count: 0,
            },
        };
        Self { header, data }
    }

    /// The parsed header.
    #[must_use]
    pub const fn header(&self) -> &FontHeader {
        &self.header
    }

    /// Glyph height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.header.height as usize
    }

    /// Whether every glyph has `fixed_width` columns.
    #[must_use]
    pub const fn is_fixed_width(&self) -> bool {
        self.header.total_size == 0
    }

    const fn bytes_per_column(&self) -> usize {
        self.height().div_ceil(8)
    }

    /// Position of `c` in the table, if the table has it.
    fn slot(&self, c: char) -> Option<usize> {
        let code = u8::try_from(c).ok()?;
        let slot = code.checked_sub(self.header.first_char)?;
        (slot < self.header.char_count).then_some(usize::from(slot))
    }

    fn byte(&self, offset: usize) -> u8 {
        self.data.get(offset).copied().unwrap_or(0)
    }

    fn width_at(&self, slot: usize) -> usize {
        if self.is_fixed_width() {
            usize::from(self.header.fixed_width)
        } else {
            usize::from(self.byte(HEADER_LEN + slot))
        }
    }

    /// Look up the glyph for `c`; `None` when the table has no such character.
    #[must_use]
    pub fn glyph(&self, c: char) -> Option<Glyph<'a>> {
        let slot = self.slot(c)?;
        let bytes = self.bytes_per_column();
        let width = self.width_at(slot);
        let offset = if self.is_fixed_width() {
            HEADER_LEN + slot * bytes * width
        } else {
            let previous: usize = (0..slot).map(|earlier| self.width_at(earlier)).sum();
            HEADER_LEN + usize::from(self.header.char_count) + bytes * previous
        };
        Some(Glyph {
            width,
            height: self.height(),
            data: self.data.get(offset..).unwrap_or(&[]),
        })
    }

    /// Width of `c` in pixels, `0` if the font lacks it.
    ///
    /// A space the font does not contain borrows the width of `'n'`, then `fixed_width`.
    #[must_use]
    pub fn char_width(&self, c: char) -> usize {
        if let Some(slot) = self.slot(c) {
            return self.width_at(slot);
        }
        if c == ' ' {
            return self
                .slot('n')
                .map_or(usize::from(self.header.fixed_width), |slot| self.width_at(slot));
        }
        0
    }

    /// Width of `s` as drawn on one line: glyph widths plus one pixel between glyphs.
    #[must_use]
    pub fn string_width(&self, s: &str) -> usize {
        let total: usize = s
            .chars()
            .map(|c| self.char_width(c))
            .filter(|&width| width > 0)
            .map(|width| width + 1)
            .sum();
        total.saturating_sub(1)
    }
}

/// One character's bitmap.
#[derive(Clone, Copy, Debug)]
pub struct Glyph<'a> {
    width: usize,
    height: usize,
    data: &'a [u8],
}

impl Glyph<'_> {
    /// Columns in the glyph.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Rows in the glyph.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Whether the glyph pixel at `(column, row)` is set; `false` outside the glyph.
    #[must_use]
    pub fn is_lit(&self, column: usize, row: usize) -> bool {
        if column >= self.width || row >= self.height {
            return false;
        }
        let bytes = self.height.div_ceil(8);
        let byte_row = row / 8;
        let bit = if bytes > 1 && byte_row == bytes - 1 {
            row + 8 - self.height
        } else {
            row % 8
        };
        let data = self
            .data
            .get(column + byte_row * self.width)
            .copied()
            .unwrap_or(0);
        data & (1 << bit) != 0
    }
}
