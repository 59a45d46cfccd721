//! Text drawing on a [`Frame`] with a [`Font`] table.

use super::{Frame, GraphicsMode};
use crate::font::Font;

impl Frame {
    /// Draw one character with its top-left corner at `(x, y)`.
    ///
    /// Set glyph pixels are drawn with `mode` (`Inverse` draws them dark) and clear glyph
    /// pixels with [`GraphicsMode::inverse`]. A space fills its cell with the inverse mode.
    ///
    /// Returns the glyph width (`0` for characters the font lacks), or `None` when
    /// `(x, y)` is right of or below the frame.
    pub fn draw_char(
        &mut self,
        x: i32,
        y: i32,
        c: char,
        mode: GraphicsMode,
        font: &Font<'_>,
    ) -> Option<usize> {
        if x >= self.width() as i32 || y >= self.height() as i32 {
            return None;
        }
        let background = mode.inverse();
        let height = font.height() as i32;

        if c == ' ' {
            let width = font.char_width(' ');
            if width > 0 && height > 0 {
                self.draw_filled_box(x, y, x + width as i32 - 1, y + height - 1, background);
            }
            return Some(width);
        }

        let Some(glyph) = font.glyph(c) else {
            return Some(0);
        };
        let width = glyph.width();
        if x < -(width as i32) || y < -height {
            return Some(width);
        }

        let foreground = match mode {
            GraphicsMode::Inverse => GraphicsMode::Off,
            other => other,
        };
        for column in 0..width {
            for row in 0..glyph.height() {
                let pixel_mode = if glyph.is_lit(column, row) {
                    foreground
                } else {
                    background
                };
                self.set_pixel(x + column as i32, y + row as i32, pixel_mode);
            }
        }
        Some(width)
    }

    /// Draw `s` starting at `(x, y)`, one kerning column after each glyph.
    ///
    /// Kerning columns (and one column left of `x`, when there is room) use the inverse of
    /// `mode`. `'\n'` returns to `x` and moves down by the font height plus one. Drawing
    /// stops at the first glyph that would start right of or below the frame.
    pub fn draw_string(&mut self, x: i32, mut y: i32, s: &str, mode: GraphicsMode, font: &Font<'_>) {
        let height = font.height() as i32;
        if x >= self.width() as i32 || y >= self.height() as i32 || y + height < 0 || height == 0 {
            return;
        }
        let background = mode.inverse();
        if x > 0 {
            self.draw_line(x - 1, y, x - 1, y + height - 1, background);
        }

        let mut column = 0;
        for c in s.chars() {
            if c == '\n' {
                column = 0;
                y += height + 1;
                continue;
            }
            match self.draw_char(x + column, y, c, mode, font) {
                None => return,
                Some(0) => {}
                Some(width) => {
                    column += width as i32;
                    self.draw_line(x + column, y, x + column, y + height - 1, background);
                    column += 1;
                }
            }
        }
    }
}
