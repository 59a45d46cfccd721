#![cfg(feature = "host")]
#![allow(missing_docs)]
//! Host-level tests for font lookup and text drawing.

mod common;

use common::lit_pixels;
use dmd_kit::font::{Font, FontHeader};
use dmd_kit::frame::{Frame, GraphicsMode};

/// Fixed width 3×5, characters 'A'..='C', no space.
#[rustfmt::skip]
static FIXED_3X5: [u8; 15] = [
    0x00, 0x00, 3, 5, b'A', 3,
    0b11110, 0b00101, 0b11110, // A
    0b11111, 0b10101, 0b01010, // B
    0b01110, 0b10001, 0b10001, // C
];

/// Variable width, 5 high, characters 'm' and 'n', no space.
#[rustfmt::skip]
static VARIABLE_MN: [u8; 16] = [
    0x00, 0x10, 4, 5, b'm', 2,
    5, 3, // widths
    0b11110, 0b00010, 0b11100, 0b00010, 0b11100, // m
    0b11110, 0b00010, 0b11100, // n
];

/// Variable width, with its own two-column space.
#[rustfmt::skip]
static WITH_SPACE: [u8; 11] = [
    0x00, 0x0B, 1, 5, b' ', 2,
    2, 1,
    0, 0, // ' '
    0b10111, // '!'
];

/// Fixed width 2×10, one character 'X' two bytes per column.
#[rustfmt::skip]
static TALL_2X10: [u8; 10] = [
    0x00, 0x00, 2, 10, b'X', 1,
    0x01, 0x80, // top byte, columns 0 and 1
    0b1100_0000, 0b0011_1111, // bottom byte (bottom aligned), columns 0 and 1
];

fn blank_panel() -> Frame {
    Frame::for_panels(1, 1).expect("one panel")
}

fn lit_panel() -> Frame {
    let mut frame = blank_panel();
    frame.fill_screen(true);
    frame
}

#[test]
fn header_fields_are_parsed() {
    let font = Font::new(&FIXED_3X5);
    assert_eq!(
        *font.header(),
        FontHeader {
            total_size: 0,
            fixed_width: 3,
            height: 5,
            first_char: b'A',
            char_count: 3,
        }
    );
    assert!(font.is_fixed_width());

    let font = Font::new(&VARIABLE_MN);
    assert_eq!(font.header().total_size, 16);
    assert!(!font.is_fixed_width());
}

#[test]
fn char_widths_and_fallbacks() {
    let fixed = Font::new(&FIXED_3X5);
    assert_eq!(fixed.char_width('A'), 3);
    assert_eq!(fixed.char_width('C'), 3);
    assert_eq!(fixed.char_width('D'), 0);
    assert_eq!(fixed.char_width('@'), 0);
    assert_eq!(fixed.char_width('é'), 0);
    // No space and no 'n': fall back to the fixed width.
    assert_eq!(fixed.char_width(' '), 3);

    let variable = Font::new(&VARIABLE_MN);
    assert_eq!(variable.char_width('m'), 5);
    assert_eq!(variable.char_width('n'), 3);
    // No space: borrow the width of 'n'.
    assert_eq!(variable.char_width(' '), 3);

    let with_space = Font::new(&WITH_SPACE);
    assert_eq!(with_space.char_width(' '), 2);
    assert_eq!(with_space.char_width('!'), 1);
}

#[test]
fn string_width_adds_kerning_between_glyphs() {
    let font = Font::new(&FIXED_3X5);
    assert_eq!(font.string_width(""), 0);
    assert_eq!(font.string_width("A"), 3);
    assert_eq!(font.string_width("AB"), 7);
    // Characters the font lacks add nothing, not even kerning.
    assert_eq!(font.string_width("A?B"), 7);
    assert_eq!(font.string_width("A B"), 11);
}

#[test]
fn draw_char_blits_the_glyph() {
    let font = Font::new(&FIXED_3X5);
    let mut frame = blank_panel();
    assert_eq!(frame.draw_char(1, 1, 'A', GraphicsMode::On, &font), Some(3));
    assert_eq!(
        lit_pixels(&frame),
        vec![
            (2, 1),
            (1, 2),
            (3, 2),
            (1, 3),
            (2, 3),
            (3, 3),
            (1, 4),
            (3, 4),
            (1, 5),
            (3, 5),
        ]
    );
}

#[test]
fn draw_char_clears_the_glyph_background() {
    let font = Font::new(&FIXED_3X5);
    let mut frame = lit_panel();
    frame.draw_char(0, 0, 'A', GraphicsMode::On, &font);
    // Inside the cell only glyph bits stay lit.
    assert!(!frame.get_pixel(0, 0));
    assert!(frame.get_pixel(1, 0));
    assert!(!frame.get_pixel(1, 1));
    // Outside the cell nothing changed.
    assert!(frame.get_pixel(3, 0));
    assert!(frame.get_pixel(0, 5));
}

#[test]
fn inverse_mode_draws_dark_glyphs_on_lit_background() {
    let font = Font::new(&FIXED_3X5);
    let mut frame = blank_panel();
    frame.draw_char(0, 0, 'A', GraphicsMode::Inverse, &font);
    let cell: Vec<_> = lit_pixels(&frame);
    // Background bits of 'A' light up, glyph bits stay dark.
    assert_eq!(
        cell,
        vec![(0, 0), (2, 0), (1, 1), (1, 3), (1, 4)]
    );
}

#[test]
fn xor_mode_leaves_the_background_alone() {
    let font = Font::new(&FIXED_3X5);
    let mut frame = lit_panel();
    frame.draw_char(0, 0, 'A', GraphicsMode::Xor, &font);
    // Glyph bits toggle off, background untouched.
    assert!(frame.get_pixel(0, 0));
    assert!(!frame.get_pixel(0, 1));
    assert!(!frame.get_pixel(1, 0));
}

#[test]
fn draw_char_edge_cases() {
    let font = Font::new(&FIXED_3X5);
    let mut frame = blank_panel();
    assert_eq!(frame.draw_char(32, 0, 'A', GraphicsMode::On, &font), None);
    assert_eq!(frame.draw_char(0, 16, 'A', GraphicsMode::On, &font), None);
    assert_eq!(frame.draw_char(0, 0, 'Z', GraphicsMode::On, &font), Some(0));
    // Partly off the left edge: still reports its width, draws the visible part.
    assert_eq!(frame.draw_char(-2, 0, 'A', GraphicsMode::On, &font), Some(3));
    assert_eq!(lit_pixels(&frame), vec![(0, 1), (0, 2), (0, 3), (0, 4)]);
}

#[test]
fn space_fills_its_cell_with_the_inverse_mode() {
    let font = Font::new(&FIXED_3X5);
    let mut frame = lit_panel();
    assert_eq!(frame.draw_char(0, 0, ' ', GraphicsMode::On, &font), Some(3));
    for y in 0..5 {
        for x in 0..3 {
            assert!(!frame.get_pixel(x, y));
        }
        assert!(frame.get_pixel(3, y));
    }
    assert!(frame.get_pixel(0, 5));
}

#[test]
fn draw_string_kerns_between_glyphs() {
    let font = Font::new(&FIXED_3X5);
    let mut frame = lit_panel();
    frame.draw_string(0, 0, "AB", GraphicsMode::On, &font);
    for y in 0..5 {
        assert!(!frame.get_pixel(3, y), "kerning after A at row {y}");
        assert!(!frame.get_pixel(7, y), "kerning after B at row {y}");
    }
    assert!(frame.get_pixel(4, 0), "B column 0");
    assert!(frame.get_pixel(8, 0), "past the string");
    assert!(frame.get_pixel(3, 5), "kerning is glyph height only");
}

#[test]
fn draw_string_clears_a_column_before_the_string() {
    let font = Font::new(&FIXED_3X5);
    let mut frame = lit_panel();
    frame.draw_string(2, 0, "A", GraphicsMode::On, &font);
    for y in 0..5 {
        assert!(!frame.get_pixel(1, y));
    }
    assert!(frame.get_pixel(0, 0));
}

#[test]
fn newline_moves_down_by_height_plus_one() {
    let font = Font::new(&FIXED_3X5);
    let mut frame = blank_panel();
    frame.draw_string(0, 0, "A\nB", GraphicsMode::On, &font);
    for y in 6..11 {
        assert!(frame.get_pixel(0, y), "B column 0 at row {y}");
    }
    assert!(!frame.get_pixel(0, 5));
}

#[test]
fn draw_string_stops_at_the_right_edge() {
    let font = Font::new(&FIXED_3X5);
    let mut frame = blank_panel();
    frame.draw_string(0, 0, "AAAAAAAAAAAA", GraphicsMode::On, &font);
    // Glyphs start every 4 pixels; the one at x = 28 is the last.
    assert!(frame.get_pixel(28, 1));
    assert!(frame.get_pixel(30, 4));
}

#[test]
fn draw_string_ignores_strings_off_the_canvas() {
    let font = Font::new(&FIXED_3X5);
    let mut frame = blank_panel();
    frame.draw_string(40, 0, "ABC", GraphicsMode::On, &font);
    frame.draw_string(0, -6, "ABC", GraphicsMode::On, &font);
    assert!(lit_pixels(&frame).is_empty());
}

#[test]
fn variable_width_glyphs_are_indexed_by_preceding_widths() {
    let font = Font::new(&VARIABLE_MN);
    let mut frame = blank_panel();
    assert_eq!(frame.draw_char(0, 0, 'n', GraphicsMode::On, &font), Some(3));
    assert_eq!(
        lit_pixels(&frame),
        vec![(0, 1), (1, 1), (0, 2), (2, 2), (0, 3), (2, 3), (0, 4), (2, 4)]
    );
}

#[test]
fn tall_glyphs_bottom_align_their_last_byte() {
    let font = Font::new(&TALL_2X10);
    let glyph = font.glyph('X').expect("in font");
    assert_eq!((glyph.width(), glyph.height()), (2, 10));

    let mut frame = blank_panel();
    frame.draw_char(0, 0, 'X', GraphicsMode::On, &font);
    assert_eq!(lit_pixels(&frame), vec![(0, 0), (1, 7), (0, 8), (0, 9)]);
}

#[test]
fn truncated_tables_read_as_empty_or_dark() {
    let empty = Font::new(&[0, 0, 3]);
    assert_eq!(empty.height(), 0);
    assert_eq!(empty.char_width('A'), 0);
    let mut frame = blank_panel();
    frame.draw_string(0, 0, "A", GraphicsMode::On, &empty);
    assert!(lit_pixels(&frame).is_empty());

    // Header promises three glyphs, data holds one.
    let short = Font::new(&FIXED_3X5[..9]);
    assert_eq!(frame.draw_char(0, 0, 'C', GraphicsMode::On, &short), Some(3));
    assert!(lit_pixels(&frame).is_empty());
}
