//! 5x7 dot-matrix glyph templates for the built-in OCR backend.
//!
//! Chart renderers draw axis labels in small fixed-pitch faces that reduce
//! cleanly to this grid, which is all the digit matcher needs.

/// Template grid width in cells.
pub const GLYPH_WIDTH: u32 = 5;
/// Template grid height in cells.
pub const GLYPH_HEIGHT: u32 = 7;

/// Row bit patterns, bit 4 = leftmost column.
pub type Glyph = [u8; 7];

/// Digit templates in value order.
pub const DIGITS: [Glyph; 10] = [
    // 0
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
    // 1
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
    // 2
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
    // 3
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
    // 4
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
    // 5
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
    // 6
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
    // 7
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
    // 8
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
    // 9
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
];

/// Whether the template cell at (col, row) is inked.
pub fn cell(glyph: &Glyph, col: u32, row: u32) -> bool {
    if col >= GLYPH_WIDTH || row >= GLYPH_HEIGHT {
        return false;
    }
    glyph[row as usize] & (1 << (GLYPH_WIDTH - 1 - col)) != 0
}
