//! Box-drawing glyph constants for the full-screen frame. An implementation
//! detail per §1's non-goals, kept in one table as §9 directs.

pub const TOP_LEFT: char = '┌';
pub const TOP_RIGHT: char = '┐';
pub const BOTTOM_LEFT: char = '└';
pub const BOTTOM_RIGHT: char = '┘';
pub const HORIZONTAL: char = '─';
pub const VERTICAL: char = '│';
pub const TEE_DOWN: char = '┬';
pub const TEE_UP: char = '┴';
pub const TEE_RIGHT: char = '├';
pub const TEE_LEFT: char = '┤';
pub const CROSS: char = '┼';

pub fn horizontal_rule(width: usize) -> String {
    std::iter::repeat(HORIZONTAL).take(width).collect()
}
