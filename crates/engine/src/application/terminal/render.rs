//! Panel-drawing helpers for the full-screen renderer (§4.4): outer frame,
//! player panel, shared info panel, phase panel. Each returns plain text;
//! `TerminalApplication::redraw` is responsible for the draw order (clear
//! -> frame -> player panel -> info panel -> phase panel -> dialog ->
//! cursor) and for writing the result to the `TerminalSurface`.

use super::glyphs;

/// A horizontal rule framed with left/right tee glyphs, used to separate
/// panels within the outer frame (`lobby.py::_update_status_area`'s
/// border style, generalized).
pub fn section_rule(width: u16) -> String {
    format!(
        "{}{}{}",
        glyphs::TEE_RIGHT,
        glyphs::horizontal_rule(width.saturating_sub(2) as usize),
        glyphs::TEE_LEFT
    )
}

/// The outer box, drawn once per redraw before any panel content.
pub fn outer_frame(width: u16, height: u16) -> String {
    let mut out = String::new();
    out.push(glyphs::TOP_LEFT);
    out.push_str(&glyphs::horizontal_rule(width.saturating_sub(2) as usize));
    out.push(glyphs::TOP_RIGHT);
    out.push('\n');
    for _ in 1..height.saturating_sub(1) {
        out.push(glyphs::VERTICAL);
        out.push_str(&" ".repeat(width.saturating_sub(2) as usize));
        out.push(glyphs::VERTICAL);
        out.push('\n');
    }
    out.push(glyphs::BOTTOM_LEFT);
    out.push_str(&glyphs::horizontal_rule(width.saturating_sub(2) as usize));
    out.push(glyphs::BOTTOM_RIGHT);
    out
}

/// Centers `text` within `width` columns, matching the original's
/// `(tw - len(text)) // 2` centering arithmetic.
pub fn centered(text: &str, width: u16) -> String {
    let text_len = text.chars().count();
    if text_len >= width as usize {
        return text.to_string();
    }
    let pad = (width as usize - text_len) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_pads_evenly() {
        let line = centered("hi", 10);
        assert_eq!(line, "    hi");
    }

    #[test]
    fn outer_frame_has_matching_border_rows() {
        let frame = outer_frame(20, 5);
        let lines: Vec<&str> = frame.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with(glyphs::TOP_LEFT));
        assert!(lines[4].starts_with(glyphs::BOTTOM_LEFT));
    }
}
