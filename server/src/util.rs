//! Text helpers for chat lines.

/// Suffix appended to capped text
const ELLIPSIS: &str = "...";

/// Pixel width of a glyph in the client chat font
fn glyph_width(c: char) -> i32 {
    match c {
        'i' | 'l' | 'j' | '\'' | ',' | '.' | '!' | '|' | ':' | ';' | '`' => 3,
        ' ' | 'f' | 'r' | 't' | 'I' | '(' | ')' | '[' | ']' => 4,
        'm' | 'w' => 9,
        'M' | 'W' | '@' => 10,
        c if c.is_ascii_uppercase() => 7,
        c if c.is_ascii() => 6,
        _ => 8,
    }
}

/// Rendered width of `text`
pub fn text_width(text: &str) -> i32 {
    text.chars().map(glyph_width).sum()
}

/// Cut `text` so it renders within `width`, marking the cut with an ellipsis
pub fn text_cap(text: &str, width: i32) -> String {
    if text_width(text) <= width {
        return text.to_string();
    }

    let budget = width - text_width(ELLIPSIS);
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = glyph_width(c);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ELLIPSIS);
    out
}

/// Uppercase the first character
pub fn ucfirst(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
