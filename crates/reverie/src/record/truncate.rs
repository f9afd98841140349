//! Boundary-aware short-text derivation
//!
//! Short text prefers the first sentence terminator at or before the maximum
//! length, then the last whitespace before it with an ellipsis, then a hard
//! cut with an ellipsis. All cuts respect char boundaries.

const ELLIPSIS: &str = "...";

/// Derive the compact form of `full_text`, at most `max_chars` characters.
pub fn derive_short_text(full_text: &str, max_chars: usize) -> String {
    let text = full_text.trim();
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let window = &chars[..max_chars];

    // First choice: cut at the last sentence terminator inside the window
    if let Some(pos) = window
        .iter()
        .rposition(|c| matches!(c, '.' | '!' | '?'))
    {
        return window[..=pos].iter().collect::<String>().trim_end().to_string();
    }

    // Second choice: cut at the last whitespace, marking the truncation
    if let Some(pos) = window.iter().rposition(|c| c.is_whitespace()) {
        if pos > 0 {
            let mut cut: String = window[..pos].iter().collect();
            cut.truncate(cut.trim_end().len());
            cut.push_str(ELLIPSIS);
            return cut;
        }
    }

    // Last resort: hard cut
    let mut cut: String = window.iter().collect();
    cut.push_str(ELLIPSIS);
    cut
}
