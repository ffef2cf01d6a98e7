pub const MAX_SEO_TITLE: usize = 60;
pub const MAX_SEO_DESCRIPTION: usize = 155;

const ELLIPSIS: char = '…';

/// Trim, then cut to at most `max` characters, ending in an ellipsis when cut.
pub fn clamp(text: &str, max: usize) -> String {
    let t = text.trim();
    if t.chars().count() <= max {
        return t.to_string();
    }
    let head: String = t.chars().take(max.saturating_sub(1)).collect();
    let mut out = head.trim_end().to_string();
    out.push(ELLIPSIS);
    out
}

/// Single-line preview for progress output.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push(ELLIPSIS);
    out
}
