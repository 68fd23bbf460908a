//! Utility functions and helpers

/// Shorten text for log lines, respecting UTF-8 boundaries
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(3);
    while !s.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    format!("{}...", &s[..end])
}
