//! String utilities for the domain layer.

/// Truncate a string to at most `max_len` bytes, appending "..." when cut.
///
/// The cut always lands on a UTF-8 character boundary, so model output in
/// any script can be previewed in logs safely.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(3).min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_strings_unchanged() {
        assert_eq!(truncate("rank 1", 10), "rank 1");
        assert_eq!(truncate("", 0), "");
    }

    #[test]
    fn test_ascii_cut() {
        assert_eq!(truncate("hypertension", 8), "hyper...");
    }

    #[test]
    fn test_multibyte_cut_on_boundary() {
        // "é" is 2 bytes: 10 bytes total, target 5 falls inside the third "é"
        assert_eq!(truncate("ééééé", 8), "éé...");
        // "→" is 3 bytes
        assert_eq!(truncate("→→→→", 9), "→→...");
    }
}
