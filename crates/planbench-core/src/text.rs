use crate::diff::TRUNCATION_MARKER;

/// First `max_chars` characters of `text`.
pub fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Like [`clip`], but marks the cut with the truncation marker.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let clipped = clip(text, max_chars);
    if clipped.len() == text.len() {
        text.to_string()
    } else {
        format!("{clipped}{TRUNCATION_MARKER}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_counts_chars_not_bytes() {
        assert_eq!(clip("héllo", 2), "hé");
        assert_eq!(clip("abc", 10), "abc");
        assert_eq!(clip("abc", 0), "");
    }

    #[test]
    fn truncate_marks_only_when_cut() {
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("abcd", 3), format!("abc{TRUNCATION_MARKER}"));
    }
}
