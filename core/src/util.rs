pub trait OptionPathExt {
    fn as_opt_path(&self) -> Option<&camino::Utf8Path>;
}

impl OptionPathExt for Option<camino::Utf8PathBuf> {
    fn as_opt_path(&self) -> Option<&camino::Utf8Path> {
        self.as_ref().map(|p| p.as_path())
    }
}

/// Truncate to at most `max` bytes, respecting char boundaries.
/// Rendition error messages are capped at 255 before they go in the database.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::truncate_chars;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 255), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // 'é' is two bytes, cutting in the middle must back off
        assert_eq!(truncate_chars("héllo", 2), "h");
    }
}
