//! UTF-8–safe string truncation.
//!
//! `&str[..n]` panics when `n` falls inside a multi-byte character. These
//! helpers snap back to the nearest char boundary so truncation is always
//! safe. Used for session-title capture and APNS collapse ids, both of
//! which cap stored length in bytes.

/// Truncate a string to at most `max_bytes` bytes at a char boundary.
///
/// Returns the longest prefix of `s` whose byte length is ≤ `max_bytes`
/// and that does not split a multi-byte character.
#[inline]
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    // `floor_char_boundary` is nightly-only, so walk backward ourselves.
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_within_limit() {
        assert_eq!(truncate_str("hello", 10), "hello");
    }

    #[test]
    fn ascii_exact_limit() {
        assert_eq!(truncate_str("hello", 5), "hello");
    }

    #[test]
    fn ascii_truncated() {
        assert_eq!(truncate_str("hello world", 5), "hello");
    }

    #[test]
    fn empty_string() {
        assert_eq!(truncate_str("", 5), "");
    }

    #[test]
    fn zero_max() {
        assert_eq!(truncate_str("hello", 0), "");
    }

    #[test]
    fn two_byte_char_boundary() {
        // 'é' (U+00E9) is 2 bytes: c(0) a(1) f(2) é(3,4)
        let s = "café";
        assert_eq!(truncate_str(s, 3), "caf");
        assert_eq!(truncate_str(s, 4), "caf"); // inside 'é'
        assert_eq!(truncate_str(s, 5), "café");
    }

    #[test]
    fn emoji_4_byte() {
        // '🦀' (U+1F980) is 4 bytes: h(0) i(1) 🦀(2..6) b(6)
        let s = "hi🦀b";
        assert_eq!(truncate_str(s, 2), "hi");
        assert_eq!(truncate_str(s, 3), "hi"); // inside the emoji
        assert_eq!(truncate_str(s, 5), "hi"); // still inside
        assert_eq!(truncate_str(s, 6), "hi🦀");
    }

    #[test]
    fn all_multibyte() {
        let s = "———"; // three em dashes, 9 bytes
        assert_eq!(truncate_str(s, 2), "");
        assert_eq!(truncate_str(s, 3), "—");
        assert_eq!(truncate_str(s, 8), "——");
        assert_eq!(truncate_str(s, 9), "———");
    }
}
