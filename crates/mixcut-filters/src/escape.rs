//! Escaping for values embedded in engine filter syntax.

/// Escape text for embedding inside a filter option value.
///
/// The substitution table is applied exactly once, backslash first so the
/// backslashes introduced by later substitutions are never re-escaped.
/// Covers every character the filter parser treats specially: backslash,
/// single-quote, colon, equals, hash, brackets, braces, percent.
pub fn escape_filter_text(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
        .replace('=', "\\=")
        .replace('#', "\\#")
        .replace('[', "\\[")
        .replace(']', "\\]")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('%', "\\%")
}

/// Escape a filesystem path for a quoted filter filename option.
///
/// Paths only need the quote-sensitive subset: backslash, colon, quote.
pub fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECIALS: &[char] = &['\\', '\'', ':', '=', '#', '[', ']', '{', '}', '%'];

    /// Every special character in the output must be preceded by a backslash.
    fn assert_fully_escaped(escaped: &str) {
        let chars: Vec<char> = escaped.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '\\' {
                // Escape pair; skip the escaped character.
                i += 2;
                continue;
            }
            assert!(
                !SPECIALS.contains(&chars[i]),
                "unescaped '{}' in {:?}",
                chars[i],
                escaped
            );
            i += 1;
        }
    }

    #[test]
    fn test_escape_sample() {
        let escaped = escape_filter_text("O'Brien: 50% [test]");
        assert_eq!(escaped, "O\\'Brien\\: 50\\% \\[test\\]");
        assert_fully_escaped(&escaped);
    }

    #[test]
    fn test_escape_all_specials() {
        let escaped = escape_filter_text("\\ ' : = # [ ] { } %");
        assert_fully_escaped(&escaped);
    }

    #[test]
    fn test_backslash_not_double_escaped() {
        // A lone backslash becomes exactly two characters.
        assert_eq!(escape_filter_text("\\"), "\\\\");
        // A backslash-quote pair escapes each independently.
        assert_eq!(escape_filter_text("\\'"), "\\\\\\'");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(escape_filter_text("hello world"), "hello world");
    }

    #[test]
    fn test_escape_path() {
        assert_eq!(
            escape_filter_path("/tmp/task:1/subs.ass"),
            "/tmp/task\\:1/subs.ass"
        );
    }
}
