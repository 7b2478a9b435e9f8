//! 파일 이름 정리 모듈.

use once_cell::sync::Lazy;
use regex::Regex;

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Longest file stem (in characters) produced by [`filter_name`].
pub const MAX_NAME_CHARS: usize = 64;

/// Turns arbitrary text into a file-system safe file stem.
///
/// Whitespace runs collapse to one `_`, anything `sanitize_filename` rejects
/// (path separators, reserved characters, control characters, Windows
/// reserved names) is dropped, and the result is capped at
/// [`MAX_NAME_CHARS`]. Falls back to `default` when nothing usable remains.
pub fn filter_name(name: &str, default: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let sanitized = sanitize_filename::sanitize(spaced);

    let collapsed = WS_RE.replace_all(sanitized.trim(), "_");
    let trimmed: String = collapsed
        .trim_matches(|c: char| c == '.' || c == '_' || c == '-')
        .chars()
        .take(MAX_NAME_CHARS)
        .collect();

    let trimmed = trimmed.trim_end_matches(['.', '_', ' ']);
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_name_removes_forbidden_chars() {
        assert_eq!(filter_name("a:b?c*d", "x"), "abcd");
    }

    #[test]
    fn test_filter_name_collapses_whitespace() {
        assert_eq!(filter_name("hello   world\tagain", "x"), "hello_world_again");
    }

    #[test]
    fn test_filter_name_keeps_chinese() {
        assert_eq!(filter_name("快手 作品", "x"), "快手_作品");
    }

    #[test]
    fn test_filter_name_fallback_when_empty() {
        assert_eq!(filter_name("   ", "3xabc"), "3xabc");
        assert_eq!(filter_name("???", "3xabc"), "3xabc");
    }

    #[test]
    fn test_filter_name_strips_leading_dots() {
        assert_eq!(filter_name("..hidden", "x"), "hidden");
    }

    #[test]
    fn test_filter_name_length_cap() {
        let long = "长".repeat(200);
        assert_eq!(filter_name(&long, "x").chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn test_filter_name_windows_reserved_names() {
        assert_eq!(filter_name("CON", "3xabc"), "3xabc");
        assert_eq!(filter_name("nul.txt", "3xabc"), "3xabc");
        assert_eq!(filter_name("com1", "3xabc"), "3xabc");
    }

    #[test]
    fn test_filter_name_trailing_dots_and_spaces() {
        assert_eq!(filter_name("作品. . ", "x"), "作品");
    }

    #[test]
    fn test_filter_name_drops_control_chars() {
        assert_eq!(filter_name("a\u{0}b\u{7}c", "x"), "abc");
    }

    #[test]
    fn test_filter_name_path_traversal() {
        assert_eq!(filter_name("../../etc/passwd", "x"), "etcpasswd");
    }
}
