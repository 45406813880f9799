//! Choice parsing.
//!
//! Selections arrive as free text echoing a display string the engine sent
//! earlier; these functions recover the domain identifiers from that text.
//! All of them are pure; a malformed selection is `None`, never an error.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static TORRENT_CHOICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):").expect("valid regex"));

static FILE_CHOICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.(\d+):").expect("valid regex"));

/// Recover a torrent id from a selection.
///
/// The text must exactly match one of the currently displayed strings and
/// carry a leading `<id>:` prefix; anything else is `None`.
pub fn torrent_id(choice: &str, displayed: &[String]) -> Option<i64> {
    if !displayed.iter().any(|d| d == choice) {
        return None;
    }

    let captures = TORRENT_CHOICE.captures(choice)?;
    captures[1].parse().ok()
}

/// Recover a (torrent id, file id) pair from a `<int>.<int>:` selection.
///
/// Arithmetic overflow on absurd digit runs counts as `None`, not an error.
pub fn torrent_file_id(choice: &str) -> Option<(i64, usize)> {
    let captures = FILE_CHOICE.captures(choice)?;

    let torrent_id = captures[1].parse().ok()?;
    let file_id = captures[2].parse().ok()?;

    Some((torrent_id, file_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn displayed() -> Vec<String> {
        vec!["12: Ubuntu.iso".to_string(), "7: Movie.mkv".to_string()]
    }

    #[test]
    fn test_torrent_id_exact_display_string() {
        assert_eq!(torrent_id("12: Ubuntu.iso", &displayed()), Some(12));
        assert_eq!(torrent_id("7: Movie.mkv", &displayed()), Some(7));
    }

    #[test]
    fn test_torrent_id_rejects_partial_text() {
        // "12" is a valid-looking id but not a displayed string.
        assert_eq!(torrent_id("12", &displayed()), None);
        assert_eq!(torrent_id("12: Ubuntu", &displayed()), None);
        assert_eq!(torrent_id("Ubuntu.iso", &displayed()), None);
    }

    #[test]
    fn test_torrent_id_requires_numeric_prefix() {
        let shown = vec!["weird entry".to_string()];
        assert_eq!(torrent_id("weird entry", &shown), None);
    }

    #[test]
    fn test_file_id_parses_pair() {
        assert_eq!(torrent_file_id("3.7: video.mkv"), Some((3, 7)));
        assert_eq!(torrent_file_id("12.0: a/b.srt"), Some((12, 0)));
    }

    #[test]
    fn test_file_id_rejects_missing_segment() {
        assert_eq!(torrent_file_id("3:video.mkv"), None);
        assert_eq!(torrent_file_id("3.video.mkv"), None);
        assert_eq!(torrent_file_id("video.mkv"), None);
        assert_eq!(torrent_file_id(""), None);
    }

    #[test]
    fn test_file_id_overflow_is_none() {
        let huge = format!("{}.{}: x", "9".repeat(40), "9".repeat(40));
        assert_eq!(torrent_file_id(&huge), None);
    }
}
