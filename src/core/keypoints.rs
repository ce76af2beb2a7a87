//! Parsing of the bullet blocks returned by the combine step.
//!
//! The model is asked for pairs of lines shaped like
//!
//! ```text
//! - Title: <text>
//! - Summary: <text>
//! ```
//!
//! Markers are matched as substrings anywhere on the line, so a leading bullet
//! or stray prose is tolerated. Incomplete pairs are dropped without error.

use serde::Serialize;

const TITLE_MARKER: &str = "Title:";
const SUMMARY_MARKER: &str = "Summary:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyPoint {
    pub title: String,
    pub summary: String,
}

impl KeyPoint {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into().replace('\n', " "),
        }
    }
}

#[derive(Debug, Default)]
enum ParseState {
    #[default]
    NoPendingTitle,
    HavePendingTitle(String),
}

/// Extracts ordered `(title, summary)` pairs from a bullet block.
///
/// A title is only emitted once a summary line follows it. A second title
/// before that summary replaces the first one, and a summary with no pending
/// title is consumed without output.
pub fn parse_key_points(text: &str) -> Vec<KeyPoint> {
    let mut key_points = Vec::new();
    let mut state = ParseState::default();

    // `\r\n` yields an extra empty piece, which carries no marker.
    for line in text.split(is_line_break) {
        let line = line.trim();

        // Title is checked first, even if "Summary:" also appears on the line.
        if let Some(title) = text_after_last(line, TITLE_MARKER) {
            state = if title.is_empty() {
                ParseState::NoPendingTitle
            } else {
                ParseState::HavePendingTitle(title.to_string())
            };
        } else if let Some(summary) = text_after_last(line, SUMMARY_MARKER) {
            if let ParseState::HavePendingTitle(title) = std::mem::take(&mut state) {
                key_points.push(KeyPoint::new(title, summary));
            }
        }
    }

    tracing::debug!(count = key_points.len(), "Parsed key points");
    key_points
}

/// Universal newlines: `\n`, a bare `\r`, the ASCII vertical tab, form feed and
/// group separators, NEL and the Unicode line and paragraph separators.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c'..='\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn text_after_last<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.rfind(marker)
        .map(|idx| line[idx + marker.len()..].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(points: &[KeyPoint]) -> Vec<(&str, &str)> {
        points
            .iter()
            .map(|kp| (kp.title.as_str(), kp.summary.as_str()))
            .collect()
    }

    #[test]
    fn parses_alternating_pairs_in_order() {
        let text = "- Title: A\n- Summary: a1\n- Title: B\n- Summary: b1";
        assert_eq!(pairs(&parse_key_points(text)), vec![("A", "a1"), ("B", "b1")]);
    }

    #[test]
    fn splits_on_carriage_returns_and_unicode_separators() {
        let text = "- Title: A\r- Summary: a1\r- Title: B\r- Summary: b1";
        assert_eq!(pairs(&parse_key_points(text)), vec![("A", "a1"), ("B", "b1")]);

        let text = "- Title: A\u{2028}- Summary: a1\x0c- Title: B\u{85}- Summary: b1";
        assert_eq!(pairs(&parse_key_points(text)), vec![("A", "a1"), ("B", "b1")]);

        let text = "- Title: A\r\n- Summary: a1\r\n";
        assert_eq!(pairs(&parse_key_points(text)), vec![("A", "a1")]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_key_points("").is_empty());
        assert!(parse_key_points("\n\n   \n").is_empty());
    }

    #[test]
    fn overwritten_title_is_dropped() {
        let text = "- Title: A\n- Title: B\n- Summary: b1";
        assert_eq!(pairs(&parse_key_points(text)), vec![("B", "b1")]);
    }

    #[test]
    fn orphan_summary_is_discarded() {
        let text = "- Summary: orphan\n- Title: C\n- Summary: c1";
        assert_eq!(pairs(&parse_key_points(text)), vec![("C", "c1")]);
    }

    #[test]
    fn trailing_title_without_summary_is_dropped() {
        let text = "- Title: A\n- Summary: a1\n- Title: dangling";
        assert_eq!(pairs(&parse_key_points(text)), vec![("A", "a1")]);
    }

    #[test]
    fn summary_does_not_pair_twice() {
        let text = "Title: A\nSummary: a1\nSummary: a2";
        assert_eq!(pairs(&parse_key_points(text)), vec![("A", "a1")]);
    }

    #[test]
    fn markers_match_anywhere_and_take_last_occurrence() {
        let text = "Here you go:\n  * Key Title: Title: The Heist  \nPlot Summary: it goes wrong";
        assert_eq!(
            pairs(&parse_key_points(text)),
            vec![("The Heist", "it goes wrong")]
        );
    }

    #[test]
    fn title_marker_wins_over_summary_on_same_line() {
        let text = "- Title: Reunion - Summary: inline\n- Summary: real";
        assert_eq!(
            pairs(&parse_key_points(text)),
            vec![("Reunion - Summary: inline", "real")]
        );
    }

    #[test]
    fn empty_title_leaves_nothing_pending() {
        let text = "- Title:\n- Summary: lost";
        assert!(parse_key_points(text).is_empty());
    }

    #[test]
    fn ignores_prose_between_pairs() {
        let text = "Sure! Here is the summary.\n\n- Title: One\nsome filler\n- Summary: first\n\nThanks!";
        assert_eq!(pairs(&parse_key_points(text)), vec![("One", "first")]);
    }

    #[test]
    fn count_matches_number_of_well_formed_pairs() {
        let text: String = (1..=25)
            .map(|i| format!("- Title: T{i}\n- Summary: S{i}\n"))
            .collect();
        let points = parse_key_points(&text);
        assert_eq!(points.len(), 25);
        assert_eq!(points[0], KeyPoint::new("T1", "S1"));
        assert_eq!(points[24], KeyPoint::new("T25", "S25"));
    }

    #[test]
    fn key_point_collapses_newlines_in_summary() {
        let kp = KeyPoint::new("t", "line one\nline two");
        assert_eq!(kp.summary, "line one line two");
    }
}
