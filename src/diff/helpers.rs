//! Matching helpers for the patch engine.

use super::engine::NearestRegion;

/// A `[start, end)` byte range in the file content.
pub(super) type Span = (usize, usize);

/// Byte spans of the lines of `text` starting at `from`, without newlines.
///
/// The first span starts at `from` even when that is mid-line.
fn line_spans(text: &str, from: usize) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start = from;
    for (offset, _) in text[from..].match_indices('\n') {
        let end = from + offset;
        spans.push((start, end));
        start = end + 1;
    }
    spans.push((start, text.len()));
    spans
}

/// Every exact occurrence of `needle` at or after `from`, overlapping ones
/// included.
pub(super) fn exact_matches(text: &str, from: usize, needle: &str) -> Vec<Span> {
    let mut found = Vec::new();
    let mut start = from;
    while let Some(offset) = text[start..].find(needle) {
        let at = start + offset;
        found.push((at, at + needle.len()));
        match text[at..].chars().next() {
            Some(c) => start = at + c.len_utf8(),
            None => break,
        }
    }
    found
}

/// Occurrences of `needle` as whole lines, comparing with trailing whitespace
/// removed. Spans cover the matched lines without the final newline.
pub(super) fn tolerant_matches(text: &str, from: usize, needle: &str) -> Vec<Span> {
    let wanted: Vec<&str> = needle.split('\n').map(str::trim_end).collect();
    let lines = line_spans(text, from);
    let mut found = Vec::new();

    let mut i = 0;
    while i + wanted.len() <= lines.len() {
        let window = &lines[i..i + wanted.len()];
        let matches = window
            .iter()
            .zip(&wanted)
            .all(|(&(s, e), want)| text[s..e].trim_end() == *want);
        if matches {
            found.push((window[0].0, window[window.len() - 1].1));
        }
        i += 1;
    }
    found
}

/// Locate the region of `text` that most resembles the start of `head`.
///
/// Candidates are lines whose trimmed text shares a prefix of at least half
/// of the head's first non-blank line (and at least 4 characters); an exact
/// trimmed match wins outright.
pub(super) fn nearest_region(text: &str, head: &str) -> Option<NearestRegion> {
    let first = head.lines().map(str::trim).find(|l| !l.is_empty())?;
    let head_lines = head.split('\n').count();
    let all: Vec<&str> = text.split('\n').collect();

    let threshold = (first.chars().count() / 2).max(4);
    let mut best: Option<(usize, usize)> = None;
    for (index, line) in all.iter().enumerate() {
        let score = common_prefix_chars(line.trim(), first);
        if line.trim() == first {
            best = Some((index, usize::MAX));
            break;
        }
        if score >= threshold && best.is_none_or(|(_, s)| score > s) {
            best = Some((index, score));
        }
    }

    let (index, _) = best?;
    let end = (index + head_lines).min(all.len());
    Some(NearestRegion {
        line: index + 1,
        text: all[index..end].join("\n"),
    })
}

fn common_prefix_chars(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Whether every line break in `text` is `\r\n` (and there is at least one).
pub(super) fn uses_crlf(text: &str) -> bool {
    let breaks = text.matches('\n').count();
    breaks > 0 && text.matches("\r\n").count() == breaks
}

/// 1-based line number of byte offset `pos`.
pub(super) fn line_number_at(text: &str, pos: usize) -> usize {
    text[..pos].matches('\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matches_start_from_cursor() {
        let text = "a\nb\na\nb\n";
        assert_eq!(exact_matches(text, 0, "a\nb"), vec![(0, 3), (4, 7)]);
        assert_eq!(exact_matches(text, 1, "a\nb"), vec![(4, 7)]);
    }

    #[test]
    fn overlapping_occurrences_are_all_counted() {
        assert_eq!(exact_matches("}\n}\n}\n", 0, "}\n}"), vec![(0, 3), (2, 5)]);
        assert_eq!(tolerant_matches("}\n}\n}\n", 0, "}\n}").len(), 2);
        assert!(exact_matches("", 0, "x").is_empty());
    }

    #[test]
    fn crlf_detection_needs_every_break() {
        assert!(uses_crlf("a\r\nb\r\n"));
        assert!(!uses_crlf("a\r\nb\n"));
        assert!(!uses_crlf("no breaks"));
    }

    #[test]
    fn tolerant_matches_ignore_trailing_whitespace() {
        let text = "fn a() {  \n    x\t\n}\n";
        let spans = tolerant_matches(text, 0, "fn a() {\n    x\n}");
        assert_eq!(spans.len(), 1);
        let (s, e) = spans[0];
        assert_eq!(&text[s..e], "fn a() {  \n    x\t\n}");

        assert!(tolerant_matches(text, 0, "fn a() {\n  x\n}").is_empty());
    }

    #[test]
    fn nearest_region_prefers_exact_first_line() {
        let text = "use std::io;\n\nfn main() {\n    run();\n}\n";
        let region = nearest_region(text, "fn main() {\n    run( );\n}").unwrap();
        assert_eq!(region.line, 3);
        assert_eq!(region.text, "fn main() {\n    run();\n}");
    }

    #[test]
    fn nearest_region_none_when_nothing_resembles() {
        assert!(nearest_region("alpha\nbeta\n", "zzzzzz").is_none());
        assert!(nearest_region("alpha\n", "   \n").is_none());
    }

    #[test]
    fn line_numbers_are_one_based() {
        assert_eq!(line_number_at("a\nb\nc", 0), 1);
        assert_eq!(line_number_at("a\nb\nc", 4), 3);
    }
}
