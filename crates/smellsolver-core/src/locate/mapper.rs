//! Position mapper: pins an extracted comment to exact coordinates.
//!
//! The extractor only reports a line window and (possibly reformatted)
//! comment text. The mapper finds that text inside the window and reports
//! where the comment begins (its opening marker) and ends, always in terms of
//! the original file lines.

use tracing::debug;

use crate::language::LanguageProfile;
use crate::locate::context::associated_code;
use crate::locate::normalize::{line_len, normalize_comment_text, PositionMap};
use crate::models::{CommentKind, LocatedComment, Precision, RawComment};

/// 1-indexed column of the first `marker` on `line`, or 1 when absent.
pub fn marker_column(line: &str, marker: &str) -> usize {
    match line.find(marker) {
        Some(byte) => line[..byte].chars().count() + 1,
        None => 1,
    }
}

/// 1-indexed column of the last `marker` that starts before `column`.
///
/// Anchors an exactly matched comment to its own marker rather than to one
/// inside a string literal earlier on the line.
pub fn marker_column_before(line: &str, marker: &str, column: usize) -> usize {
    let head = match line.char_indices().nth(column.saturating_sub(1)) {
        Some((byte, _)) => &line[..byte],
        None => line,
    };
    match head.rfind(marker) {
        Some(byte) => head[..byte].chars().count() + 1,
        None => marker_column(line, marker),
    }
}

/// Column of the last char of the closing marker on `line`, or the line
/// length when the marker is absent.
pub fn closing_column(line: &str, profile: &LanguageProfile) -> usize {
    if profile.block_comments {
        if let Some(byte) = line.find(profile.block_close) {
            return line[..byte].chars().count() + profile.block_close.chars().count();
        }
    }
    line_len(line)
}

/// Locate one comment in `lines` (the file split without terminators).
///
/// Returns `None` only when the reported line window lies outside the file.
/// Otherwise always returns a location, falling back to whole-window bounds
/// with [`Precision::Coarse`] when the text cannot be matched.
pub fn locate(comment: &RawComment, lines: &[&str], radius: usize) -> Option<LocatedComment> {
    let (first, last) = (comment.start_line, comment.end_line);
    if first == 0 || last < first || last > lines.len() {
        debug!(
            start_line = first,
            end_line = last,
            total_lines = lines.len(),
            "comment window outside file"
        );
        return None;
    }

    let profile = comment.language.profile();
    let window = &lines[first - 1..last];
    let needle = normalize_comment_text(&comment.text);

    let (start_line, start_column, end_line, end_column, precision) = match comment.kind {
        CommentKind::Single | CommentKind::ContinuedSingle => {
            let map = PositionMap::from_lines(window, first);
            match map.find(&needle) {
                Some(((s_line, s_col), (e_line, e_col))) => (
                    s_line,
                    marker_column_before(lines[s_line - 1], profile.single_marker, s_col),
                    e_line,
                    e_col,
                    Precision::Exact,
                ),
                None => (
                    first,
                    marker_column(window[0], profile.single_marker),
                    last,
                    line_len(window[window.len() - 1]),
                    Precision::Coarse,
                ),
            }
        }
        CommentKind::Block => {
            let map = if profile.block_comments {
                PositionMap::from_block_lines(window, first)
            } else {
                PositionMap::from_lines(window, first)
            };
            let precision = if map.find(&needle).is_some() {
                Precision::Exact
            } else {
                Precision::Coarse
            };
            (
                first,
                marker_column(window[0], profile.opening_marker(true)),
                last,
                closing_column(window[window.len() - 1], profile),
                precision,
            )
        }
    };

    if precision == Precision::Coarse {
        debug!(
            kind = comment.kind.as_str(),
            start_line = first,
            end_line = last,
            "comment text not found verbatim; using window bounds"
        );
    }

    Some(LocatedComment {
        raw: comment.clone(),
        start_line,
        start_column,
        end_line,
        end_column,
        associated_code: associated_code(lines, start_line, end_line, radius),
        precision,
    })
}

/// Locate every comment of a file, dropping those outside the file and block
/// comments of languages that have no block comment syntax.
pub fn locate_comments<'a, I>(file_text: &str, comments: I, radius: usize) -> Vec<LocatedComment>
where
    I: IntoIterator<Item = &'a RawComment>,
{
    let lines: Vec<&str> = file_text.lines().collect();
    comments
        .into_iter()
        .filter(|c| c.kind != CommentKind::Block || c.language.profile().block_comments)
        .filter_map(|c| locate(c, &lines, radius))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn trailing_python_comment_starts_at_marker() {
        let text = "x = 1  # old comment\n";
        let raw = RawComment::single(1, "old comment", Language::Python);
        let located = locate(&raw, &lines(text), 15).unwrap();
        assert_eq!(
            (
                located.start_line,
                located.start_column,
                located.end_line,
                located.end_column
            ),
            (1, 8, 1, 20)
        );
        assert!(located.is_exact());
        assert_eq!(located.associated_code, "x = 1  # old comment");
    }

    #[test]
    fn java_single_line_with_indentation() {
        let text = "class A {\n    // Test isSet methods\n    int a;\n}";
        let raw = RawComment::single(2, "Test isSet methods", Language::Java);
        let located = locate(&raw, &lines(text), 1).unwrap();
        assert_eq!(located.start_column, 5);
        assert_eq!(located.end_column, 25);
        assert_eq!(located.associated_code, "class A {\n    // Test isSet methods\n    int a;");
    }

    #[test]
    fn marker_inside_string_literal_is_skipped() {
        let text = "String u = \"http://x\"; // fetch url\n";
        let raw = RawComment::single(1, "fetch url", Language::Java);
        let located = locate(&raw, &lines(text), 15).unwrap();
        assert!(located.is_exact());
        assert_eq!((located.start_column, located.end_column), (24, 35));

        let python = "url = \"a#b\"  # anchor\n";
        let raw = RawComment::single(1, "anchor", Language::Python);
        let located = locate(&raw, &lines(python), 15).unwrap();
        assert_eq!((located.start_column, located.end_column), (14, 21));
    }

    #[test]
    fn continued_single_spans_lines() {
        let text = "void f() {\n  // first part\n  // second part\n  g();\n}";
        let raw = RawComment::spanning(
            CommentKind::ContinuedSingle,
            2,
            3,
            "first part\n  // second part",
            Language::Java,
        );
        let located = locate(&raw, &lines(text), 15).unwrap();
        assert!(located.is_exact());
        assert_eq!((located.start_line, located.start_column), (2, 3));
        assert_eq!((located.end_line, located.end_column), (3, 16));
    }

    #[test]
    fn block_comment_reports_marker_bounds() {
        let text = "int a;\n  /*\n   * Substract two numbers.\n   */ int b;\n";
        let raw = RawComment::spanning(
            CommentKind::Block,
            2,
            4,
            "Substract two numbers.",
            Language::Java,
        );
        let located = locate(&raw, &lines(text), 0).unwrap();
        assert!(located.is_exact());
        assert_eq!((located.start_line, located.start_column), (2, 3));
        // `*/` occupies columns 4-5 of "   */ int b;".
        assert_eq!((located.end_line, located.end_column), (4, 5));
    }

    #[test]
    fn block_comment_matches_across_stripped_lines() {
        let text = "/*\n * Licensed to the ASF under one\n * or more agreements.\n */";
        let raw = RawComment::spanning(
            CommentKind::Block,
            1,
            4,
            "Licensed to the ASF under one\nor more agreements.",
            Language::Java,
        );
        let located = locate(&raw, &lines(text), 15).unwrap();
        assert!(located.is_exact());
        assert_eq!((located.start_column, located.end_column), (1, 3));
    }

    #[test]
    fn unmatched_block_text_degrades_to_block_bounds() {
        let text = "int a;\n  /* Returns\n   * the sum */\nint b;\n";
        let raw = RawComment::spanning(
            CommentKind::Block,
            2,
            3,
            "Returns the total",
            Language::Java,
        );
        let located = locate(&raw, &lines(text), 15).unwrap();
        assert_eq!(located.precision, Precision::Coarse);
        assert_eq!((located.start_line, located.start_column), (2, 3));
        assert_eq!((located.end_line, located.end_column), (3, 15));

        let kept = crate::diff::filter_by_diff(vec![located], "@@ -0,0 +1,4 @@", 4, 15);
        assert!(kept.is_empty());
    }

    #[test]
    fn block_without_closing_marker_ends_at_line_length() {
        let text = "/* dangling\n   text";
        let raw = RawComment::spanning(CommentKind::Block, 1, 2, "dangling", Language::Go);
        let located = locate(&raw, &lines(text), 0).unwrap();
        assert_eq!(located.end_column, 7);
    }

    #[test]
    fn unmatched_text_falls_back_to_window() {
        let text = "a = 1\n    # tabs\tdiffer here\nb = 2";
        let raw = RawComment::single(2, "tabs    differ here", Language::Python);
        let located = locate(&raw, &lines(text), 15).unwrap();
        assert_eq!(located.precision, Precision::Coarse);
        assert_eq!((located.start_line, located.start_column), (2, 5));
        assert_eq!((located.end_line, located.end_column), (2, 22));
    }

    #[test]
    fn missing_marker_defaults_to_column_one() {
        let text = "no marker here";
        let raw = RawComment::single(1, "something else", Language::Java);
        let located = locate(&raw, &lines(text), 15).unwrap();
        assert_eq!(located.start_column, 1);
        assert_eq!(located.precision, Precision::Coarse);
    }

    #[test]
    fn window_outside_file_is_dropped() {
        let text = "one\ntwo";
        assert!(locate(&RawComment::single(3, "x", Language::Java), &lines(text), 1).is_none());
        assert!(locate(&RawComment::single(0, "x", Language::Java), &lines(text), 1).is_none());
        let inverted = RawComment::spanning(CommentKind::Block, 2, 1, "x", Language::Java);
        assert!(locate(&inverted, &lines(text), 1).is_none());
    }

    #[test]
    fn locating_is_idempotent() {
        let text = "int a; // set a\nint b; // set b\n";
        let raw = RawComment::single(2, "set b", Language::Java);
        let first = locate(&raw, &lines(text), 15);
        let second = locate(&raw, &lines(text), 15);
        assert_eq!(first, second);
    }

    #[test]
    fn round_trip_for_embedded_comments() {
        let comments = ["alpha", "beta gamma", "δ unicode ok"];
        for (i, body) in comments.iter().enumerate() {
            let padding = " ".repeat(i * 3);
            let text = format!("fn x() {{}}\n{padding}let v = {i}; // {body}\n");
            let raw = RawComment::single(2, *body, Language::Go);
            let located = locate(&raw, &lines(&text), 15).unwrap();
            let code_len = padding.chars().count() + format!("let v = {i}; ").len();
            assert_eq!(located.start_line, 2);
            assert_eq!(located.start_column, code_len + 1);
            assert_eq!(located.end_column, code_len + 3 + body.chars().count());
        }
    }

    #[test]
    fn python_block_comments_are_skipped_in_batch() {
        let text = "'''doc'''\nx = 1  # note\n";
        let comments = vec![
            RawComment::spanning(CommentKind::Block, 1, 1, "doc", Language::Python),
            RawComment::single(2, "note", Language::Python),
            RawComment::single(9, "ghost", Language::Python),
        ];
        let located = locate_comments(text, &comments, 15);
        assert_eq!(located.len(), 1);
        assert_eq!(located[0].raw.text, "note");
    }
}
