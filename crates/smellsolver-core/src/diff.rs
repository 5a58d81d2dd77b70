//! Diff filter: keeps only comments whose neighbourhood was touched by a patch.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::locate::context::expanded_span;
use crate::models::{DiffHunk, LocatedComment};

static HUNK_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@@ -\d+(?:,\d+)? \+(\d+)(?:,(\d+))? @@").unwrap());

/// Parse new-file line ranges from the hunk headers of a unified diff.
///
/// Only lines starting with `@@` are considered. A missing length means a
/// single line; zero-length hunks (pure deletions) cover no new lines and are
/// skipped. Malformed headers are ignored.
pub fn changed_ranges(patch: &str) -> Vec<DiffHunk> {
    patch
        .lines()
        .filter(|line| line.starts_with("@@"))
        .filter_map(|line| HUNK_HEADER_RE.captures(line))
        .filter_map(|caps| {
            let new_start: usize = caps.get(1)?.as_str().parse().ok()?;
            let new_len: usize = match caps.get(2) {
                Some(m) => m.as_str().parse().ok()?,
                None => 1,
            };
            if new_len == 0 {
                return None;
            }
            Some(DiffHunk {
                new_start,
                new_end: new_start + new_len - 1,
            })
        })
        .collect()
}

/// Closed-interval overlap test.
pub fn intersects(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> bool {
    a_start.max(b_start) <= a_end.min(b_end)
}

/// Whether the comment's span widened by `radius` overlaps any hunk.
///
/// Comments located only coarsely have no trustworthy coordinates and are
/// never considered part of the diff.
pub fn is_in_diff(
    comment: &LocatedComment,
    hunks: &[DiffHunk],
    total_lines: usize,
    radius: usize,
) -> bool {
    if !comment.is_exact() {
        return false;
    }
    let (start, end) = expanded_span(comment.start_line, comment.end_line, total_lines, radius);
    hunks
        .iter()
        .any(|hunk| intersects(start, end, hunk.new_start, hunk.new_end))
}

/// Keep the comments of one file that fall inside its patch.
pub fn filter_by_diff(
    comments: Vec<LocatedComment>,
    patch: &str,
    total_lines: usize,
    radius: usize,
) -> Vec<LocatedComment> {
    let hunks = changed_ranges(patch);
    let before = comments.len();
    let kept: Vec<LocatedComment> = comments
        .into_iter()
        .filter(|c| is_in_diff(c, &hunks, total_lines, radius))
        .collect();
    debug!(
        hunks = hunks.len(),
        kept = kept.len(),
        dropped = before - kept.len(),
        "diff filter applied"
    );
    kept
}
