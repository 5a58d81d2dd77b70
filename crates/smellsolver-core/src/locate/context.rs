//! Context windows around a located comment.

/// Widen `[start_line, end_line]` by `radius` lines, clipped to
/// `[1, total_lines]`.
pub fn expanded_span(
    start_line: usize,
    end_line: usize,
    total_lines: usize,
    radius: usize,
) -> (usize, usize) {
    let start = start_line.saturating_sub(radius).max(1);
    let end = end_line.saturating_add(radius).min(total_lines);
    (start, end)
}

/// Lines `[start_line - radius, end_line + radius]` of `lines`, clipped to
/// the file, joined with `\n`.
pub fn associated_code(lines: &[&str], start_line: usize, end_line: usize, radius: usize) -> String {
    let (start, end) = expanded_span(start_line, end_line, lines.len(), radius);
    if lines.is_empty() || start > end {
        return String::new();
    }
    lines[start - 1..end].join("\n")
}
