//! Newline-free views of file lines that remember where every char came from.

use std::sync::LazyLock;

use regex::Regex;

static BLOCK_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*/\*").unwrap());
static BLOCK_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*/.*$").unwrap());
static BLOCK_STAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\*\s?").unwrap());

/// Remove newline characters only. Whitespace is kept so columns stay aligned.
pub fn normalize_comment_text(text: &str) -> String {
    text.replace(['\n', '\r'], "")
}

/// 1-indexed column of the first char at byte offset `byte` in `line`.
pub fn column_at(line: &str, byte: usize) -> usize {
    line[..byte].chars().count() + 1
}

/// Length of `line` in chars.
pub fn line_len(line: &str) -> usize {
    line.chars().count()
}

/// Concatenated text plus a parallel `(line, column)` for each char.
#[derive(Debug, Default)]
pub struct PositionMap {
    text: String,
    positions: Vec<(usize, usize)>,
}

impl PositionMap {
    /// Map whole lines; `first_line` is the file line number of `lines[0]`.
    pub fn from_lines(lines: &[&str], first_line: usize) -> Self {
        let mut map = Self::default();
        for (offset, line) in lines.iter().enumerate() {
            map.push_segment(first_line + offset, line, 1);
        }
        map
    }

    /// Map block-comment lines after removing comment syntax. Columns still
    /// point into the unstripped lines.
    pub fn from_block_lines(lines: &[&str], first_line: usize) -> Self {
        let mut map = Self::default();
        for (offset, (line, range)) in lines.iter().zip(strip_block_syntax(lines)).enumerate() {
            let first_column = column_at(line, range.start);
            map.push_segment(first_line + offset, &line[range], first_column);
        }
        map
    }

    fn push_segment(&mut self, line_no: usize, segment: &str, first_column: usize) {
        for (i, ch) in segment.chars().enumerate() {
            self.text.push(ch);
            self.positions.push((line_no, first_column + i));
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Locate `needle` and return the original coordinates of its first and
    /// last char. An empty needle never matches.
    pub fn find(&self, needle: &str) -> Option<((usize, usize), (usize, usize))> {
        if needle.is_empty() {
            return None;
        }
        let byte = self.text.find(needle)?;
        let start = self.text[..byte].chars().count();
        let end = start + needle.chars().count() - 1;
        Some((*self.positions.get(start)?, *self.positions.get(end)?))
    }
}

/// Byte range of each line that survives block-comment syntax removal:
/// a leading `/*` on the first line, `*/` and everything after it on the
/// last line, and a leading `*` (plus one space) on every line.
pub fn strip_block_syntax(lines: &[&str]) -> Vec<std::ops::Range<usize>> {
    let last = lines.len().saturating_sub(1);
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let (mut start, mut end) = (0, line.len());
            if idx == 0 {
                if let Some(m) = BLOCK_OPEN_RE.find(&line[start..end]) {
                    start += m.end();
                }
            }
            if idx == last {
                if let Some(m) = BLOCK_CLOSE_RE.find(&line[start..end]) {
                    end = start + m.start();
                }
            }
            if let Some(m) = BLOCK_STAR_RE.find(&line[start..end]) {
                start += m.end();
            }
            start..end
        })
        .collect()
}

/// Block comment body with syntax removed, one stripped line per source line.
pub fn strip_block_text(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines
        .iter()
        .zip(strip_block_syntax(&lines))
        .map(|(line, range)| &line[range])
        .collect::<Vec<_>>()
        .join("\n")
}
