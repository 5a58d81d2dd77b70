//! Block rewriter: renders a suggestion as a comment in place of the original.

use crate::language::LanguageProfile;
use crate::models::{LocatedComment, SmellLabel};

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

fn char_prefix(line: &str, chars: usize) -> &str {
    match line.char_indices().nth(chars) {
        Some((byte, _)) => &line[..byte],
        None => line,
    }
}

fn char_suffix(line: &str, skip: usize) -> &str {
    match line.char_indices().nth(skip) {
        Some((byte, _)) => &line[byte..],
        None => "",
    }
}

/// Comment lines for `wrapped` text, without any surrounding code.
///
/// `code_follows` selects an inline block comment for one-line text so the
/// code after the comment is not swallowed by a line comment.
fn render_comment(
    wrapped: &[String],
    profile: &LanguageProfile,
    indent: &str,
    code_follows: bool,
) -> Vec<String> {
    if wrapped.len() == 1 {
        if code_follows && profile.block_comments {
            return vec![format!(
                "{} {} {}",
                profile.block_open, wrapped[0], profile.block_close
            )];
        }
        return vec![format!("{} {}", profile.single_marker, wrapped[0])];
    }
    let mut out = Vec::with_capacity(wrapped.len() + 2);
    if profile.block_comments {
        out.push(format!("{} {}", profile.block_open, wrapped[0]));
        for line in &wrapped[1..] {
            out.push(format!("{indent}{} {line}", profile.continuation_prefix));
        }
        out.push(format!("{indent} {}", profile.block_close));
    } else {
        out.push(profile.block_open.to_string());
        for line in wrapped {
            out.push(format!("{indent}{line}"));
        }
        out.push(format!("{indent}{}", profile.block_close));
    }
    out
}

/// Replacement text for lines `[start_line, end_line]` of `file_text`.
///
/// Code before the comment on its first line and after it on its last line
/// is kept verbatim. An empty suggestion deletes the comment and keeps only
/// that code. The result never ends with a line terminator.
pub fn rewrite_block(
    file_text: &str,
    comment: &LocatedComment,
    suggestion: &str,
    max_width: usize,
) -> String {
    let lines: Vec<&str> = file_text.lines().collect();
    let first = lines
        .get(comment.start_line.wrapping_sub(1))
        .copied()
        .unwrap_or("");
    let last = lines
        .get(comment.end_line.wrapping_sub(1))
        .copied()
        .unwrap_or("");
    let prefix = char_prefix(first, comment.start_column.saturating_sub(1));
    let suffix = char_suffix(last, comment.end_column);

    let profile = comment.raw.language.profile();
    let wrap_width = max_width
        .saturating_sub(profile.single_marker.chars().count() + 1)
        .max(1);
    let wrapped = wrap_words(suggestion, wrap_width);
    if wrapped.is_empty() {
        return format!("{prefix}{suffix}").trim_end().to_string();
    }

    let code_follows = !suffix.trim().is_empty();
    let indent = leading_whitespace(first);
    let mut rendered = render_comment(&wrapped, profile, indent, code_follows);
    if rendered.len() > 1 && !profile.block_comments && !prefix.trim().is_empty() {
        // A string container cannot share a line with code.
        rendered[0].insert_str(0, indent);
        rendered.insert(0, prefix.trim_end().to_string());
    } else if let Some(head) = rendered.first_mut() {
        head.insert_str(0, prefix);
    }
    if let Some(tail) = rendered.last_mut() {
        tail.push_str(suffix);
    }
    rendered.join("\n").trim_end_matches(['\n', '\r']).to_string()
}

/// Splice a rewritten block over lines `[start_line, end_line]` of
/// `file_text`. An empty block removes those lines entirely.
pub fn apply_rewrite(file_text: &str, comment: &LocatedComment, block: &str) -> String {
    let newline = if file_text.contains("\r\n") { "\r\n" } else { "\n" };
    let lines: Vec<&str> = file_text.lines().collect();
    let start = comment.start_line.clamp(1, lines.len().max(1)) - 1;
    let end = comment.end_line.clamp(start + 1, lines.len().max(start + 1));

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    out.extend_from_slice(&lines[..start.min(lines.len())]);
    if !block.is_empty() {
        out.extend(block.lines());
    }
    out.extend_from_slice(&lines[end.min(lines.len())..]);

    let mut joined = out.join(newline);
    if file_text.ends_with('\n') && !joined.is_empty() {
        joined.push_str(newline);
    }
    joined
}

/// Review comment body posted to the hosting platform.
pub fn suggestion_body(label: SmellLabel, block: &str) -> String {
    format!(
        "**{} smell** : {}\n```suggestion\n{}\n```",
        label.as_str(),
        label.explanation(),
        block
    )
}
