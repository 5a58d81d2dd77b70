//! Tree-sitter backed comment extractor.
//!
//! Each supported language is parsed with its native grammar and every
//! comment node is collected. Runs of line comments that sit alone on
//! consecutive lines are merged into one continued comment.

use tree_sitter::{Node, Parser};

use crate::errors::{SmellError, SmellResult};
use crate::extract::{group_by_kind, CommentExtractor, GroupedComments};
use crate::language::Language;
use crate::locate::normalize::strip_block_text;
use crate::models::{CommentKind, RawComment};

fn grammar(language: Language) -> tree_sitter::Language {
    match language {
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
    }
}

fn is_comment_kind(kind: &str) -> bool {
    kind == "comment" || kind.ends_with("_comment")
}

fn comment_nodes(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if is_comment_kind(node.kind()) {
            out.push(node);
            continue;
        }
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    out.sort_by_key(|n| n.start_byte());
    out
}

/// A line comment alone on its line, possibly extended by the ones below it.
struct LineRun {
    start_row: usize,
    end_row: usize,
    body_start: usize,
    end_byte: usize,
}

/// Parses with tree-sitter. A fresh parser is built per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterExtractor;

impl TreeSitterExtractor {
    pub fn new() -> Self {
        Self
    }

    fn flush(run: LineRun, source: &str, language: Language, out: &mut Vec<RawComment>) {
        let text = source[run.body_start..run.end_byte].trim();
        if text.is_empty() {
            return;
        }
        let kind = if run.end_row > run.start_row {
            CommentKind::ContinuedSingle
        } else {
            CommentKind::Single
        };
        out.push(RawComment::spanning(
            kind,
            run.start_row + 1,
            run.end_row + 1,
            text,
            language,
        ));
    }
}

impl CommentExtractor for TreeSitterExtractor {
    fn extract(&self, source: &str, language: Language) -> SmellResult<GroupedComments> {
        let mut parser = Parser::new();
        parser
            .set_language(&grammar(language))
            .map_err(|e| SmellError::Parse(format!("Failed to set language: {e}")))?;
        let tree = parser
            .parse(source.as_bytes(), None)
            .ok_or_else(|| SmellError::Parse(format!("Failed to parse {} source", language.as_str())))?;

        let profile = language.profile();
        let mut comments = Vec::new();
        let mut run: Option<LineRun> = None;

        for node in comment_nodes(tree.root_node()) {
            let text = node
                .utf8_text(source.as_bytes())
                .map_err(|e| SmellError::Parse(e.to_string()))?;
            let start = node.start_position();
            let mut end = node.end_position();
            if end.column == 0 && end.row > start.row {
                end.row -= 1;
            }
            let line_start = node.start_byte() - start.column;
            let own_line = source[line_start..node.start_byte()].trim().is_empty();

            if profile.block_comments && text.starts_with(profile.block_open) {
                if let Some(done) = run.take() {
                    Self::flush(done, source, language, &mut comments);
                }
                let body = strip_block_text(text);
                let body = body.trim();
                if !body.is_empty() {
                    comments.push(RawComment::spanning(
                        CommentKind::Block,
                        start.row + 1,
                        end.row + 1,
                        body,
                        language,
                    ));
                }
                continue;
            }

            let body_start = node.start_byte()
                + if text.starts_with(profile.single_marker) {
                    profile.single_marker.len()
                } else {
                    0
                };

            match run.as_mut() {
                Some(current) if own_line && current.end_row + 1 == start.row => {
                    current.end_row = end.row;
                    current.end_byte = node.end_byte();
                }
                _ => {
                    if let Some(done) = run.take() {
                        Self::flush(done, source, language, &mut comments);
                    }
                    let fresh = LineRun {
                        start_row: start.row,
                        end_row: end.row,
                        body_start,
                        end_byte: node.end_byte(),
                    };
                    if own_line {
                        run = Some(fresh);
                    } else {
                        Self::flush(fresh, source, language, &mut comments);
                    }
                }
            }
        }
        if let Some(done) = run.take() {
            Self::flush(done, source, language, &mut comments);
        }

        Ok(group_by_kind(comments))
    }
}
