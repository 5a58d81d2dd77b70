//! Comment extraction: the collaborator that feeds raw comments to the mapper.

pub mod syntax;

use indexmap::IndexMap;

use crate::errors::SmellResult;
use crate::language::Language;
use crate::models::{CommentKind, RawComment};

/// Raw comments of one file, grouped by kind in first-seen order.
pub type GroupedComments = IndexMap<CommentKind, Vec<RawComment>>;

/// Anything that can list the comments of a source file.
pub trait CommentExtractor: Send + Sync {
    fn extract(&self, source: &str, language: Language) -> SmellResult<GroupedComments>;
}

/// Group comments by kind, keeping extraction order inside each group.
pub fn group_by_kind(comments: impl IntoIterator<Item = RawComment>) -> GroupedComments {
    let mut grouped = GroupedComments::new();
    for comment in comments {
        grouped.entry(comment.kind).or_default().push(comment);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_preserves_first_seen_order() {
        let comments = vec![
            RawComment::spanning(CommentKind::Block, 1, 3, "a", Language::Java),
            RawComment::single(5, "b", Language::Java),
            RawComment::spanning(CommentKind::Block, 7, 8, "c", Language::Java),
        ];
        let grouped = group_by_kind(comments);
        let kinds: Vec<CommentKind> = grouped.keys().copied().collect();
        assert_eq!(kinds, vec![CommentKind::Block, CommentKind::Single]);
        assert_eq!(grouped[&CommentKind::Block].len(), 2);
        assert_eq!(grouped[&CommentKind::Block][1].text, "c");
    }
}
