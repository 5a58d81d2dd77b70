//! External collaborators: the classification and rewrite oracles and the
//! hosting platform that receives suggestions.
//!
//! The engine only depends on these traits. Calls are synchronous and have
//! no retry policy here; any error degrades to "no label", "no suggestion"
//! or "not posted" in the pipeline.

use serde::{Deserialize, Serialize};

use crate::errors::SmellResult;
use crate::language::Language;
use crate::models::{Side, SmellLabel};

/// `(associated_code, comment_text) -> label` from the closed taxonomy.
pub trait SmellClassifier: Send + Sync {
    /// Raw oracle output; parsed with [`SmellLabel::parse`] by the caller.
    fn classify(&self, associated_code: &str, comment_text: &str) -> SmellResult<String>;
}

/// `(associated_code, comment_text, label) -> suggested text`.
pub trait CommentRewriter: Send + Sync {
    fn rewrite(
        &self,
        associated_code: &str,
        comment_text: &str,
        label: SmellLabel,
        language: Language,
    ) -> SmellResult<String>;
}

/// An inline suggestion to post on a pull request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub commit_sha: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub side: Side,
    pub body: String,
}

impl SuggestionRequest {
    pub fn is_single_line(&self) -> bool {
        self.start_line == self.end_line
    }
}

/// Identity of a posted review comment on the hosting platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedComment {
    pub id: String,
    pub url: Option<String>,
}

pub trait HostingPlatform: Send + Sync {
    fn post_suggestion(&self, request: &SuggestionRequest) -> SmellResult<PostedComment>;
}

/// What to do with a comment once it has a label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepairAction {
    /// Not a smell: the comment stays as written.
    Keep,
    /// The comment has no value worth rewording; remove it.
    Delete,
    /// Ask the rewrite oracle for new text.
    Rewrite,
}

pub fn repair_action(label: SmellLabel) -> RepairAction {
    if !label.is_smell() {
        RepairAction::Keep
    } else if label.is_unrepairable() {
        RepairAction::Delete
    } else {
        RepairAction::Rewrite
    }
}

/// Strip code fences/quotes around oracle output and one leading comment
/// marker of the file's language.
pub fn clean_suggestion(raw: &str, language: Language) -> String {
    let unquoted = raw.trim().trim_matches(|c| c == '`' || c == '\'' || c == '"');
    let trimmed = unquoted.trim_start();
    match trimmed.strip_prefix(language.profile().single_marker) {
        Some(rest) => rest.trim().to_string(),
        None => unquoted.trim().to_string(),
    }
}

/// Suggested replacement text for a labelled comment. `None` means no
/// suggestion is available (the rewrite oracle failed).
pub fn suggest(
    rewriter: &dyn CommentRewriter,
    associated_code: &str,
    comment_text: &str,
    label: SmellLabel,
    language: Language,
) -> Option<String> {
    match repair_action(label) {
        RepairAction::Keep => Some(comment_text.to_string()),
        RepairAction::Delete => Some(String::new()),
        RepairAction::Rewrite => {
            match rewriter.rewrite(associated_code, comment_text, label, language) {
                Ok(raw) => Some(clean_suggestion(&raw, language)),
                Err(e) => {
                    tracing::warn!(label = label.as_str(), "rewrite oracle failed: {e}");
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SmellError;

    struct Echo;

    impl CommentRewriter for Echo {
        fn rewrite(
            &self,
            _associated_code: &str,
            comment_text: &str,
            label: SmellLabel,
            _language: Language,
        ) -> SmellResult<String> {
            Ok(format!("```// {} ({})```", comment_text, label.as_str()))
        }
    }

    struct Broken;

    impl CommentRewriter for Broken {
        fn rewrite(
            &self,
            _associated_code: &str,
            _comment_text: &str,
            _label: SmellLabel,
            _language: Language,
        ) -> SmellResult<String> {
            Err(SmellError::Oracle("timeout".to_string()))
        }
    }

    #[test]
    fn policy_by_label() {
        assert_eq!(repair_action(SmellLabel::NotASmell), RepairAction::Keep);
        assert_eq!(repair_action(SmellLabel::Task), RepairAction::Delete);
        assert_eq!(repair_action(SmellLabel::Obvious), RepairAction::Delete);
        assert_eq!(repair_action(SmellLabel::Misleading), RepairAction::Rewrite);
        assert_eq!(repair_action(SmellLabel::Vague), RepairAction::Rewrite);
    }

    #[test]
    fn cleans_markers_and_fences() {
        assert_eq!(clean_suggestion("`// Adds x to y`", Language::Java), "Adds x to y");
        assert_eq!(clean_suggestion("\"# Retry count\"", Language::Python), "Retry count");
        assert_eq!(clean_suggestion("  plain text ", Language::Go), "plain text");
        // A marker of another language is left alone.
        assert_eq!(clean_suggestion("# not java", Language::Java), "# not java");
    }

    #[test]
    fn suggest_follows_policy() {
        assert_eq!(
            suggest(&Echo, "", "keep me", SmellLabel::NotASmell, Language::Java),
            Some("keep me".to_string())
        );
        assert_eq!(
            suggest(&Echo, "", "TODO", SmellLabel::Task, Language::Java),
            Some(String::new())
        );
        assert_eq!(
            suggest(&Echo, "", "adds", SmellLabel::Misleading, Language::Java),
            Some("adds (Misleading)".to_string())
        );
    }

    #[test]
    fn rewrite_failure_means_no_suggestion() {
        assert_eq!(
            suggest(&Broken, "", "adds", SmellLabel::Vague, Language::Java),
            None
        );
    }

    #[test]
    fn single_line_request() {
        let request = SuggestionRequest {
            commit_sha: "abc".to_string(),
            file_path: "A.java".to_string(),
            start_line: 4,
            end_line: 4,
            side: Side::Right,
            body: String::new(),
        };
        assert!(request.is_single_line());
    }
}
