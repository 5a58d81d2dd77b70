//! Shared typed models used across locating, filtering, rewriting and the ledger.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::language::Language;

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// How an extractor segmented a comment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    Single,
    ContinuedSingle,
    Block,
}

impl CommentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single_line",
            Self::ContinuedSingle => "cont_single_line",
            Self::Block => "multi_line",
        }
    }
}

/// A comment as reported by an extractor, before it is located in the file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComment {
    pub kind: CommentKind,
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
    pub language: Language,
}

impl RawComment {
    pub fn single(line: usize, text: impl Into<String>, language: Language) -> Self {
        Self {
            kind: CommentKind::Single,
            text: text.into(),
            start_line: line,
            end_line: line,
            language,
        }
    }

    pub fn spanning(
        kind: CommentKind,
        start_line: usize,
        end_line: usize,
        text: impl Into<String>,
        language: Language,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            start_line,
            end_line,
            language,
        }
    }
}

/// Whether a location came from an exact text match or from the fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Exact,
    /// The comment text was not found verbatim; bounds are the whole window.
    Coarse,
}

/// A comment mapped to 1-indexed, inclusive line/column coordinates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedComment {
    pub raw: RawComment,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub associated_code: String,
    pub precision: Precision,
}

impl LocatedComment {
    pub fn is_exact(&self) -> bool {
        self.precision == Precision::Exact
    }
}

/// New-file line range covered by one patch hunk (inclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub new_start: usize,
    pub new_end: usize,
}

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// Closed comment-smell taxonomy returned by the classification oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmellLabel {
    Misleading,
    Obvious,
    #[serde(rename = "Commented out code")]
    CommentedOutCode,
    Irrelevant,
    Task,
    #[serde(rename = "Too much info")]
    TooMuchInfo,
    Beautification,
    #[serde(rename = "Nonlocal info")]
    NonlocalInfo,
    Vague,
    #[serde(rename = "Not a smell")]
    NotASmell,
}

impl SmellLabel {
    pub const ALL: [SmellLabel; 10] = [
        Self::Misleading,
        Self::Obvious,
        Self::CommentedOutCode,
        Self::Irrelevant,
        Self::Task,
        Self::TooMuchInfo,
        Self::Beautification,
        Self::NonlocalInfo,
        Self::Vague,
        Self::NotASmell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Misleading => "Misleading",
            Self::Obvious => "Obvious",
            Self::CommentedOutCode => "Commented out code",
            Self::Irrelevant => "Irrelevant",
            Self::Task => "Task",
            Self::TooMuchInfo => "Too much info",
            Self::Beautification => "Beautification",
            Self::NonlocalInfo => "Nonlocal info",
            Self::Vague => "Vague",
            Self::NotASmell => "Not a smell",
        }
    }

    /// Parse oracle output. Case, punctuation and surrounding quotes are
    /// ignored; anything outside the taxonomy yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        let label = match key.as_str() {
            "misleading" => Self::Misleading,
            "obvious" => Self::Obvious,
            "commentedoutcode" => Self::CommentedOutCode,
            "irrelevant" => Self::Irrelevant,
            "task" => Self::Task,
            "toomuchinfo" | "toomuchinformation" => Self::TooMuchInfo,
            "beautification" => Self::Beautification,
            "nonlocalinfo" | "nonlocalinformation" | "nonlocal" => Self::NonlocalInfo,
            "vague" => Self::Vague,
            "notasmell" => Self::NotASmell,
            _ => return None,
        };
        Some(label)
    }

    pub fn is_smell(&self) -> bool {
        *self != Self::NotASmell
    }

    /// Labels whose remediation is always deleting the comment.
    pub fn is_unrepairable(&self) -> bool {
        matches!(
            self,
            Self::Task
                | Self::CommentedOutCode
                | Self::Beautification
                | Self::Obvious
                | Self::Irrelevant
        )
    }

    /// One-sentence reviewer-facing explanation.
    pub fn explanation(&self) -> &'static str {
        match self {
            Self::Misleading => "Comment does not correctly reflect what the code does.",
            Self::Obvious => "Redundant comment simply restates the code.",
            Self::CommentedOutCode => "Dead code left in comments; should be removed.",
            Self::Irrelevant => "Comment is unrelated to explaining the code.",
            Self::Task => "TODO/FIXME note without actionable detail.",
            Self::TooMuchInfo => "Overly verbose comment that hurts readability.",
            Self::Beautification => "Decorative or section-divider comment with no value.",
            Self::NonlocalInfo => "Comment refers to code located elsewhere.",
            Self::Vague => "Comment is unclear or lacks meaningful detail.",
            Self::NotASmell => "Comment is clear and appropriate.",
        }
    }
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

/// Reviewer disposition of a finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FindingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Pending" => Some(Self::Pending),
            "Accepted" => Some(Self::Accepted),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Diff side a hosted annotation is attached to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "LEFT")]
    Left,
    #[default]
    #[serde(rename = "RIGHT")]
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }

    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("LEFT") {
            Self::Left
        } else {
            Self::Right
        }
    }
}

/// A finding about to be inserted by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFinding {
    pub file_path: String,
    pub commit_sha: String,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub side: Side,
    pub smell_type: Option<SmellLabel>,
    pub associated_code: String,
    pub comment_body: String,
    pub suggestion: Option<String>,
    pub external_comment_id: Option<String>,
    pub external_comment_url: Option<String>,
    pub repair_enabled: bool,
}

impl NewFinding {
    /// Build an unposted finding from a located comment.
    pub fn from_located(
        file_path: &str,
        commit_sha: &str,
        located: &LocatedComment,
        smell_type: Option<SmellLabel>,
    ) -> Self {
        Self {
            file_path: file_path.to_string(),
            commit_sha: commit_sha.to_string(),
            start_line: located.start_line,
            start_column: located.start_column,
            end_line: located.end_line,
            end_column: located.end_column,
            side: Side::Right,
            smell_type,
            associated_code: located.associated_code.clone(),
            comment_body: located.raw.text.clone(),
            suggestion: None,
            external_comment_id: None,
            external_comment_url: None,
            repair_enabled: false,
        }
    }

    /// Line the hosted annotation anchors on (the last line of the comment).
    pub fn line(&self) -> usize {
        self.end_line
    }

    /// A genuine smell: classified, and not "Not a smell".
    pub fn is_smell(&self) -> bool {
        self.smell_type.is_some_and(|label| label.is_smell())
    }

    /// Stable identity of this comment occurrence within one file.
    ///
    /// First 16 hex chars of SHA-256 over the revision, the span and the
    /// comment text.
    pub fn occurrence_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.commit_sha.as_bytes());
        hasher.update(b"\0");
        hasher.update(
            format!(
                "{}:{}:{}:{}",
                self.start_line, self.start_column, self.end_line, self.end_column
            )
            .as_bytes(),
        );
        hasher.update(b"\0");
        hasher.update(self.comment_body.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }
}

/// A persisted finding row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmellFinding {
    pub id: i64,
    pub pr_id: i64,
    pub file_path: String,
    pub occurrence_key: String,
    pub commit_sha: String,
    pub line: i64,
    pub side: Side,
    pub start_line: i64,
    pub start_column: i64,
    pub end_line: i64,
    pub end_column: i64,
    pub smell_type: Option<SmellLabel>,
    pub associated_code: String,
    pub comment_body: String,
    pub suggestion: Option<String>,
    pub external_comment_id: Option<String>,
    pub external_comment_url: Option<String>,
    pub status: FindingStatus,
    pub is_current: bool,
    pub repair_enabled: bool,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Repositories and pull requests
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub internal_id: String,
    pub github_repo_id: String,
    pub full_name: String,
    pub installation_id: String,
}

/// Repository-level opt-ins that decide which findings count as live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSettings {
    pub auto_repair: bool,
    /// Empty means every label is enabled.
    pub enabled_smells: Vec<SmellLabel>,
}

impl Default for RepoSettings {
    fn default() -> Self {
        Self {
            auto_repair: true,
            enabled_smells: Vec::new(),
        }
    }
}

impl RepoSettings {
    /// Whether a finding with this label is repair-enabled for the repo.
    pub fn repair_enabled_for(&self, label: Option<SmellLabel>) -> bool {
        match label {
            Some(label) if label.is_smell() => {
                self.auto_repair
                    && (self.enabled_smells.is_empty() || self.enabled_smells.contains(&label))
            }
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSummary {
    pub pr_id: i64,
    pub repo_internal_id: String,
    pub pr_number: i64,
    pub title: String,
    pub status: String,
    /// Current, repair-enabled findings.
    pub smell_count: i64,
    /// Genuine smells ever recorded for this pull request. Never decremented.
    pub total_smells: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStats {
    pub total_prs: i64,
    pub total_smells: i64,
    pub most_common_smell: Option<SmellLabel>,
}

/// Result of one archive-then-insert pass over a file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceOutcome {
    pub archived: usize,
    pub inserted: usize,
    pub new_smells: usize,
    pub smell_count: i64,
    pub finding_ids: Vec<i64>,
}
