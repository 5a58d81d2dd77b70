//! Pull-request analysis pipeline with Rayon-based parallelism.
//!
//! Locating and diff filtering are pure and run in parallel across files.
//! Oracle calls, posting and ledger writes run file by file afterwards.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::diff::filter_by_diff;
use crate::errors::SmellResult;
use crate::extract::CommentExtractor;
use crate::language::Language;
use crate::locate::mapper::locate_comments;
use crate::models::{LocatedComment, NewFinding, RepoSettings, SmellLabel};
use crate::oracle::{suggest, CommentRewriter, HostingPlatform, SmellClassifier, SuggestionRequest};
use crate::rewrite::{rewrite_block, suggestion_body};
use crate::store::Ledger;

/// One file touched by a pull request, at the head revision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub content: String,
    /// Unified diff of the file; only hunk headers are read.
    pub patch: String,
    pub language: Option<Language>,
    pub blob_sha: Option<String>,
    pub status: String,
}

impl ChangedFile {
    /// A modified file whose language is taken from its extension.
    pub fn new(path: impl Into<String>, content: impl Into<String>, patch: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            language: Language::from_path(&path),
            path,
            content: content.into(),
            patch: patch.into(),
            blob_sha: None,
            status: "modified".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub repo_internal_id: String,
    pub pr_id: i64,
    pub commit_sha: String,
    pub files: Vec<ChangedFile>,
}

/// Outcome of analysing one file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileReport {
    pub file_path: String,
    /// Comments located in the file.
    pub located: usize,
    /// Located comments that intersect the patch.
    pub in_diff: usize,
    pub findings_inserted: usize,
    /// Suggestions newly posted to the hosting platform.
    pub posted: usize,
    /// Findings that kept an annotation posted by an earlier delivery.
    pub reused: usize,
    pub error: Option<String>,
}

impl FileReport {
    fn new(file_path: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
            ..Self::default()
        }
    }
}

/// How a finding got (or did not get) its hosted annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Annotation {
    None,
    Posted,
    Reused,
}

/// Result of the parallel stage for one file.
struct Candidates<'a> {
    file: &'a ChangedFile,
    language: Language,
    located: usize,
    in_diff: SmellResult<Vec<LocatedComment>>,
}

pub struct Analyzer {
    config: EngineConfig,
    extractor: Box<dyn CommentExtractor>,
    classifier: Box<dyn SmellClassifier>,
    rewriter: Box<dyn CommentRewriter>,
    host: Box<dyn HostingPlatform>,
    ledger: Ledger,
}

impl Analyzer {
    pub fn new(
        config: EngineConfig,
        extractor: Box<dyn CommentExtractor>,
        classifier: Box<dyn SmellClassifier>,
        rewriter: Box<dyn CommentRewriter>,
        host: Box<dyn HostingPlatform>,
        ledger: Ledger,
    ) -> Self {
        Self {
            config,
            extractor,
            classifier,
            rewriter,
            host,
            ledger,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn candidates<'a>(&self, file: &'a ChangedFile, language: Language) -> Candidates<'a> {
        let radius = self.config.context_radius;
        let mut located = 0;
        let in_diff = self.extractor.extract(&file.content, language).map(|grouped| {
            let comments = locate_comments(&file.content, grouped.values().flatten(), radius);
            located = comments.len();
            filter_by_diff(comments, &file.patch, file.content.lines().count(), radius)
        });
        Candidates {
            file,
            language,
            located,
            in_diff,
        }
    }

    fn classify(&self, comment: &LocatedComment) -> Option<SmellLabel> {
        match self
            .classifier
            .classify(&comment.associated_code, &comment.raw.text)
        {
            Ok(raw) => {
                let label = SmellLabel::parse(&raw);
                if label.is_none() {
                    warn!(output = raw.as_str(), "classifier returned a label outside the taxonomy");
                }
                label
            }
            Err(e) => {
                warn!(line = comment.start_line, "classifier failed: {e}");
                None
            }
        }
    }

    /// Build the finding for one in-diff comment and annotate it when it is a
    /// repair-enabled smell with a suggestion. An occurrence already
    /// annotated by an earlier delivery keeps that annotation.
    fn assess(
        &self,
        request: &AnalysisRequest,
        candidates: &Candidates<'_>,
        comment: &LocatedComment,
        settings: &RepoSettings,
    ) -> (NewFinding, Annotation) {
        let file = candidates.file;
        let label = self.classify(comment);
        let mut finding = NewFinding::from_located(&file.path, &request.commit_sha, comment, label);
        finding.repair_enabled = settings.repair_enabled_for(label);

        let Some(label) = label else {
            return (finding, Annotation::None);
        };
        let Some(text) = suggest(
            self.rewriter.as_ref(),
            &comment.associated_code,
            &comment.raw.text,
            label,
            candidates.language,
        ) else {
            return (finding, Annotation::None);
        };
        let block = rewrite_block(&file.content, comment, &text, self.config.max_width);
        finding.suggestion = Some(block.clone());

        if !(finding.is_smell() && finding.repair_enabled) {
            return (finding, Annotation::None);
        }
        let key = finding.occurrence_key();
        match self.ledger.posted_annotation(request.pr_id, &file.path, &key) {
            Ok(Some(previous)) => {
                debug!(
                    file = file.path.as_str(),
                    line = finding.line(),
                    id = previous.id.as_str(),
                    "reusing posted suggestion"
                );
                finding.external_comment_id = Some(previous.id);
                finding.external_comment_url = previous.url;
                return (finding, Annotation::Reused);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    file = file.path.as_str(),
                    line = finding.line(),
                    "annotation lookup failed, not posting: {e}"
                );
                return (finding, Annotation::None);
            }
        }

        let suggestion = SuggestionRequest {
            commit_sha: request.commit_sha.clone(),
            file_path: file.path.clone(),
            start_line: finding.start_line,
            end_line: finding.end_line,
            side: finding.side,
            body: suggestion_body(label, &block),
        };
        match self.host.post_suggestion(&suggestion) {
            Ok(posted) => {
                finding.external_comment_id = Some(posted.id);
                finding.external_comment_url = posted.url;
                (finding, Annotation::Posted)
            }
            Err(e) => {
                warn!(file = file.path.as_str(), line = finding.line(), "posting suggestion failed: {e}");
                (finding, Annotation::None)
            }
        }
    }

    /// Analyse every supported file of a pull request and record the
    /// findings. Per-file failures are reported, not propagated.
    pub fn analyze_pull_request(&self, request: &AnalysisRequest) -> SmellResult<Vec<FileReport>> {
        let started = Instant::now();
        let settings = self.ledger.repo_settings(&request.repo_internal_id)?;

        let supported: Vec<(&ChangedFile, Language)> = request
            .files
            .iter()
            .filter_map(|file| match file.language {
                Some(language) => Some((file, language)),
                None => {
                    debug!(file = file.path.as_str(), "skipping file in unsupported language");
                    None
                }
            })
            .collect();

        let staged: Vec<Candidates<'_>> = supported
            .par_iter()
            .map(|(file, language)| self.candidates(file, *language))
            .collect();

        let mut reports = Vec::with_capacity(staged.len());
        for candidates in &staged {
            let file = candidates.file;
            let mut report = FileReport::new(&file.path);
            report.located = candidates.located;

            let in_diff = match &candidates.in_diff {
                Ok(comments) => comments,
                Err(e) => {
                    warn!(file = file.path.as_str(), "comment extraction failed: {e}");
                    report.error = Some(e.to_string());
                    reports.push(report);
                    continue;
                }
            };
            report.in_diff = in_diff.len();

            let mut findings = Vec::with_capacity(in_diff.len());
            for comment in in_diff {
                let (finding, annotation) = self.assess(request, candidates, comment, &settings);
                match annotation {
                    Annotation::Posted => report.posted += 1,
                    Annotation::Reused => report.reused += 1,
                    Annotation::None => {}
                }
                findings.push(finding);
            }

            let recorded = self
                .ledger
                .record_file(
                    request.pr_id,
                    &request.repo_internal_id,
                    &file.path,
                    file.blob_sha.as_deref(),
                    &file.status,
                )
                .and_then(|_| {
                    self.ledger
                        .replace_file_findings(request.pr_id, &file.path, &findings)
                });
            match recorded {
                Ok(outcome) => report.findings_inserted = outcome.inserted,
                Err(e) => {
                    warn!(file = file.path.as_str(), "ledger update failed: {e}");
                    report.error = Some(e.to_string());
                }
            }
            reports.push(report);
        }

        info!(
            pr_id = request.pr_id,
            files = reports.len(),
            posted = reports.iter().map(|r| r.posted).sum::<usize>(),
            reused = reports.iter().map(|r| r.reused).sum::<usize>(),
            failed = reports.iter().filter(|r| r.error.is_some()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pull request analysed"
        );
        Ok(reports)
    }
}
