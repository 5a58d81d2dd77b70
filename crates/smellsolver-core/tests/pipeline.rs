use std::sync::{Arc, Mutex};

use smellsolver_core::config::EngineConfig;
use smellsolver_core::extract::syntax::TreeSitterExtractor;
use smellsolver_core::extract::{CommentExtractor, GroupedComments};
use smellsolver_core::language::Language;
use smellsolver_core::models::{RepoSettings, SmellLabel};
use smellsolver_core::oracle::{
    CommentRewriter, HostingPlatform, PostedComment, SmellClassifier, SuggestionRequest,
};
use smellsolver_core::{AnalysisRequest, Analyzer, ChangedFile, Ledger, SmellError, SmellResult};
use tempfile::TempDir;

const DEMO: &str = "public class Demo {\n    // TODO: fix\n    public static int sub(int x, int y) {\n        // add x and y\n        return x - y; // result\n    }\n}\n";

struct KeywordClassifier;

impl SmellClassifier for KeywordClassifier {
    fn classify(&self, _associated_code: &str, comment_text: &str) -> SmellResult<String> {
        match comment_text {
            "TODO: fix" => Ok("Task".to_string()),
            "add x and y" => Ok("\"Misleading\"".to_string()),
            "result" => Ok("Not a smell".to_string()),
            _ => Err(SmellError::Oracle("unexpected comment".to_string())),
        }
    }
}

struct FailingClassifier;

impl SmellClassifier for FailingClassifier {
    fn classify(&self, _associated_code: &str, _comment_text: &str) -> SmellResult<String> {
        Err(SmellError::Oracle("rate limited".to_string()))
    }
}

struct FixedRewriter;

impl CommentRewriter for FixedRewriter {
    fn rewrite(
        &self,
        _associated_code: &str,
        _comment_text: &str,
        _label: SmellLabel,
        _language: Language,
    ) -> SmellResult<String> {
        Ok("`// Subtracts y from x`".to_string())
    }
}

#[derive(Clone, Default)]
struct RecordingHost {
    posted: Arc<Mutex<Vec<SuggestionRequest>>>,
    fail: bool,
}

impl HostingPlatform for RecordingHost {
    fn post_suggestion(&self, request: &SuggestionRequest) -> SmellResult<PostedComment> {
        if self.fail {
            return Err(SmellError::Hosting("502 bad gateway".to_string()));
        }
        let mut posted = self.posted.lock().unwrap();
        posted.push(request.clone());
        Ok(PostedComment {
            id: format!("gh-{}", posted.len()),
            url: Some(format!("https://example.test/comments/{}", posted.len())),
        })
    }
}

struct BrokenExtractor;

impl CommentExtractor for BrokenExtractor {
    fn extract(&self, _source: &str, _language: Language) -> SmellResult<GroupedComments> {
        Err(SmellError::Parse("grammar unavailable".to_string()))
    }
}

struct Fixture {
    _dir: TempDir,
    ledger: Ledger,
    repo: String,
    pr_id: i64,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::open(dir.path().join("ledger.db")).unwrap();
    ledger.init_schema().unwrap();
    ledger.add_installation("inst-1", "acme").unwrap();
    let repo = ledger.add_repository("inst-1", "42", "acme/widgets").unwrap();
    let pr_id = ledger.upsert_pull_request(&repo, 7, "Add sub", "open").unwrap();
    Fixture {
        _dir: dir,
        ledger,
        repo,
        pr_id,
    }
}

fn analyzer(
    fx: &Fixture,
    extractor: Box<dyn CommentExtractor>,
    classifier: Box<dyn SmellClassifier>,
    host: RecordingHost,
) -> Analyzer {
    Analyzer::new(
        EngineConfig::default(),
        extractor,
        classifier,
        Box::new(FixedRewriter),
        Box::new(host),
        fx.ledger.clone(),
    )
}

fn request(fx: &Fixture, patch: &str) -> AnalysisRequest {
    AnalysisRequest {
        repo_internal_id: fx.repo.clone(),
        pr_id: fx.pr_id,
        commit_sha: "head1".to_string(),
        files: vec![
            ChangedFile::new("src/Demo.java", DEMO, patch),
            ChangedFile::new("NOTES.md", "# notes\n", "@@ -0,0 +1 @@"),
        ],
    }
}

#[test]
fn analyses_posts_and_records_findings() {
    let fx = fixture();
    let host = RecordingHost::default();
    let analyzer = analyzer(
        &fx,
        Box::new(TreeSitterExtractor::new()),
        Box::new(KeywordClassifier),
        host.clone(),
    );

    let reports = analyzer
        .analyze_pull_request(&request(&fx, "@@ -0,0 +1,7 @@"))
        .unwrap();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.file_path, "src/Demo.java");
    assert_eq!(report.error, None);
    assert_eq!((report.located, report.in_diff), (3, 3));
    assert_eq!(report.findings_inserted, 3);
    assert_eq!(report.posted, 2);

    let posted = host.posted.lock().unwrap().clone();
    assert_eq!(posted.len(), 2);
    assert_eq!((posted[0].start_line, posted[0].end_line), (2, 2));
    assert!(posted[0].body.starts_with("**Task smell**"));
    assert!(posted[0].body.ends_with("```suggestion\n\n```"));
    assert!(posted[1]
        .body
        .contains("```suggestion\n        // Subtracts y from x\n```"));

    let summary = fx.ledger.pull_request_summary(fx.pr_id).unwrap().unwrap();
    assert_eq!(summary.smell_count, 2);
    assert_eq!(summary.total_smells, 2);

    let current = fx.ledger.current_findings(fx.pr_id).unwrap();
    let not_smell = current
        .iter()
        .find(|f| f.smell_type == Some(SmellLabel::NotASmell))
        .unwrap();
    assert!(!not_smell.repair_enabled);
    assert!(not_smell.external_comment_id.is_none());
    assert_eq!(fx.ledger.posted_findings(fx.pr_id).unwrap().len(), 2);
}

#[test]
fn duplicate_delivery_keeps_counters_and_annotations_stable() {
    let fx = fixture();
    let host = RecordingHost::default();
    let analyzer = analyzer(
        &fx,
        Box::new(TreeSitterExtractor::new()),
        Box::new(KeywordClassifier),
        host.clone(),
    );
    let req = request(&fx, "@@ -0,0 +1,7 @@");
    analyzer.analyze_pull_request(&req).unwrap();
    for _ in 0..2 {
        let reports = analyzer.analyze_pull_request(&req).unwrap();
        assert_eq!((reports[0].posted, reports[0].reused), (0, 2));
    }

    assert_eq!(host.posted.lock().unwrap().len(), 2);
    let summary = fx.ledger.pull_request_summary(fx.pr_id).unwrap().unwrap();
    assert_eq!(summary.smell_count, 2);
    assert_eq!(summary.total_smells, 2);
    assert_eq!(fx.ledger.current_findings(fx.pr_id).unwrap().len(), 3);

    let mut ids: Vec<String> = fx
        .ledger
        .posted_findings(fx.pr_id)
        .unwrap()
        .into_iter()
        .filter_map(|f| f.external_comment_id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["gh-1", "gh-2"]);
}

#[test]
fn new_revision_posts_fresh_suggestions() {
    let fx = fixture();
    let host = RecordingHost::default();
    let analyzer = analyzer(
        &fx,
        Box::new(TreeSitterExtractor::new()),
        Box::new(KeywordClassifier),
        host.clone(),
    );
    let mut req = request(&fx, "@@ -0,0 +1,7 @@");
    analyzer.analyze_pull_request(&req).unwrap();
    req.commit_sha = "head2".to_string();
    let reports = analyzer.analyze_pull_request(&req).unwrap();
    assert_eq!((reports[0].posted, reports[0].reused), (2, 0));
    assert_eq!(host.posted.lock().unwrap().len(), 4);
    assert_eq!(fx.ledger.posted_findings(fx.pr_id).unwrap().len(), 2);
}

#[test]
fn comments_outside_the_patch_are_ignored() {
    let fx = fixture();
    let analyzer = analyzer(
        &fx,
        Box::new(TreeSitterExtractor::new()),
        Box::new(KeywordClassifier),
        RecordingHost::default(),
    );
    let reports = analyzer
        .analyze_pull_request(&request(&fx, "@@ -40,2 +40,2 @@"))
        .unwrap();
    assert_eq!((reports[0].located, reports[0].in_diff), (3, 0));
    assert_eq!(reports[0].findings_inserted, 0);
    assert!(fx.ledger.current_findings(fx.pr_id).unwrap().is_empty());
}

#[test]
fn hosting_failure_still_records_findings() {
    let fx = fixture();
    let host = RecordingHost {
        fail: true,
        ..RecordingHost::default()
    };
    let analyzer = analyzer(
        &fx,
        Box::new(TreeSitterExtractor::new()),
        Box::new(KeywordClassifier),
        host,
    );
    let reports = analyzer
        .analyze_pull_request(&request(&fx, "@@ -0,0 +1,7 @@"))
        .unwrap();
    assert_eq!(reports[0].posted, 0);
    assert_eq!(reports[0].findings_inserted, 3);
    assert_eq!(fx.ledger.unposted_findings(fx.pr_id).unwrap().len(), 3);
    let summary = fx.ledger.pull_request_summary(fx.pr_id).unwrap().unwrap();
    assert_eq!(summary.smell_count, 2);
}

#[test]
fn classifier_failure_records_unlabelled_findings() {
    let fx = fixture();
    let analyzer = analyzer(
        &fx,
        Box::new(TreeSitterExtractor::new()),
        Box::new(FailingClassifier),
        RecordingHost::default(),
    );
    let reports = analyzer
        .analyze_pull_request(&request(&fx, "@@ -0,0 +1,7 @@"))
        .unwrap();
    assert_eq!(reports[0].posted, 0);
    let current = fx.ledger.current_findings(fx.pr_id).unwrap();
    assert_eq!(current.len(), 3);
    assert!(current.iter().all(|f| f.smell_type.is_none() && f.suggestion.is_none()));
    let summary = fx.ledger.pull_request_summary(fx.pr_id).unwrap().unwrap();
    assert_eq!((summary.smell_count, summary.total_smells), (0, 0));
}

#[test]
fn extraction_failure_leaves_previous_findings() {
    let fx = fixture();
    let good = analyzer(
        &fx,
        Box::new(TreeSitterExtractor::new()),
        Box::new(KeywordClassifier),
        RecordingHost::default(),
    );
    good.analyze_pull_request(&request(&fx, "@@ -0,0 +1,7 @@"))
        .unwrap();

    let broken = analyzer(
        &fx,
        Box::new(BrokenExtractor),
        Box::new(KeywordClassifier),
        RecordingHost::default(),
    );
    let reports = broken
        .analyze_pull_request(&request(&fx, "@@ -0,0 +1,7 @@"))
        .unwrap();
    assert!(reports[0].error.as_deref().unwrap().contains("grammar unavailable"));
    assert_eq!(fx.ledger.current_findings(fx.pr_id).unwrap().len(), 3);
}

#[test]
fn disabled_auto_repair_posts_nothing() {
    let fx = fixture();
    fx.ledger
        .update_repo_settings(
            &fx.repo,
            &RepoSettings {
                auto_repair: false,
                enabled_smells: Vec::new(),
            },
        )
        .unwrap();
    let host = RecordingHost::default();
    let analyzer = analyzer(
        &fx,
        Box::new(TreeSitterExtractor::new()),
        Box::new(KeywordClassifier),
        host.clone(),
    );
    let reports = analyzer
        .analyze_pull_request(&request(&fx, "@@ -0,0 +1,7 @@"))
        .unwrap();
    assert_eq!(reports[0].posted, 0);
    assert!(host.posted.lock().unwrap().is_empty());
    let summary = fx.ledger.pull_request_summary(fx.pr_id).unwrap().unwrap();
    assert_eq!(summary.smell_count, 0);
    assert_eq!(summary.total_smells, 2);
}
