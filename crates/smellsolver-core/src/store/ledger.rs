//! Findings ledger backed by SQLite.
//!
//! Each public method opens its own connection so callers never manage
//! connection lifetime. Every mutation that touches more than one row runs in
//! a single `IMMEDIATE` transaction; any error drops the transaction and
//! leaves the previous state intact.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::errors::{SmellError, SmellResult};
use crate::models::{
    FindingStatus, NewFinding, PullRequestSummary, ReplaceOutcome, RepoSettings, RepoStats,
    Repository, Side, SmellFinding, SmellLabel,
};
use crate::oracle::PostedComment;
use crate::store::schema;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const FINDING_COLUMNS: &str = "id, pr_id, file_path, occurrence_key, commit_sha, line, side, \
     start_line, start_column, end_line, end_column, smell_type, associated_code, comment_body, \
     suggestion, external_comment_id, external_comment_url, status, is_current, repair_enabled, \
     created_at";

const SUMMARY_COLUMNS: &str = "pr.pr_id, pr.repo_internal_id, pr.pr_number, pr.title, pr.status, \
     pr.smell_count, COALESCE(ss.total_smells, 0)";

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    if raw == "~" || raw.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut expanded = PathBuf::from(home);
            if raw.len() > 2 {
                expanded.push(&raw[2..]);
            }
            return expanded;
        }
    }
    path.to_path_buf()
}

/// Deterministic internal id of a repository within an installation.
pub fn repository_internal_id(installation_id: &str, github_repo_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(installation_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(github_repo_id.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}

fn row_to_finding(row: &Row<'_>) -> rusqlite::Result<SmellFinding> {
    let side: String = row.get(6)?;
    let smell_type: Option<String> = row.get(11)?;
    let status: String = row.get(17)?;
    Ok(SmellFinding {
        id: row.get(0)?,
        pr_id: row.get(1)?,
        file_path: row.get(2)?,
        occurrence_key: row.get(3)?,
        commit_sha: row.get(4)?,
        line: row.get(5)?,
        side: Side::parse(&side),
        start_line: row.get(7)?,
        start_column: row.get(8)?,
        end_line: row.get(9)?,
        end_column: row.get(10)?,
        smell_type: smell_type.as_deref().and_then(SmellLabel::parse),
        associated_code: row.get(12)?,
        comment_body: row.get(13)?,
        suggestion: row.get(14)?,
        external_comment_id: row.get(15)?,
        external_comment_url: row.get(16)?,
        status: FindingStatus::parse(&status).unwrap_or(FindingStatus::Pending),
        is_current: row.get::<_, i64>(18)? != 0,
        repair_enabled: row.get::<_, i64>(19)? != 0,
        created_at: row.get::<_, Option<String>>(20)?.unwrap_or_default(),
    })
}

fn row_to_summary(row: &Row<'_>) -> rusqlite::Result<PullRequestSummary> {
    Ok(PullRequestSummary {
        pr_id: row.get(0)?,
        repo_internal_id: row.get(1)?,
        pr_number: row.get(2)?,
        title: row.get(3)?,
        status: row.get(4)?,
        smell_count: row.get(5)?,
        total_smells: row.get(6)?,
    })
}

fn row_to_repository(row: &Row<'_>) -> rusqlite::Result<Repository> {
    Ok(Repository {
        internal_id: row.get(0)?,
        github_repo_id: row.get(1)?,
        full_name: row.get(2)?,
        installation_id: row.get(3)?,
    })
}

// ---------------------------------------------------------------------------
// Statement helpers shared by the transactional operations
// ---------------------------------------------------------------------------

fn pull_request_repo(conn: &Connection, pr_id: i64) -> SmellResult<String> {
    conn.query_row(
        "SELECT repo_internal_id FROM pull_requests WHERE pr_id = ?1;",
        params![pr_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| SmellError::Database(format!("unknown pull request {pr_id}")))
}

fn archive(conn: &Connection, pr_id: i64, file_path: &str) -> SmellResult<usize> {
    let archived = conn.execute(
        "UPDATE comment_smells SET is_current = 0 \
         WHERE pr_id = ?1 AND file_path = ?2 AND is_current = 1;",
        params![pr_id, file_path],
    )?;
    Ok(archived)
}

/// Reset `smell_count` to the live aggregate and return it.
fn recompute(conn: &Connection, pr_id: i64) -> SmellResult<i64> {
    let updated = conn.execute(
        "UPDATE pull_requests SET smell_count = ( \
             SELECT COUNT(*) FROM comment_smells \
             WHERE pr_id = ?1 AND is_current = 1 AND repair_enabled = 1 \
         ), updated_at = CURRENT_TIMESTAMP \
         WHERE pr_id = ?1;",
        params![pr_id],
    )?;
    if updated == 0 {
        return Err(SmellError::Database(format!("unknown pull request {pr_id}")));
    }
    let count = conn.query_row(
        "SELECT smell_count FROM pull_requests WHERE pr_id = ?1;",
        params![pr_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn ever_recorded(conn: &Connection, pr_id: i64, file_path: &str, key: &str) -> SmellResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM comment_smells \
             WHERE pr_id = ?1 AND file_path = ?2 AND occurrence_key = ?3 LIMIT 1;",
            params![pr_id, file_path, key],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn bump_total_smells(conn: &Connection, pr_id: i64, by: usize) -> SmellResult<()> {
    if by == 0 {
        return Ok(());
    }
    conn.execute(
        "INSERT INTO smell_summary(pr_id, repo_internal_id, total_smells) \
         SELECT pr_id, repo_internal_id, ?2 FROM pull_requests WHERE pr_id = ?1 \
         ON CONFLICT(pr_id) DO UPDATE SET total_smells = total_smells + excluded.total_smells;",
        params![pr_id, by as i64],
    )?;
    Ok(())
}

fn insert_finding(
    conn: &Connection,
    pr_id: i64,
    file_path: &str,
    key: &str,
    finding: &NewFinding,
) -> SmellResult<i64> {
    conn.execute(
        "INSERT INTO comment_smells ( \
             pr_id, file_path, occurrence_key, commit_sha, line, side, \
             start_line, start_column, end_line, end_column, smell_type, \
             associated_code, comment_body, suggestion, external_comment_id, \
             external_comment_url, status, is_current, repair_enabled \
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
                   'Pending', 1, ?17);",
        params![
            pr_id,
            file_path,
            key,
            finding.commit_sha,
            finding.line() as i64,
            finding.side.as_str(),
            finding.start_line as i64,
            finding.start_column as i64,
            finding.end_line as i64,
            finding.end_column as i64,
            finding.smell_type.map(|label| label.as_str()),
            finding.associated_code,
            finding.comment_body,
            finding.suggestion,
            finding.external_comment_id,
            finding.external_comment_url,
            (finding.repair_enabled && finding.is_smell()) as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Labels stored in `repo_settings.enabled_smells`. Entries outside the
/// taxonomy are skipped so one stale label cannot block analysis.
fn parse_enabled_smells(repo_internal_id: &str, json: &str) -> SmellResult<Vec<SmellLabel>> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut labels = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.as_str().and_then(SmellLabel::parse) {
            Some(label) if !labels.contains(&label) => labels.push(label),
            Some(_) => {}
            None => warn!(repo = repo_internal_id, entry = %entry, "ignoring unknown enabled smell"),
        }
    }
    Ok(labels)
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Durable record of findings per pull request and file.
#[derive(Clone, Debug)]
pub struct Ledger {
    db_path: PathBuf,
}

impl Ledger {
    /// Resolve `db_path` and create its parent directories. The schema is not
    /// touched until [`Ledger::init_schema`].
    pub fn open(db_path: impl AsRef<Path>) -> SmellResult<Self> {
        let expanded = expand_tilde(db_path.as_ref());
        let resolved = if expanded.is_absolute() {
            expanded
        } else {
            std::env::current_dir()?.join(&expanded)
        };
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { db_path: resolved })
    }

    pub fn from_config(config: &EngineConfig) -> SmellResult<Self> {
        Self::open(&config.db_path)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> SmellResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Set WAL mode, create all tables and indexes, then run pending
    /// migrations.
    pub fn init_schema(&self) -> SmellResult<()> {
        let conn = self.connect()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        for stmt in schema::SCHEMA_STATEMENTS {
            conn.execute_batch(stmt)?;
        }
        schema::migrate_schema(&conn)?;
        info!(path = %self.db_path.display(), "ledger schema ready");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Installations and repositories
    // -----------------------------------------------------------------------

    pub fn add_installation(&self, installation_id: &str, account: &str) -> SmellResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO installations(installation_id, account) VALUES (?1, ?2) \
             ON CONFLICT(installation_id) DO UPDATE SET account = excluded.account;",
            params![installation_id, account],
        )?;
        Ok(())
    }

    /// Remove an installation and, through cascades, everything recorded for
    /// its repositories. Returns whether the installation existed.
    pub fn remove_installation(&self, installation_id: &str) -> SmellResult<bool> {
        let conn = self.connect()?;
        let removed = conn.execute(
            "DELETE FROM installations WHERE installation_id = ?1;",
            params![installation_id],
        )?;
        if removed > 0 {
            info!(installation_id, "installation removed");
        }
        Ok(removed > 0)
    }

    /// Register a repository under an installation and return its internal
    /// id. Re-adding the same repository only refreshes its name.
    pub fn add_repository(
        &self,
        installation_id: &str,
        github_repo_id: &str,
        full_name: &str,
    ) -> SmellResult<String> {
        let internal_id = repository_internal_id(installation_id, github_repo_id);
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT OR IGNORE INTO installations(installation_id) VALUES (?1);",
            params![installation_id],
        )?;
        tx.execute(
            "INSERT INTO repositories(internal_id, github_repo_id, full_name, installation_id) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(github_repo_id, installation_id) DO UPDATE SET full_name = excluded.full_name;",
            params![internal_id, github_repo_id, full_name, installation_id],
        )?;
        tx.commit()?;
        Ok(internal_id)
    }

    pub fn repository_by_internal_id(&self, internal_id: &str) -> SmellResult<Option<Repository>> {
        let conn = self.connect()?;
        let repo = conn
            .query_row(
                "SELECT internal_id, github_repo_id, full_name, installation_id \
                 FROM repositories WHERE internal_id = ?1;",
                params![internal_id],
                row_to_repository,
            )
            .optional()?;
        Ok(repo)
    }

    pub fn repository_by_full_name(
        &self,
        installation_id: &str,
        full_name: &str,
    ) -> SmellResult<Option<Repository>> {
        let conn = self.connect()?;
        let repo = conn
            .query_row(
                "SELECT internal_id, github_repo_id, full_name, installation_id \
                 FROM repositories WHERE installation_id = ?1 AND full_name = ?2 LIMIT 1;",
                params![installation_id, full_name],
                row_to_repository,
            )
            .optional()?;
        Ok(repo)
    }

    pub fn repositories_by_installation(&self, installation_id: &str) -> SmellResult<Vec<Repository>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT internal_id, github_repo_id, full_name, installation_id \
             FROM repositories WHERE installation_id = ?1 ORDER BY full_name ASC;",
        )?;
        let repos = stmt
            .query_map(params![installation_id], row_to_repository)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(repos)
    }

    // -----------------------------------------------------------------------
    // Pull requests, settings, files
    // -----------------------------------------------------------------------

    /// Create or refresh a pull request and return its `pr_id`.
    pub fn upsert_pull_request(
        &self,
        repo_internal_id: &str,
        pr_number: i64,
        title: &str,
        status: &str,
    ) -> SmellResult<i64> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO pull_requests(repo_internal_id, pr_number, title, status) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(repo_internal_id, pr_number) DO UPDATE SET \
                 title = excluded.title, status = excluded.status, \
                 updated_at = CURRENT_TIMESTAMP;",
            params![repo_internal_id, pr_number, title, status],
        )?;
        let pr_id: i64 = tx.query_row(
            "SELECT pr_id FROM pull_requests WHERE repo_internal_id = ?1 AND pr_number = ?2;",
            params![repo_internal_id, pr_number],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO smell_summary(pr_id, repo_internal_id, total_smells) \
             VALUES (?1, ?2, 0);",
            params![pr_id, repo_internal_id],
        )?;
        tx.commit()?;
        Ok(pr_id)
    }

    /// Settings of a repository, or the defaults when none were stored.
    pub fn repo_settings(&self, repo_internal_id: &str) -> SmellResult<RepoSettings> {
        let conn = self.connect()?;
        let stored: Option<(i64, String)> = conn
            .query_row(
                "SELECT auto_repair, enabled_smells FROM repo_settings WHERE repo_internal_id = ?1;",
                params![repo_internal_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match stored {
            Some((auto_repair, enabled_json)) => Ok(RepoSettings {
                auto_repair: auto_repair != 0,
                enabled_smells: parse_enabled_smells(repo_internal_id, &enabled_json)?,
            }),
            None => Ok(RepoSettings::default()),
        }
    }

    /// Store new settings. Existing findings keep the repair flag they were
    /// recorded with.
    pub fn update_repo_settings(
        &self,
        repo_internal_id: &str,
        settings: &RepoSettings,
    ) -> SmellResult<()> {
        let conn = self.connect()?;
        let enabled_json = serde_json::to_string(&settings.enabled_smells)?;
        conn.execute(
            "INSERT INTO repo_settings(repo_internal_id, auto_repair, enabled_smells) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT(repo_internal_id) DO UPDATE SET \
                 auto_repair = excluded.auto_repair, \
                 enabled_smells = excluded.enabled_smells, \
                 updated_at = CURRENT_TIMESTAMP;",
            params![repo_internal_id, settings.auto_repair as i64, enabled_json],
        )?;
        Ok(())
    }

    pub fn record_file(
        &self,
        pr_id: i64,
        repo_internal_id: &str,
        file_path: &str,
        blob_sha: Option<&str>,
        status: &str,
    ) -> SmellResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO files(pr_id, repo_internal_id, file_path, blob_sha, status) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(pr_id, file_path) DO UPDATE SET \
                 blob_sha = excluded.blob_sha, status = excluded.status, \
                 updated_at = CURRENT_TIMESTAMP;",
            params![pr_id, repo_internal_id, file_path, blob_sha, status],
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Findings lifecycle
    // -----------------------------------------------------------------------

    /// Archive the current findings of `(pr_id, file_path)` and insert
    /// `findings` in their place, all in one transaction.
    ///
    /// Findings repeating an occurrence key within the batch are skipped.
    /// `total_smells` grows once per genuine smell whose occurrence key was
    /// never recorded for this file. `smell_count` is recomputed from the
    /// current rows before commit.
    pub fn replace_file_findings(
        &self,
        pr_id: i64,
        file_path: &str,
        findings: &[NewFinding],
    ) -> SmellResult<ReplaceOutcome> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        pull_request_repo(&tx, pr_id)?;

        let mut outcome = ReplaceOutcome {
            archived: archive(&tx, pr_id, file_path)?,
            ..ReplaceOutcome::default()
        };

        let mut seen: HashSet<String> = HashSet::new();
        for finding in findings {
            let key = finding.occurrence_key();
            if !seen.insert(key.clone()) {
                continue;
            }
            if finding.is_smell() && !ever_recorded(&tx, pr_id, file_path, &key)? {
                outcome.new_smells += 1;
            }
            let id = insert_finding(&tx, pr_id, file_path, &key, finding)?;
            outcome.finding_ids.push(id);
        }
        outcome.inserted = outcome.finding_ids.len();

        bump_total_smells(&tx, pr_id, outcome.new_smells)?;
        outcome.smell_count = recompute(&tx, pr_id)?;
        tx.commit()?;

        debug!(
            pr_id,
            file_path,
            archived = outcome.archived,
            inserted = outcome.inserted,
            new_smells = outcome.new_smells,
            smell_count = outcome.smell_count,
            "file findings replaced"
        );
        Ok(outcome)
    }

    /// Insert one finding without archiving anything.
    pub fn record_finding(&self, pr_id: i64, finding: &NewFinding) -> SmellResult<i64> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        pull_request_repo(&tx, pr_id)?;

        let key = finding.occurrence_key();
        let is_new_smell =
            finding.is_smell() && !ever_recorded(&tx, pr_id, &finding.file_path, &key)?;
        let id = insert_finding(&tx, pr_id, &finding.file_path, &key, finding)?;
        if is_new_smell {
            bump_total_smells(&tx, pr_id, 1)?;
        }
        if finding.repair_enabled && finding.is_smell() {
            tx.execute(
                "UPDATE pull_requests SET smell_count = smell_count + 1, \
                 updated_at = CURRENT_TIMESTAMP WHERE pr_id = ?1;",
                params![pr_id],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    /// Mark every current finding of a file as historical.
    pub fn archive_file_findings(&self, pr_id: i64, file_path: &str) -> SmellResult<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let archived = archive(&tx, pr_id, file_path)?;
        recompute(&tx, pr_id)?;
        tx.commit()?;
        Ok(archived)
    }

    pub fn recompute_smell_count(&self, pr_id: i64) -> SmellResult<i64> {
        let conn = self.connect()?;
        recompute(&conn, pr_id)
    }

    /// Record a reviewer decision. Only pending findings can be decided.
    pub fn set_finding_status(&self, finding_id: i64, status: FindingStatus) -> SmellResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: String = tx
            .query_row(
                "SELECT status FROM comment_smells WHERE id = ?1;",
                params![finding_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| SmellError::Database(format!("unknown finding {finding_id}")))?;
        if current != FindingStatus::Pending.as_str() || status == FindingStatus::Pending {
            return Err(SmellError::Database(format!(
                "invalid transition {current} -> {}",
                status.as_str()
            )));
        }
        tx.execute(
            "UPDATE comment_smells SET status = ?2 WHERE id = ?1;",
            params![finding_id, status.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn attach_external_comment(
        &self,
        finding_id: i64,
        external_comment_id: &str,
        external_comment_url: Option<&str>,
    ) -> SmellResult<()> {
        let conn = self.connect()?;
        let updated = conn.execute(
            "UPDATE comment_smells SET external_comment_id = ?2, external_comment_url = ?3 \
             WHERE id = ?1;",
            params![finding_id, external_comment_id, external_comment_url],
        )?;
        if updated == 0 {
            return Err(SmellError::Database(format!("unknown finding {finding_id}")));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Latest hosted annotation recorded for an occurrence, archived rows
    /// included.
    pub fn posted_annotation(
        &self,
        pr_id: i64,
        file_path: &str,
        occurrence_key: &str,
    ) -> SmellResult<Option<PostedComment>> {
        let conn = self.connect()?;
        let posted = conn
            .query_row(
                "SELECT external_comment_id, external_comment_url FROM comment_smells \
                 WHERE pr_id = ?1 AND file_path = ?2 AND occurrence_key = ?3 \
                   AND external_comment_id IS NOT NULL \
                 ORDER BY id DESC LIMIT 1;",
                params![pr_id, file_path, occurrence_key],
                |row| {
                    Ok(PostedComment {
                        id: row.get(0)?,
                        url: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(posted)
    }

    fn findings_where(&self, clause: &str, pr_id: i64) -> SmellResult<Vec<SmellFinding>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {FINDING_COLUMNS} FROM comment_smells WHERE pr_id = ?1 AND {clause} \
             ORDER BY file_path ASC, start_line ASC, id ASC;"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![pr_id], row_to_finding)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn current_findings(&self, pr_id: i64) -> SmellResult<Vec<SmellFinding>> {
        self.findings_where("is_current = 1", pr_id)
    }

    /// Current findings that carry a hosted review comment.
    pub fn posted_findings(&self, pr_id: i64) -> SmellResult<Vec<SmellFinding>> {
        self.findings_where("is_current = 1 AND external_comment_id IS NOT NULL", pr_id)
    }

    pub fn unposted_findings(&self, pr_id: i64) -> SmellResult<Vec<SmellFinding>> {
        self.findings_where("is_current = 1 AND external_comment_id IS NULL", pr_id)
    }

    pub fn finding(&self, finding_id: i64) -> SmellResult<Option<SmellFinding>> {
        let conn = self.connect()?;
        let sql = format!("SELECT {FINDING_COLUMNS} FROM comment_smells WHERE id = ?1;");
        let finding = conn
            .query_row(&sql, params![finding_id], row_to_finding)
            .optional()?;
        Ok(finding)
    }

    pub fn pull_request_summary(&self, pr_id: i64) -> SmellResult<Option<PullRequestSummary>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM pull_requests pr \
             LEFT JOIN smell_summary ss ON ss.pr_id = pr.pr_id \
             WHERE pr.pr_id = ?1;"
        );
        let summary = conn
            .query_row(&sql, params![pr_id], row_to_summary)
            .optional()?;
        Ok(summary)
    }

    pub fn pull_requests_for_repo(&self, repo_internal_id: &str) -> SmellResult<Vec<PullRequestSummary>> {
        let conn = self.connect()?;
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM pull_requests pr \
             LEFT JOIN smell_summary ss ON ss.pr_id = pr.pr_id \
             WHERE pr.repo_internal_id = ?1 ORDER BY pr.pr_number ASC;"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![repo_internal_id], row_to_summary)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Repository-wide totals. The most common smell is counted over current
    /// genuine findings; ties go to the alphabetically first label.
    pub fn repo_stats(&self, repo_internal_id: &str) -> SmellResult<RepoStats> {
        let conn = self.connect()?;
        let (total_prs, total_smells): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(ss.total_smells), 0) FROM pull_requests pr \
             LEFT JOIN smell_summary ss ON ss.pr_id = pr.pr_id \
             WHERE pr.repo_internal_id = ?1;",
            params![repo_internal_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let most_common: Option<String> = conn
            .query_row(
                "SELECT cs.smell_type FROM comment_smells cs \
                 JOIN pull_requests pr ON pr.pr_id = cs.pr_id \
                 WHERE pr.repo_internal_id = ?1 AND cs.is_current = 1 \
                   AND cs.smell_type IS NOT NULL AND cs.smell_type != ?2 \
                 GROUP BY cs.smell_type \
                 ORDER BY COUNT(*) DESC, cs.smell_type ASC LIMIT 1;",
                params![repo_internal_id, SmellLabel::NotASmell.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(RepoStats {
            total_prs,
            total_smells,
            most_common_smell: most_common.as_deref().and_then(SmellLabel::parse),
        })
    }
}
