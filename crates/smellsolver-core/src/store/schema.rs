//! SQLite schema DDL and migration framework for the findings ledger.

use rusqlite::Connection;

use crate::errors::SmellResult;

/// Version stamped by the newest entry of [`MIGRATIONS`].
pub const SCHEMA_VERSION: i32 = 1;

/// Core DDL statements: 9 CREATE TABLE + 8 CREATE INDEX.
///
/// Executed with `CREATE … IF NOT EXISTS` so they are safe to replay on an
/// already-initialised database.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // ── tables (9) ──────────────────────────────────────────────────────
    "CREATE TABLE IF NOT EXISTS ledger_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS migration_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_version INTEGER NOT NULL,
        to_version INTEGER NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL,
        error_message TEXT,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS installations (
        installation_id TEXT PRIMARY KEY,
        account TEXT NOT NULL DEFAULT '',
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS repositories (
        internal_id TEXT PRIMARY KEY,
        github_repo_id TEXT NOT NULL,
        full_name TEXT NOT NULL,
        installation_id TEXT NOT NULL
            REFERENCES installations(installation_id) ON DELETE CASCADE,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(github_repo_id, installation_id)
    );",
    "CREATE TABLE IF NOT EXISTS pull_requests (
        pr_id INTEGER PRIMARY KEY AUTOINCREMENT,
        repo_internal_id TEXT NOT NULL
            REFERENCES repositories(internal_id) ON DELETE CASCADE,
        pr_number INTEGER NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'open',
        smell_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(repo_internal_id, pr_number)
    );",
    "CREATE TABLE IF NOT EXISTS comment_smells (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pr_id INTEGER NOT NULL REFERENCES pull_requests(pr_id) ON DELETE CASCADE,
        file_path TEXT NOT NULL,
        occurrence_key TEXT NOT NULL,
        commit_sha TEXT NOT NULL,
        line INTEGER NOT NULL,
        side TEXT NOT NULL DEFAULT 'RIGHT' CHECK (side IN ('LEFT', 'RIGHT')),
        start_line INTEGER NOT NULL,
        start_column INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        end_column INTEGER NOT NULL,
        smell_type TEXT CHECK (smell_type IS NULL OR smell_type IN (
            'Misleading', 'Obvious', 'Commented out code', 'Irrelevant', 'Task',
            'Too much info', 'Beautification', 'Nonlocal info', 'Vague', 'Not a smell'
        )),
        associated_code TEXT NOT NULL DEFAULT '',
        comment_body TEXT NOT NULL,
        suggestion TEXT,
        external_comment_id TEXT,
        external_comment_url TEXT,
        status TEXT NOT NULL DEFAULT 'Pending'
            CHECK (status IN ('Pending', 'Accepted', 'Rejected')),
        is_current INTEGER NOT NULL DEFAULT 1,
        repair_enabled INTEGER NOT NULL DEFAULT 0,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS repo_settings (
        repo_internal_id TEXT PRIMARY KEY
            REFERENCES repositories(internal_id) ON DELETE CASCADE,
        auto_repair INTEGER NOT NULL DEFAULT 1,
        enabled_smells TEXT NOT NULL DEFAULT '[]',
        updated_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS smell_summary (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pr_id INTEGER NOT NULL UNIQUE REFERENCES pull_requests(pr_id) ON DELETE CASCADE,
        repo_internal_id TEXT NOT NULL,
        total_smells INTEGER NOT NULL DEFAULT 0
    );",
    "CREATE TABLE IF NOT EXISTS files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pr_id INTEGER NOT NULL REFERENCES pull_requests(pr_id) ON DELETE CASCADE,
        repo_internal_id TEXT NOT NULL,
        file_path TEXT NOT NULL,
        blob_sha TEXT,
        status TEXT NOT NULL DEFAULT 'modified',
        updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(pr_id, file_path)
    );",
    // ── indexes (8) ─────────────────────────────────────────────────────
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_comment_smells_current_occurrence \
     ON comment_smells(pr_id, file_path, occurrence_key) WHERE is_current = 1;",
    // A redelivered occurrence carries its annotation id over to the new
    // generation, so the id is unique among current rows only.
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_comment_smells_external_id \
     ON comment_smells(external_comment_id) \
     WHERE external_comment_id IS NOT NULL AND is_current = 1;",
    "CREATE INDEX IF NOT EXISTS idx_comment_smells_pr_current ON comment_smells(pr_id, is_current);",
    "CREATE INDEX IF NOT EXISTS idx_comment_smells_occurrence \
     ON comment_smells(pr_id, file_path, occurrence_key);",
    "CREATE INDEX IF NOT EXISTS idx_comment_smells_type ON comment_smells(smell_type);",
    "CREATE INDEX IF NOT EXISTS idx_repositories_installation ON repositories(installation_id);",
    "CREATE INDEX IF NOT EXISTS idx_repositories_full_name ON repositories(full_name);",
    "CREATE INDEX IF NOT EXISTS idx_pull_requests_repo ON pull_requests(repo_internal_id, pr_number);",
];

// ─── Migrations ─────────────────────────────────────────────────────────────

/// One schema step. `version` is the version stamped once `apply` succeeds.
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    apply: fn(&Connection) -> SmellResult<()>,
}

/// Ordered schema history. New steps are appended with the next version.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "baseline ledger schema",
    apply: stamp_baseline,
}];

/// The baseline tables come from [`SCHEMA_STATEMENTS`]; the step records when
/// this ledger file was first initialised.
fn stamp_baseline(conn: &Connection) -> SmellResult<()> {
    conn.execute(
        "INSERT INTO ledger_meta(key, value) VALUES('initialised_at', CURRENT_TIMESTAMP) \
         ON CONFLICT(key) DO NOTHING;",
        [],
    )?;
    Ok(())
}

/// Apply every migration newer than the stored version, each inside its own
/// SAVEPOINT. A failing step is rolled back, logged to `migration_history`
/// and returned; earlier steps stay committed.
pub fn migrate_schema(conn: &Connection) -> SmellResult<()> {
    let mut version = get_schema_version(conn);
    let start = version;
    for step in MIGRATIONS.iter().filter(move |m| m.version > start) {
        conn.execute_batch("SAVEPOINT ledger_migration;")?;
        let applied = (step.apply)(conn)
            .and_then(|()| set_schema_version(conn, step.version))
            .and_then(|()| record_step(conn, version, step, "success", None));
        if let Err(e) = applied {
            let _ = conn.execute_batch("ROLLBACK TO ledger_migration; RELEASE ledger_migration;");
            let _ = record_step(conn, version, step, "failed", Some(&e.to_string()));
            tracing::error!(from = version, to = step.version, "ledger migration failed: {e}");
            return Err(e);
        }
        conn.execute_batch("RELEASE ledger_migration;")?;
        tracing::debug!(version = step.version, step = step.description, "ledger migrated");
        version = step.version;
    }
    Ok(())
}

/// Stored schema version, 0 for a ledger that was never migrated.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT value FROM ledger_meta WHERE key = 'schema_version';",
        [],
        |row| row.get::<_, String>(0),
    )
    .ok()
    .and_then(|v| v.parse().ok())
    .unwrap_or(0)
}

fn set_schema_version(conn: &Connection, version: i32) -> SmellResult<()> {
    conn.execute(
        "INSERT INTO ledger_meta(key, value) VALUES('schema_version', ?1) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        rusqlite::params![version.to_string()],
    )?;
    Ok(())
}

fn record_step(
    conn: &Connection,
    from: i32,
    step: &Migration,
    status: &str,
    error: Option<&str>,
) -> SmellResult<()> {
    conn.execute(
        "INSERT INTO migration_history(from_version, to_version, description, status, error_message) \
         VALUES (?1, ?2, ?3, ?4, ?5);",
        rusqlite::params![from, step.version, step.description, status, error],
    )?;
    Ok(())
}
