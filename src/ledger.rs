use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

pub const LEDGER_SCHEMA_VERSION: &str = "0.1.0";
pub const LEDGER_FILE: &str = "skuscan_ledger.sqlite";

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub run_id: String,
    pub target_id: String,
    pub retailer: String,
    pub generation: u64,
    pub status: String,
    pub score: Option<f64>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub result_json: Option<String>,
    pub merged_json: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerCounts {
    pub total: i64,
    pub completed: i64,
    pub failed: i64,
    pub distinct_targets: i64,
}

pub fn open_ledger(path: &Path) -> Result<Connection> {
    let connection =
        Connection::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS analyses (
              analysis_id INTEGER PRIMARY KEY AUTOINCREMENT,
              run_id TEXT NOT NULL,
              target_id TEXT NOT NULL,
              retailer TEXT NOT NULL,
              generation INTEGER NOT NULL,
              status TEXT NOT NULL,
              score REAL,
              error_kind TEXT,
              error_message TEXT,
              result_json TEXT,
              merged_json TEXT,
              created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_analyses_target ON analyses(target_id);
            ",
        )
        .context("failed to create ledger schema")?;

    connection
        .execute(
            "INSERT OR REPLACE INTO metadata(key, value) VALUES('schema_version', ?1)",
            params![LEDGER_SCHEMA_VERSION],
        )
        .context("failed to record ledger schema version")?;

    Ok(())
}

pub fn record_analysis(connection: &Connection, entry: &LedgerEntry) -> Result<i64> {
    let generation = i64::try_from(entry.generation).context("generation exceeds i64 range")?;

    connection
        .execute(
            "
            INSERT INTO analyses(
              run_id, target_id, retailer, generation, status, score,
              error_kind, error_message, result_json, merged_json, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
            params![
                entry.run_id,
                entry.target_id,
                entry.retailer,
                generation,
                entry.status,
                entry.score,
                entry.error_kind,
                entry.error_message,
                entry.result_json,
                entry.merged_json,
                entry.created_at,
            ],
        )
        .with_context(|| format!("failed to record analysis for {}", entry.target_id))?;

    Ok(connection.last_insert_rowid())
}

pub fn ledger_counts(connection: &Connection) -> Result<LedgerCounts> {
    let counts = connection
        .query_row(
            "
            SELECT
              COUNT(*),
              COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
              COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0),
              COUNT(DISTINCT target_id)
            FROM analyses
            ",
            [],
            |row| {
                Ok(LedgerCounts {
                    total: row.get(0)?,
                    completed: row.get(1)?,
                    failed: row.get(2)?,
                    distinct_targets: row.get(3)?,
                })
            },
        )
        .context("failed to count ledger entries")?;
    Ok(counts)
}

pub fn latest_for_target(connection: &Connection, target_id: &str) -> Result<Option<LedgerEntry>> {
    let mut statement = connection
        .prepare(
            "
            SELECT run_id, target_id, retailer, generation, status, score,
                   error_kind, error_message, result_json, merged_json, created_at
            FROM analyses
            WHERE target_id = ?1
            ORDER BY analysis_id DESC
            LIMIT 1
            ",
        )
        .context("failed to prepare latest analysis query")?;

    let mut rows = statement
        .query(params![target_id])
        .context("failed to query latest analysis")?;

    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let generation: i64 = row.get(3)?;
    Ok(Some(LedgerEntry {
        run_id: row.get(0)?,
        target_id: row.get(1)?,
        retailer: row.get(2)?,
        generation: u64::try_from(generation).unwrap_or_default(),
        status: row.get(4)?,
        score: row.get(5)?,
        error_kind: row.get(6)?,
        error_message: row.get(7)?,
        result_json: row.get(8)?,
        merged_json: row.get(9)?,
        created_at: row.get(10)?,
    }))
}
