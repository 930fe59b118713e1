use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::parser::table::NestedTable;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS fetch_log (
            id         INTEGER PRIMARY KEY,
            page       INTEGER NOT NULL,
            url        TEXT NOT NULL,
            status     INTEGER,
            error      TEXT,
            latency_ms INTEGER,
            fetched_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_fetch_log_page ON fetch_log(page);

        -- Final table: one row per variable, nested tables as gzipped JSON
        CREATE TABLE IF NOT EXISTS variables (
            position    INTEGER PRIMARY KEY,
            id          TEXT NOT NULL,
            description TEXT NOT NULL,
            text        TEXT,
            properties  BLOB NOT NULL,
            marginals   BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_variables_id ON variables(id);
        ",
    )?;
    Ok(())
}

// ── Fetching ──

pub struct FetchLogRow {
    pub page: u32,
    pub url: String,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

pub fn log_fetch(conn: &Connection, row: &FetchLogRow) -> Result<()> {
    conn.execute(
        "INSERT INTO fetch_log (page, url, status, error, latency_ms, fetched_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            row.page,
            row.url,
            row.status,
            row.error,
            row.latency_ms,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

// ── Variables ──

/// One surveyed variable: the unit of the final table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRow {
    pub id: String,
    pub description: String,
    /// `None` only when the text join found no match for `id`.
    pub text: Option<String>,
    pub properties: NestedTable,
    pub marginals: NestedTable,
}

/// Replace the stored table with `rows`, keeping their order.
pub fn save_variables(conn: &Connection, rows: &[VariableRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM variables", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO variables (position, id, description, text, properties, marginals)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (pos, r) in rows.iter().enumerate() {
            stmt.execute(rusqlite::params![
                pos as i64,
                r.id,
                r.description,
                r.text,
                compress(&r.properties)?,
                compress(&r.marginals)?,
            ])?;
        }
    }
    tx.commit()?;
    Ok(rows.len())
}

pub fn load_variables(conn: &Connection) -> Result<Vec<VariableRow>> {
    query_variables(
        conn,
        "SELECT id, description, text, properties, marginals FROM variables ORDER BY position",
        [],
    )
}

/// All stored variables named `id` (ids are stored lower-cased).
pub fn find_variables(conn: &Connection, id: &str) -> Result<Vec<VariableRow>> {
    query_variables(
        conn,
        "SELECT id, description, text, properties, marginals FROM variables
         WHERE id = ?1 ORDER BY position",
        [id.to_lowercase()],
    )
}

fn query_variables<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<VariableRow>> {
    let mut stmt = conn.prepare(sql)?;
    let raw = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Vec<u8>>(3)?,
                row.get::<_, Vec<u8>>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(id, description, text, properties, marginals)| {
            Ok(VariableRow {
                properties: decompress(&properties)
                    .with_context(|| format!("Corrupt properties for {}", id))?,
                marginals: decompress(&marginals)
                    .with_context(|| format!("Corrupt marginals for {}", id))?,
                id,
                description,
                text,
            })
        })
        .collect()
}

fn compress(table: &NestedTable) -> Result<Vec<u8>> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut enc, table)?;
    Ok(enc.finish()?)
}

fn decompress(bytes: &[u8]) -> Result<NestedTable> {
    let mut json = String::new();
    GzDecoder::new(bytes).read_to_string(&mut json)?;
    Ok(serde_json::from_str(&json)?)
}

// ── Stats ──

pub struct Stats {
    pub fetch_attempts: usize,
    pub fetch_errors: usize,
    pub variables: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let fetch_attempts: usize =
        conn.query_row("SELECT COUNT(*) FROM fetch_log", [], |r| r.get(0))?;
    let fetch_errors: usize = conn.query_row(
        "SELECT COUNT(*) FROM fetch_log WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let variables: usize = conn.query_row("SELECT COUNT(*) FROM variables", [], |r| r.get(0))?;
    Ok(Stats {
        fetch_attempts,
        fetch_errors,
        variables,
    })
}
