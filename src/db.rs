use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::parser::{Record, ScanStats};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS extraction_runs (
            id            INTEGER PRIMARY KEY,
            source_path   TEXT NOT NULL,
            pages_total   INTEGER NOT NULL,
            pages_skipped INTEGER NOT NULL,
            pages_empty   INTEGER NOT NULL,
            record_count  INTEGER NOT NULL,
            orphans       INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS test_items (
            id                INTEGER PRIMARY KEY,
            run_id            INTEGER NOT NULL REFERENCES extraction_runs(id),
            item_number       INTEGER NOT NULL,
            major_item        TEXT NOT NULL,
            minor_item        TEXT NOT NULL,
            test_content      TEXT NOT NULL,
            test_condition    TEXT NOT NULL,
            judgment_criteria TEXT NOT NULL,
            UNIQUE(run_id, item_number)
        );
        CREATE INDEX IF NOT EXISTS idx_items_run ON test_items(run_id);
        ",
    )?;
    Ok(())
}

/// Persist one extraction and its records. Returns the new run id.
pub fn save_run(
    conn: &Connection,
    source_path: &str,
    stats: &ScanStats,
    records: &[Record],
) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO extraction_runs
         (source_path, pages_total, pages_skipped, pages_empty, record_count, orphans)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            source_path,
            stats.pages_seen,
            stats.pages_skipped,
            stats.pages_empty,
            records.len() as i64,
            stats.orphans as i64,
        ],
    )?;
    let run_id = tx.last_insert_rowid();
    {
        let mut stmt = tx.prepare(
            "INSERT INTO test_items
             (run_id, item_number, major_item, minor_item, test_content, test_condition, judgment_criteria)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for r in records {
            stmt.execute(params![
                run_id, r.item_number, r.major_item, r.minor_item,
                r.test_content, r.test_condition, r.judgment_criteria,
            ])?;
        }
    }
    tx.commit()?;
    Ok(run_id)
}

pub struct RunRow {
    pub id: i64,
    pub source_path: String,
    pub pages_total: i64,
    pub record_count: i64,
    pub orphans: i64,
    pub created_at: String,
}

/// Most recent runs first.
pub fn fetch_runs(conn: &Connection, limit: usize) -> Result<Vec<RunRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, source_path, pages_total, record_count, orphans, created_at
         FROM extraction_runs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(RunRow {
                id: row.get(0)?,
                source_path: row.get(1)?,
                pages_total: row.get(2)?,
                record_count: row.get(3)?,
                orphans: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_records(conn: &Connection, run_id: i64) -> Result<Vec<Record>> {
    let mut stmt = conn.prepare(
        "SELECT item_number, major_item, minor_item, test_content, test_condition, judgment_criteria
         FROM test_items WHERE run_id = ?1 ORDER BY item_number",
    )?;
    let rows = stmt
        .query_map([run_id], |row| {
            Ok(Record {
                item_number: row.get(0)?,
                major_item: row.get(1)?,
                minor_item: row.get(2)?,
                test_content: row.get(3)?,
                test_condition: row.get(4)?,
                judgment_criteria: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn run_exists(conn: &Connection, run_id: i64) -> Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM extraction_runs WHERE id = ?1",
        [run_id],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn record(n: u32, content: &str) -> Record {
        Record {
            item_number: n,
            major_item: "■A".into(),
            test_content: content.into(),
            ..Record::default()
        }
    }

    #[test]
    fn save_and_reload() {
        let conn = memory();
        let mut second = record(2, "1-1 制動");
        second.test_condition = "乾燥路面。".into();
        let records = vec![record(1, "■A"), second];
        let stats = ScanStats {
            pages_seen: 6,
            pages_skipped: 3,
            ..ScanStats::default()
        };

        let id = save_run(&conn, "spec.pdf", &stats, &records).unwrap();
        assert!(run_exists(&conn, id).unwrap());
        assert_eq!(fetch_records(&conn, id).unwrap(), records);

        let runs = fetch_runs(&conn, 10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].source_path, "spec.pdf");
        assert_eq!(runs[0].pages_total, 6);
        assert_eq!(runs[0].record_count, 2);
    }

    #[test]
    fn runs_are_isolated() {
        let conn = memory();
        let stats = ScanStats::default();
        let a = save_run(&conn, "a.txt", &stats, &[record(1, "x")]).unwrap();
        let b = save_run(&conn, "b.txt", &stats, &[record(1, "y"), record(2, "z")]).unwrap();
        assert_eq!(fetch_records(&conn, a).unwrap().len(), 1);
        assert_eq!(fetch_records(&conn, b).unwrap().len(), 2);

        let runs = fetch_runs(&conn, 1).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, b);
    }

    #[test]
    fn empty_run_is_kept() {
        let conn = memory();
        let id = save_run(&conn, "blank.txt", &ScanStats::default(), &[]).unwrap();
        assert!(run_exists(&conn, id).unwrap());
        assert!(fetch_records(&conn, id).unwrap().is_empty());
    }

    #[test]
    fn unknown_run() {
        let conn = memory();
        assert!(!run_exists(&conn, 42).unwrap());
    }
}
