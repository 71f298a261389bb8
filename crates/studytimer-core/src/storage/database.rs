//! SQLite-based storage backend.
//!
//! Provides persistent storage for:
//! - Committed study records (indexed by date and tag)
//! - The ordered tag list
//! - Key-value settings (selected tag, timer snapshot, flags)

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use indoc::indoc;
use rusqlite::{params, Connection, OptionalExtension};

use super::backend::{unique_tags, StoreBackend};
use super::model::{parse_hhmm, BackendKind, NewRecord, SettingValue, StudyRecord};
use crate::error::DatabaseError;

const SCHEMA: &str = indoc! {"
    CREATE TABLE IF NOT EXISTS records (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        tag       TEXT NOT NULL,
        date      TEXT NOT NULL,
        time      TEXT NOT NULL,
        duration  INTEGER NOT NULL CHECK (duration > 0)
    );

    CREATE TABLE IF NOT EXISTS tags (
        name      TEXT PRIMARY KEY,
        position  INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS settings (
        name      TEXT PRIMARY KEY,
        value     TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_records_date ON records(date);
    CREATE INDEX IF NOT EXISTS idx_records_tag ON records(tag);
"};

type RawRecord = (i64, String, String, String, i64);

/// SQLite database backend.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database file at `path` and migrate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or the schema cannot be applied.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory SQLite database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(SCHEMA)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StudyRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(decode_record(row?)?);
        }
        Ok(records)
    }
}

fn decode_record((id, tag, date, time, duration): RawRecord) -> Result<StudyRecord, DatabaseError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|e| DatabaseError::QueryFailed(format!("record {id}: bad date '{date}': {e}")))?;
    let time = parse_hhmm(&time)
        .ok_or_else(|| DatabaseError::QueryFailed(format!("record {id}: bad time '{time}'")))?;
    let duration = u64::try_from(duration)
        .map_err(|_| DatabaseError::QueryFailed(format!("record {id}: negative duration")))?;
    Ok(StudyRecord {
        id,
        tag,
        date,
        time,
        duration,
    })
}

fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn insert_record_sql(conn: &Connection, record: &NewRecord) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO records (tag, date, time, duration) VALUES (?1, ?2, ?3, ?4)",
        params![
            record.tag,
            encode_date(record.date),
            record.time.format("%H:%M").to_string(),
            i64::try_from(record.duration).unwrap_or(i64::MAX),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_tags_sql(conn: &Connection, tags: &[String]) -> Result<(), rusqlite::Error> {
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO tags (name, position) VALUES (?1, ?2)")?;
    for (position, name) in unique_tags(tags).iter().enumerate() {
        stmt.execute(params![name, position as i64])?;
    }
    Ok(())
}

impl StoreBackend for Database {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn load_tags(&self) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM tags ORDER BY position ASC, rowid ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }

    fn save_tags(&mut self, tags: &[String]) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM tags", [])?;
        insert_tags_sql(&tx, tags)?;
        tx.commit()?;
        Ok(())
    }

    fn insert_record(&mut self, record: &NewRecord) -> Result<StudyRecord, DatabaseError> {
        let id = insert_record_sql(&self.conn, record)?;
        Ok(record.clone().with_id(id))
    }

    fn records_by_date(&self, date: NaiveDate) -> Result<Vec<StudyRecord>, DatabaseError> {
        self.query_records(
            "SELECT id, tag, date, time, duration FROM records WHERE date = ?1 ORDER BY id ASC",
            params![encode_date(date)],
        )
    }

    fn all_records(&self) -> Result<Vec<StudyRecord>, DatabaseError> {
        self.query_records(
            "SELECT id, tag, date, time, duration FROM records ORDER BY id ASC",
            [],
        )
    }

    fn record_dates(&self) -> Result<Vec<NaiveDate>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT date FROM records ORDER BY date ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut dates = Vec::new();
        for row in rows {
            let raw = row?;
            let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|e| DatabaseError::QueryFailed(format!("bad date '{raw}': {e}")))?;
            dates.push(date);
        }
        Ok(dates)
    }

    fn get_setting(&self, name: &str) -> Result<Option<SettingValue>, DatabaseError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        // Values written by other tools may not be JSON; keep them as text.
        Ok(raw.map(|raw| serde_json::from_str(&raw).unwrap_or(SettingValue::Text(raw))))
    }

    fn put_setting(&mut self, name: &str, value: &SettingValue) -> Result<(), DatabaseError> {
        let encoded = serde_json::to_string(value)
            .map_err(|e| DatabaseError::QueryFailed(format!("encode setting '{name}': {e}")))?;
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (name, value) VALUES (?1, ?2)",
            params![name, encoded],
        )?;
        Ok(())
    }

    fn delete_setting(&mut self, name: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM settings WHERE name = ?1", params![name])?;
        Ok(())
    }

    fn replace_all(&mut self, records: &[NewRecord], tags: &[String]) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM records", [])?;
        tx.execute("DELETE FROM tags", [])?;
        insert_tags_sql(&tx, tags)?;
        for record in records {
            insert_record_sql(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
    }
}
