use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::app_dirs::AppDirs;
use crate::content::Difficulty;
use crate::error::StatsError;

/// Result of one completed typing session, ready to persist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypingRecord {
    pub book_id: u32,
    pub wpm: u32,
    pub accuracy: u32,
    pub difficulty: Difficulty,
    pub timestamp: DateTime<Local>,
}

/// A persisted [`TypingRecord`] with its row id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: TypingRecord,
}

/// Aggregate over every stored session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsSummary {
    pub sessions: i64,
    pub avg_wpm: f64,
    pub avg_accuracy: f64,
    pub best_wpm: u32,
}

/// Anything that accepts completed sessions. Failures never reach the engine.
pub trait StatsSink {
    fn record(&mut self, record: &TypingRecord) -> Result<i64, StatsError>;

    fn best_wpm(&self, _book_id: u32, _difficulty: Difficulty) -> Result<Option<u32>, StatsError> {
        Ok(None)
    }
}

/// SQLite-backed history of completed sessions
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Open (or create) the database at the default state path
    pub fn open_default() -> Result<Self, StatsError> {
        let path = AppDirs::db_path().ok_or(StatsError::NoDataDir)?;
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StatsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StatsError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StatsError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS typing_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                book_id INTEGER NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                difficulty TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_typing_stats_book ON typing_stats(book_id, difficulty)",
            [],
        )?;

        Ok(StatsDb { conn })
    }

    pub fn records_for_book(&self, book_id: u32) -> Result<Vec<StoredRecord>, StatsError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, book_id, wpm, accuracy, difficulty, timestamp
            FROM typing_stats
            WHERE book_id = ?1
            ORDER BY timestamp DESC, id DESC
            "#,
        )?;
        let rows = stmt.query_map([book_id], stored_record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Most recent sessions first
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredRecord>, StatsError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, book_id, wpm, accuracy, difficulty, timestamp
            FROM typing_stats
            ORDER BY timestamp DESC, id DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt.query_map([limit as i64], stored_record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Highest WPM for a book at a difficulty, if any session was recorded
    pub fn best_for(&self, book_id: u32, difficulty: Difficulty) -> Result<Option<u32>, StatsError> {
        let best: Option<u32> = self.conn.query_row(
            "SELECT MAX(wpm) FROM typing_stats WHERE book_id = ?1 AND difficulty = ?2",
            params![book_id, difficulty.to_string()],
            |row| row.get(0),
        )?;
        Ok(best)
    }

    pub fn summary(&self) -> Result<StatsSummary, StatsError> {
        let summary = self.conn.query_row(
            "SELECT COUNT(*), AVG(wpm), AVG(accuracy), MAX(wpm) FROM typing_stats",
            [],
            |row| {
                Ok(StatsSummary {
                    sessions: row.get(0)?,
                    avg_wpm: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                    avg_accuracy: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                    best_wpm: row.get::<_, Option<u32>>(3)?.unwrap_or(0),
                })
            },
        )?;
        Ok(summary)
    }

    /// Write every stored session as CSV, oldest first
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize, StatsError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, book_id, wpm, accuracy, difficulty, timestamp
            FROM typing_stats
            ORDER BY timestamp ASC, id ASC
            "#,
        )?;
        let rows = stmt.query_map([], stored_record_from_row)?;

        let mut out = csv::Writer::from_writer(writer);
        out.write_record(["id", "book_id", "wpm", "accuracy", "difficulty", "timestamp"])?;
        let mut written = 0;
        for row in rows {
            let stored = row?;
            out.write_record([
                stored.id.to_string(),
                stored.record.book_id.to_string(),
                stored.record.wpm.to_string(),
                stored.record.accuracy.to_string(),
                stored.record.difficulty.to_string(),
                stored.record.timestamp.to_rfc3339(),
            ])?;
            written += 1;
        }
        out.flush()?;
        Ok(written)
    }

    pub fn clear(&self) -> Result<(), StatsError> {
        self.conn.execute("DELETE FROM typing_stats", [])?;
        Ok(())
    }
}

impl StatsSink for StatsDb {
    fn record(&mut self, record: &TypingRecord) -> Result<i64, StatsError> {
        self.conn.execute(
            r#"
            INSERT INTO typing_stats (book_id, wpm, accuracy, difficulty, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.book_id,
                record.wpm,
                record.accuracy,
                record.difficulty.to_string(),
                record.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn best_wpm(&self, book_id: u32, difficulty: Difficulty) -> Result<Option<u32>, StatsError> {
        self.best_for(book_id, difficulty)
    }
}

fn stored_record_from_row(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    let difficulty_str: String = row.get(4)?;
    let difficulty = Difficulty::parse(&difficulty_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(4, "difficulty".to_string(), rusqlite::types::Type::Text)
    })?;

    let timestamp_str: String = row.get(5)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(5, "timestamp".to_string(), rusqlite::types::Type::Text)
        })?
        .with_timezone(&Local);

    Ok(StoredRecord {
        id: row.get(0)?,
        record: TypingRecord {
            book_id: row.get(1)?,
            wpm: row.get(2)?,
            accuracy: row.get(3)?,
            difficulty,
            timestamp,
        },
    })
}

/// Human readable age like "5 minutes ago"
pub fn humanize_age(timestamp: DateTime<Local>, now: DateTime<Local>) -> String {
    let secs = (now - timestamp).num_seconds().max(0) as u64;
    time_humanize::HumanTime::from(std::time::Duration::from_secs(secs))
        .to_text_en(time_humanize::Accuracy::Rough, time_humanize::Tense::Past)
}
