use chrono::{DateTime, Local};
use itertools::Itertools;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::{GymError, Result};
use crate::game::GameType;
use crate::record::{aggregate, AggregateStats, Record, RecordMetrics};

/// Append-only history of session records.
pub trait RecordSink {
    /// Store a record and return it with its assigned id.
    fn append(&mut self, record: &Record) -> Result<Record>;

    /// Records of one game, most recent first.
    fn query(&self, game: GameType, limit: Option<usize>) -> Result<Vec<Record>>;

    fn aggregate(&self, game: GameType) -> Result<AggregateStats>;

    /// Remove the history of one game, or of every game with `None`.
    fn clear(&mut self, game: Option<GameType>) -> Result<()>;
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        game TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        completed BOOLEAN NOT NULL,
        payload TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_records_game_timestamp ON records(game, timestamp);
"#;

/// SQLite-backed record history
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Open the database at the default state path, creating it if needed
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("braingym_stats.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(StatsDb { conn })
    }

    /// Every record of every game, oldest first
    pub fn all_records(&self) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, completed, payload FROM records ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt.query_map([], Self::row_to_parts)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::decode(row?)?);
        }
        Ok(records)
    }

    fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, bool, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn decode((id, timestamp, completed, payload): (i64, String, bool, String)) -> Result<Record> {
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| GymError::InvalidImport(format!("bad timestamp {}: {}", timestamp, e)))?
            .with_timezone(&Local);
        let metrics: RecordMetrics = serde_json::from_str(&payload)?;
        Ok(Record {
            id: Some(id),
            timestamp,
            completed,
            metrics,
        })
    }
}

impl RecordSink for StatsDb {
    fn append(&mut self, record: &Record) -> Result<Record> {
        let payload = serde_json::to_string(&record.metrics)?;
        self.conn.execute(
            "INSERT INTO records (game, timestamp, completed, payload) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.game_type().to_string(),
                record.timestamp.to_rfc3339(),
                record.completed,
                payload,
            ],
        )?;
        Ok(Record {
            id: Some(self.conn.last_insert_rowid()),
            ..record.clone()
        })
    }

    fn query(&self, game: GameType, limit: Option<usize>) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, timestamp, completed, payload
            FROM records
            WHERE game = ?1
            ORDER BY timestamp DESC, id DESC
            LIMIT ?2
            "#,
        )?;
        // SQLite treats a negative LIMIT as no limit
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = stmt.query_map(params![game.to_string(), limit], Self::row_to_parts)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::decode(row?)?);
        }
        Ok(records)
    }

    fn aggregate(&self, game: GameType) -> Result<AggregateStats> {
        Ok(aggregate(game, &self.query(game, None)?))
    }

    fn clear(&mut self, game: Option<GameType>) -> Result<()> {
        match game {
            Some(game) => self
                .conn
                .execute("DELETE FROM records WHERE game = ?1", [game.to_string()])?,
            None => self.conn.execute("DELETE FROM records", [])?,
        };
        Ok(())
    }
}

/// In-memory sink for tests and for running without a database.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Vec<Record>,
    next_id: i64,
}

impl MemorySink {
    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &Record) -> Result<Record> {
        self.next_id += 1;
        let stored = Record {
            id: Some(self.next_id),
            ..record.clone()
        };
        self.records.push(stored.clone());
        Ok(stored)
    }

    fn query(&self, game: GameType, limit: Option<usize>) -> Result<Vec<Record>> {
        let mut records: Vec<Record> = self
            .records
            .iter()
            .filter(|r| r.game_type() == game)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    fn aggregate(&self, game: GameType) -> Result<AggregateStats> {
        Ok(aggregate(game, &self.records))
    }

    fn clear(&mut self, game: Option<GameType>) -> Result<()> {
        match game {
            Some(game) => self.records.retain(|r| r.game_type() != game),
            None => self.records.clear(),
        }
        Ok(())
    }
}

/// Versioned wrapper written by [`export_json`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportFile {
    version: u32,
    export_date: DateTime<Local>,
    records: Vec<Record>,
}

const EXPORT_VERSION: u32 = 1;

/// Write the full history of every game as JSON.
pub fn export_json<W: Write>(sink: &dyn RecordSink, writer: W) -> Result<usize> {
    let per_game = GameType::ALL
        .iter()
        .map(|game| sink.query(*game, None))
        .collect::<Result<Vec<_>>>()?;
    let records: Vec<Record> = per_game
        .into_iter()
        .flatten()
        .sorted_by_key(|r| r.timestamp)
        .collect();
    let count = records.len();

    let file = ExportFile {
        version: EXPORT_VERSION,
        export_date: Local::now(),
        records,
    };
    serde_json::to_writer_pretty(writer, &file)?;
    Ok(count)
}

/// Append every record of a JSON export. Nothing is written unless the whole
/// file parses.
pub fn import_json<R: Read>(sink: &mut dyn RecordSink, reader: R) -> Result<usize> {
    let value: serde_json::Value = serde_json::from_reader(reader)?;
    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| GymError::InvalidImport("missing version".into()))?;
    if version != EXPORT_VERSION as u64 {
        return Err(GymError::InvalidImport(format!(
            "unsupported version {}",
            version
        )));
    }
    if !value.get("records").map(|r| r.is_array()).unwrap_or(false) {
        return Err(GymError::InvalidImport("records must be a list".into()));
    }
    let file: ExportFile = serde_json::from_value(value)
        .map_err(|e| GymError::InvalidImport(e.to_string()))?;

    for record in &file.records {
        sink.append(&Record {
            id: None,
            ..record.clone()
        })?;
    }
    Ok(file.records.len())
}

/// Write one game's history as CSV, most recent first.
pub fn export_csv<W: Write>(sink: &dyn RecordSink, game: GameType, writer: W) -> Result<usize> {
    let records = sink.query(game, None)?;
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(["timestamp", "completed", "headline", "comment", "metrics"])?;
    for record in &records {
        wtr.write_record([
            record.timestamp.to_rfc3339(),
            record.completed.to_string(),
            record
                .headline()
                .map(|h| format!("{:.2}", h))
                .unwrap_or_default(),
            record.comment().to_string(),
            serde_json::to_string(&record.metrics)?,
        ])?;
    }
    wtr.flush()?;
    Ok(records.len())
}
