//! SQLite-backed durable call store.
//!
//! Uses `rusqlite` to persist one row per call in a `calls` table keyed by
//! the carrier call SID. The connection lives behind a Tokio mutex and every
//! mutation is a single statement or transaction, which gives the per-key
//! read-modify-write atomicity the webhook handlers rely on when callbacks
//! for the same call arrive close together.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use ringline_core::{ActionTaken, CallDirection, CallRecord, CallStatus};

use crate::store::{CallMutator, CallStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS calls (
         call_sid           TEXT PRIMARY KEY,
         id                 TEXT NOT NULL,
         from_number        TEXT NOT NULL,
         to_number          TEXT NOT NULL,
         status             TEXT NOT NULL,
         direction          TEXT NOT NULL,
         start_time         TEXT NOT NULL,
         end_time           TEXT,
         duration           INTEGER,
         digits_pressed     TEXT,
         action_taken       TEXT,
         forwarded_to       TEXT,
         recording_url      TEXT,
         recording_duration INTEGER,
         error_message      TEXT,
         created_at         TEXT NOT NULL,
         updated_at         TEXT NOT NULL
     );
     CREATE INDEX IF NOT EXISTS idx_calls_start_time ON calls(start_time);";

pub struct SqliteCallStore {
    conn: Mutex<Connection>,
}

impl SqliteCallStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open SQLite call database")?;

        conn.execute_batch(&format!("PRAGMA journal_mode=WAL;\n{SCHEMA}"))
            .context("Failed to initialize calls schema")?;

        info!("SqliteCallStore opened at {:?}", path.as_ref());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

#[async_trait]
impl CallStore for SqliteCallStore {
    async fn find_by_call_sid(&self, call_sid: &str) -> Result<Option<CallRecord>> {
        let conn = self.conn.lock().await;
        let record = conn
            .query_row(
                "SELECT call_sid, id, from_number, to_number, status, direction,
                        start_time, end_time, duration, digits_pressed, action_taken,
                        forwarded_to, recording_url, recording_duration, error_message,
                        created_at, updated_at
                 FROM calls WHERE call_sid = ?1",
                params![call_sid],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    async fn insert_if_absent(&self, record: &CallRecord) -> Result<bool> {
        let conn = self.conn.lock().await;
        let inserted = conn.execute(
            "INSERT INTO calls (call_sid, id, from_number, to_number, status, direction,
                                start_time, end_time, duration, digits_pressed, action_taken,
                                forwarded_to, recording_url, recording_duration, error_message,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
             ON CONFLICT(call_sid) DO NOTHING",
            rusqlite::params_from_iter(record_params(record).iter().map(|p| p.as_ref())),
        )?;
        debug!(call_sid = %record.call_sid, inserted = inserted > 0, "insert_if_absent");
        Ok(inserted > 0)
    }

    async fn update(&self, call_sid: &str, mutate: CallMutator) -> Result<Option<CallRecord>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let record = tx
            .query_row(
                "SELECT call_sid, id, from_number, to_number, status, direction,
                        start_time, end_time, duration, digits_pressed, action_taken,
                        forwarded_to, recording_url, recording_duration, error_message,
                        created_at, updated_at
                 FROM calls WHERE call_sid = ?1",
                params![call_sid],
                row_to_record,
            )
            .optional()?;

        let Some(mut record) = record else {
            return Ok(None);
        };

        mutate(&mut record);
        record.updated_at = Utc::now();

        tx.execute(
            "UPDATE calls SET
                 id = ?2, from_number = ?3, to_number = ?4, status = ?5, direction = ?6,
                 start_time = ?7, end_time = ?8, duration = ?9, digits_pressed = ?10,
                 action_taken = ?11, forwarded_to = ?12, recording_url = ?13,
                 recording_duration = ?14, error_message = ?15, created_at = ?16,
                 updated_at = ?17
             WHERE call_sid = ?1",
            rusqlite::params_from_iter(record_params(&record).iter().map(|p| p.as_ref())),
        )?;
        tx.commit()?;

        Ok(Some(record))
    }

    async fn list_all(&self) -> Result<Vec<CallRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT call_sid, id, from_number, to_number, status, direction,
                    start_time, end_time, duration, digits_pressed, action_taken,
                    forwarded_to, recording_url, recording_duration, error_message,
                    created_at, updated_at
             FROM calls ORDER BY start_time DESC",
        )?;
        let records: Vec<CallRecord> = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<_>>()?;
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Row serialization helpers
// ---------------------------------------------------------------------------

fn record_params(record: &CallRecord) -> Vec<Box<dyn rusqlite::types::ToSql>> {
    vec![
        Box::new(record.call_sid.clone()),
        Box::new(record.id.to_string()),
        Box::new(record.from.clone()),
        Box::new(record.to.clone()),
        Box::new(record.status.as_str().to_string()),
        Box::new(record.direction.as_str().to_string()),
        Box::new(record.start_time.to_rfc3339()),
        Box::new(record.end_time.map(|t| t.to_rfc3339())),
        Box::new(record.duration),
        Box::new(record.digits_pressed.clone()),
        Box::new(record.action_taken.as_ref().map(|a| a.wire_name())),
        Box::new(record.forwarded_to.clone()),
        Box::new(record.recording_url.clone()),
        Box::new(record.recording_duration),
        Box::new(record.error_message.clone()),
        Box::new(record.created_at.to_rfc3339()),
        Box::new(record.updated_at.to_rfc3339()),
    ]
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<CallRecord> {
    let id_str: String = row.get(1)?;
    let status: String = row.get(4)?;
    let direction: String = row.get(5)?;
    let start_time: String = row.get(6)?;
    let end_time: Option<String> = row.get(7)?;
    let action_taken: Option<String> = row.get(10)?;
    let created_at: String = row.get(15)?;
    let updated_at: String = row.get(16)?;

    let id = Uuid::parse_str(&id_str)
        .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?;
    let direction = match direction.as_str() {
        "outbound" => CallDirection::Outbound,
        _ => CallDirection::Inbound,
    };

    Ok(CallRecord {
        call_sid: row.get(0)?,
        id,
        from: row.get(2)?,
        to: row.get(3)?,
        status: CallStatus::parse(&status),
        direction,
        start_time: parse_timestamp(&start_time)?,
        end_time: end_time.as_deref().map(parse_timestamp).transpose()?,
        duration: row.get(8)?,
        digits_pressed: row.get(9)?,
        action_taken: action_taken.as_deref().map(ActionTaken::parse),
        forwarded_to: row.get(11)?,
        recording_url: row.get(12)?,
        recording_duration: row.get(13)?,
        error_message: row.get(14)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_sqlite_store_roundtrip() {
        let store = SqliteCallStore::in_memory().expect("in-memory db");
        let mut record = CallRecord::new_inbound("CA100", "+15550001111", "+15550002222");
        record.digits_pressed = Some("1".to_string());
        record.action_taken = Some(ActionTaken::Forwarded);
        record.forwarded_to = Some("+15550003333".to_string());

        assert!(store.insert_if_absent(&record).await.unwrap());

        let found = store.find_by_call_sid("CA100").await.unwrap().unwrap();
        assert_eq!(found.id, record.id);
        assert_eq!(found.status, CallStatus::Initiated);
        assert_eq!(found.action_taken, Some(ActionTaken::Forwarded));
        assert_eq!(found.forwarded_to.as_deref(), Some("+15550003333"));
        // RFC 3339 round-trip keeps sub-second precision.
        assert_eq!(found.start_time, record.start_time);
    }

    #[tokio::test]
    async fn test_sqlite_insert_if_absent_no_duplicate() {
        let store = SqliteCallStore::in_memory().unwrap();
        let record = CallRecord::new_inbound("CA100", "+1A", "+1B");

        assert!(store.insert_if_absent(&record).await.unwrap());
        // Retry with a fresh record object for the same SID.
        let retry = CallRecord::new_inbound("CA100", "+1A", "+1B");
        assert!(!store.insert_if_absent(&retry).await.unwrap());

        let found = store.find_by_call_sid("CA100").await.unwrap().unwrap();
        assert_eq!(found.id, record.id);
    }

    #[tokio::test]
    async fn test_sqlite_update_persists_mutation() {
        let store = SqliteCallStore::in_memory().unwrap();
        let record = CallRecord::new_inbound("CA100", "+1A", "+1B");
        store.insert_if_absent(&record).await.unwrap();

        let updated = store
            .update(
                "CA100",
                Box::new(|call| {
                    call.status = CallStatus::Completed;
                    call.action_taken = Some(ActionTaken::HungUpBeforeAction);
                    call.end_time = Some(Utc::now());
                }),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, CallStatus::Completed);

        let found = store.find_by_call_sid("CA100").await.unwrap().unwrap();
        assert_eq!(found.status, CallStatus::Completed);
        assert_eq!(found.action_taken, Some(ActionTaken::HungUpBeforeAction));
        assert!(found.end_time.is_some());
        assert!(found.updated_at >= record.updated_at);
    }

    #[tokio::test]
    async fn test_sqlite_update_unknown_sid_is_none() {
        let store = SqliteCallStore::in_memory().unwrap();
        let result = store.update("CA-missing", Box::new(|_| {})).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_sqlite_list_all_newest_first() {
        let store = SqliteCallStore::in_memory().unwrap();
        let mut older = CallRecord::new_inbound("CA1", "+1A", "+1B");
        older.start_time = older.start_time - Duration::minutes(5);
        let newer = CallRecord::new_inbound("CA2", "+1C", "+1D");

        store.insert_if_absent(&older).await.unwrap();
        store.insert_if_absent(&newer).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].call_sid, "CA2");
        assert_eq!(all[1].call_sid, "CA1");
    }

    #[tokio::test]
    async fn test_sqlite_preserves_unknown_status_string() {
        let store = SqliteCallStore::in_memory().unwrap();
        let mut record = CallRecord::new_inbound("CA1", "+1A", "+1B");
        record.status = CallStatus::Other("queued".to_string());
        store.insert_if_absent(&record).await.unwrap();

        let found = store.find_by_call_sid("CA1").await.unwrap().unwrap();
        assert_eq!(found.status, CallStatus::Other("queued".to_string()));
    }
}
