//! OutboxStore implementation for SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::core::{OutboxEntry, OutboxStore};
use crate::error::{BackendError, StorageError, StorageResult};
use crate::types::ChangeEnvelope;

use super::SqliteBackend;

fn serialization_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::SerializationError { message })
}

#[async_trait]
impl OutboxStore for SqliteBackend {
    async fn pending(&self, limit: u32) -> StorageResult<Vec<OutboxEntry>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(
            "SELECT seq, event_id, topic, payload, attempts, created_at
             FROM outbox
             WHERE delivered_at IS NULL
             ORDER BY seq
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(seq, event_id, topic, payload, attempts, created_at)| {
                let envelope: ChangeEnvelope = serde_json::from_str(&payload).map_err(|e| {
                    serialization_error(format!("Failed to decode outbox entry {}: {}", seq, e))
                })?;
                let event_id = Uuid::parse_str(&event_id).map_err(|e| {
                    serialization_error(format!("Invalid event id in outbox entry {}: {}", seq, e))
                })?;
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        serialization_error(format!(
                            "Invalid timestamp in outbox entry {}: {}",
                            seq, e
                        ))
                    })?;

                Ok(OutboxEntry {
                    seq,
                    event_id,
                    topic,
                    envelope,
                    attempts,
                    created_at,
                })
            })
            .collect()
    }

    async fn mark_delivered(&self, seq: i64) -> StorageResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE outbox SET delivered_at = ?1 WHERE seq = ?2 AND delivered_at IS NULL",
            params![Utc::now().to_rfc3339(), seq],
        )?;
        Ok(())
    }

    async fn record_failure(&self, seq: i64, message: &str) -> StorageResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE outbox SET attempts = attempts + 1, last_error = ?1 WHERE seq = ?2",
            params![message, seq],
        )?;
        Ok(())
    }

    async fn pending_count(&self) -> StorageResult<u64> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM outbox WHERE delivered_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
