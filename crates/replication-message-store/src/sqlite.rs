//! SQLite implementation of the message store.

use crate::{migrations, normalize_targets, MessageStore, StoreError, StoreResult, StoredMessageRecord};
use chrono::Utc;
use replication_core::{
    decode_date, encode_date, CustomMetadata, MessageId, ReplicationInstance, SenderMessage,
};
use rusqlite::{params, Connection};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Message store backed by a single SQLite connection.
///
/// The connection sits behind a mutex: every operation, including the
/// read-modify-write of a target set, runs in one transaction while holding it.
pub struct SqliteMessageStore {
    conn: Mutex<Connection>,
}

/// Raw message row, decoded outside of rusqlite's row closure.
struct MessageRow {
    id: String,
    message_type: String,
    date: String,
    source: Option<String>,
    receivers: String,
    custom_metadata: String,
    payload: Vec<u8>,
}

impl SqliteMessageStore {
    /// Open a store at the given path, running migrations if needed.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
        migrations::run_migrations(&conn)?;

        info!(path = %path.display(), "Opened message store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store for testing.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of outstanding deliveries per target URI.
    pub fn count_by_target(&self) -> StoreResult<Vec<(String, usize)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT target_uri, COUNT(*) FROM replication_message_targets
             GROUP BY target_uri ORDER BY target_uri",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }
}

impl MessageStore for SqliteMessageStore {
    fn write_record(
        &self,
        message: &SenderMessage,
        targets: &[ReplicationInstance],
    ) -> StoreResult<StoredMessageRecord> {
        let targets = normalize_targets(targets);
        if targets.is_empty() {
            return Err(StoreError::InvalidData(format!(
                "Message [{}] has no target to store",
                message.id
            )));
        }

        let receivers = serde_json::to_string(&message.receivers)?;
        let custom_metadata = serde_json::to_string(&message.custom_metadata)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO replication_messages
                (id, message_type, date, source, receivers, custom_metadata, payload, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                message_type = excluded.message_type,
                date = excluded.date,
                source = excluded.source,
                receivers = excluded.receivers,
                custom_metadata = excluded.custom_metadata,
                payload = excluded.payload",
            params![
                message.id.as_str(),
                message.message_type,
                encode_date(message.date),
                message.source,
                receivers,
                custom_metadata,
                message.payload,
                Utc::now().to_rfc3339(),
            ],
        )?;

        tx.execute(
            "DELETE FROM replication_message_targets WHERE message_id = ?1",
            params![message.id.as_str()],
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO replication_message_targets (message_id, position, target_uri, target_name)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, target) in targets.iter().enumerate() {
                insert.execute(params![
                    message.id.as_str(),
                    position as i64,
                    target.uri,
                    target.name
                ])?;
            }
        }

        tx.commit()?;

        debug!(message_id = %message.id, targets = targets.len(), "Stored message");
        Ok(StoredMessageRecord {
            message: message.clone(),
            targets,
        })
    }

    fn load_all(&self) -> StoreResult<Vec<StoredMessageRecord>> {
        let conn = self.lock()?;

        let rows = {
            let mut stmt = conn.prepare(
                "SELECT id, message_type, date, source, receivers, custom_metadata, payload
                 FROM replication_messages ORDER BY seq",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        message_type: row.get(1)?,
                        date: row.get(2)?,
                        source: row.get(3)?,
                        receivers: row.get(4)?,
                        custom_metadata: row.get(5)?,
                        payload: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut targets_stmt = conn.prepare(
            "SELECT target_name, target_uri FROM replication_message_targets
             WHERE message_id = ?1 ORDER BY position",
        )?;

        let mut records = Vec::with_capacity(rows.len());
        let mut orphans = Vec::new();

        for row in rows {
            let targets = targets_stmt
                .query_map(params![row.id], |r| {
                    Ok(ReplicationInstance::new(
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            if targets.is_empty() {
                orphans.push(row.id);
                continue;
            }

            let id = row.id.clone();
            match decode_message(row) {
                Ok(message) => records.push(StoredMessageRecord { message, targets }),
                Err(e) => {
                    warn!(message_id = %id, error = %e, "Skipping stored message that cannot be decoded");
                }
            }
        }
        drop(targets_stmt);

        for id in &orphans {
            warn!(message_id = %id, "Purging stored message without targets");
            conn.execute("DELETE FROM replication_messages WHERE id = ?1", params![id])?;
        }

        debug!(count = records.len(), "Loaded stored messages");
        Ok(records)
    }

    fn remove_target(
        &self,
        message_id: &MessageId,
        target: &ReplicationInstance,
    ) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let removed = tx.execute(
            "DELETE FROM replication_message_targets WHERE message_id = ?1 AND target_uri = ?2",
            params![message_id.as_str(), target.uri],
        )?;

        let remaining: i64 = tx.query_row(
            "SELECT COUNT(*) FROM replication_message_targets WHERE message_id = ?1",
            params![message_id.as_str()],
            |row| row.get(0),
        )?;

        if remaining == 0 {
            let deleted = tx.execute(
                "DELETE FROM replication_messages WHERE id = ?1",
                params![message_id.as_str()],
            )?;
            if deleted > 0 {
                debug!(message_id = %message_id, "Message delivered to every target, record deleted");
            }
        }

        tx.commit()?;

        if removed == 0 {
            debug!(message_id = %message_id, target = %target.uri, "Target already absent");
        }
        Ok(())
    }

    fn count(&self) -> StoreResult<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM replication_messages", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn decode_message(row: MessageRow) -> StoreResult<SenderMessage> {
    let date = decode_date(&row.date).map_err(|e| {
        StoreError::InvalidData(format!("Invalid date [{}] for message [{}]: {}", row.date, row.id, e))
    })?;
    let receivers: BTreeSet<String> = serde_json::from_str(&row.receivers)?;
    let custom_metadata: CustomMetadata = serde_json::from_str(&row.custom_metadata)?;

    Ok(SenderMessage {
        id: MessageId::from(row.id),
        date,
        message_type: row.message_type,
        source: row.source,
        receivers,
        custom_metadata,
        payload: row.payload,
    })
}
