//! Message store schema migrations.
//!
//! Migrations are run in order and tracked in the `migrations` table.

use crate::StoreResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version >= CURRENT_VERSION {
        debug!(current_version, "Message store schema up to date");
        return Ok(());
    }

    info!(current_version, target_version = CURRENT_VERSION, "Running message store migrations");

    if current_version < 1 {
        migrate_v1_messages(conn)?;
    }

    info!("Message store migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: messages waiting for delivery and their outstanding targets.
fn migrate_v1_messages(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE replication_messages (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            message_type TEXT NOT NULL,
            date TEXT NOT NULL,
            source TEXT,
            receivers TEXT NOT NULL,
            custom_metadata TEXT NOT NULL,
            payload BLOB NOT NULL,
            stored_at TEXT NOT NULL
        );

        CREATE TABLE replication_message_targets (
            message_id TEXT NOT NULL REFERENCES replication_messages(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            target_uri TEXT NOT NULL,
            target_name TEXT NOT NULL,
            PRIMARY KEY (message_id, target_uri)
        );

        CREATE INDEX idx_replication_message_targets_uri
            ON replication_message_targets(target_uri);
        ",
    )?;
    record_migration(conn, 1, "messages")
}
