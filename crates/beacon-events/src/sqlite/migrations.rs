//! Idempotent schema creation.
//!
//! Every statement is guarded (`IF NOT EXISTS`), so running this against an
//! already-initialized database is a no-op and restarts are safe. Must
//! complete before the server starts accepting traffic.

use rusqlite::Connection;
use tracing::info;

use crate::errors::Result;

/// Create the schema if it does not exist yet.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS devices (
            device_id   TEXT PRIMARY KEY,
            device_name TEXT NOT NULL,
            platform    TEXT NOT NULL,
            first_seen  TEXT NOT NULL,
            last_seen   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            session_id  TEXT PRIMARY KEY,
            device_id   TEXT NOT NULL REFERENCES devices(device_id),
            started_at  TEXT NOT NULL,
            last_event  TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'active',
            cwd         TEXT,
            title       TEXT
        );

        CREATE TABLE IF NOT EXISTS events (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id        TEXT NOT NULL REFERENCES sessions(session_id),
            device_id         TEXT NOT NULL REFERENCES devices(device_id),
            hook_event_name   TEXT NOT NULL,
            timestamp         TEXT NOT NULL,
            received_at       TEXT NOT NULL,
            tool_name         TEXT,
            notification_type TEXT,
            payload           TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_events_session_id ON events(session_id);
        CREATE INDEX IF NOT EXISTS idx_events_device_id ON events(device_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_device_id ON sessions(device_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status);
        CREATE INDEX IF NOT EXISTS idx_sessions_last_event ON sessions(last_event);

        CREATE TABLE IF NOT EXISTS push_tokens (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id   TEXT NOT NULL,
            platform    TEXT NOT NULL,
            token       TEXT NOT NULL,
            sandbox     INTEGER NOT NULL DEFAULT 0,
            updated_at  TEXT NOT NULL,
            UNIQUE(device_id, platform, sandbox)
        );",
    )?;

    info!("database schema ready");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
