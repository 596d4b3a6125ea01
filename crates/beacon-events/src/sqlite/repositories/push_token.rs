//! Push-token repository: keyed upsert for the `push_tokens` table.
//!
//! Tokens are keyed by `(device_id, platform, sandbox)`: re-registering
//! replaces the token string for that slot. No derivation happens here.

use rusqlite::{Connection, params};

use crate::errors::Result;
use crate::sqlite::row_types::PushTokenRow;

/// Stateless repository over the `push_tokens` table.
pub struct PushTokenRepo;

impl PushTokenRepo {
    /// Insert or replace the token for `(device_id, platform, sandbox)`.
    pub fn upsert(
        conn: &Connection,
        device_id: &str,
        platform: &str,
        token: &str,
        sandbox: bool,
        now: &str,
    ) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO push_tokens (device_id, platform, token, sandbox, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(device_id, platform, sandbox) DO UPDATE SET
                token = excluded.token,
                updated_at = excluded.updated_at",
            params![device_id, platform, token, i32::from(sandbox), now],
        )?;
        Ok(())
    }

    /// List every registered token.
    pub fn list(conn: &Connection) -> Result<Vec<PushTokenRow>> {
        let mut stmt = conn.prepare(
            "SELECT device_id, platform, token, sandbox, updated_at FROM push_tokens",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let sandbox: i32 = row.get(3)?;
                Ok(PushTokenRow {
                    device_id: row.get(0)?,
                    platform: row.get(1)?,
                    token: row.get(2)?,
                    sandbox: sandbox != 0,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete a token the push provider reported as gone.
    /// Returns `true` if a row was deleted.
    pub fn delete_by_token(conn: &Connection, token: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM push_tokens WHERE token = ?1", params![token])?;
        Ok(changed > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
