//! Device repository: upsert and listing for the `devices` table.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::projection::DeviceUpsert;
use crate::sqlite::row_types::DeviceRow;

/// Stateless repository; every method takes `&Connection` so the caller
/// owns the transaction boundary.
pub struct DeviceRepo;

impl DeviceRepo {
    /// Insert the device or refresh its mutable fields.
    ///
    /// `first_seen` is written only on insert; `device_name`, `platform`,
    /// and `last_seen` follow every event.
    pub fn upsert(conn: &Connection, device: &DeviceUpsert<'_>) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO devices (device_id, device_name, platform, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(device_id) DO UPDATE SET
                device_name = excluded.device_name,
                platform = excluded.platform,
                last_seen = excluded.last_seen",
            params![
                device.device_id,
                device.device_name,
                device.platform,
                device.seen_at
            ],
        )?;
        Ok(())
    }

    /// List all devices, most recently seen first, each with its live
    /// count of sessions whose status is not `ended`.
    pub fn list(conn: &Connection) -> Result<Vec<DeviceRow>> {
        let mut stmt = conn.prepare(
            "SELECT d.device_id, d.device_name, d.platform, d.first_seen, d.last_seen,
                    (SELECT COUNT(*) FROM sessions s
                      WHERE s.device_id = d.device_id AND s.status != 'ended') AS active_sessions
             FROM devices d
             ORDER BY d.last_seen DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DeviceRow {
                    device_id: row.get(0)?,
                    device_name: row.get(1)?,
                    platform: row.get(2)?,
                    first_seen: row.get(3)?,
                    last_seen: row.get(4)?,
                    active_sessions: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get one device by id.
    pub fn get(conn: &Connection, device_id: &str) -> Result<Option<DeviceRow>> {
        let row = conn
            .query_row(
                "SELECT d.device_id, d.device_name, d.platform, d.first_seen, d.last_seen,
                        (SELECT COUNT(*) FROM sessions s
                          WHERE s.device_id = d.device_id AND s.status != 'ended') AS active_sessions
                 FROM devices d WHERE d.device_id = ?1",
                params![device_id],
                |row| {
                    Ok(DeviceRow {
                        device_id: row.get(0)?,
                        device_name: row.get(1)?,
                        platform: row.get(2)?,
                        first_seen: row.get(3)?,
                        last_seen: row.get(4)?,
                        active_sessions: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
