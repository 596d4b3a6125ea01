//! Session repository: event-driven upsert and listing for the
//! `sessions` table.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::projection::SessionUpsert;
use crate::sqlite::row_types::SessionRow;

/// Options for listing sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListSessionsOptions<'a> {
    /// Restrict to one device. `None` lists across all devices.
    pub device_id: Option<&'a str>,
    /// When set, exclude sessions whose status is `ended`.
    pub active_only: bool,
    /// Maximum rows returned. `None` uses the default of 50.
    pub limit: Option<i64>,
}

const DEFAULT_LIMIT: i64 = 50;

/// Stateless repository over the `sessions` table.
pub struct SessionRepo;

impl SessionRepo {
    /// Apply one event's session projection.
    ///
    /// Creates the row on the session's first event (whatever kind it is).
    /// On later events: `last_event` always follows the incoming timestamp,
    /// `status` changes only when the projection derived one, and
    /// `started_at` / `cwd` / `title` keep their first non-null value.
    pub fn upsert_on_event(conn: &Connection, session: &SessionUpsert<'_>) -> Result<()> {
        let derived = session.status.map(crate::types::SessionStatus::as_str);
        // A brand-new row with no derived status starts out 'active'.
        let initial = derived.unwrap_or("active");

        let _ = conn.execute(
            "INSERT INTO sessions (session_id, device_id, started_at, last_event, status, cwd, title)
             VALUES (?1, ?2, ?3, ?3, ?4, ?5, ?6)
             ON CONFLICT(session_id) DO UPDATE SET
                last_event = excluded.last_event,
                status = COALESCE(?7, sessions.status),
                cwd = COALESCE(sessions.cwd, excluded.cwd),
                title = COALESCE(sessions.title, excluded.title)",
            params![
                session.session_id,
                session.device_id,
                session.event_at,
                initial,
                session.cwd,
                session.title,
                derived,
            ],
        )?;
        Ok(())
    }

    /// List sessions, most recent activity first.
    pub fn list(conn: &Connection, opts: &ListSessionsOptions<'_>) -> Result<Vec<SessionRow>> {
        let mut sql = String::from(
            "SELECT s.session_id, s.device_id, s.started_at, s.last_event, s.status,
                    s.cwd, s.title, d.device_name, d.platform
             FROM sessions s
             LEFT JOIN devices d ON d.device_id = s.device_id
             WHERE 1=1",
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(device_id) = opts.device_id {
            sql.push_str(" AND s.device_id = ?");
            params.push(Box::new(device_id.to_string()));
        }
        if opts.active_only {
            sql.push_str(" AND s.status != 'ended'");
        }
        sql.push_str(" ORDER BY s.last_event DESC LIMIT ?");
        params.push(Box::new(opts.limit.unwrap_or(DEFAULT_LIMIT)));

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| &**p as &dyn rusqlite::types::ToSql).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(SessionRow {
                    session_id: row.get(0)?,
                    device_id: row.get(1)?,
                    started_at: row.get(2)?,
                    last_event: row.get(3)?,
                    status: row.get(4)?,
                    cwd: row.get(5)?,
                    title: row.get(6)?,
                    device_name: row.get(7)?,
                    platform: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get one session by id.
    pub fn get(conn: &Connection, session_id: &str) -> Result<Option<SessionRow>> {
        let row = conn
            .query_row(
                "SELECT s.session_id, s.device_id, s.started_at, s.last_event, s.status,
                        s.cwd, s.title, d.device_name, d.platform
                 FROM sessions s
                 LEFT JOIN devices d ON d.device_id = s.device_id
                 WHERE s.session_id = ?1",
                params![session_id],
                |row| {
                    Ok(SessionRow {
                        session_id: row.get(0)?,
                        device_id: row.get(1)?,
                        started_at: row.get(2)?,
                        last_event: row.get(3)?,
                        status: row.get(4)?,
                        cwd: row.get(5)?,
                        title: row.get(6)?,
                        device_name: row.get(7)?,
                        platform: row.get(8)?,
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
