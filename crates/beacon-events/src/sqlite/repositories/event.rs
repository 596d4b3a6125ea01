//! Event repository: append and feed queries for the `events` table.
//!
//! The log is append-only: nothing here mutates or deletes rows. Display
//! order is the surrogate `id` (insertion order), because client clocks are
//! not trusted to be monotonic.

use rusqlite::{Connection, params};

use crate::errors::Result;
use crate::sqlite::row_types::EventRow;

/// Fields for one new event row.
#[derive(Debug, Clone)]
pub struct NewEvent<'a> {
    /// Session the event belongs to.
    pub session_id: &'a str,
    /// Reporting device.
    pub device_id: &'a str,
    /// Event kind.
    pub hook_event_name: &'a str,
    /// Client-supplied timestamp.
    pub timestamp: &'a str,
    /// Server receive time.
    pub received_at: &'a str,
    /// Tool involved, when present.
    pub tool_name: Option<&'a str>,
    /// Notification subtype, when present.
    pub notification_type: Option<&'a str>,
    /// Full original event JSON.
    pub payload: &'a str,
}

/// Page request for the session event feed.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventPage {
    /// Maximum rows returned. `None` uses the default of 100.
    pub limit: Option<i64>,
    /// Exclusive upper bound on `id`; pass the smallest id of the previous
    /// page to fetch the next (older) one.
    pub before: Option<i64>,
}

const DEFAULT_LIMIT: i64 = 100;

/// Stateless repository over the `events` table.
pub struct EventRepo;

impl EventRepo {
    /// Append one event. Returns the assigned id.
    pub fn insert(conn: &Connection, event: &NewEvent<'_>) -> Result<i64> {
        let _ = conn.execute(
            "INSERT INTO events (session_id, device_id, hook_event_name, timestamp,
                                 received_at, tool_name, notification_type, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.session_id,
                event.device_id,
                event.hook_event_name,
                event.timestamp,
                event.received_at,
                event.tool_name,
                event.notification_type,
                event.payload,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List a session's events, newest first.
    ///
    /// Page contract: rows are ordered by `id` descending; `before` is an
    /// exclusive upper bound on `id`.
    pub fn list_by_session(
        conn: &Connection,
        session_id: &str,
        page: &EventPage,
    ) -> Result<Vec<EventRow>> {
        let mut stmt = conn.prepare(
            "SELECT e.id, e.hook_event_name, e.timestamp, e.tool_name, e.notification_type,
                    json_extract(e.payload, '$.message') AS message
             FROM events e
             WHERE e.session_id = ?1
               AND (?2 IS NULL OR e.id < ?2)
             ORDER BY e.id DESC
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(
                params![session_id, page.before, page.limit.unwrap_or(DEFAULT_LIMIT)],
                |row| {
                    Ok(EventRow {
                        id: row.get(0)?,
                        hook_event_name: row.get(1)?,
                        timestamp: row.get(2)?,
                        tool_name: row.get(3)?,
                        notification_type: row.get(4)?,
                        message: row.get(5)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Count events in one session.
    pub fn count_by_session(conn: &Connection, session_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::projection::{DeviceUpsert, SessionUpsert};
    use crate::sqlite::migrations;
    use crate::sqlite::repositories::device::DeviceRepo;
    use crate::sqlite::repositories::session::SessionRepo;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        migrations::run(&conn).unwrap();
        DeviceRepo::upsert(
            &conn,
            &DeviceUpsert {
                device_id: "d1",
                device_name: "mac1",
                platform: "macos",
                seen_at: "t0",
            },
        )
        .unwrap();
        SessionRepo::upsert_on_event(
            &conn,
            &SessionUpsert {
                session_id: "s1",
                device_id: "d1",
                event_at: "t0",
                status: None,
                cwd: None,
                title: None,
            },
        )
        .unwrap();
        conn
    }

    fn insert(conn: &Connection, hook: &str, payload: &str) -> i64 {
        EventRepo::insert(
            conn,
            &NewEvent {
                session_id: "s1",
                device_id: "d1",
                hook_event_name: hook,
                timestamp: "2026-01-01T00:00:00Z",
                received_at: "2026-01-01T00:00:01Z",
                tool_name: None,
                notification_type: None,
                payload,
            },
        )
        .unwrap()
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let conn = setup();
        let first = insert(&conn, "SessionStart", "{}");
        let second = insert(&conn, "Stop", "{}");
        assert!(second > first);
        assert_eq!(EventRepo::count_by_session(&conn, "s1").unwrap(), 2);
    }

    #[test]
    fn duplicate_payloads_are_both_recorded() {
        let conn = setup();
        let a = insert(&conn, "SessionStart", "{}");
        let b = insert(&conn, "SessionStart", "{}");
        assert_ne!(a, b);
        assert_eq!(EventRepo::count_by_session(&conn, "s1").unwrap(), 2);
    }

    #[test]
    fn feed_is_newest_first() {
        let conn = setup();
        let _ = insert(&conn, "SessionStart", "{}");
        let _ = insert(&conn, "UserPromptSubmit", "{}");
        let last = insert(&conn, "Stop", "{}");

        let events = EventRepo::list_by_session(&conn, "s1", &EventPage::default()).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].id, last);
        assert_eq!(events[0].hook_event_name, "Stop");
        assert_eq!(events[2].hook_event_name, "SessionStart");
    }

    #[test]
    fn before_cursor_pages_backward() {
        let conn = setup();
        for i in 0..5 {
            let _ = insert(&conn, &format!("Kind{i}"), "{}");
        }

        let first_page = EventRepo::list_by_session(
            &conn,
            "s1",
            &EventPage {
                limit: Some(2),
                before: None,
            },
        )
        .unwrap();
        assert_eq!(first_page.len(), 2);

        let oldest_seen = first_page.last().unwrap().id;
        let second_page = EventRepo::list_by_session(
            &conn,
            "s1",
            &EventPage {
                limit: Some(2),
                before: Some(oldest_seen),
            },
        )
        .unwrap();
        assert_eq!(second_page.len(), 2);
        assert!(second_page.iter().all(|e| e.id < oldest_seen));
    }

    #[test]
    fn message_is_extracted_from_payload() {
        let conn = setup();
        let _ = insert(
            &conn,
            "Notification",
            r#"{"message": "needs permission", "tool_name": "bash"}"#,
        );

        let events = EventRepo::list_by_session(&conn, "s1", &EventPage::default()).unwrap();
        assert_eq!(events[0].message.as_deref(), Some("needs permission"));
    }

    #[test]
    fn unknown_session_feed_is_empty() {
        let conn = setup();
        let events =
            EventRepo::list_by_session(&conn, "missing", &EventPage::default()).unwrap();
        assert!(events.is_empty());
    }
}
