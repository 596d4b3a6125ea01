//! High-level transactional `TelemetryStore` API.
//!
//! Composes the repositories into atomic operations. [`TelemetryStore::ingest`]
//! is the single write path for events: the device upsert, session upsert,
//! and event insert run in one transaction, so a crash mid-way never leaves
//! an event recorded without its derived projection or vice versa.
//!
//! Transient `SQLite` BUSY/LOCKED failures are retried here, at the
//! transaction boundary, with a small bounded attempt count, never inside
//! individual queries, which would fragment the atomicity guarantee.

use chrono::{SecondsFormat, Utc};
use tracing::{debug, instrument};

use std::time::Duration;

use crate::errors::{Result, StoreError};
use crate::projection::{self, Projection};
use crate::sqlite::connection::{DbPool, PooledConnection};
use crate::sqlite::repositories::device::DeviceRepo;
use crate::sqlite::repositories::event::{EventPage, EventRepo, NewEvent};
use crate::sqlite::repositories::push_token::PushTokenRepo;
use crate::sqlite::repositories::session::{ListSessionsOptions, SessionRepo};
use crate::sqlite::row_types::{DeviceRow, EventRow, PushTokenRow, SessionRow};
use crate::types::EventEnvelope;

/// Counter: transient contention retries performed by the store.
const STORE_BUSY_RETRIES_TOTAL: &str = "store_busy_retries_total";

/// Acknowledgement for one accepted event.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    /// Assigned event id (insertion order).
    pub event_id: i64,
    /// The event's client-supplied timestamp, echoed back.
    pub timestamp: String,
}

/// Shared store handle. Cheap to clone via the inner pool; handlers receive
/// it explicitly rather than through process-wide state.
pub struct TelemetryStore {
    pool: DbPool,
}

impl TelemetryStore {
    /// Give up and surface [`StoreError::Busy`] after this many attempts.
    const BUSY_MAX_ATTEMPTS: u32 = 8;

    /// Create a store over an initialized pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Write path
    // ─────────────────────────────────────────────────────────────────────

    /// Ingest one event: append it to the log and apply the device/session
    /// projection it implies, atomically.
    ///
    /// Re-sending the same envelope appends another event row but leaves
    /// the projection unchanged: set-once fields keep their first value
    /// and the remaining fields are overwritten with identical data.
    #[instrument(skip(self, envelope), fields(
        device_id = %envelope.device.device_id,
        session_id = %envelope.event.session_id,
        hook = %envelope.event.hook_event_name,
    ))]
    pub fn ingest(&self, envelope: &EventEnvelope) -> Result<IngestReceipt> {
        let payload = serde_json::to_string(&envelope.event)?;
        let received_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let projected = projection::project(envelope);

        let event_id =
            self.retry_on_busy(|| self.apply(envelope, &projected, &payload, &received_at))?;

        debug!(event_id, "event ingested");
        Ok(IngestReceipt {
            event_id,
            timestamp: envelope.timestamp.clone(),
        })
    }

    /// One transaction: device upsert + session upsert + event insert.
    fn apply(
        &self,
        envelope: &EventEnvelope,
        projected: &Projection<'_>,
        payload: &str,
        received_at: &str,
    ) -> Result<i64> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        DeviceRepo::upsert(&tx, &projected.device)?;
        SessionRepo::upsert_on_event(&tx, &projected.session)?;
        let event_id = EventRepo::insert(
            &tx,
            &NewEvent {
                session_id: &envelope.event.session_id,
                device_id: &envelope.device.device_id,
                hook_event_name: &envelope.event.hook_event_name,
                timestamp: &envelope.timestamp,
                received_at,
                tool_name: envelope.event.tool_name.as_deref(),
                notification_type: envelope.event.notification_type.as_deref(),
                payload,
            },
        )?;

        tx.commit()?;
        Ok(event_id)
    }

    /// Register or refresh a push token for `(device_id, platform, sandbox)`.
    pub fn upsert_push_token(
        &self,
        device_id: &str,
        platform: &str,
        token: &str,
        sandbox: bool,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.retry_on_busy(|| {
            let conn = self.conn()?;
            PushTokenRepo::upsert(&conn, device_id, platform, token, sandbox, &now)
        })
    }

    /// Remove a push token the provider reported as gone.
    pub fn remove_push_token(&self, token: &str) -> Result<bool> {
        self.retry_on_busy(|| {
            let conn = self.conn()?;
            PushTokenRepo::delete_by_token(&conn, token)
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read path
    // ─────────────────────────────────────────────────────────────────────

    /// All devices with live active-session counts.
    pub fn list_devices(&self) -> Result<Vec<DeviceRow>> {
        let conn = self.conn()?;
        DeviceRepo::list(&conn)
    }

    /// One device by id.
    pub fn get_device(&self, device_id: &str) -> Result<Option<DeviceRow>> {
        let conn = self.conn()?;
        DeviceRepo::get(&conn, device_id)
    }

    /// Sessions for one device, most recent activity first.
    pub fn list_sessions_by_device(
        &self,
        device_id: &str,
        active_only: bool,
        limit: Option<i64>,
    ) -> Result<Vec<SessionRow>> {
        let conn = self.conn()?;
        SessionRepo::list(
            &conn,
            &ListSessionsOptions {
                device_id: Some(device_id),
                active_only,
                limit,
            },
        )
    }

    /// Sessions across all devices, most recent activity first.
    pub fn list_all_sessions(
        &self,
        active_only: bool,
        limit: Option<i64>,
    ) -> Result<Vec<SessionRow>> {
        let conn = self.conn()?;
        SessionRepo::list(
            &conn,
            &ListSessionsOptions {
                device_id: None,
                active_only,
                limit,
            },
        )
    }

    /// One session by id.
    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionRow>> {
        let conn = self.conn()?;
        SessionRepo::get(&conn, session_id)
    }

    /// A session's events, newest first (see [`EventPage`] for the cursor).
    pub fn list_events_by_session(
        &self,
        session_id: &str,
        page: &EventPage,
    ) -> Result<Vec<EventRow>> {
        let conn = self.conn()?;
        EventRepo::list_by_session(&conn, session_id, page)
    }

    /// Every registered push token.
    pub fn list_push_tokens(&self) -> Result<Vec<PushTokenRow>> {
        let conn = self.conn()?;
        PushTokenRepo::list(&conn)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Retry
    // ─────────────────────────────────────────────────────────────────────

    /// Retry an operation on `SQLite` BUSY/LOCKED with linear backoff plus
    /// jitter, so concurrent writers don't retry in lockstep. Exhaustion
    /// surfaces as [`StoreError::Busy`].
    #[allow(clippy::unused_self)]
    fn retry_on_busy<T>(&self, mut f: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempts = 0;

        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient_contention() => {
                    attempts += 1;
                    if attempts > Self::BUSY_MAX_ATTEMPTS {
                        return Err(StoreError::Busy { attempts });
                    }
                    metrics::counter!(STORE_BUSY_RETRIES_TOTAL).increment(1);

                    let base_ms = u64::from(attempts).saturating_mul(10).min(200);
                    let jitter_range = base_ms / 4;
                    let jitter = if jitter_range > 0 {
                        rand::random::<u64>() % (jitter_range * 2 + 1)
                    } else {
                        0
                    };
                    let backoff_ms = base_ms.saturating_sub(jitter_range) + jitter;
                    std::thread::sleep(Duration::from_millis(backoff_ms));
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
