//! Bounded r2d2 connection pool over one SQLite file.
//!
//! Every connection gets the same pragma set on acquire: WAL journaling so
//! readers never block behind the writer, `NORMAL` fsync level,
//! foreign keys on, and a busy timeout as the first line of defense before
//! the store's own retry loop.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use uuid::Uuid;

use crate::errors::Result;

/// Pool handle shared by all request handlers.
pub type DbPool = Pool<SqliteConnectionManager>;

/// A connection checked out of the pool.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool size. Writes serialize at the SQLite level anyway; a small pool
/// keeps reads concurrent without stacking up blocked writers.
const MAX_CONNECTIONS: u32 = 4;

fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )
}

#[derive(Debug)]
struct PragmaCustomizer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> rusqlite::Result<()> {
        apply_pragmas(conn)
    }
}

/// Open a pool over the database file at `path`, creating it if missing.
pub fn open_pool(path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path);
    build(manager)
}

/// Open a pool over a fresh shared-cache in-memory database.
///
/// Each call gets its own uniquely named database; all connections in the
/// returned pool see the same data, and the pool's idle connections keep it
/// alive. Intended for tests.
pub fn open_in_memory() -> Result<DbPool> {
    let uri = format!("file:beacon-mem-{}?mode=memory&cache=shared", Uuid::new_v4());
    let manager = SqliteConnectionManager::file(uri).with_flags(
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    );
    build(manager)
}

fn build(manager: SqliteConnectionManager) -> Result<DbPool> {
    let pool = Pool::builder()
        .max_size(MAX_CONNECTIONS)
        .connection_customizer(Box::new(PragmaCustomizer))
        .build(manager)?;
    Ok(pool)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
