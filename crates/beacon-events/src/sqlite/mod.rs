//! SQLite persistence: connection pool, idempotent migrations, row types,
//! and per-table repositories.

pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod row_types;
