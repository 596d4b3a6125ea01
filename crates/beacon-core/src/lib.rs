//! Foundation utilities for the Beacon telemetry server.

pub mod text;
