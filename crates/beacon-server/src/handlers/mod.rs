//! Request handlers. Each handler receives the shared [`crate::AppState`]
//! explicitly via the axum state extractor; there is no ambient store.

pub mod devices;
pub mod events;
pub mod ping;
pub mod push;
pub mod sessions;
