//! Apple Push Notification service integration.

mod service;
mod types;

pub use service::{ApnsError, ApnsService};
pub use types::{AlertPush, ApnsConfig, ApnsOutcome};
