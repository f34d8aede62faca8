use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where an alert-log entry came from: the vehicle's AI analysis stream, or
/// the console itself (link transitions, dispatch failures, operator notices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSource {
    Ai,
    System,
}

/// One human-readable entry in the operator's alert feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEntry {
    pub id: Uuid,
    pub source: AlertSource,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl AlertEntry {
    pub fn new(source: AlertSource, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            message: message.into(),
            at: Utc::now(),
        }
    }
}
