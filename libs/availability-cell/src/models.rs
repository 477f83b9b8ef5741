// libs/availability-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Defaults to the configured slot duration when omitted.
    pub slot_minutes: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Doctor-clinic assignment not found")]
    AssignmentNotFound,

    #[error("Invalid availability query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
