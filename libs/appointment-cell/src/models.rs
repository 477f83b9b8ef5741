// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use availability_cell::models::AvailabilityError;
use shared_models::error::AppError;
use shared_models::scheduling::{AppointmentStatus, ProposalStatus};
use shared_store::LockBusy;

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    /// Slot start; the end time is derived server-side from the configured
    /// slot duration.
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
    pub cancelled_by: CancelledBy,
    /// Required for cancelling an in-progress appointment; flags the result
    /// as a no-show.
    #[serde(default)]
    pub override_in_progress: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Patient,
    Doctor,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeBusinessTimeRequest {
    pub proposed_start: DateTime<Utc>,
    pub proposed_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveProposalRequest {
    pub outcome: ProposalOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalOutcome {
    Accept,
    Decline,
}

// ==============================================================================
// LIFECYCLE EVENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Confirm,
    Start,
    Complete,
    Cancel,
    Reschedule,
    Propose,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Confirm => write!(f, "confirm"),
            LifecycleEvent::Start => write!(f, "start"),
            LifecycleEvent::Complete => write!(f, "complete"),
            LifecycleEvent::Cancel => write!(f, "cancel"),
            LifecycleEvent::Reschedule => write!(f, "reschedule"),
            LifecycleEvent::Propose => write!(f, "propose"),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor-clinic assignment not found")]
    AssignmentNotFound,

    #[error("Proposal not found")]
    ProposalNotFound,

    #[error("Requested window is not available")]
    ConflictDetected,

    #[error("An active proposal already exists for this appointment")]
    ActiveProposalExists,

    #[error("Proposal is already {0}")]
    ProposalAlreadyResolved(ProposalStatus),

    #[error("Event '{event}' is not allowed from status '{from}'")]
    InvalidTransition {
        from: AppointmentStatus,
        event: LifecycleEvent,
    },

    #[error("Scheduling is busy for doctor {0}, retry shortly")]
    SchedulerBusy(Uuid),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<AvailabilityError> for AppointmentError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::AssignmentNotFound => AppointmentError::AssignmentNotFound,
            AvailabilityError::InvalidQuery(msg) => AppointmentError::InvalidTime(msg),
            AvailabilityError::Store(inner) => AppointmentError::Store(inner),
        }
    }
}

impl From<LockBusy> for AppointmentError {
    fn from(err: LockBusy) -> Self {
        AppointmentError::SchedulerBusy(err.0)
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match &err {
            AppointmentError::NotFound
            | AppointmentError::AssignmentNotFound
            | AppointmentError::ProposalNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::ConflictDetected
            | AppointmentError::ActiveProposalExists
            | AppointmentError::ProposalAlreadyResolved(_) => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidTransition { .. } => {
                AppError::UnprocessableEntity(err.to_string())
            }
            AppointmentError::SchedulerBusy(_) => AppError::Busy(err.to_string()),
            AppointmentError::InvalidTime(_) => AppError::BadRequest(err.to_string()),
            AppointmentError::Store(inner) => AppError::Internal(inner.to_string()),
        }
    }
}
