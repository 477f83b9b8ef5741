// libs/shared/models/src/scheduling.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// DOCTOR-CLINIC ASSIGNMENT AND TIME WINDOWS
// ==============================================================================

/// A doctor practicing at a specific clinic. Owns the working/business-time
/// windows below; the store only ever returns active assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorClinicAssignment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Recurring weekly interval [start_time, end_time) during which an
/// assignment is open for booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingTimeWindow {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub day_of_week: i32, // 0 = Sunday, 1 = Monday, etc.
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Ad-hoc override window pinned to a concrete date. For any date carrying
/// at least one override, the union of that date's overrides is the
/// authoritative open time; recurring windows are ignored for that date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessTimeWindow {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub clinic_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    /// Policy flag: set when a cancellation was really a missed appointment
    /// (override-cancel out of InProgress, or the provider no-show rule).
    pub marked_no_show: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Statuses that reserve the doctor's time. Terminal appointments never
    /// block a slot.
    pub fn is_non_terminal(&self) -> bool {
        self.status.is_non_terminal()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn is_non_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending
                | AppointmentStatus::Confirmed
                | AppointmentStatus::InProgress
        )
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_non_terminal()
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// BUSINESS-TIME CHANGE PROPOSALS
// ==============================================================================

/// A provider-side request to move one appointment to a new window. At most
/// one Pending proposal exists per appointment at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessTimeChangeProposal {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub assignment_id: Uuid,
    pub proposed_start: DateTime<Utc>,
    pub proposed_end: DateTime<Utc>,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Declined,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposalStatus::Pending => write!(f, "pending"),
            ProposalStatus::Accepted => write!(f, "accepted"),
            ProposalStatus::Declined => write!(f, "declined"),
        }
    }
}
