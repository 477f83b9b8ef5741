// libs/shared/store/src/store.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use shared_models::scheduling::{
    Appointment, BusinessTimeChangeProposal, BusinessTimeWindow, DoctorClinicAssignment,
    WorkingTimeWindow,
};

/// Persistence boundary for the scheduling engine. The surrounding system
/// owns the durable store; the engine only ever reaches it through this
/// trait. Implementations must apply the soft-delete filter themselves:
/// every method returns live records only.
///
/// Errors are passed through untranslated; the engine neither retries nor
/// reinterprets a failing store call.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn get_assignment(
        &self,
        doctor_id: Uuid,
        clinic_id: Uuid,
    ) -> Result<Option<DoctorClinicAssignment>>;

    async fn get_assignment_by_id(
        &self,
        assignment_id: Uuid,
    ) -> Result<Option<DoctorClinicAssignment>>;

    async fn list_working_windows(&self, assignment_id: Uuid) -> Result<Vec<WorkingTimeWindow>>;

    /// Override windows whose date falls inside [from, to] inclusive.
    async fn list_business_windows(
        &self,
        assignment_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BusinessTimeWindow>>;

    /// Appointments in a non-terminal status for the given doctor, across
    /// all clinics, whose [start, end) intersects [from, to).
    async fn list_non_terminal_appointments(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>>;

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>>;

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()>;

    async fn update_appointment(&self, appointment: &Appointment) -> Result<()>;

    async fn get_proposal(&self, id: Uuid) -> Result<Option<BusinessTimeChangeProposal>>;

    /// The at-most-one Pending proposal for an appointment, if any.
    async fn pending_proposal_for(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<BusinessTimeChangeProposal>>;

    async fn insert_proposal(&self, proposal: &BusinessTimeChangeProposal) -> Result<()>;

    async fn update_proposal(&self, proposal: &BusinessTimeChangeProposal) -> Result<()>;
}
