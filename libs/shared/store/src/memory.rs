// libs/shared/store/src/memory.rs
use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::scheduling::{
    Appointment, BusinessTimeChangeProposal, BusinessTimeWindow, DoctorClinicAssignment,
    ProposalStatus, WorkingTimeWindow,
};

use crate::store::SchedulingStore;

#[derive(Default)]
struct Inner {
    assignments: HashMap<Uuid, DoctorClinicAssignment>,
    working_windows: HashMap<Uuid, WorkingTimeWindow>,
    business_windows: HashMap<Uuid, BusinessTimeWindow>,
    appointments: HashMap<Uuid, Appointment>,
    proposals: HashMap<Uuid, BusinessTimeChangeProposal>,
}

/// Reference store used by the default server wiring and the test suites.
/// A database-backed implementation of [`SchedulingStore`] is an embedding
/// concern and lives outside this repository.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an active doctor-clinic assignment, returning its id.
    pub async fn seed_assignment(&self, doctor_id: Uuid, clinic_id: Uuid) -> Uuid {
        let assignment = DoctorClinicAssignment {
            id: Uuid::new_v4(),
            doctor_id,
            clinic_id,
            active: true,
            created_at: Utc::now(),
        };
        let id = assignment.id;
        self.inner
            .write()
            .await
            .assignments
            .insert(id, assignment);
        id
    }

    pub async fn seed_working_window(&self, window: WorkingTimeWindow) {
        self.inner
            .write()
            .await
            .working_windows
            .insert(window.id, window);
    }

    pub async fn seed_business_window(&self, window: BusinessTimeWindow) {
        self.inner
            .write()
            .await
            .business_windows
            .insert(window.id, window);
    }

    /// Deactivate an assignment; it disappears from every read.
    pub async fn deactivate_assignment(&self, assignment_id: Uuid) {
        if let Some(assignment) = self.inner.write().await.assignments.get_mut(&assignment_id) {
            assignment.active = false;
        }
    }

    /// Full scan of stored appointments, for invariant checks in tests.
    pub async fn all_appointments(&self) -> Vec<Appointment> {
        self.inner.read().await.appointments.values().cloned().collect()
    }
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    async fn get_assignment(
        &self,
        doctor_id: Uuid,
        clinic_id: Uuid,
    ) -> Result<Option<DoctorClinicAssignment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .assignments
            .values()
            .find(|a| a.doctor_id == doctor_id && a.clinic_id == clinic_id && a.active)
            .cloned())
    }

    async fn get_assignment_by_id(
        &self,
        assignment_id: Uuid,
    ) -> Result<Option<DoctorClinicAssignment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .assignments
            .get(&assignment_id)
            .filter(|a| a.active)
            .cloned())
    }

    async fn list_working_windows(&self, assignment_id: Uuid) -> Result<Vec<WorkingTimeWindow>> {
        let inner = self.inner.read().await;
        let mut windows: Vec<WorkingTimeWindow> = inner
            .working_windows
            .values()
            .filter(|w| w.assignment_id == assignment_id)
            .cloned()
            .collect();
        windows.sort_by_key(|w| (w.day_of_week, w.start_time));
        Ok(windows)
    }

    async fn list_business_windows(
        &self,
        assignment_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BusinessTimeWindow>> {
        let inner = self.inner.read().await;
        let mut windows: Vec<BusinessTimeWindow> = inner
            .business_windows
            .values()
            .filter(|w| w.assignment_id == assignment_id && w.date >= from && w.date <= to)
            .cloned()
            .collect();
        windows.sort_by_key(|w| (w.date, w.start_time));
        Ok(windows)
    }

    async fn list_non_terminal_appointments(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>> {
        let inner = self.inner.read().await;
        let mut appointments: Vec<Appointment> = inner
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.is_non_terminal())
            // Half-open intersection with [from, to).
            .filter(|a| a.start_time < to && from < a.end_time)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.start_time);
        Ok(appointments)
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>> {
        Ok(self.inner.read().await.appointments.get(&id).cloned())
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.appointments.contains_key(&appointment.id) {
            return Err(anyhow!("appointment {} already exists", appointment.id));
        }
        inner.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn update_appointment(&self, appointment: &Appointment) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.appointments.contains_key(&appointment.id) {
            return Err(anyhow!("appointment {} does not exist", appointment.id));
        }
        inner.appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn get_proposal(&self, id: Uuid) -> Result<Option<BusinessTimeChangeProposal>> {
        Ok(self.inner.read().await.proposals.get(&id).cloned())
    }

    async fn pending_proposal_for(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<BusinessTimeChangeProposal>> {
        let inner = self.inner.read().await;
        Ok(inner
            .proposals
            .values()
            .find(|p| p.appointment_id == appointment_id && p.status == ProposalStatus::Pending)
            .cloned())
    }

    async fn insert_proposal(&self, proposal: &BusinessTimeChangeProposal) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.proposals.contains_key(&proposal.id) {
            return Err(anyhow!("proposal {} already exists", proposal.id));
        }
        inner.proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn update_proposal(&self, proposal: &BusinessTimeChangeProposal) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.proposals.contains_key(&proposal.id) {
            return Err(anyhow!("proposal {} does not exist", proposal.id));
        }
        inner.proposals.insert(proposal.id, proposal.clone());
        Ok(())
    }
}
