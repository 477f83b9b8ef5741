// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use availability_cell::interval::TimeInterval;
use availability_cell::services::AvailabilityService;
use shared_config::AppConfig;
use shared_models::context::RequestContext;
use shared_models::scheduling::{Appointment, AppointmentStatus};
use shared_store::{DoctorLockRegistry, SchedulingStore};

use crate::models::{AppointmentError, BookAppointmentRequest, LifecycleEvent};

/// Allocates doctor time. All capacity-changing operations run their
/// check-then-act inside the doctor's lock scope; availability reads done
/// without the lock are treated as hints only and re-validated here.
pub struct BookingService {
    store: Arc<dyn SchedulingStore>,
    locks: Arc<DoctorLockRegistry>,
    availability: AvailabilityService,
    slot_duration: Duration,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        locks: Arc<DoctorLockRegistry>,
        config: &AppConfig,
    ) -> Self {
        let availability = AvailabilityService::new(Arc::clone(&store));
        Self {
            store,
            locks,
            availability,
            slot_duration: Duration::minutes(config.slot_duration_minutes),
        }
    }

    /// Book one slot. The end time is derived from the configured slot
    /// duration; the requested window must be fully contained in a free
    /// window at commit time or the booking is rejected.
    pub async fn book(
        &self,
        ctx: &RequestContext,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let start = request.start_time;
        let end = start + self.slot_duration;

        if start <= ctx.now {
            return Err(AppointmentError::InvalidTime(
                "Appointment must be scheduled for a future time".to_string(),
            ));
        }

        let assignment = self
            .store
            .get_assignment(request.doctor_id, request.clinic_id)
            .await?
            .ok_or(AppointmentError::AssignmentNotFound)?;

        // Exclusive scope for this doctor: the free-window check and the
        // insert must not interleave with another writer.
        let _guard = self.locks.acquire(request.doctor_id).await?;

        let requested = TimeInterval::new(start, end);
        let free = self
            .availability
            .free_windows(&assignment, start, end, None)
            .await?;

        if !free.iter().any(|window| window.contains(&requested)) {
            warn!(
                "Booking conflict for doctor {} at {}",
                request.doctor_id, start
            );
            return Err(AppointmentError::ConflictDetected);
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            patient_id: request.patient_id,
            clinic_id: request.clinic_id,
            start_time: start,
            end_time: end,
            status: AppointmentStatus::Pending,
            notes: request.notes,
            marked_no_show: false,
            created_at: ctx.now,
            updated_at: ctx.now,
        };
        self.store.insert_appointment(&appointment).await?;

        info!(
            "Appointment {} booked for doctor {} at {}",
            appointment.id, appointment.doctor_id, appointment.start_time
        );
        Ok(appointment)
    }

    /// Move an appointment to a new start, keeping the configured slot
    /// duration and the current status. The appointment's own window is
    /// excluded from the busy set, so rescheduling into (or across) its
    /// current slot never self-conflicts.
    pub async fn reschedule(
        &self,
        ctx: &RequestContext,
        appointment_id: Uuid,
        new_start: chrono::DateTime<chrono::Utc>,
    ) -> Result<Appointment, AppointmentError> {
        if new_start <= ctx.now {
            return Err(AppointmentError::InvalidTime(
                "Appointment must be rescheduled to a future time".to_string(),
            ));
        }

        let appointment = self
            .store
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        let _guard = self.locks.acquire(appointment.doctor_id).await?;
        let window = TimeInterval::new(new_start, new_start + self.slot_duration);
        self.commit_move(ctx, appointment_id, window, false).await
    }

    /// Relocate an appointment to `window`. The caller must hold the
    /// doctor's lock. Shared by patient-initiated reschedules and accepted
    /// business-time proposals so both pass the same conflict gate.
    pub(crate) async fn commit_move(
        &self,
        ctx: &RequestContext,
        appointment_id: Uuid,
        window: TimeInterval,
        reset_to_pending: bool,
    ) -> Result<Appointment, AppointmentError> {
        // Re-read under the lock; the pre-lock snapshot may be stale.
        let mut appointment = self
            .store
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if !matches!(
            appointment.status,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        ) {
            return Err(AppointmentError::InvalidTransition {
                from: appointment.status,
                event: LifecycleEvent::Reschedule,
            });
        }

        let assignment = self
            .store
            .get_assignment(appointment.doctor_id, appointment.clinic_id)
            .await?
            .ok_or(AppointmentError::AssignmentNotFound)?;

        let free = self
            .availability
            .free_windows(&assignment, window.start, window.end, Some(appointment_id))
            .await?;

        if !free.iter().any(|candidate| candidate.contains(&window)) {
            debug!(
                "Reschedule conflict for appointment {} to {}",
                appointment_id, window.start
            );
            return Err(AppointmentError::ConflictDetected);
        }

        appointment.start_time = window.start;
        appointment.end_time = window.end;
        if reset_to_pending {
            // Provider-moved appointments wait for reconfirmation.
            appointment.status = AppointmentStatus::Pending;
        }
        appointment.updated_at = ctx.now;
        self.store.update_appointment(&appointment).await?;

        info!(
            "Appointment {} moved to {} - {}",
            appointment.id, appointment.start_time, appointment.end_time
        );
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        self.store
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }
}
