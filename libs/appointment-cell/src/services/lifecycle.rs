// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::context::RequestContext;
use shared_models::scheduling::{Appointment, AppointmentStatus};
use shared_store::{DoctorLockRegistry, SchedulingStore};

use crate::models::{AppointmentError, CancelAppointmentRequest, LifecycleEvent};

/// Owns the appointment state machine. Transitions not present in the table
/// fail with an error naming the current status and the requested event;
/// terminal statuses accept no events.
pub struct AppointmentLifecycleService {
    store: Arc<dyn SchedulingStore>,
    locks: Arc<DoctorLockRegistry>,
    early_start_grace: Duration,
    no_show_threshold: Duration,
}

impl AppointmentLifecycleService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        locks: Arc<DoctorLockRegistry>,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            locks,
            early_start_grace: Duration::minutes(config.early_start_grace_minutes),
            no_show_threshold: Duration::minutes(config.no_show_threshold_minutes),
        }
    }

    /// The target status for an event, or None when the event is illegal
    /// from the given status.
    pub fn transition_target(
        status: AppointmentStatus,
        event: LifecycleEvent,
    ) -> Option<AppointmentStatus> {
        use AppointmentStatus::*;
        use LifecycleEvent::*;

        match (status, event) {
            (Pending, Confirm) => Some(Confirmed),
            (Pending, Cancel) => Some(Cancelled),
            (Pending, Reschedule) => Some(Pending),
            (Pending, Propose) => Some(Pending),
            (Confirmed, Start) => Some(InProgress),
            (Confirmed, Cancel) => Some(Cancelled),
            (Confirmed, Reschedule) => Some(Confirmed),
            (Confirmed, Propose) => Some(Confirmed),
            (InProgress, Complete) => Some(Completed),
            (InProgress, Cancel) => Some(Cancelled), // override flag required
            _ => None,
        }
    }

    pub fn validate_transition(
        status: AppointmentStatus,
        event: LifecycleEvent,
    ) -> Result<AppointmentStatus, AppointmentError> {
        Self::transition_target(status, event).ok_or_else(|| {
            warn!("Invalid transition attempted: {} from {}", event, status);
            AppointmentError::InvalidTransition {
                from: status,
                event,
            }
        })
    }

    pub async fn confirm(
        &self,
        ctx: &RequestContext,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.load(appointment_id).await?;
        appointment.status =
            Self::validate_transition(appointment.status, LifecycleEvent::Confirm)?;
        self.persist(ctx, appointment).await
    }

    /// Start a consultation. Gated on the clock: a confirmed appointment may
    /// be started from `early_start_grace` before its scheduled start.
    pub async fn start(
        &self,
        ctx: &RequestContext,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.load(appointment_id).await?;
        let target = Self::validate_transition(appointment.status, LifecycleEvent::Start)?;

        let earliest = appointment.start_time - self.early_start_grace;
        if ctx.now < earliest {
            return Err(AppointmentError::InvalidTime(format!(
                "Appointment cannot be started before {}",
                earliest
            )));
        }

        appointment.status = target;
        self.persist(ctx, appointment).await
    }

    pub async fn complete(
        &self,
        ctx: &RequestContext,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let mut appointment = self.load(appointment_id).await?;
        appointment.status =
            Self::validate_transition(appointment.status, LifecycleEvent::Complete)?;
        self.persist(ctx, appointment).await
    }

    /// Cancel an appointment. Cancellation is a status transition, never a
    /// delete; the freed slot becomes bookable again immediately. An
    /// in-progress appointment only cancels with the explicit override
    /// flag, which records the outcome as a no-show.
    pub async fn cancel(
        &self,
        ctx: &RequestContext,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;

        // Cancellation frees capacity, so it takes the doctor scope like
        // every other capacity change.
        let _guard = self.locks.acquire(appointment.doctor_id).await?;
        let mut appointment = self.load(appointment_id).await?;

        if appointment.status == AppointmentStatus::InProgress && !request.override_in_progress {
            return Err(AppointmentError::InvalidTransition {
                from: appointment.status,
                event: LifecycleEvent::Cancel,
            });
        }

        let was_in_progress = appointment.status == AppointmentStatus::InProgress;
        appointment.status = Self::validate_transition(appointment.status, LifecycleEvent::Cancel)?;
        if was_in_progress {
            appointment.marked_no_show = true;
        }

        let audit = match &request.reason {
            Some(reason) => format!("Cancelled by {:?}: {}", request.cancelled_by, reason),
            None => format!("Cancelled by {:?}", request.cancelled_by),
        };
        appointment.notes = Some(match appointment.notes.take() {
            Some(notes) => format!("{}\n{}", notes, audit),
            None => audit,
        });

        info!(
            "Appointment {} cancelled (no-show: {})",
            appointment.id, appointment.marked_no_show
        );
        self.persist(ctx, appointment).await
    }

    /// Provider-declared no-show: a confirmed appointment whose start is
    /// more than the configured threshold in the past is cancelled with the
    /// no-show flag set.
    pub async fn mark_no_show(
        &self,
        ctx: &RequestContext,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;
        let _guard = self.locks.acquire(appointment.doctor_id).await?;
        let mut appointment = self.load(appointment_id).await?;

        if appointment.status != AppointmentStatus::Confirmed {
            return Err(AppointmentError::InvalidTransition {
                from: appointment.status,
                event: LifecycleEvent::Cancel,
            });
        }

        let threshold = appointment.start_time + self.no_show_threshold;
        if ctx.now <= threshold {
            return Err(AppointmentError::InvalidTime(format!(
                "Appointment is not past the no-show threshold until {}",
                threshold
            )));
        }

        appointment.status = AppointmentStatus::Cancelled;
        appointment.marked_no_show = true;
        info!("Appointment {} marked as no-show", appointment.id);
        self.persist(ctx, appointment).await
    }

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    async fn persist(
        &self,
        ctx: &RequestContext,
        mut appointment: Appointment,
    ) -> Result<Appointment, AppointmentError> {
        appointment.updated_at = ctx.now;
        self.store.update_appointment(&appointment).await?;
        debug!(
            "Appointment {} now {}",
            appointment.id, appointment.status
        );
        Ok(appointment)
    }
}
