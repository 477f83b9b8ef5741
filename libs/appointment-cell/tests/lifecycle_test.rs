// libs/appointment-cell/tests/lifecycle_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentError, BookAppointmentRequest, CancelAppointmentRequest, CancelledBy,
    LifecycleEvent,
};
use appointment_cell::services::{AppointmentLifecycleService, BookingService};
use shared_config::AppConfig;
use shared_models::context::{Actor, RequestContext};
use shared_models::scheduling::{Appointment, AppointmentStatus, WorkingTimeWindow};
use shared_store::{DoctorLockRegistry, InMemoryStore, SchedulingStore};

const MONDAY: (i32, u32, u32) = (2025, 3, 10);
const SUNDAY: (i32, u32, u32) = (2025, 3, 9);

fn at(ymd: (i32, u32, u32), hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(ymd.0, ymd.1, ymd.2, hour, min, 0).unwrap()
}

fn ctx_at(ymd: (i32, u32, u32), hour: u32, min: u32) -> RequestContext {
    RequestContext::new(at(ymd, hour, min), Actor::System)
}

fn cancel_request(override_in_progress: bool) -> CancelAppointmentRequest {
    CancelAppointmentRequest {
        reason: Some("test".to_string()),
        cancelled_by: CancelledBy::Doctor,
        override_in_progress,
    }
}

struct TestSetup {
    lifecycle: AppointmentLifecycleService,
    booking: BookingService,
    doctor_id: Uuid,
    clinic_id: Uuid,
    ctx: RequestContext,
}

impl TestSetup {
    /// Doctor working Mondays 09:00-17:00; requests issued the Sunday before.
    async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let config = AppConfig {
            lock_wait_millis: 5_000,
            ..AppConfig::default()
        };
        let locks = Arc::new(DoctorLockRegistry::new(config.lock_wait_millis));

        let doctor_id = Uuid::new_v4();
        let clinic_id = Uuid::new_v4();
        let assignment_id = store.seed_assignment(doctor_id, clinic_id).await;
        store
            .seed_working_window(WorkingTimeWindow {
                id: Uuid::new_v4(),
                assignment_id,
                day_of_week: 1,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            })
            .await;

        let dyn_store = Arc::clone(&store) as Arc<dyn SchedulingStore>;
        let booking = BookingService::new(Arc::clone(&dyn_store), Arc::clone(&locks), &config);
        let lifecycle = AppointmentLifecycleService::new(dyn_store, locks, &config);

        Self {
            lifecycle,
            booking,
            doctor_id,
            clinic_id,
            ctx: ctx_at(SUNDAY, 12, 0),
        }
    }

    /// A fresh Pending appointment at the given Monday time.
    async fn pending_appointment(&self, hour: u32, min: u32) -> Appointment {
        self.booking
            .book(
                &self.ctx,
                BookAppointmentRequest {
                    doctor_id: self.doctor_id,
                    clinic_id: self.clinic_id,
                    patient_id: Uuid::new_v4(),
                    start_time: at(MONDAY, hour, min),
                    notes: None,
                },
            )
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn full_happy_path_runs_to_completion() {
    let setup = TestSetup::new().await;
    let appointment = setup.pending_appointment(10, 0).await;

    let appointment = setup
        .lifecycle
        .confirm(&setup.ctx, appointment.id)
        .await
        .unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);

    // Starting is allowed within the grace window before the slot.
    let start_ctx = ctx_at(MONDAY, 9, 50);
    let appointment = setup
        .lifecycle
        .start(&start_ctx, appointment.id)
        .await
        .unwrap();
    assert_eq!(appointment.status, AppointmentStatus::InProgress);

    let appointment = setup
        .lifecycle
        .complete(&start_ctx, appointment.id)
        .await
        .unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Completed);
    assert!(!appointment.marked_no_show);
}

#[tokio::test]
async fn starting_too_early_is_rejected() {
    let setup = TestSetup::new().await;
    let appointment = setup.pending_appointment(10, 0).await;
    let appointment = setup
        .lifecycle
        .confirm(&setup.ctx, appointment.id)
        .await
        .unwrap();

    // 09:30 is outside the 15-minute grace before a 10:00 start.
    let result = setup
        .lifecycle
        .start(&ctx_at(MONDAY, 9, 30), appointment.id)
        .await;
    assert_matches!(result, Err(AppointmentError::InvalidTime(_)));
}

#[tokio::test]
async fn starting_an_unconfirmed_appointment_is_rejected() {
    let setup = TestSetup::new().await;
    let appointment = setup.pending_appointment(10, 0).await;

    let result = setup
        .lifecycle
        .start(&ctx_at(MONDAY, 10, 0), appointment.id)
        .await;
    assert_matches!(
        result,
        Err(AppointmentError::InvalidTransition {
            from: AppointmentStatus::Pending,
            event: LifecycleEvent::Start,
        })
    );
}

#[tokio::test]
async fn completing_a_pending_appointment_is_rejected() {
    let setup = TestSetup::new().await;
    let appointment = setup.pending_appointment(10, 0).await;

    let result = setup.lifecycle.complete(&setup.ctx, appointment.id).await;
    assert_matches!(
        result,
        Err(AppointmentError::InvalidTransition {
            from: AppointmentStatus::Pending,
            event: LifecycleEvent::Complete,
        })
    );
}

#[tokio::test]
async fn terminal_appointments_accept_no_events() {
    let setup = TestSetup::new().await;
    let appointment = setup.pending_appointment(10, 0).await;
    setup
        .lifecycle
        .cancel(&setup.ctx, appointment.id, cancel_request(false))
        .await
        .unwrap();

    assert_matches!(
        setup.lifecycle.confirm(&setup.ctx, appointment.id).await,
        Err(AppointmentError::InvalidTransition { .. })
    );
    assert_matches!(
        setup
            .lifecycle
            .cancel(&setup.ctx, appointment.id, cancel_request(false))
            .await,
        Err(AppointmentError::InvalidTransition { .. })
    );
}

#[tokio::test]
async fn in_progress_cancel_requires_the_override_flag() {
    let setup = TestSetup::new().await;
    let appointment = setup.pending_appointment(10, 0).await;
    setup
        .lifecycle
        .confirm(&setup.ctx, appointment.id)
        .await
        .unwrap();
    let in_session = ctx_at(MONDAY, 10, 0);
    setup
        .lifecycle
        .start(&in_session, appointment.id)
        .await
        .unwrap();

    let result = setup
        .lifecycle
        .cancel(&in_session, appointment.id, cancel_request(false))
        .await;
    assert_matches!(
        result,
        Err(AppointmentError::InvalidTransition {
            from: AppointmentStatus::InProgress,
            event: LifecycleEvent::Cancel,
        })
    );

    // With the override it cancels and is recorded as a no-show.
    let cancelled = setup
        .lifecycle
        .cancel(&in_session, appointment.id, cancel_request(true))
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(cancelled.marked_no_show);
}

#[tokio::test]
async fn confirmed_cancel_keeps_audit_note_and_is_not_a_no_show() {
    let setup = TestSetup::new().await;
    let appointment = setup.pending_appointment(10, 0).await;
    setup
        .lifecycle
        .confirm(&setup.ctx, appointment.id)
        .await
        .unwrap();

    let cancelled = setup
        .lifecycle
        .cancel(&setup.ctx, appointment.id, cancel_request(false))
        .await
        .unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(!cancelled.marked_no_show);
    assert!(cancelled.notes.unwrap().contains("Cancelled by Doctor"));
}

#[tokio::test]
async fn no_show_requires_the_threshold_to_pass() {
    let setup = TestSetup::new().await;
    let appointment = setup.pending_appointment(10, 0).await;
    setup
        .lifecycle
        .confirm(&setup.ctx, appointment.id)
        .await
        .unwrap();

    // 20 minutes late: inside the 30-minute threshold.
    let result = setup
        .lifecycle
        .mark_no_show(&ctx_at(MONDAY, 10, 20), appointment.id)
        .await;
    assert_matches!(result, Err(AppointmentError::InvalidTime(_)));

    // 45 minutes late: past the threshold.
    let no_show = setup
        .lifecycle
        .mark_no_show(&ctx_at(MONDAY, 10, 45), appointment.id)
        .await
        .unwrap();
    assert_eq!(no_show.status, AppointmentStatus::Cancelled);
    assert!(no_show.marked_no_show);
}

#[tokio::test]
async fn lifecycle_of_unknown_appointment_is_not_found() {
    let setup = TestSetup::new().await;

    let result = setup.lifecycle.confirm(&setup.ctx, Uuid::new_v4()).await;
    assert_matches!(result, Err(AppointmentError::NotFound));
}

#[test]
fn transition_table_matches_the_state_machine() {
    use AppointmentStatus::*;
    use LifecycleEvent::*;

    let target = AppointmentLifecycleService::transition_target;

    assert_eq!(target(Pending, Confirm), Some(Confirmed));
    assert_eq!(target(Pending, Cancel), Some(Cancelled));
    assert_eq!(target(Confirmed, Start), Some(InProgress));
    assert_eq!(target(Confirmed, Cancel), Some(Cancelled));
    assert_eq!(target(Confirmed, Reschedule), Some(Confirmed));
    assert_eq!(target(InProgress, Complete), Some(Completed));
    assert_eq!(target(InProgress, Cancel), Some(Cancelled));

    assert_eq!(target(Pending, Start), None);
    assert_eq!(target(Pending, Complete), None);
    assert_eq!(target(InProgress, Confirm), None);
    assert_eq!(target(InProgress, Reschedule), None);
    for event in [Confirm, Start, Complete, Cancel, Reschedule, Propose] {
        assert_eq!(target(Cancelled, event), None);
        assert_eq!(target(Completed, event), None);
    }
}
