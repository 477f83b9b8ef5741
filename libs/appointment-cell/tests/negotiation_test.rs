// libs/appointment-cell/tests/negotiation_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentError, BookAppointmentRequest, CancelAppointmentRequest, CancelledBy,
    ProposalOutcome,
};
use appointment_cell::services::negotiation::ProposalResolution;
use appointment_cell::services::{
    AppointmentLifecycleService, BookingService, NegotiationService,
};
use shared_config::AppConfig;
use shared_models::context::{Actor, RequestContext};
use shared_models::scheduling::{Appointment, AppointmentStatus, ProposalStatus, WorkingTimeWindow};
use shared_store::{DoctorLockRegistry, InMemoryStore, SchedulingStore};

const MONDAY: (i32, u32, u32) = (2025, 3, 10);
const SUNDAY: (i32, u32, u32) = (2025, 3, 9);

fn at(ymd: (i32, u32, u32), hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(ymd.0, ymd.1, ymd.2, hour, min, 0).unwrap()
}

struct TestSetup {
    store: Arc<InMemoryStore>,
    booking: BookingService,
    lifecycle: AppointmentLifecycleService,
    negotiation: NegotiationService,
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
        let lifecycle = AppointmentLifecycleService::new(
            Arc::clone(&dyn_store),
            Arc::clone(&locks),
            &config,
        );
        let negotiation = NegotiationService::new(dyn_store, locks, &config);

        Self {
            store,
            booking,
            lifecycle,
            negotiation,
            doctor_id,
            clinic_id,
            ctx: RequestContext::new(at(SUNDAY, 12, 0), Actor::System),
        }
    }

    async fn confirmed_appointment(&self, hour: u32, min: u32) -> Appointment {
        let appointment = self
            .booking
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
            .unwrap();
        self.lifecycle
            .confirm(&self.ctx, appointment.id)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn propose_creates_a_pending_proposal() {
    let setup = TestSetup::new().await;
    let appointment = setup.confirmed_appointment(10, 0).await;

    let proposal = setup
        .negotiation
        .propose(
            &setup.ctx,
            appointment.id,
            at(MONDAY, 14, 0),
            at(MONDAY, 14, 45),
        )
        .await
        .unwrap();

    assert_eq!(proposal.status, ProposalStatus::Pending);
    assert_eq!(proposal.appointment_id, appointment.id);
    assert_eq!(proposal.proposed_start, at(MONDAY, 14, 0));
    assert_eq!(proposal.proposed_end, at(MONDAY, 14, 45));
}

#[tokio::test]
async fn only_one_active_proposal_per_appointment() {
    let setup = TestSetup::new().await;
    let appointment = setup.confirmed_appointment(10, 0).await;

    setup
        .negotiation
        .propose(
            &setup.ctx,
            appointment.id,
            at(MONDAY, 14, 0),
            at(MONDAY, 14, 30),
        )
        .await
        .unwrap();

    let result = setup
        .negotiation
        .propose(
            &setup.ctx,
            appointment.id,
            at(MONDAY, 15, 0),
            at(MONDAY, 15, 30),
        )
        .await;
    assert_matches!(result, Err(AppointmentError::ActiveProposalExists));
}

#[tokio::test]
async fn inverted_proposal_window_is_rejected() {
    let setup = TestSetup::new().await;
    let appointment = setup.confirmed_appointment(10, 0).await;

    let result = setup
        .negotiation
        .propose(
            &setup.ctx,
            appointment.id,
            at(MONDAY, 15, 0),
            at(MONDAY, 14, 0),
        )
        .await;
    assert_matches!(result, Err(AppointmentError::InvalidTime(_)));
}

#[tokio::test]
async fn proposals_on_terminal_appointments_are_rejected() {
    let setup = TestSetup::new().await;
    let appointment = setup.confirmed_appointment(10, 0).await;
    setup
        .lifecycle
        .cancel(
            &setup.ctx,
            appointment.id,
            CancelAppointmentRequest {
                reason: None,
                cancelled_by: CancelledBy::Doctor,
                override_in_progress: false,
            },
        )
        .await
        .unwrap();

    let result = setup
        .negotiation
        .propose(
            &setup.ctx,
            appointment.id,
            at(MONDAY, 14, 0),
            at(MONDAY, 14, 30),
        )
        .await;
    assert_matches!(result, Err(AppointmentError::InvalidTransition { .. }));
}

#[tokio::test]
async fn decline_leaves_the_appointment_untouched() {
    let setup = TestSetup::new().await;
    let appointment = setup.confirmed_appointment(10, 0).await;
    let proposal = setup
        .negotiation
        .propose(
            &setup.ctx,
            appointment.id,
            at(MONDAY, 14, 0),
            at(MONDAY, 14, 30),
        )
        .await
        .unwrap();

    let resolution = setup
        .negotiation
        .resolve(&setup.ctx, proposal.id, ProposalOutcome::Decline)
        .await
        .unwrap();

    assert_matches!(
        resolution,
        ProposalResolution::Declined { proposal } if proposal.status == ProposalStatus::Declined
    );

    let unchanged = setup.booking.get_appointment(appointment.id).await.unwrap();
    assert_eq!(unchanged.start_time, at(MONDAY, 10, 0));
    assert_eq!(unchanged.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn accept_moves_the_appointment_and_resets_it_to_pending() {
    let setup = TestSetup::new().await;
    let appointment = setup.confirmed_appointment(10, 0).await;
    let proposal = setup
        .negotiation
        .propose(
            &setup.ctx,
            appointment.id,
            at(MONDAY, 14, 0),
            at(MONDAY, 14, 45),
        )
        .await
        .unwrap();

    let resolution = setup
        .negotiation
        .resolve(&setup.ctx, proposal.id, ProposalOutcome::Accept)
        .await
        .unwrap();

    match resolution {
        ProposalResolution::Accepted {
            proposal,
            appointment,
        } => {
            assert_eq!(proposal.status, ProposalStatus::Accepted);
            assert_eq!(appointment.start_time, at(MONDAY, 14, 0));
            // The proposal's exact window is installed, not a slot grid.
            assert_eq!(appointment.end_time, at(MONDAY, 14, 45));
            // Provider-moved appointments wait for reconfirmation.
            assert_eq!(appointment.status, AppointmentStatus::Pending);
        }
        other => panic!("expected acceptance, got {:?}", other),
    }
}

#[tokio::test]
async fn conflicting_accept_reverts_nothing_and_stays_pending() {
    let setup = TestSetup::new().await;
    let appointment = setup.confirmed_appointment(10, 0).await;
    let blocker = setup.confirmed_appointment(14, 0).await;

    let proposal = setup
        .negotiation
        .propose(
            &setup.ctx,
            appointment.id,
            at(MONDAY, 14, 15),
            at(MONDAY, 14, 45),
        )
        .await
        .unwrap();

    let result = setup
        .negotiation
        .resolve(&setup.ctx, proposal.id, ProposalOutcome::Accept)
        .await;
    assert_matches!(result, Err(AppointmentError::ConflictDetected));

    // The appointment window is unchanged and the proposal is back to
    // Pending, ready for another resolution attempt.
    let unchanged = setup.booking.get_appointment(appointment.id).await.unwrap();
    assert_eq!(unchanged.start_time, at(MONDAY, 10, 0));
    assert_eq!(unchanged.status, AppointmentStatus::Confirmed);

    // Once the blocker is gone, the same proposal accepts cleanly.
    setup
        .lifecycle
        .cancel(
            &setup.ctx,
            blocker.id,
            CancelAppointmentRequest {
                reason: None,
                cancelled_by: CancelledBy::Patient,
                override_in_progress: false,
            },
        )
        .await
        .unwrap();

    let resolution = setup
        .negotiation
        .resolve(&setup.ctx, proposal.id, ProposalOutcome::Accept)
        .await
        .unwrap();
    assert_matches!(resolution, ProposalResolution::Accepted { .. });
}

#[tokio::test]
async fn resolved_proposals_cannot_be_resolved_again() {
    let setup = TestSetup::new().await;
    let appointment = setup.confirmed_appointment(10, 0).await;
    let proposal = setup
        .negotiation
        .propose(
            &setup.ctx,
            appointment.id,
            at(MONDAY, 14, 0),
            at(MONDAY, 14, 30),
        )
        .await
        .unwrap();

    setup
        .negotiation
        .resolve(&setup.ctx, proposal.id, ProposalOutcome::Decline)
        .await
        .unwrap();

    let result = setup
        .negotiation
        .resolve(&setup.ctx, proposal.id, ProposalOutcome::Accept)
        .await;
    assert_matches!(
        result,
        Err(AppointmentError::ProposalAlreadyResolved(ProposalStatus::Declined))
    );
}

#[tokio::test]
async fn unknown_proposal_is_not_found() {
    let setup = TestSetup::new().await;

    let result = setup
        .negotiation
        .resolve(&setup.ctx, Uuid::new_v4(), ProposalOutcome::Accept)
        .await;
    assert_matches!(result, Err(AppointmentError::ProposalNotFound));
}

#[tokio::test]
async fn declined_proposal_frees_the_appointment_for_a_new_one() {
    let setup = TestSetup::new().await;
    let appointment = setup.confirmed_appointment(10, 0).await;
    let proposal = setup
        .negotiation
        .propose(
            &setup.ctx,
            appointment.id,
            at(MONDAY, 14, 0),
            at(MONDAY, 14, 30),
        )
        .await
        .unwrap();
    setup
        .negotiation
        .resolve(&setup.ctx, proposal.id, ProposalOutcome::Decline)
        .await
        .unwrap();

    // A fresh proposal is allowed once the previous one is resolved.
    setup
        .negotiation
        .propose(
            &setup.ctx,
            appointment.id,
            at(MONDAY, 15, 0),
            at(MONDAY, 15, 30),
        )
        .await
        .unwrap();

    assert_eq!(setup.store.all_appointments().await.len(), 1);
}
