// libs/appointment-cell/src/services/negotiation.rs
//
// Provider-side business-time negotiation: a pending proposal to move one
// appointment, resolved by the counterpart. Acceptance is transactional
// across the proposal and the appointment: the appointment only moves if
// the proposed window clears the same conflict gate as a reschedule, and
// the proposal only becomes Accepted once the move is committed.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use availability_cell::interval::TimeInterval;
use shared_config::AppConfig;
use shared_models::context::RequestContext;
use shared_models::scheduling::{
    Appointment, BusinessTimeChangeProposal, ProposalStatus,
};
use shared_store::{DoctorLockRegistry, SchedulingStore};

use crate::models::{AppointmentError, LifecycleEvent, ProposalOutcome};
use crate::services::booking::BookingService;
use crate::services::lifecycle::AppointmentLifecycleService;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum ProposalResolution {
    Accepted {
        proposal: BusinessTimeChangeProposal,
        appointment: Appointment,
    },
    Declined {
        proposal: BusinessTimeChangeProposal,
    },
}

pub struct NegotiationService {
    store: Arc<dyn SchedulingStore>,
    locks: Arc<DoctorLockRegistry>,
    booking: BookingService,
}

impl NegotiationService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        locks: Arc<DoctorLockRegistry>,
        config: &AppConfig,
    ) -> Self {
        let booking = BookingService::new(Arc::clone(&store), Arc::clone(&locks), config);
        Self {
            store,
            locks,
            booking,
        }
    }

    /// Raise a proposal to move an appointment. At most one pending
    /// proposal may exist per appointment.
    pub async fn propose(
        &self,
        ctx: &RequestContext,
        appointment_id: Uuid,
        proposed_start: chrono::DateTime<chrono::Utc>,
        proposed_end: chrono::DateTime<chrono::Utc>,
    ) -> Result<BusinessTimeChangeProposal, AppointmentError> {
        if proposed_start >= proposed_end {
            return Err(AppointmentError::InvalidTime(
                "Proposed start must be before proposed end".to_string(),
            ));
        }

        let appointment = self
            .store
            .get_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        AppointmentLifecycleService::validate_transition(
            appointment.status,
            LifecycleEvent::Propose,
        )?;

        if self
            .store
            .pending_proposal_for(appointment_id)
            .await?
            .is_some()
        {
            warn!(
                "Rejecting second active proposal for appointment {}",
                appointment_id
            );
            return Err(AppointmentError::ActiveProposalExists);
        }

        let assignment = self
            .store
            .get_assignment(appointment.doctor_id, appointment.clinic_id)
            .await?
            .ok_or(AppointmentError::AssignmentNotFound)?;

        let proposal = BusinessTimeChangeProposal {
            id: Uuid::new_v4(),
            appointment_id,
            assignment_id: assignment.id,
            proposed_start,
            proposed_end,
            status: ProposalStatus::Pending,
            created_at: ctx.now,
            resolved_at: None,
        };
        self.store.insert_proposal(&proposal).await?;

        info!(
            "Proposal {} raised for appointment {} ({} - {})",
            proposal.id, appointment_id, proposed_start, proposed_end
        );
        Ok(proposal)
    }

    /// Resolve a pending proposal. Decline leaves the appointment
    /// untouched. Accept moves the appointment to the proposed window and
    /// resets it to Pending for reconfirmation; if the window fails the
    /// conflict check the proposal stays Pending and the caller sees the
    /// conflict.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        proposal_id: Uuid,
        outcome: ProposalOutcome,
    ) -> Result<ProposalResolution, AppointmentError> {
        let proposal = self
            .store
            .get_proposal(proposal_id)
            .await?
            .ok_or(AppointmentError::ProposalNotFound)?;

        if proposal.status != ProposalStatus::Pending {
            return Err(AppointmentError::ProposalAlreadyResolved(proposal.status));
        }

        let appointment = self
            .store
            .get_appointment(proposal.appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        let _guard = self.locks.acquire(appointment.doctor_id).await?;

        match outcome {
            ProposalOutcome::Decline => {
                let mut proposal = proposal;
                proposal.status = ProposalStatus::Declined;
                proposal.resolved_at = Some(ctx.now);
                self.store.update_proposal(&proposal).await?;

                info!("Proposal {} declined", proposal.id);
                Ok(ProposalResolution::Declined { proposal })
            }
            ProposalOutcome::Accept => {
                let window = TimeInterval::new(proposal.proposed_start, proposal.proposed_end);
                let appointment = self
                    .booking
                    .commit_move(ctx, proposal.appointment_id, window, true)
                    .await?;

                let mut proposal = proposal;
                proposal.status = ProposalStatus::Accepted;
                proposal.resolved_at = Some(ctx.now);
                self.store.update_proposal(&proposal).await?;

                info!(
                    "Proposal {} accepted, appointment {} moved",
                    proposal.id, appointment.id
                );
                Ok(ProposalResolution::Accepted {
                    proposal,
                    appointment,
                })
            }
        }
    }
}
