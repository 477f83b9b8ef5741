// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::context::{Actor, RequestContext};
use shared_models::error::AppError;
use shared_store::AppState;

use crate::models::{
    BookAppointmentRequest, CancelAppointmentRequest, ProposeBusinessTimeRequest,
    RescheduleAppointmentRequest, ResolveProposalRequest,
};
use crate::services::{AppointmentLifecycleService, BookingService, NegotiationService};

// Identity resolution lives in the surrounding system; commands carry the
// acting party where the engine needs it for the audit trail.

fn booking_service(state: &AppState) -> BookingService {
    BookingService::new(
        Arc::clone(&state.store),
        Arc::clone(&state.locks),
        &state.config,
    )
}

fn lifecycle_service(state: &AppState) -> AppointmentLifecycleService {
    AppointmentLifecycleService::new(
        Arc::clone(&state.store),
        Arc::clone(&state.locks),
        &state.config,
    )
}

fn negotiation_service(state: &AppState) -> NegotiationService {
    NegotiationService::new(
        Arc::clone(&state.store),
        Arc::clone(&state.locks),
        &state.config,
    )
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::capture(Actor::Patient(request.patient_id));

    let appointment = booking_service(&state).book(&ctx, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = booking_service(&state)
        .get_appointment(appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::capture(Actor::System);
    let appointment = lifecycle_service(&state)
        .confirm(&ctx, appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn start_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::capture(Actor::System);
    let appointment = lifecycle_service(&state)
        .start(&ctx, appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::capture(Actor::System);
    let appointment = lifecycle_service(&state)
        .complete(&ctx, appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::capture(Actor::System);
    let appointment = lifecycle_service(&state)
        .cancel(&ctx, appointment_id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn mark_appointment_no_show(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::capture(Actor::System);
    let appointment = lifecycle_service(&state)
        .mark_no_show(&ctx, appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::capture(Actor::System);
    let appointment = booking_service(&state)
        .reschedule(&ctx, appointment_id, request.new_start_time)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled"
    })))
}

#[axum::debug_handler]
pub async fn propose_business_time_change(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<ProposeBusinessTimeRequest>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::capture(Actor::System);
    let proposal = negotiation_service(&state)
        .propose(
            &ctx,
            appointment_id,
            request.proposed_start,
            request.proposed_end,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "proposal": proposal
    })))
}

#[axum::debug_handler]
pub async fn resolve_business_time_change(
    State(state): State<Arc<AppState>>,
    Path(proposal_id): Path<Uuid>,
    Json(request): Json<ResolveProposalRequest>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::capture(Actor::System);
    let resolution = negotiation_service(&state)
        .resolve(&ctx, proposal_id, request.outcome)
        .await?;

    Ok(Json(json!({
        "success": true,
        "result": resolution
    })))
}
