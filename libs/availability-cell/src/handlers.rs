// libs/availability-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_store::AppState;

use crate::models::{AvailabilityError, SlotQuery};
use crate::services::AvailabilityService;

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppState>>,
    Path((doctor_id, clinic_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(Arc::clone(&state.store));
    let slot_minutes = query
        .slot_minutes
        .unwrap_or(state.config.slot_duration_minutes);

    let slots = service
        .compute_free_slots(doctor_id, clinic_id, query.from, query.to, slot_minutes)
        .await
        .map_err(|e| match e {
            AvailabilityError::AssignmentNotFound => {
                AppError::NotFound("Doctor is not assigned to this clinic".to_string())
            }
            AvailabilityError::InvalidQuery(msg) => AppError::BadRequest(msg),
            AvailabilityError::Store(err) => AppError::Internal(err.to_string()),
        })?;

    Ok(Json(json!({
        "success": true,
        "count": slots.len(),
        "slots": slots
    })))
}
