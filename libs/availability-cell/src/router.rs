// libs/availability-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use shared_store::AppState;

use crate::handlers;

pub fn availability_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/doctors/{doctor_id}/clinics/{clinic_id}/slots",
            get(handlers::get_available_slots),
        )
        .with_state(state)
}
