// libs/shared/store/src/state.rs
use std::sync::Arc;

use shared_config::AppConfig;

use crate::locks::DoctorLockRegistry;
use crate::store::SchedulingStore;

/// Shared state handed to every cell router; services are constructed per
/// request from it.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn SchedulingStore>,
    pub locks: Arc<DoctorLockRegistry>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn SchedulingStore>) -> Self {
        let locks = Arc::new(DoctorLockRegistry::new(config.lock_wait_millis));
        Self {
            config,
            store,
            locks,
        }
    }
}
