// libs/shared/store/src/locks.rs
//
// Per-doctor mutual exclusion for booking, rescheduling and proposal
// acceptance. Every mutation of a doctor's calendar runs its check-then-act
// inside this scope; operations on different doctors never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("scheduling lock for doctor {0} is busy")]
pub struct LockBusy(pub Uuid);

/// Holds the doctor's calendar exclusively until dropped.
pub struct DoctorLockGuard {
    doctor_id: Uuid,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for DoctorLockGuard {
    fn drop(&mut self) {
        debug!("Scheduling lock released for doctor {}", self.doctor_id);
    }
}

pub struct DoctorLockRegistry {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
    wait: Duration,
}

impl DoctorLockRegistry {
    pub fn new(wait_millis: u64) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            wait: Duration::from_millis(wait_millis),
        }
    }

    /// Acquire the lock for one doctor, waiting at most the configured
    /// bound. Expiry surfaces as [`LockBusy`], the only retryable error in
    /// the engine; the caller backs off and resubmits.
    pub async fn acquire(&self, doctor_id: Uuid) -> Result<DoctorLockGuard, LockBusy> {
        let lock = {
            let mut locks = self.locks.lock().expect("lock registry poisoned");
            Arc::clone(locks.entry(doctor_id).or_default())
        };

        match tokio::time::timeout(self.wait, lock.lock_owned()).await {
            Ok(guard) => {
                debug!("Scheduling lock acquired for doctor {}", doctor_id);
                Ok(DoctorLockGuard {
                    doctor_id,
                    _guard: guard,
                })
            }
            Err(_) => {
                warn!(
                    "Scheduling lock for doctor {} not acquired within {:?}",
                    doctor_id, self.wait
                );
                Err(LockBusy(doctor_id))
            }
        }
    }
}
