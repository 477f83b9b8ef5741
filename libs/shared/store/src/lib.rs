pub mod locks;
pub mod memory;
pub mod state;
pub mod store;

pub use locks::{DoctorLockGuard, DoctorLockRegistry, LockBusy};
pub use memory::InMemoryStore;
pub use state::AppState;
pub use store::SchedulingStore;
