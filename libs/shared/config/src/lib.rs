use std::env;
use tracing::warn;

/// Scheduling policy knobs, loaded once at startup and threaded into the
/// engine services. Every value falls back to a sensible default so the
/// server can boot in an unconfigured environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Fixed booking slot length; appointment end times are derived from it,
    /// never supplied by clients.
    pub slot_duration_minutes: i64,
    /// Upper bound on waiting for a doctor's scheduling lock before the
    /// operation fails with a retryable busy error.
    pub lock_wait_millis: u64,
    /// How many minutes before its scheduled start a confirmed appointment
    /// may be started.
    pub early_start_grace_minutes: i64,
    /// How long past the scheduled start a confirmed appointment may be
    /// declared a no-show by the provider.
    pub no_show_threshold_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            slot_duration_minutes: read_var("SLOT_DURATION_MINUTES", 30),
            lock_wait_millis: read_var("SCHEDULING_LOCK_WAIT_MILLIS", 500),
            early_start_grace_minutes: read_var("EARLY_START_GRACE_MINUTES", 15),
            no_show_threshold_minutes: read_var("NO_SHOW_THRESHOLD_MINUTES", 30),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slot_duration_minutes: 30,
            lock_wait_millis: 500,
            early_start_grace_minutes: 15,
            no_show_threshold_minutes: 30,
        }
    }
}

fn read_var<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("{} has invalid value {:?}, using default", name, raw);
                default
            }
        },
        Err(_) => {
            warn!("{} not set, using default", name);
            default
        }
    }
}
