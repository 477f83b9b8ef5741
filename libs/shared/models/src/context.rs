use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is invoking an engine operation. Identity resolution happens in the
/// surrounding system; the engine only records and gates on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Patient(Uuid),
    Doctor(Uuid),
    ClinicStaff(Uuid),
    System,
}

/// Explicit per-call context. The engine never reads ambient wall-clock
/// time; `now` is captured once at the request boundary so every decision
/// inside one call sees the same instant and tests can pin it.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub now: DateTime<Utc>,
    pub actor: Actor,
}

impl RequestContext {
    pub fn new(now: DateTime<Utc>, actor: Actor) -> Self {
        Self { now, actor }
    }

    /// Boundary constructor: stamps the current instant.
    pub fn capture(actor: Actor) -> Self {
        Self {
            now: Utc::now(),
            actor,
        }
    }
}
