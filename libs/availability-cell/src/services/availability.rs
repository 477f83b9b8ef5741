// libs/availability-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use tracing::debug;
use uuid::Uuid;

use shared_models::scheduling::DoctorClinicAssignment;
use shared_store::SchedulingStore;

use crate::interval::{self, TimeInterval};
use crate::models::{AvailabilityError, AvailableSlot};

pub struct AvailabilityService {
    store: Arc<dyn SchedulingStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Calculate bookable slots for a doctor at a clinic over [from, to).
    ///
    /// Open time comes from the assignment's recurring windows, except on
    /// dates that carry override windows, where the overrides alone count.
    /// Every non-terminal appointment of the doctor is subtracted, across
    /// all clinics, so the result never offers a double-booking. The
    /// remaining windows are sliced into consecutive fixed-length slots;
    /// trailing remainders shorter than a slot are discarded.
    ///
    /// The result is a lock-free snapshot: booking re-validates the chosen
    /// window under the doctor's lock rather than trusting this read.
    pub async fn compute_free_slots(
        &self,
        doctor_id: Uuid,
        clinic_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        slot_minutes: i64,
    ) -> Result<Vec<AvailableSlot>, AvailabilityError> {
        if slot_minutes <= 0 {
            return Err(AvailabilityError::InvalidQuery(
                "slot duration must be positive".to_string(),
            ));
        }

        let assignment = self
            .store
            .get_assignment(doctor_id, clinic_id)
            .await?
            .ok_or(AvailabilityError::AssignmentNotFound)?;

        let free = self.free_windows(&assignment, from, to, None).await?;
        let slots = slice_into_slots(&free, slot_minutes);

        debug!(
            "Computed {} free slots for doctor {} at clinic {}",
            slots.len(),
            doctor_id,
            clinic_id
        );
        Ok(slots)
    }

    /// Un-sliced free intervals for an assignment over [from, to).
    /// `exclude_appointment` drops one appointment from the busy set so a
    /// reschedule never conflicts with the window it is vacating.
    pub async fn free_windows(
        &self,
        assignment: &DoctorClinicAssignment,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exclude_appointment: Option<Uuid>,
    ) -> Result<Vec<TimeInterval>, AvailabilityError> {
        if from >= to {
            return Ok(vec![]);
        }

        let open = self.effective_open_time(assignment, from, to).await?;

        let busy: Vec<TimeInterval> = self
            .store
            .list_non_terminal_appointments(assignment.doctor_id, from, to)
            .await?
            .into_iter()
            .filter(|appointment| exclude_appointment != Some(appointment.id))
            .map(|appointment| TimeInterval::new(appointment.start_time, appointment.end_time))
            .collect();

        let mut free = Vec::new();
        for window in open {
            free.extend(interval::subtract(window, &busy));
        }
        Ok(free)
    }

    /// Effective open intervals for the assignment, clipped to [from, to):
    /// per date, the union of that date's override windows if any exist,
    /// otherwise the union of the recurring windows matching its weekday.
    /// Self-overlapping configuration is tolerated; the union never
    /// double-counts capacity.
    async fn effective_open_time(
        &self,
        assignment: &DoctorClinicAssignment,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TimeInterval>, AvailabilityError> {
        let recurring = self.store.list_working_windows(assignment.id).await?;
        let overrides = self
            .store
            .list_business_windows(assignment.id, from.date_naive(), to.date_naive())
            .await?;

        let range = TimeInterval::new(from, to);
        let mut open = Vec::new();

        let mut date = from.date_naive();
        let last = to.date_naive();
        while date <= last {
            let todays_overrides: Vec<&_> =
                overrides.iter().filter(|w| w.date == date).collect();

            if !todays_overrides.is_empty() {
                for window in todays_overrides {
                    open.push(concrete_interval(date, window.start_time, window.end_time));
                }
            } else {
                let dow = day_of_week(date);
                for window in recurring.iter().filter(|w| w.day_of_week == dow) {
                    open.push(concrete_interval(date, window.start_time, window.end_time));
                }
            }

            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        let clipped = open
            .into_iter()
            .filter_map(|window| window.intersection(&range))
            .collect();
        Ok(interval::union(clipped))
    }
}

fn concrete_interval(
    date: NaiveDate,
    start: chrono::NaiveTime,
    end: chrono::NaiveTime,
) -> TimeInterval {
    TimeInterval::new(date.and_time(start).and_utc(), date.and_time(end).and_utc())
}

// 0 = Sunday, 1 = Monday, etc.
fn day_of_week(date: NaiveDate) -> i32 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

/// Slice free windows into consecutive fixed-length candidate slots.
pub fn slice_into_slots(windows: &[TimeInterval], slot_minutes: i64) -> Vec<AvailableSlot> {
    let step = Duration::minutes(slot_minutes);
    let mut slots = Vec::new();

    for window in windows {
        let mut current = window.start;
        while current + step <= window.end {
            slots.push(AvailableSlot {
                start_time: current,
                end_time: current + step,
                duration_minutes: slot_minutes,
            });
            current += step;
        }
    }
    slots
}
