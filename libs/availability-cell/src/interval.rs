// libs/availability-cell/src/interval.rs
//
// Half-open time intervals and the set operations the scheduling engine is
// built on. Everything here is pure: no clock reads, no store access.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Half-open interval [start, end). An interval with start >= end is empty;
/// empty intervals overlap nothing and contain nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn duration(&self) -> Duration {
        if self.is_empty() {
            Duration::zero()
        } else {
            self.end - self.start
        }
    }

    /// Two intervals overlap iff s1 < e2 and s2 < e1. Touching endpoints do
    /// not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &TimeInterval) -> bool {
        !other.is_empty() && self.start <= other.start && other.end <= self.end
    }

    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn intersection(&self, other: &TimeInterval) -> Option<TimeInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(TimeInterval::new(start, end))
    }
}

/// Merge a set of intervals into a minimal, ordered, disjoint set. Empty
/// inputs drop out; overlapping and exactly-adjacent intervals coalesce.
pub fn union(mut intervals: Vec<TimeInterval>) -> Vec<TimeInterval> {
    intervals.retain(|interval| !interval.is_empty());
    if intervals.is_empty() {
        return intervals;
    }

    intervals.sort_by_key(|interval| interval.start);

    let mut merged: Vec<TimeInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// The ordered free remainder of `window` after removing every interval in
/// `busy`. An empty window yields nothing.
pub fn subtract(window: TimeInterval, busy: &[TimeInterval]) -> Vec<TimeInterval> {
    if window.is_empty() {
        return vec![];
    }

    let mut free = Vec::new();
    let mut cursor = window.start;

    for block in union(busy.to_vec()) {
        if block.end <= cursor {
            continue;
        }
        if block.start >= window.end {
            break;
        }
        if block.start > cursor {
            free.push(TimeInterval::new(cursor, block.start.min(window.end)));
        }
        cursor = cursor.max(block.end);
        if cursor >= window.end {
            return free;
        }
    }

    if cursor < window.end {
        free.push(TimeInterval::new(cursor, window.end));
    }
    free
}
