//! Conflict index: answers "does `[start, end)` overlap any busy interval?"
//!
//! Busy intervals from several calendars routinely overlap or nest (the same
//! meeting on two calendars, a long block containing short ones). On
//! construction they are merged into a sorted, disjoint sequence, so a single
//! binary search lands on the only interval that could overlap a candidate.
//! Lookups are `O(log n)`.

use chrono::{DateTime, Utc};

use crate::event::BusyInterval;

/// Sorted, disjoint busy time for one slot computation.
#[derive(Debug, Clone, Default)]
pub struct ConflictIndex {
    intervals: Vec<BusyInterval>,
}

impl ConflictIndex {
    /// Build an index from busy intervals in any order.
    pub fn new(busy: impl IntoIterator<Item = BusyInterval>) -> Self {
        let mut sorted: Vec<BusyInterval> = busy.into_iter().collect();
        sorted.sort();

        let mut intervals: Vec<BusyInterval> = Vec::with_capacity(sorted.len());
        for interval in sorted {
            let merged = intervals
                .last_mut()
                .is_some_and(|last| last.absorb(&interval));
            if !merged {
                intervals.push(interval);
            }
        }

        Self { intervals }
    }

    /// Whether `[start, end)` overlaps any busy interval.
    pub fn has_conflict(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if self.intervals.is_empty() {
            return false;
        }

        let mut lo = 0;
        let mut hi = self.intervals.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let interval = &self.intervals[mid];
            if interval.end() <= start {
                lo = mid + 1;
            } else if interval.start() >= end {
                hi = mid;
            } else {
                return true;
            }
        }

        // Search converged between two neighbours; confirm against both.
        let from = lo.saturating_sub(1);
        let to = (lo + 1).min(self.intervals.len());
        self.intervals[from..to]
            .iter()
            .any(|interval| interval.overlaps(start, end))
    }

    /// The merged busy intervals, ascending.
    pub fn intervals(&self) -> &[BusyInterval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}
