//! Slot generation: walk working days in fixed steps and keep every window
//! that does not collide with busy time, then cap and spread the result.
//!
//! # Algorithm
//!
//! Days are visited from the local date of the request's start instant. Each
//! working day contributes candidates `[cursor, cursor + duration)` where the
//! cursor starts at the later of the day's working-hour start and the request
//! start, and advances by `step_minutes`. A candidate is kept when it ends no
//! later than the day's working-hour end and the [`ConflictIndex`] reports no
//! overlap. Generation stops once `day_count` working days have been visited;
//! skipped weekend days do not count.
//!
//! Accepted candidates are grouped per local calendar day so the limiter can
//! see how many slots each day offers.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::conflict::ConflictIndex;
use crate::error::{Result, SlotError};
use crate::event::FilterConfig;
use crate::time::at_local;

// ── Configuration ───────────────────────────────────────────────────────────

/// The daily window within which slots may be offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkingHours {
    /// Local start of the working day (default 09:00).
    pub start: NaiveTime,
    /// Local end of the working day (default 17:00).
    pub end: NaiveTime,
    /// Distance between candidate start times (default 30).
    pub step_minutes: u32,
    /// Skip Saturdays and Sundays entirely (default true).
    pub skip_weekends: bool,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            step_minutes: 30,
            skip_weekends: true,
        }
    }
}

impl WorkingHours {
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !(self.skip_weekends && matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
    }

    fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(SlotError::InvalidArgument(format!(
                "working hours must start before they end: {} - {}",
                self.start, self.end
            )));
        }
        if self.step_minutes == 0 {
            return Err(SlotError::InvalidArgument(
                "step_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Post-generation truncation and spreading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitConfig {
    /// Maximum number of slots returned; 0 means unlimited.
    pub max_slots: usize,
    /// Spread the quota across days instead of taking the earliest slots.
    pub diversify: bool,
}

/// Upper bound on `day_count`: one year of working days keeps the candidate
/// list bounded for untrusted input.
pub const MAX_DAY_COUNT: u32 = 366;

/// One slot computation.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRequest {
    pub duration_minutes: u32,
    pub start: DateTime<Utc>,
    /// Number of working days to visit.
    pub day_count: u32,
    /// Zone in which working hours, weekdays and all-day events are read.
    pub timezone: Tz,
    pub working_hours: WorkingHours,
    pub filter: FilterConfig,
    pub limit: LimitConfig,
}

impl SlotRequest {
    /// A request in UTC with default working hours, filters and no limit.
    pub fn new(duration_minutes: u32, start: DateTime<Utc>, day_count: u32) -> Self {
        Self {
            duration_minutes,
            start,
            day_count,
            timezone: Tz::UTC,
            working_hours: WorkingHours::default(),
            filter: FilterConfig::default(),
            limit: LimitConfig::default(),
        }
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_working_hours(mut self, working_hours: WorkingHours) -> Self {
        self.working_hours = working_hours;
        self
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_limit(mut self, limit: LimitConfig) -> Self {
        self.limit = limit;
        self
    }

    /// Reject requests that cannot describe any slot.
    ///
    /// A duration longer than the working day is not an error; it simply
    /// yields no slots.
    pub fn validate(&self) -> Result<()> {
        if self.duration_minutes == 0 {
            return Err(SlotError::InvalidArgument(
                "duration must be a positive number of minutes".to_string(),
            ));
        }
        if self.day_count == 0 {
            return Err(SlotError::InvalidArgument(
                "day count must be positive".to_string(),
            ));
        }
        if self.day_count > MAX_DAY_COUNT {
            return Err(SlotError::InvalidArgument(format!(
                "day count must be at most {MAX_DAY_COUNT}, got {}",
                self.day_count
            )));
        }
        self.working_hours.validate()
    }
}

// ── Output ──────────────────────────────────────────────────────────────────

/// A free meeting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDescriptor {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Local calendar day the slot belongs to.
    pub date: NaiveDate,
}

impl SlotDescriptor {
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// Accepted candidates keyed by local day, built fresh for every call.
type SlotsByDay = BTreeMap<NaiveDate, Vec<SlotDescriptor>>;

// ── Generation ──────────────────────────────────────────────────────────────

/// Generate the free slots for `request` against `index`.
///
/// The result is sorted by start time and capped per `request.limit`.
///
/// # Errors
///
/// Returns [`SlotError::InvalidArgument`] for a zero duration, a zero day
/// count, or malformed working hours.
pub fn generate_slots(index: &ConflictIndex, request: &SlotRequest) -> Result<Vec<SlotDescriptor>> {
    request.validate()?;

    let by_day = collect_candidates(index, request);
    let available: usize = by_day.values().map(Vec::len).sum();

    let mut slots = apply_limit(by_day, &request.limit);
    slots.sort();

    tracing::debug!(
        available,
        returned = slots.len(),
        max_slots = request.limit.max_slots,
        diversify = request.limit.diversify,
        "generated availability slots"
    );

    Ok(slots)
}

fn collect_candidates(index: &ConflictIndex, request: &SlotRequest) -> SlotsByDay {
    let tz = request.timezone;
    let hours = &request.working_hours;
    let duration = chrono::Duration::minutes(i64::from(request.duration_minutes));
    let step = chrono::Duration::minutes(i64::from(hours.step_minutes));

    let mut by_day = SlotsByDay::new();
    let mut date = request.start.with_timezone(&tz).date_naive();
    let mut visited = 0;
    let mut conflict_checks = 0usize;

    while visited < request.day_count {
        if hours.is_working_day(date) {
            visited += 1;
            if let (Some(day_start), Some(day_end)) =
                (at_local(tz, date, hours.start), at_local(tz, date, hours.end))
            {
                let mut cursor = day_start.max(request.start);
                while cursor < day_end {
                    let end = cursor + duration;
                    if end > day_end {
                        break;
                    }
                    conflict_checks += 1;
                    if !index.has_conflict(cursor, end) {
                        by_day.entry(date).or_default().push(SlotDescriptor {
                            start: cursor,
                            end,
                            date,
                        });
                    }
                    cursor += step;
                }
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    tracing::trace!(
        days_visited = visited,
        days_with_slots = by_day.len(),
        conflict_checks,
        busy_intervals = index.len(),
        "slot candidates collected"
    );

    by_day
}

// ── Limiting and diversification ────────────────────────────────────────────

/// Cap the candidate set at `limit.max_slots`.
///
/// Without diversification the earliest slots win. With it, days with slots
/// are visited in order and each takes `remaining / days_left` (rounded down)
/// of its earliest slots; the last day absorbs whatever is left. If a day runs
/// short, the gap is filled from the unused candidates in chronological order
/// so the quota is met whenever enough candidates exist.
fn apply_limit(by_day: SlotsByDay, limit: &LimitConfig) -> Vec<SlotDescriptor> {
    let total: usize = by_day.values().map(Vec::len).sum();
    let max = limit.max_slots;

    if max == 0 || total <= max {
        return by_day.into_values().flatten().collect();
    }
    if !limit.diversify {
        return by_day.into_values().flatten().take(max).collect();
    }

    let days: Vec<Vec<SlotDescriptor>> = by_day.into_values().filter(|d| !d.is_empty()).collect();
    let day_total = days.len();

    let mut picked = Vec::with_capacity(max);
    let mut unused = Vec::new();
    let mut remaining = max;

    for (i, slots) in days.into_iter().enumerate() {
        let days_left = day_total - i;
        let share = if days_left == 1 {
            remaining
        } else {
            remaining / days_left
        };
        let take = share.min(slots.len());

        let mut iter = slots.into_iter();
        picked.extend(iter.by_ref().take(take));
        unused.extend(iter);
        remaining -= take;
    }

    if remaining > 0 {
        unused.sort();
        picked.extend(unused.into_iter().take(remaining));
    }

    picked
}

// ── Tests ───────────────────────────────────────────────────────────────────
