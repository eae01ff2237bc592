//! The one-call entry point: raw events in, free slots out.
//!
//! Each call builds its own busy list, index and per-day buckets; nothing is
//! shared between calls except the caller's read-only configuration, so
//! concurrent callers cannot interfere with each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conflict::ConflictIndex;
use crate::error::Result;
use crate::event::{normalize_events, FilterConfig, RawEvent};
use crate::format::{format_message, format_slots};
use crate::slots::{generate_slots, LimitConfig, SlotDescriptor, SlotRequest, WorkingHours};
use crate::time::parse_timezone;

/// Caller preferences for a slot computation.
///
/// Field names follow the extension's stored settings, so a settings object
/// deserializes directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailabilityConfig {
    #[serde(flatten)]
    pub filter: FilterConfig,
    #[serde(flatten)]
    pub limit: LimitConfig,
    /// IANA timezone for working hours and all-day events.
    pub timezone: String,
    pub working_hours: WorkingHours,
    /// Scheduling page offered alongside (or instead of) the slots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_link: Option<String>,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            limit: LimitConfig::default(),
            timezone: "UTC".to_string(),
            working_hours: WorkingHours::default(),
            booking_link: None,
        }
    }
}

impl AvailabilityConfig {
    /// Build a validated [`SlotRequest`] from this configuration.
    pub fn request(
        &self,
        duration_minutes: u32,
        start: DateTime<Utc>,
        day_count: u32,
    ) -> Result<SlotRequest> {
        let request = SlotRequest::new(duration_minutes, start, day_count)
            .with_timezone(parse_timezone(&self.timezone)?)
            .with_working_hours(self.working_hours)
            .with_filter(self.filter)
            .with_limit(self.limit);
        request.validate()?;
        Ok(request)
    }
}

/// Compute free slots for `events` starting at `start`.
///
/// # Errors
///
/// Returns [`SlotError::InvalidArgument`](crate::SlotError::InvalidArgument)
/// for a zero duration or day count, and
/// [`SlotError::InvalidTimezone`](crate::SlotError::InvalidTimezone) for an
/// unknown zone. Malformed events are dropped, never reported.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use slot_engine::{compute_availability, AvailabilityConfig};
///
/// let monday = Utc.with_ymd_and_hms(2024, 3, 18, 9, 0, 0).unwrap();
/// let slots = compute_availability(&[], 30, monday, 1, &AvailabilityConfig::default()).unwrap();
/// assert_eq!(slots.len(), 16);
/// ```
pub fn compute_availability(
    events: &[RawEvent],
    duration_minutes: u32,
    start: DateTime<Utc>,
    day_count: u32,
    config: &AvailabilityConfig,
) -> Result<Vec<SlotDescriptor>> {
    let request = config.request(duration_minutes, start, day_count)?;
    find_available_slots(events, &request)
}

/// Like [`compute_availability`], rendering each slot as a label.
pub fn compute_availability_formatted(
    events: &[RawEvent],
    duration_minutes: u32,
    start: DateTime<Utc>,
    day_count: u32,
    config: &AvailabilityConfig,
) -> Result<Vec<String>> {
    let request = config.request(duration_minutes, start, day_count)?;
    let slots = find_available_slots(events, &request)?;
    Ok(format_slots(&slots, request.timezone))
}

/// Like [`compute_availability`], composing the full reply block.
///
/// An empty result is not an error: the block then points at the configured
/// booking link.
pub fn compose_availability_message(
    events: &[RawEvent],
    duration_minutes: u32,
    start: DateTime<Utc>,
    day_count: u32,
    config: &AvailabilityConfig,
) -> Result<String> {
    let request = config.request(duration_minutes, start, day_count)?;
    let slots = find_available_slots(events, &request)?;
    Ok(format_message(
        &slots,
        duration_minutes,
        day_count,
        request.timezone,
        config.booking_link.as_deref(),
    ))
}

/// Normalize, index and generate for an already-built request.
pub fn find_available_slots(events: &[RawEvent], request: &SlotRequest) -> Result<Vec<SlotDescriptor>> {
    request.validate()?;
    let busy = normalize_events(events, &request.filter, request.timezone);
    let index = ConflictIndex::new(busy);
    generate_slots(&index, request)
}
