//! Event normalization: raw calendar events → sorted busy intervals.
//!
//! [`RawEvent`] mirrors the shape of a Google Calendar v3 event closely enough
//! that API responses deserialize into it directly. Nothing about a raw event
//! is trusted: timestamps may be missing or unparseable, and such events are
//! dropped rather than reported. Upstream data quality is not ours to enforce.
//!
//! # Filter precedence
//!
//! After an event resolves to a valid `[start, end)` range, it is tested in
//! this order:
//!
//! 1. all-day events are dropped unless `include_all_day`
//! 2. events with neither a location nor a conferencing link are dropped unless
//!    `include_no_location`
//! 3. events without attendees are dropped unless `include_no_participants`
//! 4. transparent (free) events are always dropped

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::time::{at_local, parse_date, parse_timestamp};

// ── Raw event model ─────────────────────────────────────────────────────────

/// A calendar event as delivered by the calendar collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub attendees: Vec<Attendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hangout_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<ConferenceData>,
    pub transparency: Transparency,
}

/// A start or end marker: either a precise timestamp or a date-only marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// IANA zone for an offset-less `date_time`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attendee {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConferenceData {
    pub entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Whether an event blocks time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transparency {
    /// Free: never blocks a slot.
    Transparent,
    /// Busy. Unknown values are read as opaque.
    #[default]
    #[serde(other)]
    Opaque,
}

/// A marker resolved against a timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTime {
    Timed(DateTime<Utc>),
    /// Local midnight of a date-only marker.
    AllDay(DateTime<Utc>),
}

impl ResolvedTime {
    pub fn instant(self) -> DateTime<Utc> {
        match self {
            ResolvedTime::Timed(dt) | ResolvedTime::AllDay(dt) => dt,
        }
    }

    pub fn is_all_day(self) -> bool {
        matches!(self, ResolvedTime::AllDay(_))
    }
}

impl EventTime {
    /// Resolve this marker to an instant.
    ///
    /// `date_time` wins when both fields are set; an unparseable `date_time`
    /// does not fall back to `date`. Date-only markers resolve to local
    /// midnight in `tz`.
    pub fn resolve(&self, tz: Tz) -> Option<ResolvedTime> {
        if let Some(dt) = self.date_time.as_deref().filter(|s| !s.is_empty()) {
            let zone = self
                .time_zone
                .as_deref()
                .and_then(|z| z.parse::<Tz>().ok())
                .unwrap_or(tz);
            return parse_timestamp(dt, zone).map(ResolvedTime::Timed);
        }
        let date = parse_date(self.date.as_deref()?)?;
        at_local(tz, date, NaiveTime::from_hms_opt(0, 0, 0)?).map(ResolvedTime::AllDay)
    }
}

impl RawEvent {
    /// Whether the event names a physical location or a conferencing link.
    pub fn has_location(&self) -> bool {
        let non_empty = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        non_empty(&self.location)
            || non_empty(&self.hangout_link)
            || self
                .conference_data
                .as_ref()
                .is_some_and(|c| c.entry_points.iter().any(|e| non_empty(&e.uri)))
    }

    pub fn has_participants(&self) -> bool {
        !self.attendees.is_empty()
    }

    pub fn is_free(&self) -> bool {
        self.transparency == Transparency::Transparent
    }
}

/// Read events out of arbitrary JSON, dropping entries that do not parse.
///
/// Accepts a flat array of events, an array of per-calendar arrays, or a list
/// response object carrying an `items` array.
pub fn events_from_json(value: &serde_json::Value) -> Vec<RawEvent> {
    let mut out = Vec::new();
    collect_events(value, &mut out);
    out
}

fn collect_events(value: &serde_json::Value, out: &mut Vec<RawEvent>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_events(item, out);
            }
        }
        serde_json::Value::Object(map) if !map.contains_key("start") => {
            if let Some(items) = map.get("items") {
                collect_events(items, out);
            }
        }
        serde_json::Value::Object(_) => {
            if let Ok(event) = serde_json::from_value::<RawEvent>(value.clone()) {
                out.push(event);
            }
        }
        _ => {}
    }
}

// ── Filter configuration ────────────────────────────────────────────────────

/// Which events count as busy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    pub include_all_day: bool,
    pub include_no_location: bool,
    pub include_no_participants: bool,
}

impl FilterConfig {
    /// Count every opaque event as busy.
    pub fn include_all() -> Self {
        Self {
            include_all_day: true,
            include_no_location: true,
            include_no_participants: true,
        }
    }
}

// ── Busy intervals ──────────────────────────────────────────────────────────

/// A half-open `[start, end)` range during which the owner is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BusyInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl BusyInterval {
    /// Returns `None` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Extend this interval to cover `other` when the two overlap or touch.
    pub(crate) fn absorb(&mut self, other: &BusyInterval) -> bool {
        if other.start > self.end || other.end < self.start {
            return false;
        }
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
        true
    }

    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }
}

// ── Normalization ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct NormalizeStats {
    malformed: usize,
    all_day: usize,
    no_location: usize,
    no_participants: usize,
    free: usize,
}

/// Convert raw events into busy intervals sorted ascending by start.
///
/// Pure: the same inputs always produce the same output, and malformed events
/// are silently dropped.
pub fn normalize_events(events: &[RawEvent], filter: &FilterConfig, tz: Tz) -> Vec<BusyInterval> {
    let mut stats = NormalizeStats::default();
    let mut intervals = Vec::with_capacity(events.len());

    for event in events {
        let start = event.start.as_ref().and_then(|s| s.resolve(tz));
        let end = event.end.as_ref().and_then(|e| e.resolve(tz));
        let (Some(start), Some(end)) = (start, end) else {
            stats.malformed += 1;
            continue;
        };
        let Some(interval) = BusyInterval::new(start.instant(), end.instant()) else {
            stats.malformed += 1;
            continue;
        };

        if start.is_all_day() && !filter.include_all_day {
            stats.all_day += 1;
            continue;
        }
        if !filter.include_no_location && !event.has_location() {
            stats.no_location += 1;
            continue;
        }
        if !filter.include_no_participants && !event.has_participants() {
            stats.no_participants += 1;
            continue;
        }
        if event.is_free() {
            stats.free += 1;
            continue;
        }
        intervals.push(interval);
    }

    intervals.sort();

    tracing::debug!(
        total = events.len(),
        kept = intervals.len(),
        malformed = stats.malformed,
        all_day = stats.all_day,
        no_location = stats.no_location,
        no_participants = stats.no_participants,
        free = stats.free,
        "normalized calendar events"
    );

    intervals
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timed(start: &str, end: &str) -> RawEvent {
        RawEvent {
            start: Some(EventTime {
                date_time: Some(start.to_string()),
                ..Default::default()
            }),
            end: Some(EventTime {
                date_time: Some(end.to_string()),
                ..Default::default()
            }),
            location: Some("Room 1".to_string()),
            attendees: vec![Attendee {
                email: Some("a@example.com".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn all_day(start: &str, end: &str) -> RawEvent {
        RawEvent {
            start: Some(EventTime {
                date: Some(start.to_string()),
                ..Default::default()
            }),
            end: Some(EventTime {
                date: Some(end.to_string()),
                ..Default::default()
            }),
            location: Some("Offsite".to_string()),
            attendees: vec![Attendee::default()],
            ..Default::default()
        }
    }

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 18, h, m, 0).unwrap()
    }

    // ── deserialization ─────────────────────────────────────────────────

    #[test]
    fn test_deserialize_google_event() {
        let json = r#"{
            "id": "abc",
            "summary": "Standup",
            "start": {"dateTime": "2024-03-18T10:00:00-04:00", "timeZone": "America/New_York"},
            "end": {"dateTime": "2024-03-18T10:30:00-04:00"},
            "attendees": [{"email": "a@example.com", "responseStatus": "accepted"}],
            "hangoutLink": "https://meet.google.com/abc-defg-hij",
            "transparency": "transparent",
            "etag": "\"123\""
        }"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.id.as_deref(), Some("abc"));
        assert!(event.has_location());
        assert!(event.has_participants());
        assert!(event.is_free());
    }

    #[test]
    fn test_unknown_transparency_is_opaque() {
        let event: RawEvent = serde_json::from_str(r#"{"transparency": "sometimes"}"#).unwrap();
        assert_eq!(event.transparency, Transparency::Opaque);
    }

    #[test]
    fn test_transparency_serde_roundtrip() {
        assert_eq!(
            serde_json::to_string(&Transparency::Transparent).unwrap(),
            "\"transparent\""
        );
        assert_eq!(serde_json::to_string(&Transparency::Opaque).unwrap(), "\"opaque\"");
        let parsed: Transparency = serde_json::from_str("\"opaque\"").unwrap();
        assert_eq!(parsed, Transparency::Opaque);
        assert_eq!(Transparency::default(), Transparency::Opaque);
    }

    #[test]
    fn test_conference_entry_point_counts_as_location() {
        let json = r#"{"conferenceData": {"entryPoints": [{"uri": "https://zoom.us/j/1"}]}}"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert!(event.has_location());
    }

    #[test]
    fn test_blank_location_is_no_location() {
        let event = RawEvent {
            location: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(!event.has_location());
    }

    #[test]
    fn test_events_from_json_shapes() {
        let one = r#"{"start": {"date": "2024-03-18"}, "end": {"date": "2024-03-19"}}"#;
        let flat: serde_json::Value = serde_json::from_str(&format!("[{one}, {one}]")).unwrap();
        assert_eq!(events_from_json(&flat).len(), 2);

        let nested: serde_json::Value =
            serde_json::from_str(&format!("[[{one}], [{one}, {one}]]")).unwrap();
        assert_eq!(events_from_json(&nested).len(), 3);

        let listing: serde_json::Value =
            serde_json::from_str(&format!(r#"{{"kind": "calendar#events", "items": [{one}]}}"#))
                .unwrap();
        assert_eq!(events_from_json(&listing).len(), 1);
    }

    #[test]
    fn test_events_from_json_skips_bad_entries() {
        let json: serde_json::Value = serde_json::from_str(
            r#"[{"start": 42, "end": {"date": "2024-03-19"}}, {"start": {"date": "2024-03-18"}}, "junk", 7]"#,
        )
        .unwrap();
        let events = events_from_json(&json);
        assert_eq!(events.len(), 1);
    }

    // ── resolution ──────────────────────────────────────────────────────

    #[test]
    fn test_date_time_wins_over_date() {
        let marker = EventTime {
            date_time: Some("2024-03-18T10:00:00Z".to_string()),
            date: Some("2024-03-18".to_string()),
            time_zone: None,
        };
        assert_eq!(marker.resolve(Tz::UTC), Some(ResolvedTime::Timed(utc(10, 0))));
    }

    #[test]
    fn test_invalid_date_time_does_not_fall_back() {
        let marker = EventTime {
            date_time: Some("garbage".to_string()),
            date: Some("2024-03-18".to_string()),
            time_zone: None,
        };
        assert_eq!(marker.resolve(Tz::UTC), None);
    }

    #[test]
    fn test_all_day_resolves_to_local_midnight() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let marker = EventTime {
            date: Some("2024-03-18".to_string()),
            ..Default::default()
        };
        let resolved = marker.resolve(tz).unwrap();
        assert!(resolved.is_all_day());
        assert_eq!(resolved.instant(), utc(4, 0));
    }

    #[test]
    fn test_event_time_zone_applies_to_naive_date_time() {
        let marker = EventTime {
            date_time: Some("2024-03-18T10:00:00".to_string()),
            time_zone: Some("Europe/Berlin".to_string()),
            date: None,
        };
        assert_eq!(marker.resolve(Tz::UTC).unwrap().instant(), utc(9, 0));
    }

    // ── normalize_events ────────────────────────────────────────────────

    #[test]
    fn test_normalize_sorts_by_start() {
        let events = vec![
            timed("2024-03-18T14:00:00Z", "2024-03-18T15:00:00Z"),
            timed("2024-03-18T10:00:00Z", "2024-03-18T11:00:00Z"),
        ];
        let busy = normalize_events(&events, &FilterConfig::default(), Tz::UTC);
        assert_eq!(busy.len(), 2);
        assert_eq!(busy[0].start(), utc(10, 0));
        assert_eq!(busy[1].start(), utc(14, 0));
    }

    #[test]
    fn test_normalize_drops_malformed() {
        let mut missing_end = timed("2024-03-18T10:00:00Z", "2024-03-18T11:00:00Z");
        missing_end.end = None;
        let events = vec![
            missing_end,
            timed("invalid", "2024-03-18T11:00:00Z"),
            timed("2024-03-18T11:00:00Z", "2024-03-18T10:00:00Z"),
            timed("2024-03-18T10:00:00Z", "2024-03-18T10:00:00Z"),
            RawEvent::default(),
        ];
        let busy = normalize_events(&events, &FilterConfig::include_all(), Tz::UTC);
        assert!(busy.is_empty());
    }

    #[test]
    fn test_normalize_all_day_filter() {
        let events = vec![all_day("2024-03-18", "2024-03-19")];
        assert!(normalize_events(&events, &FilterConfig::default(), Tz::UTC).is_empty());

        let filter = FilterConfig {
            include_all_day: true,
            ..Default::default()
        };
        let busy = normalize_events(&events, &filter, Tz::UTC);
        assert_eq!(busy.len(), 1);
        assert_eq!(busy[0].start(), utc(0, 0));
        assert_eq!(busy[0].end(), Utc.with_ymd_and_hms(2024, 3, 19, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_normalize_no_location_filter() {
        let mut event = timed("2024-03-18T10:00:00Z", "2024-03-18T11:00:00Z");
        event.location = None;
        let events = vec![event];
        assert!(normalize_events(&events, &FilterConfig::default(), Tz::UTC).is_empty());

        let filter = FilterConfig {
            include_no_location: true,
            ..Default::default()
        };
        assert_eq!(normalize_events(&events, &filter, Tz::UTC).len(), 1);
    }

    #[test]
    fn test_normalize_hangout_link_satisfies_location() {
        let mut event = timed("2024-03-18T10:00:00Z", "2024-03-18T11:00:00Z");
        event.location = None;
        event.hangout_link = Some("https://meet.google.com/x".to_string());
        assert_eq!(
            normalize_events(&[event], &FilterConfig::default(), Tz::UTC).len(),
            1
        );
    }

    #[test]
    fn test_normalize_no_participants_filter() {
        let mut event = timed("2024-03-18T10:00:00Z", "2024-03-18T11:00:00Z");
        event.attendees.clear();
        let events = vec![event];
        assert!(normalize_events(&events, &FilterConfig::default(), Tz::UTC).is_empty());

        let filter = FilterConfig {
            include_no_participants: true,
            ..Default::default()
        };
        assert_eq!(normalize_events(&events, &filter, Tz::UTC).len(), 1);
    }

    #[test]
    fn test_normalize_transparent_always_dropped() {
        let mut event = timed("2024-03-18T10:00:00Z", "2024-03-18T11:00:00Z");
        event.transparency = Transparency::Transparent;
        assert!(normalize_events(&[event.clone()], &FilterConfig::default(), Tz::UTC).is_empty());
        assert!(normalize_events(&[event], &FilterConfig::include_all(), Tz::UTC).is_empty());
    }

    #[test]
    fn test_busy_interval_half_open_overlap() {
        let b = BusyInterval::new(utc(10, 0), utc(11, 0)).unwrap();
        assert!(!b.overlaps(utc(9, 30), utc(10, 0)));
        assert!(b.overlaps(utc(10, 0), utc(10, 30)));
        assert!(b.overlaps(utc(10, 30), utc(11, 0)));
        assert!(!b.overlaps(utc(11, 0), utc(11, 30)));
        assert!(BusyInterval::new(utc(11, 0), utc(10, 0)).is_none());
    }
}
