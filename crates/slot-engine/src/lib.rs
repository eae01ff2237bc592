//! # slot-engine
//!
//! Deterministic meeting-slot computation.
//!
//! Given calendar events and a handful of preferences, the engine produces a
//! sorted list of meeting windows that fall inside working hours, skip
//! weekends, and never overlap busy time. It performs no I/O: events arrive
//! already fetched, and slots leave as structured values or formatted labels.
//!
//! ## Modules
//!
//! - [`event`] — Raw event model and normalization into busy intervals
//! - [`conflict`] — Sorted, merged busy index with logarithmic overlap queries
//! - [`slots`] — Working-hour slot generation, limiting and diversification
//! - [`availability`] — One-call facade over normalize → index → generate
//! - [`format`] — Human-readable slot labels and the bulleted reply block
//! - [`cache`] — Expiring per-calendar event cache for the fetching layer
//! - [`time`] — Timezone and timestamp parsing, DST-aware local → UTC mapping
//! - [`error`] — Error types

pub mod availability;
pub mod cache;
pub mod conflict;
pub mod error;
pub mod event;
pub mod format;
pub mod slots;
pub mod time;

pub use availability::{
    compose_availability_message, compute_availability, compute_availability_formatted,
    find_available_slots, AvailabilityConfig,
};
pub use cache::{CacheKey, Clock, EventCache, ManualClock, SystemClock};
pub use conflict::ConflictIndex;
pub use error::SlotError;
pub use event::{
    events_from_json, normalize_events, Attendee, BusyInterval, EventTime, FilterConfig, RawEvent,
    Transparency,
};
pub use format::{format_message, format_slot, format_slots};
pub use slots::{
    generate_slots, LimitConfig, SlotDescriptor, SlotRequest, WorkingHours, MAX_DAY_COUNT,
};
pub use time::parse_timezone;
