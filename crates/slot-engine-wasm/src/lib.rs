//! WASM bindings for slot-engine.
//!
//! The extension's background worker fetches events and hands them over as
//! JSON together with the request it received from the popup. The response
//! keeps the shape the popup already consumes: `{ "slots": [...] }`, plus a
//! `message` when nothing is free. `text` carries the ready-to-paste reply
//! block, including the booking link from settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slot_engine::{
    compute_availability, events_from_json, format_message, format_slot, parse_timezone,
    AvailabilityConfig, SlotDescriptor,
};
use wasm_bindgen::prelude::*;

const NO_SLOTS_MESSAGE: &str = "No available slots found in the selected time range.";

/// A `getAvailability` request plus the user's stored settings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityRequest {
    duration: u32,
    days: u32,
    /// Defaults to the current time.
    #[serde(default)]
    start: Option<DateTime<Utc>>,
    /// Return `{start, end, date, label}` objects instead of plain labels.
    #[serde(default)]
    structured: bool,
    #[serde(flatten)]
    config: AvailabilityConfig,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum SlotOut {
    Label(String),
    Structured {
        #[serde(flatten)]
        slot: SlotDescriptor,
        label: String,
    },
}

#[derive(Debug, Serialize)]
struct AvailabilityResponse {
    slots: Vec<SlotOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    text: String,
}

/// Compute availability from JSON inputs, returning the JSON response.
pub fn get_availability(events_json: &str, request_json: &str) -> Result<String, String> {
    let request: AvailabilityRequest =
        serde_json::from_str(request_json).map_err(|e| format!("Invalid request: {e}"))?;
    let events: serde_json::Value =
        serde_json::from_str(events_json).map_err(|e| format!("Invalid events: {e}"))?;
    let events = events_from_json(&events);

    let tz = parse_timezone(&request.config.timezone).map_err(|e| e.to_string())?;
    let start = request.start.unwrap_or_else(Utc::now);
    let slots = compute_availability(&events, request.duration, start, request.days, &request.config)
        .map_err(|e| e.to_string())?;

    let message = slots.is_empty().then_some(NO_SLOTS_MESSAGE);
    let text = format_message(
        &slots,
        request.duration,
        request.days,
        tz,
        request.config.booking_link.as_deref(),
    );
    let slots = slots
        .into_iter()
        .map(|slot| {
            let label = format_slot(&slot, tz);
            if request.structured {
                SlotOut::Structured { slot, label }
            } else {
                SlotOut::Label(label)
            }
        })
        .collect();

    serde_json::to_string(&AvailabilityResponse {
        slots,
        message,
        text,
    }).map_err(|e| e.to_string())
}

#[wasm_bindgen(js_name = getAvailability)]
pub fn get_availability_js(events_json: &str, request_json: &str) -> Result<String, JsValue> {
    get_availability(events_json, request_json).map_err(|e| JsValue::from_str(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: &str = r#"[[{
        "start": {"dateTime": "2024-03-20T10:00:00-04:00"},
        "end": {"dateTime": "2024-03-20T11:00:00-04:00"},
        "hangoutLink": "https://meet.google.com/abc-defg-hij",
        "attendees": [{"email": "a@example.com"}]
    }]]"#;

    fn parse(response: &str) -> serde_json::Value {
        serde_json::from_str(response).unwrap()
    }

    #[test]
    fn test_labels_by_default() {
        let request = r#"{
            "duration": 30, "days": 1,
            "start": "2024-03-20T13:00:00Z",
            "timezone": "America/New_York"
        }"#;
        let response = parse(&get_availability(EVENTS, request).unwrap());
        let slots = response["slots"].as_array().unwrap();
        assert_eq!(slots.len(), 14);
        assert_eq!(slots[0], "Wed Mar 20, 9:00 AM - 9:30 AM EDT");
        assert_eq!(slots[2], "Wed Mar 20, 11:00 AM - 11:30 AM EDT");
        assert!(response.get("message").is_none());
        let text = response["text"].as_str().unwrap();
        assert!(text.starts_with(
            "Would any of these time windows work for a 30 minute meeting (America/New_York)?"
        ));
        assert_eq!(text.matches("• ").count(), 14);
    }

    #[test]
    fn test_structured_slots() {
        let request = r#"{
            "duration": 60, "days": 2, "structured": true,
            "start": "2024-03-20T13:00:00Z",
            "timezone": "America/New_York",
            "maxSlots": 2, "diversify": true
        }"#;
        let response = parse(&get_availability(EVENTS, request).unwrap());
        let slots = response["slots"].as_array().unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0]["date"], "2024-03-20");
        assert_eq!(slots[1]["date"], "2024-03-21");
        assert!(slots[0]["label"].as_str().unwrap().contains("EDT"));
    }

    #[test]
    fn test_no_slots_message() {
        let request = r#"{"duration": 600, "days": 1, "start": "2024-03-20T13:00:00Z"}"#;
        let response = parse(&get_availability("[]", request).unwrap());
        assert_eq!(response["slots"].as_array().unwrap().len(), 0);
        assert_eq!(response["message"], NO_SLOTS_MESSAGE);
        assert_eq!(
            response["text"],
            "No availability found in the next 1 days for a 600 minute meeting."
        );
    }

    #[test]
    fn test_booking_link_from_settings() {
        let request = r#"{
            "duration": 30, "days": 1, "maxSlots": 1,
            "start": "2024-03-20T13:00:00Z",
            "bookingLink": "https://cal.example.com/me"
        }"#;
        let response = parse(&get_availability("[]", request).unwrap());
        let text = response["text"].as_str().unwrap();
        assert!(text.contains("• Wed Mar 20, 1:00 PM - 1:30 PM UTC\n"), "got: {text}");
        assert!(text.ends_with("https://cal.example.com/me"));
    }

    #[test]
    fn test_invalid_request_is_an_error() {
        let err = get_availability("[]", r#"{"days": 1}"#).unwrap_err();
        assert!(err.starts_with("Invalid request"), "got: {err}");

        let err = get_availability("[]", r#"{"duration": 30, "days": 0}"#).unwrap_err();
        assert!(err.contains("Invalid argument"), "got: {err}");
    }

    #[test]
    fn test_malformed_events_json_is_an_error() {
        let err = get_availability("{", r#"{"duration": 30, "days": 1}"#).unwrap_err();
        assert!(err.starts_with("Invalid events"), "got: {err}");
    }
}
