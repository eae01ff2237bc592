//! Human-readable slot labels.
//!
//! Produces strings such as `"Wed Mar 20, 9:00 AM - 9:30 AM EDT"`, the shape
//! older consumers paste straight into an email body, and the bulleted reply
//! block built from them.

use chrono_tz::Tz;

use crate::slots::SlotDescriptor;

/// Render one slot in `tz`: `<Weekday> <Month> <Day>, <start> - <end> <zone>`.
pub fn format_slot(slot: &SlotDescriptor, tz: Tz) -> String {
    let start = slot.start.with_timezone(&tz);
    let end = slot.end.with_timezone(&tz);
    format!(
        "{} - {} {}",
        start.format("%a %b %-d, %-I:%M %p"),
        end.format("%-I:%M %p"),
        end.format("%Z")
    )
}

pub fn format_slots(slots: &[SlotDescriptor], tz: Tz) -> Vec<String> {
    slots.iter().map(|slot| format_slot(slot, tz)).collect()
}

/// Compose the reply block pasted into a message.
///
/// With slots: a question naming the duration and zone, one `• ` bullet per
/// slot, then the booking-page footer when `booking_link` is set. Without
/// slots: a short notice pointing at the booking page instead.
pub fn format_message(
    slots: &[SlotDescriptor],
    duration_minutes: u32,
    day_count: u32,
    tz: Tz,
    booking_link: Option<&str>,
) -> String {
    let booking_link = booking_link.map(str::trim).filter(|link| !link.is_empty());

    if slots.is_empty() {
        let mut message = format!(
            "No availability found in the next {day_count} days for a {duration_minutes} minute meeting."
        );
        if let Some(link) = booking_link {
            message.push_str("\n\nPlease use my booking page for more options:\n");
            message.push_str(link);
        }
        return message;
    }

    let mut message = format!(
        "Would any of these time windows work for a {duration_minutes} minute meeting ({})?\n\n",
        tz.name()
    );
    for slot in slots {
        message.push_str("• ");
        message.push_str(&format_slot(slot, tz));
        message.push('\n');
    }
    if let Some(link) = booking_link {
        message.push_str(
            "\nFeel free to use this booking page if that's easier (also contains more availabilities):\n",
        );
        message.push_str(link);
    }
    message
}
