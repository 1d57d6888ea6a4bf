use super::models::RawCalendarEvent;
use crate::error::{AppResult, Error};
use crate::events::EventUpdate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A single `[Event Type]` tag in the title
    static ref TYPE_TAG: Regex = Regex::new(r"\[(.*?)\]").expect("valid tag regex");
    /// The tag together with the whitespace around it
    static ref TYPE_TAG_PADDED: Regex = Regex::new(r"\s*\[(.*?)\]\s*").expect("valid tag regex");
}

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Split the `[Event Type]` tag out of a summary.
///
/// Only the first bracket group is read and removed; later groups stay in
/// the name untouched.
pub fn split_type_tag(summary: &str) -> (String, String) {
    let event_type = TYPE_TAG
        .captures(summary)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let name = TYPE_TAG_PADDED.replacen(summary, 1, "").into_owned();
    (name, event_type)
}

/// Convert one raw feed event into an event update
pub fn transform_cal_event(event: &RawCalendarEvent) -> AppResult<EventUpdate> {
    let (start, end) = match (event.start, event.end) {
        (Some(start), Some(end)) => (start, end),
        _ => return Err(Error::MissingTimestamp),
    };

    let (name, event_type) = split_type_tag(&event.summary);
    // Floor division: an inverted range yields a negative duration
    let duration = (end - start)
        .num_milliseconds()
        .div_euclid(MILLIS_PER_MINUTE);

    Ok(EventUpdate {
        name,
        start_timestamp: start,
        duration,
        description: event.description.clone(),
        location: event.location.clone(),
        event_type,
        gcal_id: event.uid.clone(),
    })
}
