//! Public iCal feed access: URL construction, fetching and VEVENT extraction.

use super::models::RawCalendarEvent;
use super::normalize::transform_cal_event;
use crate::error::{config_error, AppResult, Error};
use crate::events::EventUpdate;
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
};
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

/// Build the public feed URL for a calendar
pub fn feed_url(base_url: &str, calendar_id: &str) -> AppResult<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| config_error(&format!("Invalid calendar base URL {}: {}", base_url, e)))?;

    url.path_segments_mut()
        .map_err(|_| config_error(&format!("Calendar base URL {} cannot hold a path", base_url)))?
        .pop_if_empty()
        .extend(["calendar", "ical", calendar_id, "public", "basic.ics"]);

    Ok(url)
}

/// Fetch the raw feed body
pub async fn fetch_feed(client: &Client, url: &Url) -> AppResult<String> {
    let fetch_error = |cause: String| Error::CalendarFetch {
        url: url.to_string(),
        cause,
    };

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    if !response.status().is_success() {
        return Err(fetch_error(format!("HTTP {}", response.status())));
    }

    response.text().await.map_err(|e| fetch_error(e.to_string()))
}

/// Parse a feed body, keeping only its VEVENT components
pub fn parse_feed(ics: &str, url: &Url) -> AppResult<Vec<RawCalendarEvent>> {
    // the parser accepts any text as an empty calendar
    if !ics.trim_start().starts_with("BEGIN:VCALENDAR") {
        return Err(Error::CalendarParse {
            url: url.to_string(),
            cause: "missing BEGIN:VCALENDAR".to_string(),
        });
    }

    let calendar = ics.parse::<Calendar>().map_err(|cause| Error::CalendarParse {
        url: url.to_string(),
        cause,
    })?;

    let events = calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => Some(raw_event(event)),
            _ => {
                debug!("Skipping non-event calendar component");
                None
            }
        })
        .collect();

    Ok(events)
}

/// Fetch a calendar and normalize its events.
///
/// Returns `None` when the feed holds no events.
pub async fn pull_calendar(
    client: &Client,
    base_url: &str,
    calendar_id: Option<&str>,
) -> AppResult<Option<Vec<EventUpdate>>> {
    let calendar_id = calendar_id
        .filter(|id| !id.is_empty())
        .ok_or(Error::CalendarIdentifierMissing)?;

    let url = feed_url(base_url, calendar_id)?;
    info!(url = %url, "Fetching calendar feed");

    let body = fetch_feed(client, &url).await?;
    let events = parse_feed(&body, &url)?;

    if events.is_empty() {
        info!(url = %url, "Calendar feed contained no events");
        return Ok(None);
    }

    let updates = events
        .iter()
        .map(transform_cal_event)
        .collect::<AppResult<Vec<_>>>()?;

    info!(url = %url, count = updates.len(), "Parsed calendar events");
    Ok(Some(updates))
}

fn raw_event(event: &Event) -> RawCalendarEvent {
    let start = event.get_start().and_then(to_utc);
    // DURATION stands in for DTEND when the latter is absent
    let end = event.get_end().and_then(to_utc).or_else(|| {
        let duration = event.property_value("DURATION").and_then(parse_duration)?;
        start.map(|start| start + duration)
    });

    RawCalendarEvent {
        uid: event.get_uid().map(str::to_string),
        summary: event.get_summary().unwrap_or_default().to_string(),
        description: event.get_description().map(str::to_string),
        location: event.get_location().map(str::to_string),
        start,
        end,
    }
}

/// Parse an iCalendar DURATION value such as `PT1H30M` or `-P1D`
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (negative, magnitude) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.trim_start_matches('+')),
    };

    let parsed = match iso8601::duration(magnitude) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(duration = %value, "Unreadable event duration: {}", e);
            return None;
        }
    };
    let duration = Duration::from_std(parsed.into()).ok()?;
    Some(if negative { -duration } else { duration })
}

/// Read a feed timestamp as an absolute instant
fn to_utc(value: DatePerhapsTime) -> Option<DateTime<Utc>> {
    match value {
        DatePerhapsTime::Date(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => Some(naive.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match tzid.parse::<Tz>() {
                Ok(tz) => tz
                    .from_local_datetime(&date_time)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc)),
                Err(_) => {
                    warn!(tzid = %tzid, "Unknown timezone in feed, reading as UTC");
                    Some(date_time.and_utc())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        feed_url("https://www.google.com", "test-calendar").unwrap()
    }

    #[test]
    fn builds_public_feed_url() {
        assert_eq!(
            feed_url("https://www.google.com", "abc@group.calendar.google.com")
                .unwrap()
                .as_str(),
            "https://www.google.com/calendar/ical/abc@group.calendar.google.com/public/basic.ics"
        );
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(
            feed_url("not a url", "cal"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn keeps_only_vevents() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   PRODID:-//Test//Test//EN\r\n\
                   BEGIN:VTIMEZONE\r\n\
                   TZID:America/New_York\r\n\
                   BEGIN:STANDARD\r\n\
                   DTSTART:19701101T020000\r\n\
                   TZOFFSETFROM:-0400\r\n\
                   TZOFFSETTO:-0500\r\n\
                   END:STANDARD\r\n\
                   END:VTIMEZONE\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:abc123\r\n\
                   DTSTART:20240101T090000Z\r\n\
                   DTEND:20240101T103000Z\r\n\
                   SUMMARY:Opening Ceremony [Keynote]\r\n\
                   LOCATION:Main Hall\r\n\
                   END:VEVENT\r\n\
                   BEGIN:VTODO\r\n\
                   UID:todo-1\r\n\
                   SUMMARY:Order pizza\r\n\
                   END:VTODO\r\n\
                   END:VCALENDAR\r\n";

        let events = parse_feed(ics, &url()).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid.as_deref(), Some("abc123"));
        assert_eq!(events[0].summary, "Opening Ceremony [Keynote]");
        assert_eq!(events[0].location.as_deref(), Some("Main Hall"));
        assert_eq!(
            events[0].start,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn resolves_tzid_timestamps() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   PRODID:-//Test//Test//EN\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:tz-1\r\n\
                   DTSTART;TZID=America/New_York:20240101T090000\r\n\
                   DTEND;TZID=America/New_York:20240101T100000\r\n\
                   SUMMARY:Breakfast\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR\r\n";

        let events = parse_feed(ics, &url()).unwrap();

        assert_eq!(
            events[0].start,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap())
        );
    }

    #[test]
    fn all_day_dates_start_at_midnight_utc() {
        let ics = "BEGIN:VCALENDAR\r\n\
                   VERSION:2.0\r\n\
                   PRODID:-//Test//Test//EN\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:day-1\r\n\
                   DTSTART;VALUE=DATE:20240102\r\n\
                   DTEND;VALUE=DATE:20240103\r\n\
                   SUMMARY:Judging [Ceremony]\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR\r\n";

        let events = parse_feed(ics, &url()).unwrap();
        let update = transform_cal_event(&events[0]).unwrap();

        assert_eq!(
            update.start_timestamp,
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(update.duration, 24 * 60);
    }

    #[test]
    fn garbage_body_is_parse_error() {
        let err = parse_feed("<html>not a calendar</html>", &url()).unwrap_err();
        assert!(matches!(err, Error::CalendarParse { .. }));
    }

    #[test]
    fn empty_body_is_parse_error() {
        let err = parse_feed("", &url()).unwrap_err();
        match err {
            Error::CalendarParse { url, .. } => assert!(url.contains("test-calendar")),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    fn feed_with(event_lines: &str) -> String {
        format!(
            "BEGIN:VCALENDAR\r\n\
             VERSION:2.0\r\n\
             PRODID:-//Test//Test//EN\r\n\
             BEGIN:VEVENT\r\n\
             UID:dur-1\r\n\
             SUMMARY:Hacking Begins [Milestone]\r\n\
             DTSTART:20240101T090000Z\r\n\
             {}\
             END:VEVENT\r\n\
             END:VCALENDAR\r\n",
            event_lines
        )
    }

    #[test]
    fn duration_stands_in_for_missing_end() {
        let events = parse_feed(&feed_with("DURATION:PT1H30M\r\n"), &url()).unwrap();

        assert_eq!(
            events[0].end,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap())
        );
        assert_eq!(transform_cal_event(&events[0]).unwrap().duration, 90);
    }

    #[test]
    fn dtend_wins_over_duration() {
        let lines = "DTEND:20240101T100000Z\r\nDURATION:PT3H\r\n";
        let events = parse_feed(&feed_with(lines), &url()).unwrap();

        assert_eq!(
            events[0].end,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn event_without_end_or_duration_is_missing_timestamp() {
        let events = parse_feed(&feed_with(""), &url()).unwrap();

        assert_eq!(events[0].end, None);
        assert!(matches!(
            transform_cal_event(&events[0]),
            Err(Error::MissingTimestamp)
        ));
    }

    #[test]
    fn parses_signed_durations() {
        assert_eq!(parse_duration("P1D"), Some(Duration::days(1)));
        assert_eq!(parse_duration("-PT15M"), Some(Duration::minutes(-15)));
        assert_eq!(parse_duration("soon"), None);
    }

    #[tokio::test]
    async fn missing_calendar_id_fails_before_fetching() {
        let client = Client::new();
        for id in [None, Some("")] {
            let err = pull_calendar(&client, "http://127.0.0.1:9", id)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::CalendarIdentifierMissing));
        }
    }
}
