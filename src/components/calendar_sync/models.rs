use chrono::{DateTime, Utc};

/// Simplified view of one VEVENT from a fetched feed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawCalendarEvent {
    pub uid: Option<String>,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}
