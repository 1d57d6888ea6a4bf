use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A normalized calendar entry, ready to be reconciled into the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub name: String,
    pub start_timestamp: DateTime<Utc>,
    /// Whole minutes, negative when the feed has end before start
    pub duration: i64,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_type: String,
    #[serde(rename = "gcalID")]
    pub gcal_id: Option<String>,
}

/// Upsert request: an event update plus an optional internal identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdateInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub start_timestamp: DateTime<Utc>,
    pub duration: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub event_type: String,
    #[serde(rename = "gcalID", default)]
    pub gcal_id: Option<String>,
}

impl From<EventUpdate> for EventUpdateInput {
    fn from(update: EventUpdate) -> Self {
        Self {
            id: None,
            name: update.name,
            start_timestamp: update.start_timestamp,
            duration: update.duration,
            description: update.description,
            location: update.location,
            event_type: update.event_type,
            gcal_id: update.gcal_id,
        }
    }
}

/// One attendance record in an event's check-in log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkin {
    pub user: String,
    pub timestamp: DateTime<Utc>,
}

/// Persistent event record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub start_timestamp: DateTime<Utc>,
    pub duration: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub event_type: String,
    #[serde(rename = "gcalID", default)]
    pub gcal_id: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub checkins: Vec<Checkin>,
    #[serde(default)]
    pub warn_repeated_checkins: bool,
}

/// Fields a sync always overwrites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContent {
    pub name: String,
    pub start_timestamp: DateTime<Utc>,
    pub duration: i64,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_type: String,
}

impl From<&EventUpdateInput> for EventContent {
    fn from(input: &EventUpdateInput) -> Self {
        Self {
            name: input.name.clone(),
            start_timestamp: input.start_timestamp,
            duration: input.duration,
            description: input.description.clone(),
            location: input.location.clone(),
            event_type: input.event_type.clone(),
        }
    }
}

/// Operator-owned fields, written only when a record is first created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDefaults {
    pub attendees: Vec<String>,
    pub checkins: Vec<Checkin>,
    pub warn_repeated_checkins: bool,
}

impl Default for EventDefaults {
    fn default() -> Self {
        Self {
            attendees: Vec::new(),
            checkins: Vec::new(),
            warn_repeated_checkins: true,
        }
    }
}

/// Which record an upsert targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKey {
    /// External feed identifier
    GcalId(String),
    /// Internal identifier
    Id(Uuid),
}

impl Event {
    /// Build the record an upsert creates when nothing matched its key
    pub fn inserted(key: &EventKey, content: EventContent, defaults: EventDefaults) -> Self {
        let (id, gcal_id) = match key {
            EventKey::GcalId(uid) => (Uuid::new_v4(), Some(uid.clone())),
            EventKey::Id(id) => (*id, None),
        };

        let mut event = Self {
            id,
            name: String::new(),
            start_timestamp: content.start_timestamp,
            duration: 0,
            description: None,
            location: None,
            event_type: String::new(),
            gcal_id,
            attendees: defaults.attendees,
            checkins: defaults.checkins,
            warn_repeated_checkins: defaults.warn_repeated_checkins,
        };
        event.apply(content);
        event
    }

    /// Overwrite the content fields, leaving operator fields as they are
    pub fn apply(&mut self, content: EventContent) {
        self.name = content.name;
        self.start_timestamp = content.start_timestamp;
        self.duration = content.duration;
        self.description = content.description;
        self.location = content.location;
        self.event_type = content.event_type;
    }
}
