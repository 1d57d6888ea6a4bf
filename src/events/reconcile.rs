use super::models::{Event, EventContent, EventDefaults, EventKey, EventUpdateInput};
use crate::error::{AppResult, Error};
use crate::storage::EventStore;
use tracing::{debug, info};

/// Pick the record an update targets: the feed uid wins over the internal id.
///
/// A record created without a gcalID is only reachable through its id, so a
/// caller re-keying such a record must pass the id and leave gcalID empty.
pub fn event_key(input: &EventUpdateInput) -> AppResult<EventKey> {
    match (input.gcal_id.as_deref(), input.id) {
        (Some(uid), _) if !uid.is_empty() => Ok(EventKey::GcalId(uid.to_string())),
        (_, Some(id)) => Ok(EventKey::Id(id)),
        _ => Err(Error::MissingKey),
    }
}

/// Insert or update one event, returning the stored record
pub async fn add_or_update_event<S>(input: &EventUpdateInput, store: &S) -> AppResult<Event>
where
    S: EventStore + ?Sized,
{
    let key = event_key(input)?;
    let content = EventContent::from(input);

    debug!(event = %input.name, key = ?key, "Upserting event");

    let reply = store
        .upsert_event(&key, &content, &EventDefaults::default())
        .await?;

    match reply.value {
        Some(event) if reply.ok => {
            info!(event = %event.name, id = %event.id, "Event stored");
            Ok(event)
        }
        _ => Err(Error::UpsertFailed {
            name: input.name.clone(),
            detail: reply
                .last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "null".to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::models::Checkin;
    use crate::storage::{InMemoryStore, UpsertReply};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn input(name: &str, gcal_id: Option<&str>) -> EventUpdateInput {
        EventUpdateInput {
            id: None,
            name: name.to_string(),
            start_timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            duration: 90,
            description: Some("Welcome".to_string()),
            location: Some("Main Hall".to_string()),
            event_type: "Keynote".to_string(),
            gcal_id: gcal_id.map(str::to_string),
        }
    }

    /// Store that counts calls and reports a configurable reply
    #[derive(Default)]
    struct ScriptedStore {
        calls: AtomicUsize,
        ok: bool,
    }

    #[async_trait]
    impl EventStore for ScriptedStore {
        async fn upsert_event(
            &self,
            _key: &EventKey,
            _content: &EventContent,
            _defaults: &EventDefaults,
        ) -> AppResult<UpsertReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(UpsertReply {
                value: None,
                ok: self.ok,
                last_error: Some(serde_json::json!({ "err": "write conflict" })),
            })
        }

        async fn get_event(&self, _id: Uuid) -> AppResult<Option<Event>> {
            Ok(None)
        }

        async fn list_events(&self) -> AppResult<Vec<Event>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn gcal_id_takes_precedence_over_id() {
        let mut update = input("Demo", Some("abc123"));
        update.id = Some(Uuid::new_v4());
        assert_eq!(
            event_key(&update).unwrap(),
            EventKey::GcalId("abc123".to_string())
        );
    }

    #[test]
    fn empty_gcal_id_falls_back_to_id() {
        let id = Uuid::new_v4();
        let mut update = input("Demo", Some(""));
        update.id = Some(id);
        assert_eq!(event_key(&update).unwrap(), EventKey::Id(id));
    }

    #[tokio::test]
    async fn first_sync_creates_with_defaults() {
        let store = InMemoryStore::new();
        let event = add_or_update_event(&input("Opening Ceremony", Some("abc123")), &store)
            .await
            .unwrap();

        assert_eq!(event.gcal_id.as_deref(), Some("abc123"));
        assert!(event.attendees.is_empty());
        assert!(event.checkins.is_empty());
        assert!(event.warn_repeated_checkins);
    }

    #[tokio::test]
    async fn resync_keeps_operator_fields() {
        let store = InMemoryStore::new();
        let created = add_or_update_event(&input("Opening Ceremony", Some("abc123")), &store)
            .await
            .unwrap();

        let mut seeded = created.clone();
        seeded.attendees = vec!["hacker-1".to_string(), "hacker-2".to_string()];
        seeded.checkins = vec![Checkin {
            user: "hacker-1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 9, 5, 0).unwrap(),
        }];
        seeded.warn_repeated_checkins = false;
        let store = InMemoryStore::with_events([seeded.clone()]);

        let mut changed = input("Opening Ceremony (moved)", Some("abc123"));
        changed.duration = 45;
        changed.location = Some("Room 2".to_string());
        changed.event_type = "Talk".to_string();
        let updated = add_or_update_event(&changed, &store).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Opening Ceremony (moved)");
        assert_eq!(updated.duration, 45);
        assert_eq!(updated.location.as_deref(), Some("Room 2"));
        assert_eq!(updated.event_type, "Talk");
        assert_eq!(updated.attendees, seeded.attendees);
        assert_eq!(updated.checkins, seeded.checkins);
        assert!(!updated.warn_repeated_checkins);
    }

    #[tokio::test]
    async fn id_without_gcal_creates_then_updates_same_record() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        let mut update = input("Workshop", None);
        update.id = Some(id);

        let created = add_or_update_event(&update, &store).await.unwrap();
        update.name = "Workshop II".to_string();
        let updated = add_or_update_event(&update, &store).await.unwrap();

        assert_eq!(created.id, id);
        assert_eq!(updated.id, id);
        assert_eq!(updated.name, "Workshop II");
        assert_eq!(store.list_events().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_both_keys_never_touches_store() {
        let store = ScriptedStore::default();
        let err = add_or_update_event(&input("Orphan", None), &store)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingKey));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_reply_is_upsert_failure() {
        let store = ScriptedStore {
            calls: AtomicUsize::new(0),
            ok: true,
        };
        let err = add_or_update_event(&input("Hacking Ends", Some("uid-9")), &store)
            .await
            .unwrap_err();

        match err {
            Error::UpsertFailed { name, detail } => {
                assert_eq!(name, "Hacking Ends");
                assert!(detail.contains("write conflict"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
