use super::{sort_events, ApplicationStore, EventStore, SponsorStore, UpsertReply};
use crate::application::ApplicationAnswer;
use crate::error::{AppResult, Error};
use crate::events::models::{Event, EventContent, EventDefaults, EventKey};
use crate::sponsors::{Company, CompanyInput, Tier, TierInput};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory implementation of the store (tests and Redis fallback)
#[derive(Debug, Default)]
pub struct InMemoryStore {
    events: RwLock<HashMap<Uuid, Event>>,
    applications: RwLock<HashMap<String, Vec<ApplicationAnswer>>>,
    tiers: RwLock<Vec<Tier>>,
    companies: RwLock<Vec<Company>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing event records
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: RwLock::new(events.into_iter().map(|e| (e.id, e)).collect()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn upsert_event(
        &self,
        key: &EventKey,
        content: &EventContent,
        defaults: &EventDefaults,
    ) -> AppResult<UpsertReply> {
        // One write guard spans lookup and write
        let mut events = self.events.write().await;

        let existing = match key {
            EventKey::GcalId(uid) => events
                .values()
                .find(|e| e.gcal_id.as_deref() == Some(uid.as_str()))
                .map(|e| e.id),
            EventKey::Id(id) => events.contains_key(id).then_some(*id),
        };

        let stored = match existing.and_then(|id| events.get_mut(&id)) {
            Some(event) => {
                event.apply(content.clone());
                event.clone()
            }
            None => {
                let event = Event::inserted(key, content.clone(), defaults.clone());
                events.insert(event.id, event.clone());
                event
            }
        };

        Ok(UpsertReply::stored(stored))
    }

    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn list_events(&self) -> AppResult<Vec<Event>> {
        let mut events: Vec<Event> = self.events.read().await.values().cloned().collect();
        sort_events(&mut events);
        Ok(events)
    }
}

#[async_trait]
impl ApplicationStore for InMemoryStore {
    async fn get_application(&self, user_id: &str) -> AppResult<Vec<ApplicationAnswer>> {
        let applications = self.applications.read().await;
        Ok(applications.get(user_id).cloned().unwrap_or_default())
    }

    async fn save_application(
        &self,
        user_id: &str,
        answers: &[ApplicationAnswer],
    ) -> AppResult<()> {
        let mut applications = self.applications.write().await;
        applications.insert(user_id.to_string(), answers.to_vec());
        Ok(())
    }
}

#[async_trait]
impl SponsorStore for InMemoryStore {
    async fn create_tier(&self, input: TierInput) -> AppResult<Tier> {
        let tier = input.into_tier()?;
        self.tiers.write().await.push(tier.clone());
        Ok(tier)
    }

    async fn list_tiers(&self) -> AppResult<Vec<Tier>> {
        Ok(self.tiers.read().await.clone())
    }

    async fn create_company(&self, input: CompanyInput) -> AppResult<Company> {
        let tier = self
            .tiers
            .read()
            .await
            .iter()
            .find(|t| t.id == input.tier_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Tier {}", input.tier_id)))?;

        let company = input.into_company(tier)?;
        self.companies.write().await.push(company.clone());
        Ok(company)
    }

    async fn list_companies(&self) -> AppResult<Vec<Company>> {
        Ok(self.companies.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn content(name: &str) -> EventContent {
        EventContent {
            name: name.to_string(),
            start_timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            duration: 30,
            description: None,
            location: None,
            event_type: String::new(),
        }
    }

    #[tokio::test]
    async fn upsert_by_gcal_id_reuses_record() {
        let store = InMemoryStore::new();
        let key = EventKey::GcalId("uid-1".to_string());

        let first = store
            .upsert_event(&key, &content("A"), &EventDefaults::default())
            .await
            .unwrap()
            .value
            .unwrap();
        let second = store
            .upsert_event(&key, &content("B"), &EventDefaults::default())
            .await
            .unwrap()
            .value
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "B");
        assert_eq!(store.list_events().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn company_requires_known_tier() {
        let store = InMemoryStore::new();
        let err = store
            .create_company(CompanyInput {
                name: "Acme".to_string(),
                tier_id: Uuid::new_v4(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let tier = store
            .create_tier(TierInput {
                name: "Gold".to_string(),
                permissions: vec!["resumes".to_string()],
            })
            .await
            .unwrap();
        let company = store
            .create_company(CompanyInput {
                name: "Acme".to_string(),
                tier_id: tier.id,
            })
            .await
            .unwrap();
        assert_eq!(company.tier, tier);
        assert_eq!(store.list_companies().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_application_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.get_application("nobody").await.unwrap().is_empty());
    }
}
