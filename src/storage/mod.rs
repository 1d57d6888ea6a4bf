mod memory;

pub use memory::InMemoryStore;

use crate::application::ApplicationAnswer;
use crate::error::AppResult;
use crate::events::models::{Event, EventContent, EventDefaults, EventKey};
use crate::sponsors::{Company, CompanyInput, Tier, TierInput};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// Result of a single upsert as reported by the backend
#[derive(Debug, Clone)]
pub struct UpsertReply {
    /// The stored record after the write
    pub value: Option<Event>,
    /// Whether the backend acknowledged the write
    pub ok: bool,
    /// Raw error detail from the backend, if any
    pub last_error: Option<Value>,
}

impl UpsertReply {
    pub fn stored(event: Event) -> Self {
        Self {
            value: Some(event),
            ok: true,
            last_error: None,
        }
    }
}

/// Persistent event records
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Atomically find the record matching `key` and write `content` to it,
    /// creating the record from `defaults` when nothing matches
    async fn upsert_event(
        &self,
        key: &EventKey,
        content: &EventContent,
        defaults: &EventDefaults,
    ) -> AppResult<UpsertReply>;

    /// Get a single event by its internal identifier
    async fn get_event(&self, id: Uuid) -> AppResult<Option<Event>>;

    /// List every stored event ordered by start time
    async fn list_events(&self) -> AppResult<Vec<Event>>;
}

/// Applicant answers, keyed by user
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn get_application(&self, user_id: &str) -> AppResult<Vec<ApplicationAnswer>>;

    async fn save_application(&self, user_id: &str, answers: &[ApplicationAnswer])
        -> AppResult<()>;
}

/// Sponsor tiers and companies
#[async_trait]
pub trait SponsorStore: Send + Sync {
    async fn create_tier(&self, input: TierInput) -> AppResult<Tier>;

    async fn list_tiers(&self) -> AppResult<Vec<Tier>>;

    /// Fails with `NotFound` when the referenced tier does not exist
    async fn create_company(&self, input: CompanyInput) -> AppResult<Company>;

    async fn list_companies(&self) -> AppResult<Vec<Company>>;
}

/// Everything the service persists
pub trait Store: EventStore + ApplicationStore + SponsorStore {}

impl<T: EventStore + ApplicationStore + SponsorStore> Store for T {}

/// Order events the way listings present them
pub(crate) fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| {
        a.start_timestamp
            .cmp(&b.start_timestamp)
            .then_with(|| a.name.cmp(&b.name))
    });
}
