use super::actor::{CalendarSyncActor, CalendarSyncActorHandle};
use crate::config::Config;
use crate::error::AppResult;
use crate::events::Event;
use crate::storage::Store;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Handle for interacting with the calendar sync actor
#[derive(Clone)]
pub struct CalendarSyncHandle {
    actor_handle: CalendarSyncActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl CalendarSyncHandle {
    /// Create a new handle and spawn the actor
    pub fn new(config: Arc<RwLock<Config>>, store: Arc<dyn Store>) -> Self {
        let (mut actor, handle) = CalendarSyncActor::new(config, store);

        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Sync a calendar into the store
    pub async fn sync(&self, calendar_id: Option<String>) -> AppResult<Vec<Event>> {
        self.actor_handle.sync(calendar_id).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        self.actor_handle.shutdown().await
    }
}
