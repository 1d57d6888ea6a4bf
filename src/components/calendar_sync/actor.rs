use super::sync::sync_calendar;
use crate::config::Config;
use crate::error::{component_error, AppResult};
use crate::events::Event;
use crate::storage::Store;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

/// The calendar sync actor that processes messages
pub struct CalendarSyncActor {
    config: Arc<RwLock<Config>>,
    client: Client,
    store: Arc<dyn Store>,
    command_rx: mpsc::Receiver<CalendarSyncCommand>,
}

/// Commands that can be sent to the calendar sync actor
pub enum CalendarSyncCommand {
    /// Sync the given calendar, or the configured one when `None`
    Sync(Option<String>, mpsc::Sender<AppResult<Vec<Event>>>),
    Shutdown,
}

/// Handle for communicating with the calendar sync actor
#[derive(Clone)]
pub struct CalendarSyncActorHandle {
    command_tx: mpsc::Sender<CalendarSyncCommand>,
}

impl CalendarSyncActorHandle {
    /// Run one sync and wait for the stored events
    pub async fn sync(&self, calendar_id: Option<String>) -> AppResult<Vec<Event>> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(CalendarSyncCommand::Sync(calendar_id, response_tx))
            .await
            .map_err(|e| component_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| component_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        let _ = self.command_tx.send(CalendarSyncCommand::Shutdown).await;
        Ok(())
    }
}

impl CalendarSyncActor {
    /// Create a new actor and return its handle
    pub fn new(
        config: Arc<RwLock<Config>>,
        store: Arc<dyn Store>,
    ) -> (Self, CalendarSyncActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            config,
            client: Client::new(),
            store,
            command_rx,
        };

        (actor, CalendarSyncActorHandle { command_tx })
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Calendar sync actor started");

        // Sync runs are processed one at a time
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                CalendarSyncCommand::Sync(calendar_id, response_tx) => {
                    let result = self.sync(calendar_id).await;
                    let _ = response_tx.send(result).await;
                }
                CalendarSyncCommand::Shutdown => {
                    info!("Calendar sync actor shutting down");
                    break;
                }
            }
        }

        info!("Calendar sync actor shut down");
    }

    async fn sync(&self, calendar_id: Option<String>) -> AppResult<Vec<Event>> {
        let (configured_id, base_url) = {
            let config = self.config.read().await;
            (config.calendar_id.clone(), config.calendar_base_url.clone())
        };
        let calendar_id = calendar_id.or(configured_id);

        sync_calendar(
            &self.client,
            &base_url,
            calendar_id.as_deref(),
            self.store.as_ref(),
        )
        .await
    }
}
