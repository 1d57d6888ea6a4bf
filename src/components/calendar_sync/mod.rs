mod actor;
mod handle;
pub mod models;
pub mod normalize;
mod scheduler;
pub mod source;
mod sync;

pub use handle::CalendarSyncHandle;
pub use models::RawCalendarEvent;
pub use normalize::transform_cal_event;
pub use source::pull_calendar;
pub use sync::sync_calendar;

use crate::config::Config;
use crate::error::AppResult;
use crate::storage::Store;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use scheduler::start_scheduler;

/// Recurring import of the public events calendar
pub struct CalendarSync {
    handle: CalendarSyncHandle,
    cancel: CancellationToken,
    scheduler: RwLock<Option<JoinHandle<()>>>,
}

impl CalendarSync {
    /// Create the component around an existing sync handle
    pub fn new(handle: CalendarSyncHandle) -> Self {
        Self {
            handle,
            cancel: CancellationToken::new(),
            scheduler: RwLock::new(None),
        }
    }

    pub fn handle(&self) -> CalendarSyncHandle {
        self.handle.clone()
    }
}

#[async_trait]
impl super::Component for CalendarSync {
    fn name(&self) -> &'static str {
        "calendar_sync"
    }

    async fn init(&self, config: Arc<RwLock<Config>>, _store: Arc<dyn Store>) -> AppResult<()> {
        let mut scheduler = self.scheduler.write().await;
        if scheduler.is_none() {
            *scheduler =
                Some(start_scheduler(config, self.handle.clone(), self.cancel.clone()).await);
        }
        Ok(())
    }

    async fn shutdown(&self) -> AppResult<()> {
        self.cancel.cancel();
        if let Some(task) = self.scheduler.write().await.take() {
            let _ = task.await;
        }
        self.handle.shutdown().await
    }
}
