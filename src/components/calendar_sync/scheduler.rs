use super::handle::CalendarSyncHandle;
use crate::config::Config;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Start the periodic calendar sync
pub async fn start_scheduler(
    config: Arc<RwLock<Config>>,
    handle: CalendarSyncHandle,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(config.read().await.calendar_sync_interval);

    tokio::spawn(async move {
        info!("Calendar sync scheduled every {}s", interval.as_secs());

        loop {
            match handle.sync(None).await {
                Ok(events) => info!("Scheduled calendar sync stored {} events", events.len()),
                Err(e) => error!("Scheduled calendar sync failed: {}", e),
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Calendar sync scheduler stopped");
                    break;
                }
                _ = sleep(interval) => {}
            }
        }
    })
}
