use super::source::pull_calendar;
use crate::error::AppResult;
use crate::events::{add_or_update_event, Event, EventUpdateInput};
use crate::storage::EventStore;
use reqwest::Client;
use tracing::{info, warn};

/// Pull a calendar and upsert every event it holds, in feed order.
///
/// The first failing upsert aborts the run; events stored before it stay.
pub async fn sync_calendar<S>(
    client: &Client,
    base_url: &str,
    calendar_id: Option<&str>,
    store: &S,
) -> AppResult<Vec<Event>>
where
    S: EventStore + ?Sized,
{
    let Some(updates) = pull_calendar(client, base_url, calendar_id).await? else {
        return Ok(Vec::new());
    };

    let total = updates.len();
    let mut stored = Vec::with_capacity(total);

    for update in updates {
        let input = EventUpdateInput::from(update);
        match add_or_update_event(&input, store).await {
            Ok(event) => stored.push(event),
            Err(e) => {
                warn!(
                    event = %input.name,
                    synced = stored.len(),
                    total,
                    "Calendar sync stopped: {}",
                    e
                );
                return Err(e);
            }
        }
    }

    info!(count = stored.len(), "Calendar sync finished");
    Ok(stored)
}
