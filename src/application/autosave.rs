use super::ApplicationAnswer;
use crate::error::AppResult;
use crate::storage::ApplicationStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Debounced saving of one applicant's answers.
///
/// Each call to [`Autosaver::schedule`] replaces the pending save, so only
/// the latest answers are written once the delay passes without changes.
/// Dropping the autosaver cancels whatever is still pending.
pub struct Autosaver<S: ApplicationStore + ?Sized + 'static> {
    delay: Duration,
    store: Arc<S>,
    user_id: String,
    pending: Option<CancellationToken>,
}

impl<S: ApplicationStore + ?Sized + 'static> Autosaver<S> {
    pub fn new(store: Arc<S>, user_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            delay,
            store,
            user_id: user_id.into(),
            pending: None,
        }
    }

    /// Save `answers` after the delay unless rescheduled or cancelled first
    pub fn schedule(&mut self, answers: Vec<ApplicationAnswer>) {
        self.cancel();

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let store = Arc::clone(&self.store);
        let user_id = self.user_id.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    debug!("Autosave for {} superseded", user_id);
                }
                _ = sleep(delay) => {
                    // not retried, the next change schedules another attempt
                    match store.save_application(&user_id, &answers).await {
                        Ok(()) => debug!("Autosaved {} answers for {}", answers.len(), user_id),
                        Err(e) => warn!("Autosave failed for {}: {}", user_id, e),
                    }
                }
            }
        });

        self.pending = Some(token);
    }

    /// Drop the pending save, if any
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    /// Write `answers` immediately, discarding the pending save
    pub async fn save_now(&mut self, answers: &[ApplicationAnswer]) -> AppResult<()> {
        self.cancel();
        self.store.save_application(&self.user_id, answers).await
    }
}

impl<S: ApplicationStore + ?Sized + 'static> Drop for Autosaver<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}
