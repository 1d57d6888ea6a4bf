use super::autosave::Autosaver;
use super::form::FormConfig;
use super::{set_answer, ApplicationAnswer};
use crate::error::{input_error, AppResult};
use crate::storage::{ApplicationStore, Store};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// An applicant editing their application
pub struct ApplicationSession<S: ApplicationStore + ?Sized + 'static = dyn Store> {
    user_id: String,
    answers: Vec<ApplicationAnswer>,
    autosaver: Autosaver<S>,
}

impl<S: ApplicationStore + ?Sized + 'static> ApplicationSession<S> {
    /// Start a session from the answers already stored for `user_id`
    pub async fn open(store: Arc<S>, user_id: &str, autosave_delay: Duration) -> AppResult<Self> {
        let answers = store.get_application(user_id).await?;
        Ok(Self {
            user_id: user_id.to_string(),
            answers,
            autosaver: Autosaver::new(store, user_id, autosave_delay),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn answers(&self) -> &[ApplicationAnswer] {
        &self.answers
    }

    /// Record one answer and reschedule the autosave.
    ///
    /// The question must name a field of `form`; the value itself is only
    /// checked on submit.
    pub fn set_answer(&mut self, form: &FormConfig, question: &str, value: &str) -> AppResult<()> {
        if form.field(question).is_none() {
            return Err(input_error(&format!("Unknown question '{}'", question)));
        }

        set_answer(&mut self.answers, question, value);
        self.autosaver.schedule(self.answers.clone());
        Ok(())
    }

    /// Validate every answer and save right away
    pub async fn submit(&mut self, form: &FormConfig) -> AppResult<()> {
        form.validate_submission(&self.answers)?;
        self.autosaver.save_now(&self.answers).await?;
        info!("Application submitted for {}", self.user_id);
        Ok(())
    }
}

/// Open sessions, one per applicant
pub struct SessionRegistry {
    store: Arc<dyn Store>,
    autosave_delay: Duration,
    sessions: RwLock<HashMap<String, Arc<Mutex<ApplicationSession>>>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn Store>, autosave_delay: Duration) -> Self {
        Self {
            store,
            autosave_delay,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The session for `user_id`, opened from storage on first use
    pub async fn session(&self, user_id: &str) -> AppResult<Arc<Mutex<ApplicationSession>>> {
        if let Some(session) = self.sessions.read().await.get(user_id) {
            return Ok(Arc::clone(session));
        }

        let opened =
            ApplicationSession::open(Arc::clone(&self.store), user_id, self.autosave_delay).await?;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(opened)));
        Ok(Arc::clone(session))
    }

    /// Forget a session; its pending autosave is cancelled once unused
    pub async fn close(&self, user_id: &str) {
        self.sessions.write().await.remove(user_id);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::answer_for;
    use crate::storage::InMemoryStore;
    use tokio::time::sleep;

    const FORM: &str = r#"
[[sections]]
category = "about"
title = "About You"

[[sections.fields]]
fieldName = "school"
title = "School"
kind = "text"

[[sections.fields]]
fieldName = "adult"
title = "Are you 18 or older?"
kind = "boolean"
"#;

    const DELAY: Duration = Duration::from_secs(5);

    fn form() -> FormConfig {
        FormConfig::from_toml(FORM).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn answers_are_autosaved() {
        let store = Arc::new(InMemoryStore::new());
        let form = form();
        let mut session = ApplicationSession::open(Arc::clone(&store), "ada", DELAY)
            .await
            .unwrap();

        session.set_answer(&form, "school", "MIT").unwrap();
        sleep(Duration::from_secs(6)).await;

        let saved = store.get_application("ada").await.unwrap();
        assert_eq!(answer_for(&saved, "school"), "MIT");
    }

    #[tokio::test]
    async fn unknown_question_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = ApplicationSession::open(store, "ada", DELAY).await.unwrap();

        let err = session.set_answer(&form(), "favouriteColour", "blue").unwrap_err();
        assert!(err.is_input_error());
        assert!(session.answers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn incomplete_submit_saves_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let form = form();
        let mut session = ApplicationSession::open(Arc::clone(&store), "ada", DELAY)
            .await
            .unwrap();

        session.set_answer(&form, "school", "MIT").unwrap();
        assert!(session.submit(&form).await.is_err());
        assert!(store.get_application("ada").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_saves_immediately() {
        let store = Arc::new(InMemoryStore::new());
        let form = form();
        let mut session = ApplicationSession::open(Arc::clone(&store), "ada", DELAY)
            .await
            .unwrap();

        session.set_answer(&form, "school", "MIT").unwrap();
        session.set_answer(&form, "adult", "Yes").unwrap();
        session.submit(&form).await.unwrap();

        let saved = store.get_application("ada").await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(answer_for(&saved, "adult"), "Yes");
    }

    #[tokio::test]
    async fn registry_reuses_sessions() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        store
            .save_application(
                "ada",
                &[ApplicationAnswer {
                    question: "school".to_string(),
                    answer: "MIT".to_string(),
                }],
            )
            .await
            .unwrap();

        let registry = SessionRegistry::new(store, DELAY);
        let first = registry.session("ada").await.unwrap();
        let second = registry.session("ada").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(answer_for(first.lock().await.answers(), "school"), "MIT");
        assert_eq!(registry.len().await, 1);

        registry.close("ada").await;
        assert_eq!(registry.len().await, 0);
    }
}
