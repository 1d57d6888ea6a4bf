mod error;
pub mod handlers;

use crate::application::{FormConfig, SessionRegistry};
use crate::components::CalendarSyncHandle;
use crate::storage::Store;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use handlers::{
    application_form_handler, create_company_handler, create_tier_handler, get_answers_handler,
    get_event_handler, health_handler, list_companies_handler, list_events_handler,
    list_tiers_handler, submit_application_handler, sync_calendar_handler,
    update_answer_handler, upsert_event_handler,
};

#[derive(Clone)]
pub struct AppState {
    /// Events, applications and sponsors
    pub store: Arc<dyn Store>,
    /// Calendar import actor
    pub calendar: CalendarSyncHandle,
    /// Application form shown to applicants
    pub form: Arc<FormConfig>,
    /// Applicants currently editing
    pub sessions: Arc<SessionRegistry>,
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/admin/calendar/sync", post(sync_calendar_handler))
        .route("/events", get(list_events_handler).post(upsert_event_handler))
        .route("/events/{id}", get(get_event_handler))
        .route("/applications/{user}", get(application_form_handler))
        .route(
            "/applications/{user}/answers",
            get(get_answers_handler).patch(update_answer_handler),
        )
        .route("/applications/{user}/submit", post(submit_application_handler))
        .route("/sponsors/tiers", get(list_tiers_handler).post(create_tier_handler))
        .route(
            "/sponsors/companies",
            get(list_companies_handler).post(create_company_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
