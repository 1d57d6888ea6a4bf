use super::AppState;
use crate::application::{render_form, ApplicationAnswer};
use crate::error::{AppResult, Error};
use crate::events::{add_or_update_event, Event, EventUpdateInput};
use crate::sponsors::{Company, CompanyInput, Tier, TierInput};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub calendar_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FormQuery {
    #[serde(default)]
    pub section: Option<String>,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Import a calendar now, outside the regular schedule.
///
/// Without a body the configured calendar is used.
pub async fn sync_calendar_handler(
    State(state): State<AppState>,
    request: Option<Json<SyncRequest>>,
) -> AppResult<Json<Vec<Event>>> {
    let calendar_id = request.and_then(|Json(request)| request.calendar_id);
    info!("Manual calendar sync requested");
    let events = state.calendar.sync(calendar_id).await?;
    Ok(Json(events))
}

pub async fn list_events_handler(State(state): State<AppState>) -> AppResult<Json<Vec<Event>>> {
    Ok(Json(state.store.list_events().await?))
}

pub async fn get_event_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Event>> {
    state
        .store
        .get_event(id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("event {}", id)))
}

/// Create or update an event by its id or calendar uid
pub async fn upsert_event_handler(
    State(state): State<AppState>,
    Json(input): Json<EventUpdateInput>,
) -> AppResult<Json<Event>> {
    let event = add_or_update_event(&input, state.store.as_ref()).await?;
    Ok(Json(event))
}

/// The application form, prefilled with the applicant's answers
pub async fn application_form_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<FormQuery>,
) -> AppResult<Html<String>> {
    let session = state.sessions.session(&user_id).await?;
    let session = session.lock().await;
    let html = render_form(&state.form, session.answers(), query.section.as_deref())?;
    Ok(Html(html))
}

pub async fn get_answers_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<ApplicationAnswer>>> {
    let session = state.sessions.session(&user_id).await?;
    let answers = session.lock().await.answers().to_vec();
    Ok(Json(answers))
}

/// Record one answer; it is saved once the applicant pauses
pub async fn update_answer_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(answer): Json<ApplicationAnswer>,
) -> AppResult<(StatusCode, Json<Vec<ApplicationAnswer>>)> {
    let session = state.sessions.session(&user_id).await?;
    let mut session = session.lock().await;
    session.set_answer(&state.form, &answer.question, &answer.answer)?;
    Ok((StatusCode::ACCEPTED, Json(session.answers().to_vec())))
}

pub async fn submit_application_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Value>> {
    let session = state.sessions.session(&user_id).await?;
    session.lock().await.submit(&state.form).await?;
    Ok(Json(json!({ "submitted": true })))
}

pub async fn list_tiers_handler(State(state): State<AppState>) -> AppResult<Json<Vec<Tier>>> {
    Ok(Json(state.store.list_tiers().await?))
}

pub async fn create_tier_handler(
    State(state): State<AppState>,
    Json(input): Json<TierInput>,
) -> AppResult<(StatusCode, Json<Tier>)> {
    let tier = state.store.create_tier(input).await?;
    info!("Created sponsor tier {}", tier.name);
    Ok((StatusCode::CREATED, Json(tier)))
}

pub async fn list_companies_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Company>>> {
    Ok(Json(state.store.list_companies().await?))
}

pub async fn create_company_handler(
    State(state): State<AppState>,
    Json(input): Json<CompanyInput>,
) -> AppResult<(StatusCode, Json<Company>)> {
    let company = state.store.create_company(input).await?;
    info!("Created sponsor company {}", company.name);
    Ok((StatusCode::CREATED, Json(company)))
}
