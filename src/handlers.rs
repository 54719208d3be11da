use crate::engine::{ChantEngine, Effects};
use crate::errors::AppError;
use crate::models::{
    ChantList, ChantRequest, ClearDateRequest, DateGroup, DisplayState, IncrementRequest,
    Notification, StatsResponse,
};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{extract::State, response::Html, Json};
use chrono::NaiveDate;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let session = state.session.lock().await;
    Html(render_index(&session.engine.display()))
}

pub async fn get_today(State(state): State<AppState>) -> Json<DisplayState> {
    let session = state.session.lock().await;
    Json(session.engine.display())
}

pub async fn get_history(State(state): State<AppState>) -> Json<Vec<DateGroup>> {
    let session = state.session.lock().await;
    Json(session.engine.history())
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let session = state.session.lock().await;
    Json(session.engine.stats())
}

pub async fn get_chants(State(state): State<AppState>) -> Json<ChantList> {
    let session = state.session.lock().await;
    Json(session.engine.chants())
}

pub async fn get_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    let mut session = state.session.lock().await;
    Json(session.take_notifications())
}

pub async fn increment(
    State(state): State<AppState>,
    payload: Option<Json<IncrementRequest>>,
) -> Json<DisplayState> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let chant = request
        .chant
        .as_deref()
        .map(str::trim)
        .filter(|chant| !chant.is_empty());
    apply(&state, |engine| engine.increment(chant)).await
}

pub async fn activity(State(state): State<AppState>) -> Json<DisplayState> {
    apply(&state, |engine| {
        engine.observe_activity();
        Effects::default()
    })
    .await
}

pub async fn select_chant(
    State(state): State<AppState>,
    Json(payload): Json<ChantRequest>,
) -> Json<DisplayState> {
    apply(&state, |engine| engine.select_chant(payload.chant.trim())).await
}

pub async fn add_chant(
    State(state): State<AppState>,
    Json(payload): Json<ChantRequest>,
) -> Result<Json<ChantList>, AppError> {
    if payload.chant.trim().is_empty() {
        return Err(AppError::bad_request("chant must not be empty"));
    }
    let mut session = state.session.lock().await;
    let effects = session.engine.add_custom_chant(&payload.chant);
    session.apply(effects);
    Ok(Json(session.engine.chants()))
}

pub async fn remove_chant(
    State(state): State<AppState>,
    Json(payload): Json<ChantRequest>,
) -> Json<ChantList> {
    let mut session = state.session.lock().await;
    let effects = session.engine.remove_custom_chant(payload.chant.trim());
    session.apply(effects);
    Json(session.engine.chants())
}

pub async fn toggle_timer(State(state): State<AppState>) -> Json<DisplayState> {
    apply(&state, |engine| {
        engine.toggle_timer();
        Effects::default()
    })
    .await
}

pub async fn reset_timer(State(state): State<AppState>) -> Json<DisplayState> {
    apply(&state, |engine| {
        engine.reset_session();
        Effects::default()
    })
    .await
}

pub async fn visibility_restored(State(state): State<AppState>) -> Json<DisplayState> {
    apply(&state, ChantEngine::check_day_boundary).await
}

pub async fn clear_history(State(state): State<AppState>) -> Json<Vec<DateGroup>> {
    let mut session = state.session.lock().await;
    let effects = session.engine.clear_all();
    session.apply(effects);
    Json(session.engine.history())
}

pub async fn clear_date(
    State(state): State<AppState>,
    Json(payload): Json<ClearDateRequest>,
) -> Result<Json<Vec<DateGroup>>, AppError> {
    let date = NaiveDate::parse_from_str(payload.date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::bad_request("date must be YYYY-MM-DD"))?;

    let mut session = state.session.lock().await;
    let effects = session.engine.clear_date(date);
    session.apply(effects);
    Ok(Json(session.engine.history()))
}

async fn apply<F>(state: &AppState, mutate: F) -> Json<DisplayState>
where
    F: FnOnce(&mut ChantEngine) -> Effects,
{
    let mut session = state.session.lock().await;
    let effects = mutate(&mut session.engine);
    session.apply(effects);
    Json(session.engine.display())
}
