use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/today", get(handlers::get_today))
        .route("/api/history", get(handlers::get_history))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/notifications", get(handlers::get_notifications))
        .route("/api/increment", post(handlers::increment))
        .route("/api/activity", post(handlers::activity))
        .route("/api/chant", post(handlers::select_chant))
        .route("/api/chants", get(handlers::get_chants).post(handlers::add_chant))
        .route("/api/chants/remove", post(handlers::remove_chant))
        .route("/api/timer/toggle", post(handlers::toggle_timer))
        .route("/api/timer/reset", post(handlers::reset_timer))
        .route("/api/visibility", post(handlers::visibility_restored))
        .route("/api/history/clear", post(handlers::clear_history))
        .route("/api/history/clear-date", post(handlers::clear_date))
        .with_state(state)
}
