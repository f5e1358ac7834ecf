use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/attendance", post(handlers::mark))
        .route("/api/attendance/:date", get(handlers::get_day))
        .route("/api/attendance/:date/live", get(handlers::watch_day))
        .route("/api/summary", get(handlers::get_summary))
        .route("/api/stats/period", get(handlers::period_stats))
        .route(
            "/api/subjects",
            get(handlers::get_subjects).put(handlers::put_subjects),
        )
        .route("/api/schedule/:date", get(handlers::get_schedule))
        .with_state(state)
}
