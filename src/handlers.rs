use crate::errors::AppError;
use crate::ledger::mark_attendance;
use crate::models::{
    CatalogSubject, DailyRecord, MarkRequest, MarkResponse, PeriodQuery, PeriodStatsResponse,
    ScheduleQuery, ScheduleRow, Status, SummaryResponse, UserSummary, parse_date,
};
use crate::schedule;
use crate::state::AppState;
use crate::stats::{build_period_response, build_summary_overview, compute_period_stats};
use axum::Json;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::Local;
use tokio_stream::{StreamExt, wrappers::WatchStream};
use tracing::warn;

pub struct UserId(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
        {
            Some(id) if !id.is_empty() => Ok(UserId(id.to_string())),
            _ => Err(AppError::NotAuthenticated),
        }
    }
}

pub async fn mark(
    State(state): State<AppState>,
    UserId(user): UserId,
    Json(payload): Json<MarkRequest>,
) -> Result<Json<MarkResponse>, AppError> {
    let status = Status::parse(&payload.status)?;
    let date = match &payload.date {
        Some(value) => parse_date(value)?,
        None => Local::now().date_naive(),
    };

    let outcome = mark_attendance(
        &state.store,
        &user,
        date,
        &payload.subject,
        status,
        payload.remark.as_deref(),
    )
    .await?;

    Ok(Json(MarkResponse {
        record: outcome.record,
        summary: outcome.summary,
    }))
}

pub async fn get_day(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(date): Path<String>,
) -> Result<Json<DailyRecord>, AppError> {
    let date = parse_date(&date)?;
    let record = state
        .store
        .day_record(&user, date)
        .await
        .unwrap_or_else(|| DailyRecord::empty(date));
    Ok(Json(record))
}

pub async fn watch_day(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(date): Path<String>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let date = parse_date(&date)?;
    let rx = state.store.subscribe_day(&user, date).await;
    let stream = WatchStream::new(rx).map(|record| Event::default().json_data(&record));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub async fn get_summary(
    State(state): State<AppState>,
    UserId(user): UserId,
) -> Result<Json<SummaryResponse>, AppError> {
    let summary = state.store.summary(&user).await.unwrap_or_default();
    let catalog = state.store.subjects(&user).await;
    Ok(Json(build_summary_overview(&summary, &catalog)))
}

pub async fn period_stats(
    State(state): State<AppState>,
    UserId(user): UserId,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<PeriodStatsResponse>, AppError> {
    let start = parse_date(&query.start)?;
    let end = parse_date(&query.end)?;
    if start > end {
        return Err(AppError::InvalidDateRange { start, end });
    }

    let records = state.store.days_in_range(&user, start, end).await;
    let catalog = state.store.subjects(&user).await;
    let known: Vec<String> = catalog.into_iter().map(|s| s.name).collect();
    let known = if known.is_empty() { None } else { Some(known) };

    let stats = compute_period_stats(&records, known.as_deref());
    Ok(Json(build_period_response(start, end, stats)))
}

pub async fn get_subjects(
    State(state): State<AppState>,
    UserId(user): UserId,
) -> Result<Json<Vec<CatalogSubject>>, AppError> {
    Ok(Json(state.store.subjects(&user).await))
}

pub async fn put_subjects(
    State(state): State<AppState>,
    UserId(user): UserId,
    Json(subjects): Json<Vec<CatalogSubject>>,
) -> Result<Json<UserSummary>, AppError> {
    let summary = state.store.replace_subjects(&user, subjects).await?;
    Ok(Json(summary))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    UserId(user): UserId,
    Path(date): Path<String>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<ScheduleRow>>, AppError> {
    let date = parse_date(&date)?;
    let catalog = state.store.subjects(&user).await;

    let (college, class) = match (query.college, query.class) {
        (Some(college), Some(class)) => (college, class),
        _ => return Ok(Json(schedule::fallback_rows(&catalog))),
    };

    match state.schedule.rows_for(&college, &class, date).await {
        Ok(rows) if !rows.is_empty() => Ok(Json(rows)),
        Ok(_) => Ok(Json(schedule::fallback_rows(&catalog))),
        Err(err) => {
            warn!("schedule provider failed, using catalog fallback: {err}");
            Ok(Json(schedule::fallback_rows(&catalog)))
        }
    }
}
