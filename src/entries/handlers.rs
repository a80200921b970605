use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use time::{macros::format_description, Date, Duration, OffsetDateTime, UtcOffset};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    aggregate::{daily_totals, group_by_day, local_date, recent_window},
    dto::{
        DailySummaryResponse, FoodEntryResponse, ImageSubmissionRequest, LogQuery, LogResponse,
        SummaryQuery, TextSubmissionRequest,
    },
    services::Submission,
};
use crate::{auth::extractors::AuthUser, state::AppState};

const MAX_DAYS: i64 = 30;
const MAX_LIMIT: i64 = 500;
const MAX_DAY_ROWS: i64 = 1000;
const MAX_OFFSET_MINUTES: i32 = 24 * 60 - 1;

// --- public routers ---

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_entries))
        .route("/entries/summary", get(daily_summary))
        .route("/entries/:id", delete(delete_entry))
}

pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/entries/text", post(submit_text))
        .route("/entries/image", post(submit_image))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

// --- handlers ---

/// POST /entries/text { description }
#[instrument(skip(state, body))]
pub async fn submit_text(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<TextSubmissionRequest>,
) -> Result<(StatusCode, Json<Vec<FoodEntryResponse>>), (StatusCode, String)> {
    let entries = state
        .pipeline
        .ingest(user_id, Submission::Text(body.description))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(entries.into_iter().map(Into::into).collect()),
    ))
}

/// POST /entries/image { photo_data_uri: "data:image/jpeg;base64,..." }
#[instrument(skip(state, body))]
pub async fn submit_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ImageSubmissionRequest>,
) -> Result<(StatusCode, Json<Vec<FoodEntryResponse>>), (StatusCode, String)> {
    let entries = state
        .pipeline
        .ingest(user_id, Submission::Image(body.photo_data_uri))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(entries.into_iter().map(Into::into).collect()),
    ))
}

#[instrument(skip(state))]
pub async fn list_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<LogQuery>,
) -> Result<Json<LogResponse>, (StatusCode, String)> {
    let offset = viewer_offset(q.tz_offset_minutes)?;
    let days = q.days.clamp(1, MAX_DAYS);
    let limit = q.limit.clamp(1, MAX_LIMIT);
    let now = OffsetDateTime::now_utc();

    let rows = state
        .entries
        .list_range(user_id, now - Duration::days(days), None, limit)
        .await
        .map_err(internal)?;
    let recent = recent_window(&rows, days, now);
    let groups = group_by_day(&recent, local_date(now, offset), offset);

    Ok(Json(LogResponse {
        days: groups.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn daily_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SummaryQuery>,
) -> Result<Json<DailySummaryResponse>, (StatusCode, String)> {
    let offset = viewer_offset(q.tz_offset_minutes)?;
    let date = match q.date.as_deref() {
        Some(s) => Date::parse(s, format_description!("[year]-[month]-[day]"))
            .map_err(|_| (StatusCode::BAD_REQUEST, "date must be YYYY-MM-DD".to_string()))?,
        None => local_date(OffsetDateTime::now_utc(), offset),
    };

    let start = date.midnight().assume_offset(offset);
    let end = start
        .checked_add(Duration::days(1))
        .ok_or((StatusCode::BAD_REQUEST, "date out of range".to_string()))?;
    let mut rows = state
        .entries
        .list_range(user_id, start, Some(end), MAX_DAY_ROWS + 1)
        .await
        .map_err(internal)?;
    let truncated = rows.len() as i64 > MAX_DAY_ROWS;
    if truncated {
        rows.truncate(MAX_DAY_ROWS as usize);
        warn!(%user_id, %date, cap = MAX_DAY_ROWS, "daily summary hit row cap");
    }
    let totals = daily_totals(&rows, date, offset);

    Ok(Json(DailySummaryResponse {
        date: date.to_string(),
        totals,
        entry_count: rows.len(),
        truncated,
    }))
}

/// Idempotent: unknown ids also answer 204.
#[instrument(skip(state))]
pub async fn delete_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.entries.delete(user_id, id).await.map_err(internal)?;
    info!(%user_id, %id, "food entry deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn viewer_offset(minutes: i32) -> Result<UtcOffset, (StatusCode, String)> {
    let bad = || {
        (
            StatusCode::BAD_REQUEST,
            "tz_offset_minutes out of range".to_string(),
        )
    };
    if minutes.unsigned_abs() > MAX_OFFSET_MINUTES.unsigned_abs() {
        return Err(bad());
    }
    UtcOffset::from_whole_seconds(minutes * 60).map_err(|_| bad())
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "food log store failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Could not load your food log. Please try again.".into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_offset_bounds() {
        assert_eq!(viewer_offset(0).unwrap(), UtcOffset::UTC);
        assert_eq!(viewer_offset(-330).unwrap().whole_minutes(), -330);
        assert!(viewer_offset(1439).is_ok());
        assert!(viewer_offset(1440).is_err());
        assert!(viewer_offset(i32::MIN).is_err());
    }
}
