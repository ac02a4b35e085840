use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use sqlx::SqlitePool;

use super::models::{ListEntry, ListEntryUpdate, ListRow, NewListEntry};
use crate::error::{AppError, AppResult, require};
use crate::media::{enum_str, rating::is_valid_rating};

async fn find_entry(db: &SqlitePool, user_id: &str, media_id: &str) -> AppResult<Option<ListEntry>> {
    sqlx::query_as::<_, ListRow>("SELECT * FROM user_lists WHERE user_id = $1 AND media_id = $2")
        .bind(user_id)
        .bind(media_id)
        .fetch_optional(db)
        .await?
        .map(ListEntry::try_from)
        .transpose()
}

fn check_rating(rating: Option<i64>) -> AppResult<()> {
    match rating {
        Some(v) if !is_valid_rating(v) => Err(AppError::validation("rating must be between 1 and 5")),
        _ => Ok(()),
    }
}

pub async fn list_entries(
    State(db): State<SqlitePool>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<ListEntry>>> {
    let rows = sqlx::query_as::<_, ListRow>("SELECT * FROM user_lists WHERE user_id = $1")
        .bind(&user_id)
        .fetch_all(&db)
        .await?;

    let mut entries = rows
        .into_iter()
        .map(ListEntry::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    Ok(Json(entries))
}

pub async fn create_entry(
    State(db): State<SqlitePool>,
    Path(user_id): Path<String>,
    Json(payload): Json<NewListEntry>,
) -> AppResult<(StatusCode, Json<ListEntry>)> {
    let media_id = require("media_id", payload.media_id.as_deref())?;
    check_rating(payload.rating)?;

    if find_entry(&db, &user_id, media_id).await?.is_some() {
        return Err(AppError::Conflict("Media is already in the list".to_string()));
    }

    let id = payload
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO user_lists (id, user_id, media_id, status, rating, progress, is_public, notes, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        "#,
    )
    .bind(&id)
    .bind(&user_id)
    .bind(media_id)
    .bind(enum_str(&payload.status.unwrap_or_default())?)
    .bind(payload.rating)
    .bind(i64::from(payload.progress.unwrap_or(0)))
    .bind(payload.is_public.unwrap_or(true))
    .bind(payload.notes.as_deref().unwrap_or(""))
    .bind(now)
    .execute(&db)
    .await
    // lost a race against a concurrent insert of the same pair
    .map_err(|e| AppError::conflict_on_unique(e, || "Media is already in the list".to_string()))?;

    let saved = find_entry(&db, &user_id, media_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("list entry {id} vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn update_entry(
    State(db): State<SqlitePool>,
    Path((user_id, media_id)): Path<(String, String)>,
    Json(payload): Json<ListEntryUpdate>,
) -> AppResult<Json<ListEntry>> {
    check_rating(payload.rating)?;

    let existing = find_entry(&db, &user_id, &media_id)
        .await?
        .ok_or_else(|| AppError::not_found("Entry not found"))?;
    if payload.is_empty() {
        return Ok(Json(existing));
    }

    let next = existing.updated(&payload, Utc::now());
    sqlx::query(
        r#"
        UPDATE user_lists
        SET status = $1, rating = $2, progress = $3, is_public = $4, notes = $5, updated_at = $6
        WHERE user_id = $7 AND media_id = $8
        "#,
    )
    .bind(enum_str(&next.status)?)
    .bind(next.rating)
    .bind(i64::from(next.progress))
    .bind(next.is_public)
    .bind(next.notes.as_deref().unwrap_or(""))
    .bind(next.updated_at)
    .bind(&user_id)
    .bind(&media_id)
    .execute(&db)
    .await?;

    let saved = find_entry(&db, &user_id, &media_id)
        .await?
        .ok_or_else(|| AppError::not_found("Entry not found"))?;
    Ok(Json(saved))
}

pub async fn remove_entry(
    State(db): State<SqlitePool>,
    Path((user_id, media_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let result = sqlx::query("DELETE FROM user_lists WHERE user_id = $1 AND media_id = $2")
        .bind(&user_id)
        .bind(&media_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Entry not found"));
    }
    tracing::debug!(%user_id, %media_id, "list entry removed");
    Ok(StatusCode::NO_CONTENT)
}
