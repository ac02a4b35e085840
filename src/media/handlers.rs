use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use sqlx::SqlitePool;

use super::models::{MediaItem, MediaRow, NewMedia, RatingRequest, RatingSummary, enum_str};
use super::rating::{self, MAX_RATING, MIN_RATING};
use crate::error::{AppError, AppResult, require};

pub async fn list_media(State(db): State<SqlitePool>) -> AppResult<Json<Vec<MediaItem>>> {
    let rows = sqlx::query_as::<_, MediaRow>("SELECT * FROM media_items")
        .fetch_all(&db)
        .await?;

    let mut items = rows
        .into_iter()
        .map(MediaItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(items))
}

pub async fn create_media(
    State(db): State<SqlitePool>,
    Json(payload): Json<NewMedia>,
) -> AppResult<(StatusCode, Json<MediaItem>)> {
    let title = require("title", payload.title.as_deref())?;
    let description = require("description", payload.description.as_deref())?;
    let (Some(media_type), Some(status)) = (payload.media_type, payload.status) else {
        return Err(AppError::validation("title, type, status and description are required"));
    };

    let id = payload
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let cast_json = payload.cast.as_ref().map(serde_json::to_string).transpose()?;

    sqlx::query(
        r#"
        INSERT INTO media_items
            (id, title, type, description, image_url, release_date, rating, rating_count,
             genre_json, status, episodes, chapters, cast_json, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, 0, 0, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(&id)
    .bind(title)
    .bind(enum_str(&media_type)?)
    .bind(description)
    .bind(&payload.image_url)
    .bind(&payload.release_date)
    .bind(serde_json::to_string(&payload.genre)?)
    .bind(enum_str(&status)?)
    .bind(payload.episodes.map(i64::from))
    .bind(payload.chapters.map(i64::from))
    .bind(cast_json)
    .bind(Utc::now())
    .execute(&db)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, || format!("media {id} already exists")))?;

    let saved = sqlx::query_as::<_, MediaRow>("SELECT * FROM media_items WHERE id = $1")
        .bind(&id)
        .fetch_one(&db)
        .await?;

    tracing::info!(media_id = %id, "media item created");
    Ok((StatusCode::CREATED, Json(saved.try_into()?)))
}

/// Upserts one user's rating, then recomputes the item's mean and count in the
/// same transaction and mirrors the value into the user's list entry.
pub async fn rate_media(
    State(db): State<SqlitePool>,
    Path(media_id): Path<String>,
    Json(payload): Json<RatingRequest>,
) -> AppResult<Json<RatingSummary>> {
    let user_id = require("user_id", payload.user_id.as_deref())?;
    let value = match payload.rating {
        Some(v) if rating::is_valid_rating(v) => v,
        _ => {
            return Err(AppError::validation(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }
    };

    let mut tx = db.begin().await?;

    let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM media_items WHERE id = $1")
        .bind(&media_id)
        .fetch_optional(&mut *tx)
        .await?;
    if exists.is_none() {
        return Err(AppError::not_found("Media not found"));
    }

    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO media_ratings (id, user_id, media_id, rating, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        ON CONFLICT (user_id, media_id) DO UPDATE SET rating = excluded.rating, updated_at = excluded.updated_at
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&media_id)
    .bind(value)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let values: Vec<i64> = sqlx::query_scalar("SELECT rating FROM media_ratings WHERE media_id = $1")
        .bind(&media_id)
        .fetch_all(&mut *tx)
        .await?;
    let summary = rating::summarize(&values);

    sqlx::query("UPDATE media_items SET rating = $1, rating_count = $2 WHERE id = $3")
        .bind(summary.rating)
        .bind(i64::from(summary.rating_count))
        .bind(&media_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE user_lists SET rating = $1, updated_at = $2 WHERE user_id = $3 AND media_id = $4")
        .bind(value)
        .bind(now)
        .bind(user_id)
        .bind(&media_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::debug!(%media_id, rating = summary.rating, count = summary.rating_count, "rating recomputed");
    Ok(Json(summary))
}
