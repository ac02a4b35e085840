use std::collections::HashMap;

use axum::extract::{Json, Path, State};
use chrono::Utc;
use sqlx::SqlitePool;

use super::models::{Profile, ProfileRow, ProfileUpdate, PublicEntry, PublicProfile};
use super::slug::build_profile_slug;
use crate::error::{AppError, AppResult, is_unique_violation};
use crate::lists::{ListEntry, ListRow};
use crate::media::{MediaItem, MediaRow};

const SLUG_ATTEMPTS: usize = 16;

async fn find_profile(db: &SqlitePool, user_id: &str) -> AppResult<Option<Profile>> {
    let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(Profile::from))
}

/// Every stored profile keyed by user id, for author resolution.
pub async fn load_profiles(db: &SqlitePool) -> AppResult<HashMap<String, Profile>> {
    let rows = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles")
        .fetch_all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| (row.user_id.clone(), Profile::from(row)))
        .collect())
}

async fn upsert(db: &SqlitePool, profile: &Profile, share_slug: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, username, bio, avatar_url, banner_color, share_slug, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id) DO UPDATE SET
            username = excluded.username,
            bio = excluded.bio,
            avatar_url = excluded.avatar_url,
            banner_color = excluded.banner_color,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&profile.user_id)
    .bind(&profile.username)
    .bind(&profile.bio)
    .bind(&profile.avatar_url)
    .bind(&profile.banner_color)
    .bind(share_slug)
    .bind(Utc::now())
    .execute(db)
    .await
    .map(|_| ())
}

/// Writes `profile`, keeping `existing_slug` when there is one. Otherwise
/// slugs are drawn from `candidate` until one is not held by another user.
async fn save_profile(
    db: &SqlitePool,
    profile: &Profile,
    existing_slug: Option<&str>,
    mut candidate: impl FnMut() -> String + Send,
) -> AppResult<()> {
    if let Some(slug) = existing_slug {
        return Ok(upsert(db, profile, slug).await?);
    }
    for _ in 0..SLUG_ATTEMPTS {
        let slug = candidate();
        match upsert(db, profile, &slug).await {
            Ok(()) => return Ok(()),
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(%slug, "share slug collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Internal(format!(
        "no free share slug for user {} after {SLUG_ATTEMPTS} attempts",
        profile.user_id
    )))
}

pub async fn get_profile(
    State(db): State<SqlitePool>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Option<Profile>>> {
    Ok(Json(find_profile(&db, &user_id).await?))
}

/// Upserts a profile. The share slug is generated on the first write only.
pub async fn update_profile(
    State(db): State<SqlitePool>,
    Path(user_id): Path<String>,
    Json(payload): Json<ProfileUpdate>,
) -> AppResult<Json<Profile>> {
    let existing = find_profile(&db, &user_id).await?;
    let next = existing
        .clone()
        .unwrap_or_else(|| Profile::empty(&user_id))
        .merged(&payload);

    let existing_slug = existing.and_then(|p| p.share_slug);
    let username = next.username.clone();
    save_profile(&db, &next, existing_slug.as_deref(), || {
        build_profile_slug(username.as_deref(), &user_id, &mut rand::rng())
    })
    .await?;

    let saved = find_profile(&db, &user_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("profile {user_id} vanished after upsert")))?;
    Ok(Json(saved))
}

/// Read-only public page: the profile and its public list entries joined with
/// their media, most recently updated first.
pub async fn public_profile(
    State(db): State<SqlitePool>,
    Path(slug): Path<String>,
) -> AppResult<Json<PublicProfile>> {
    let profile: Profile = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE share_slug = $1")
        .bind(&slug)
        .fetch_optional(&db)
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?
        .into();

    let rows = sqlx::query_as::<_, ListRow>(
        "SELECT * FROM user_lists WHERE user_id = $1 AND is_public = 1",
    )
    .bind(&profile.user_id)
    .fetch_all(&db)
    .await?;

    let media: HashMap<String, MediaItem> = sqlx::query_as::<_, MediaRow>(
        "SELECT * FROM media_items WHERE id IN (SELECT media_id FROM user_lists WHERE user_id = $1 AND is_public = 1)",
    )
    .bind(&profile.user_id)
    .fetch_all(&db)
    .await?
    .into_iter()
    .map(|row| MediaItem::try_from(row).map(|m| (m.id.clone(), m)))
    .collect::<Result<_, _>>()?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let entry = ListEntry::try_from(row)?;
        if let Some(item) = media.get(&entry.media_id) {
            entries.push(PublicEntry {
                media: item.summary(),
                entry,
            });
        }
    }
    entries.sort_by(|a, b| b.entry.updated_at.cmp(&a.entry.updated_at));

    Ok(Json(PublicProfile { profile, entries }))
}
