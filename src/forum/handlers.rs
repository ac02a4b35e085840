use std::collections::HashMap;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::aggregate::{assemble_post, assemble_posts};
use super::likes::{LikeSet, LikeToggle};
use super::models::{
    Comment, CommentNode, CommentRow, ForumPost, LikeRequest, NewComment, NewPost, PostRow,
    PostView,
};
use crate::error::{AppError, AppResult, require};
use crate::media::{MediaItem, MediaRow, MediaSummary};
use crate::profiles::load_profiles;

async fn load_media_summaries(db: &SqlitePool) -> AppResult<HashMap<String, MediaSummary>> {
    let rows = sqlx::query_as::<_, MediaRow>("SELECT * FROM media_items")
        .fetch_all(db)
        .await?;
    rows.into_iter()
        .map(|row| MediaItem::try_from(row).map(|m| (m.id.clone(), m.summary())))
        .collect()
}

async fn load_comments(db: &SqlitePool, post_id: Option<&str>) -> AppResult<Vec<Comment>> {
    let rows = match post_id {
        Some(id) => {
            sqlx::query_as::<_, CommentRow>("SELECT * FROM comments WHERE post_id = $1")
                .bind(id)
                .fetch_all(db)
                .await?
        }
        None => {
            sqlx::query_as::<_, CommentRow>("SELECT * FROM comments")
                .fetch_all(db)
                .await?
        }
    };
    rows.into_iter().map(Comment::try_from).collect()
}

async fn find_post(db: &SqlitePool, post_id: &str) -> AppResult<Option<ForumPost>> {
    sqlx::query_as::<_, PostRow>("SELECT * FROM forum_posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(db)
        .await?
        .map(ForumPost::try_from)
        .transpose()
}

async fn ensure_post_exists(tx: &mut Transaction<'_, Sqlite>, post_id: &str) -> AppResult<()> {
    let found: Option<(String,)> = sqlx::query_as("SELECT id FROM forum_posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&mut **tx)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("Post not found"))
}

async fn find_comment_row(
    tx: &mut Transaction<'_, Sqlite>,
    post_id: &str,
    comment_id: &str,
) -> AppResult<CommentRow> {
    sqlx::query_as::<_, CommentRow>("SELECT * FROM comments WHERE id = $1 AND post_id = $2")
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found("Comment not found"))
}

pub async fn load_post_view(db: &SqlitePool, post_id: &str) -> AppResult<PostView> {
    let post = find_post(db, post_id)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))?;
    let comments = load_comments(db, Some(post_id)).await?;
    let profiles = load_profiles(db).await?;
    let media = load_media_summaries(db).await?;
    Ok(assemble_post(post, &comments, &profiles, &media))
}

pub async fn list_posts(State(db): State<SqlitePool>) -> AppResult<Json<Vec<PostView>>> {
    let posts = sqlx::query_as::<_, PostRow>("SELECT * FROM forum_posts")
        .fetch_all(&db)
        .await?
        .into_iter()
        .map(ForumPost::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let comments = load_comments(&db, None).await?;
    let profiles = load_profiles(&db).await?;
    let media = load_media_summaries(&db).await?;

    Ok(Json(assemble_posts(posts, comments, &profiles, &media)))
}

pub async fn create_post(
    State(db): State<SqlitePool>,
    Json(payload): Json<NewPost>,
) -> AppResult<(StatusCode, Json<PostView>)> {
    let user_id = require("user_id", payload.user_id.as_deref())?;
    let title = require("title", payload.title.as_deref())?;
    let content = require("content", payload.content.as_deref())?;
    let category = payload
        .category
        .ok_or_else(|| AppError::validation("category is required"))?;
    let tags: Vec<&str> = payload
        .tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    let id = payload
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO forum_posts (id, user_id, title, content, media_id, category, tags_json, liked_by_json, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, '[]', $8, $8)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(title)
    .bind(content)
    .bind(&payload.media_id)
    .bind(category.as_str())
    .bind(serde_json::to_string(&tags)?)
    .bind(now)
    .execute(&db)
    .await
    .map_err(|e| {
        tracing::warn!(error = %e, post_id = %id, "Error inserting post");
        AppError::conflict_on_unique(e, || format!("post {id} already exists"))
    })?;

    tracing::info!(post_id = %id, %user_id, "forum post created");
    Ok((StatusCode::CREATED, Json(load_post_view(&db, &id).await?)))
}

async fn insert_comment(
    db: &SqlitePool,
    post_id: &str,
    parent_id: Option<&str>,
    payload: NewComment,
) -> AppResult<CommentNode> {
    let user_id = require("user_id", payload.user_id.as_deref())?;
    let content = require("content", payload.content.as_deref())?;

    let mut tx = db.begin().await?;
    ensure_post_exists(&mut tx, post_id).await?;
    if let Some(parent_id) = parent_id {
        find_comment_row(&mut tx, post_id, parent_id).await?;
    }

    let comment = Comment {
        id: payload
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        post_id: post_id.to_string(),
        parent_id: parent_id.map(str::to_string),
        author_id: user_id.to_string(),
        content: content.to_string(),
        liked_by: LikeSet::new(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO comments (id, post_id, user_id, content, liked_by_json, parent_id, created_at)
        VALUES ($1, $2, $3, $4, '[]', $5, $6)
        "#,
    )
    .bind(&comment.id)
    .bind(&comment.post_id)
    .bind(&comment.author_id)
    .bind(&comment.content)
    .bind(&comment.parent_id)
    .bind(comment.created_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        AppError::conflict_on_unique(e, || format!("comment {} already exists", comment.id))
    })?;

    tx.commit().await?;

    tracing::info!(comment_id = %comment.id, %post_id, reply = parent_id.is_some(), "comment created");
    Ok(CommentNode::leaf(comment))
}

pub async fn add_comment(
    State(db): State<SqlitePool>,
    Path(post_id): Path<String>,
    Json(payload): Json<NewComment>,
) -> AppResult<(StatusCode, Json<CommentNode>)> {
    let node = insert_comment(&db, &post_id, None, payload).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

pub async fn add_reply(
    State(db): State<SqlitePool>,
    Path((post_id, comment_id)): Path<(String, String)>,
    Json(payload): Json<NewComment>,
) -> AppResult<(StatusCode, Json<CommentNode>)> {
    let node = insert_comment(&db, &post_id, Some(&comment_id), payload).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

pub async fn toggle_post_like(
    State(db): State<SqlitePool>,
    Path(post_id): Path<String>,
    Json(payload): Json<LikeRequest>,
) -> AppResult<Json<LikeToggle>> {
    let user_id = require("user_id", payload.user_id.as_deref())?;

    let mut tx = db.begin().await?;
    let current: Option<(String,)> =
        sqlx::query_as("SELECT liked_by_json FROM forum_posts WHERE id = $1")
            .bind(&post_id)
            .fetch_optional(&mut *tx)
            .await?;
    let (raw,) = current.ok_or_else(|| AppError::not_found("Post not found"))?;
    let next = LikeSet::from_json(&raw)?.toggled(user_id);

    sqlx::query("UPDATE forum_posts SET liked_by_json = $1, updated_at = $2 WHERE id = $3")
        .bind(next.to_json()?)
        .bind(Utc::now())
        .bind(&post_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(LikeToggle::new(next, user_id)))
}

pub async fn toggle_comment_like(
    State(db): State<SqlitePool>,
    Path((post_id, comment_id)): Path<(String, String)>,
    Json(payload): Json<LikeRequest>,
) -> AppResult<Json<LikeToggle>> {
    let user_id = require("user_id", payload.user_id.as_deref())?;

    let mut tx = db.begin().await?;
    let row = find_comment_row(&mut tx, &post_id, &comment_id).await?;
    let next = LikeSet::from_json(&row.liked_by_json)?.toggled(user_id);

    sqlx::query("UPDATE comments SET liked_by_json = $1 WHERE id = $2")
        .bind(next.to_json()?)
        .bind(&comment_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(LikeToggle::new(next, user_id)))
}
