//! Sample catalog and forum threads for a fresh database.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::forum::Category;
use crate::media::{MediaStatus, MediaType, enum_str};

struct SeedMedia {
    id: &'static str,
    title: &'static str,
    media_type: MediaType,
    description: &'static str,
    release_date: &'static str,
    genre: &'static [&'static str],
    status: MediaStatus,
    episodes: Option<u32>,
    chapters: Option<u32>,
}

const MEDIA: &[SeedMedia] = &[
    SeedMedia {
        id: "media-dune",
        title: "Dune: Part Two",
        media_type: MediaType::Movie,
        description: "Paul Atreides unites with the Fremen on a path of revenge.",
        release_date: "2024-03-01",
        genre: &["sci-fi", "adventure"],
        status: MediaStatus::Completed,
        episodes: None,
        chapters: None,
    },
    SeedMedia {
        id: "media-frieren",
        title: "Frieren: Beyond Journey's End",
        media_type: MediaType::Anime,
        description: "An elf mage revisits the world after her party's quest is over.",
        release_date: "2023-09-29",
        genre: &["fantasy", "drama"],
        status: MediaStatus::Ongoing,
        episodes: Some(28),
        chapters: None,
    },
    SeedMedia {
        id: "media-berserk",
        title: "Berserk",
        media_type: MediaType::Manga,
        description: "A lone mercenary fights fate in a dark medieval world.",
        release_date: "1989-08-25",
        genre: &["dark fantasy", "action"],
        status: MediaStatus::Ongoing,
        episodes: None,
        chapters: Some(375),
    },
    SeedMedia {
        id: "media-severance",
        title: "Severance",
        media_type: MediaType::Series,
        description: "Office workers have their memories split between work and home.",
        release_date: "2022-02-18",
        genre: &["thriller", "mystery"],
        status: MediaStatus::Ongoing,
        episodes: Some(19),
        chapters: None,
    },
];

struct SeedComment {
    id: &'static str,
    user_id: &'static str,
    content: &'static str,
    replies: &'static [SeedComment],
}

struct SeedPost {
    id: &'static str,
    user_id: &'static str,
    title: &'static str,
    content: &'static str,
    media_id: Option<&'static str>,
    category: Category,
    tags: &'static [&'static str],
    liked_by: &'static [&'static str],
    comments: &'static [SeedComment],
}

const POSTS: &[SeedPost] = &[
    SeedPost {
        id: "post-frieren-pacing",
        user_id: "demo-user-1",
        title: "Frieren's pacing is the point",
        content: "The slow episodes are what make the flashbacks land.",
        media_id: Some("media-frieren"),
        category: Category::Anime,
        tags: &["discussion", "pacing"],
        liked_by: &["demo-user-2", "demo-user-3"],
        comments: &[SeedComment {
            id: "comment-pacing-1",
            user_id: "demo-user-2",
            content: "Agreed, episode 10 would not work at a faster pace.",
            replies: &[
                SeedComment {
                    id: "comment-pacing-2",
                    user_id: "demo-user-1",
                    content: "Exactly, the payoff needs the quiet build-up.",
                    replies: &[SeedComment {
                        id: "comment-pacing-3",
                        user_id: "demo-user-3",
                        content: "The soundtrack carries a lot of it too.",
                        replies: &[],
                    }],
                },
                SeedComment {
                    id: "comment-pacing-4",
                    user_id: "demo-user-3",
                    content: "I dropped it at first and came back later.",
                    replies: &[],
                },
            ],
        }],
    },
    SeedPost {
        id: "post-welcome",
        user_id: "demo-user-3",
        title: "Welcome to the forum",
        content: "Introduce yourself and share what you are watching.",
        media_id: None,
        category: Category::General,
        tags: &["meta"],
        liked_by: &[],
        comments: &[],
    },
];

async fn table_is_empty(db: &SqlitePool, table: &str) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db)
        .await?;
    Ok(count == 0)
}

async fn seed_media(db: &SqlitePool, now: DateTime<Utc>) -> AppResult<usize> {
    let mut tx = db.begin().await?;
    for (offset, item) in MEDIA.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO media_items
                (id, title, type, description, image_url, release_date, rating, rating_count,
                 genre_json, status, episodes, chapters, cast_json, created_at)
            VALUES ($1, $2, $3, $4, '', $5, 0, 0, $6, $7, $8, $9, NULL, $10)
            "#,
        )
        .bind(item.id)
        .bind(item.title)
        .bind(enum_str(&item.media_type)?)
        .bind(item.description)
        .bind(item.release_date)
        .bind(serde_json::to_string(item.genre)?)
        .bind(enum_str(&item.status)?)
        .bind(item.episodes.map(i64::from))
        .bind(item.chapters.map(i64::from))
        .bind(now - Duration::days(offset as i64))
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(MEDIA.len())
}

fn flatten<'a>(
    comments: &'a [SeedComment],
    parent_id: Option<&'a str>,
    out: &mut Vec<(&'a SeedComment, Option<&'a str>)>,
) {
    for comment in comments {
        out.push((comment, parent_id));
        flatten(comment.replies, Some(comment.id), out);
    }
}

async fn seed_forum(db: &SqlitePool, now: DateTime<Utc>) -> AppResult<usize> {
    let mut tx = db.begin().await?;
    for (offset, post) in POSTS.iter().enumerate() {
        let created_at = now - Duration::hours(offset as i64 * 24 + 12);
        sqlx::query(
            r#"
            INSERT INTO forum_posts (id, user_id, title, content, media_id, category, tags_json, liked_by_json, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            "#,
        )
        .bind(post.id)
        .bind(post.user_id)
        .bind(post.title)
        .bind(post.content)
        .bind(post.media_id)
        .bind(post.category.as_str())
        .bind(serde_json::to_string(post.tags)?)
        .bind(serde_json::to_string(post.liked_by)?)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        let mut flat = Vec::new();
        flatten(post.comments, None, &mut flat);
        for (minutes, (comment, parent_id)) in flat.into_iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO comments (id, post_id, user_id, content, liked_by_json, parent_id, created_at)
                VALUES ($1, $2, $3, $4, '[]', $5, $6)
                "#,
            )
            .bind(comment.id)
            .bind(post.id)
            .bind(comment.user_id)
            .bind(comment.content)
            .bind(parent_id)
            .bind(created_at + Duration::minutes(minutes as i64 + 1))
            .execute(&mut *tx)
            .await?;
        }
    }
    tx.commit().await?;
    Ok(POSTS.len())
}

/// Inserts the sample data into tables that are still empty.
pub async fn seed(db: &SqlitePool) -> AppResult<()> {
    let now = Utc::now();

    if table_is_empty(db, "media_items").await? {
        let count = seed_media(db, now).await?;
        tracing::info!(count, "seeded media items");
    } else {
        tracing::info!("media items already seeded");
    }

    if table_is_empty(db, "forum_posts").await? {
        let count = seed_forum(db, now).await?;
        tracing::info!(count, "seeded forum posts and comments");
    } else {
        tracing::info!("forum posts already seeded");
    }

    Ok(())
}
