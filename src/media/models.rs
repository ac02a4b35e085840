use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Series,
    Anime,
    Manga,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    Completed,
    Ongoing,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    pub rating: f64,
    pub rating_count: u32,
    #[serde(default)]
    pub genre: Vec<String>,
    pub status: MediaStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<Vec<CastMember>>,
    pub created_at: DateTime<Utc>,
}

impl MediaItem {
    pub fn summary(&self) -> MediaSummary {
        MediaSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            image_url: self.image_url.clone(),
            media_type: self.media_type,
            rating: self.rating,
            rating_count: self.rating_count,
        }
    }
}

/// The slice of a media item shown next to posts and public list entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub rating: f64,
    pub rating_count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMedia {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MediaStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<Vec<CastMember>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatingRequest {
    #[serde(alias = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
}

/// Derived rating fields of a media item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub rating: f64,
    pub rating_count: u32,
}

#[derive(Debug, Clone, FromRow)]
pub struct MediaRow {
    pub id: String,
    pub title: String,
    #[sqlx(rename = "type")]
    pub media_type: String,
    pub description: String,
    pub image_url: String,
    pub release_date: Option<String>,
    pub rating: f64,
    pub rating_count: i64,
    pub genre_json: String,
    pub status: String,
    pub episodes: Option<i64>,
    pub chapters: Option<i64>,
    pub cast_json: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn parse_enum<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, AppError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).map_err(AppError::from)
}

pub(crate) fn enum_str<T: Serialize>(value: &T) -> Result<String, AppError> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(AppError::Internal(format!("not a string enum: {other}"))),
    }
}

impl TryFrom<MediaRow> for MediaItem {
    type Error = AppError;

    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        let cast = match row.cast_json.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(serde_json::from_str(raw)?),
            _ => None,
        };
        Ok(MediaItem {
            media_type: parse_enum(&row.media_type)?,
            status: parse_enum(&row.status)?,
            genre: serde_json::from_str(&row.genre_json)?,
            rating_count: u32::try_from(row.rating_count).unwrap_or(0),
            episodes: row.episodes.and_then(|v| u32::try_from(v).ok()),
            chapters: row.chapters.and_then(|v| u32::try_from(v).ok()),
            cast,
            id: row.id,
            title: row.title,
            description: row.description,
            image_url: row.image_url,
            release_date: row.release_date,
            rating: row.rating,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_lowercase_wire_names() {
        assert_eq!(enum_str(&MediaType::Anime).unwrap(), "anime");
        assert_eq!(parse_enum::<MediaStatus>("ongoing").unwrap(), MediaStatus::Ongoing);
        assert!(parse_enum::<MediaStatus>("paused").is_err());
    }
}
