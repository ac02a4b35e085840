use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListStatus {
    #[default]
    PlanToWatch,
    Watching,
    Completed,
    OnHold,
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntry {
    pub id: String,
    pub user_id: String,
    pub media_id: String,
    pub status: ListStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    pub progress: u32,
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ListEntry {
    pub fn updated(&self, update: &ListEntryUpdate, now: DateTime<Utc>) -> Self {
        Self {
            status: update.status.unwrap_or(self.status),
            rating: update.rating.or(self.rating),
            progress: update.progress.unwrap_or(self.progress),
            is_public: update.is_public.unwrap_or(self.is_public),
            notes: update.notes.clone().or_else(|| self.notes.clone()),
            updated_at: now,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewListEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ListStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListEntryUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ListStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ListEntryUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.rating.is_none()
            && self.progress.is_none()
            && self.is_public.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ListRow {
    pub id: String,
    pub user_id: String,
    pub media_id: String,
    pub status: String,
    pub rating: Option<i64>,
    pub progress: i64,
    pub is_public: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ListRow> for ListEntry {
    type Error = AppError;

    fn try_from(row: ListRow) -> Result<Self, Self::Error> {
        Ok(ListEntry {
            status: serde_json::from_value(serde_json::Value::String(row.status))?,
            progress: u32::try_from(row.progress).unwrap_or(0),
            notes: row.notes.filter(|n| !n.is_empty()),
            id: row.id,
            user_id: row.user_id,
            media_id: row.media_id,
            rating: row.rating,
            is_public: row.is_public,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
