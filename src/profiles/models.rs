use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::lists::ListEntry;
use crate::media::MediaSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_color: Option<String>,
    /// Assigned on the first write, never changed afterwards. `None` only on a
    /// profile the client has not yet confirmed with the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_slug: Option<String>,
}

impl Profile {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: None,
            bio: None,
            avatar_url: None,
            banner_color: None,
            share_slug: None,
        }
    }

    /// Fields present in `update` overwrite, absent ones are kept.
    pub fn merged(&self, update: &ProfileUpdate) -> Self {
        Self {
            user_id: self.user_id.clone(),
            username: update.username.clone().or_else(|| self.username.clone()),
            bio: update.bio.clone().or_else(|| self.bio.clone()),
            avatar_url: update.avatar_url.clone().or_else(|| self.avatar_url.clone()),
            banner_color: update
                .banner_color
                .clone()
                .or_else(|| self.banner_color.clone()),
            share_slug: self.share_slug.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicEntry {
    pub entry: ListEntry,
    pub media: MediaSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub profile: Profile,
    pub entries: Vec<PublicEntry>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub user_id: String,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_color: Option<String>,
    pub share_slug: String,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        let non_blank = |v: Option<String>| v.filter(|s| !s.is_empty());
        Profile {
            user_id: row.user_id,
            username: non_blank(row.username),
            bio: non_blank(row.bio),
            avatar_url: non_blank(row.avatar_url),
            banner_color: non_blank(row.banner_color),
            share_slug: Some(row.share_slug),
        }
    }
}
