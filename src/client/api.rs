use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::forum::{CommentNode, LikeToggle, NewComment, NewPost, PostView};
use crate::lists::{ListEntry, ListEntryUpdate, NewListEntry};
use crate::media::{MediaItem, NewMedia, RatingSummary};
use crate::profiles::{Profile, ProfileUpdate, PublicProfile};

/// Failure reported by, or on the way to, the persistence collaborator.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rejected with {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::CONFLICT => ApiError::Conflict(message),
            _ => ApiError::Rejected {
                status: status.as_u16(),
                message,
            },
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// The remote operations the client core depends on.
#[async_trait]
pub trait Collaborator: Send + Sync {
    async fn list_media(&self) -> ApiResult<Vec<MediaItem>>;
    async fn create_media(&self, media: &NewMedia) -> ApiResult<MediaItem>;
    async fn rate_media(&self, media_id: &str, user_id: &str, rating: i64)
    -> ApiResult<RatingSummary>;

    async fn list_posts(&self) -> ApiResult<Vec<PostView>>;
    async fn create_post(&self, post: &NewPost) -> ApiResult<PostView>;
    async fn add_comment(&self, post_id: &str, comment: &NewComment) -> ApiResult<CommentNode>;
    async fn add_reply(
        &self,
        post_id: &str,
        parent_id: &str,
        comment: &NewComment,
    ) -> ApiResult<CommentNode>;
    async fn toggle_post_like(&self, post_id: &str, user_id: &str) -> ApiResult<LikeToggle>;
    async fn toggle_comment_like(
        &self,
        post_id: &str,
        comment_id: &str,
        user_id: &str,
    ) -> ApiResult<LikeToggle>;

    async fn list_entries(&self, user_id: &str) -> ApiResult<Vec<ListEntry>>;
    async fn add_list_entry(&self, user_id: &str, entry: &NewListEntry) -> ApiResult<ListEntry>;
    async fn update_list_entry(
        &self,
        user_id: &str,
        media_id: &str,
        update: &ListEntryUpdate,
    ) -> ApiResult<ListEntry>;
    async fn remove_list_entry(&self, user_id: &str, media_id: &str) -> ApiResult<()>;

    async fn get_profile(&self, user_id: &str) -> ApiResult<Option<Profile>>;
    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> ApiResult<Profile>;
    async fn public_profile(&self, slug: &str) -> ApiResult<PublicProfile>;
}
