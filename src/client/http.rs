use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::api::{ApiError, ApiResult, Collaborator};
use crate::config::ClientConfig;
use crate::forum::{CommentNode, LikeRequest, LikeToggle, NewComment, NewPost, PostView};
use crate::lists::{ListEntry, ListEntryUpdate, NewListEntry};
use crate::media::{MediaItem, NewMedia, RatingRequest, RatingSummary};
use crate::profiles::{Profile, ProfileUpdate, PublicProfile};

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Decodes a response body of any nesting depth. Reply chains are unbounded,
/// so the recursion limit is off and the stack grows on demand.
pub(crate) fn decode_body<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    let decode = |e: serde_json::Error| ApiError::Decode(e.to_string());
    let mut json = serde_json::Deserializer::from_slice(body);
    json.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut json)).map_err(decode)?;
    json.end().map_err(decode)?;
    Ok(value)
}

/// [`Collaborator`] speaking JSON over HTTP to the forum API.
#[derive(Debug, Clone)]
pub struct HttpCollaborator {
    client: Client,
    base_url: String,
}

impl HttpCollaborator {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            base_url: config.api_base_url.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "request to collaborator failed");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        tracing::debug!(%status, %message, "collaborator rejected request");
        Err(ApiError::from_status(status, message))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let body = self
            .execute(request)
            .await?
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        decode_body(&body)
    }

    async fn send_empty(&self, request: RequestBuilder) -> ApiResult<()> {
        self.execute(request).await.map(|_| ())
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(self.client.post(self.url(path)).json(body)).await
    }
}

fn like_body(user_id: &str) -> LikeRequest {
    LikeRequest {
        user_id: Some(user_id.to_string()),
    }
}

#[async_trait]
impl Collaborator for HttpCollaborator {
    async fn list_media(&self) -> ApiResult<Vec<MediaItem>> {
        self.send(self.client.get(self.url("/media"))).await
    }

    async fn create_media(&self, media: &NewMedia) -> ApiResult<MediaItem> {
        self.post_json("/media", media).await
    }

    async fn rate_media(
        &self,
        media_id: &str,
        user_id: &str,
        rating: i64,
    ) -> ApiResult<RatingSummary> {
        let body = RatingRequest {
            user_id: Some(user_id.to_string()),
            rating: Some(rating),
        };
        self.post_json(&format!("/media/{media_id}/ratings"), &body)
            .await
    }

    async fn list_posts(&self) -> ApiResult<Vec<PostView>> {
        self.send(self.client.get(self.url("/forum/posts"))).await
    }

    async fn create_post(&self, post: &NewPost) -> ApiResult<PostView> {
        self.post_json("/forum/posts", post).await
    }

    async fn add_comment(&self, post_id: &str, comment: &NewComment) -> ApiResult<CommentNode> {
        self.post_json(&format!("/forum/posts/{post_id}/comments"), comment)
            .await
    }

    async fn add_reply(
        &self,
        post_id: &str,
        parent_id: &str,
        comment: &NewComment,
    ) -> ApiResult<CommentNode> {
        self.post_json(
            &format!("/forum/posts/{post_id}/comments/{parent_id}/replies"),
            comment,
        )
        .await
    }

    async fn toggle_post_like(&self, post_id: &str, user_id: &str) -> ApiResult<LikeToggle> {
        self.post_json(&format!("/forum/posts/{post_id}/likes"), &like_body(user_id))
            .await
    }

    async fn toggle_comment_like(
        &self,
        post_id: &str,
        comment_id: &str,
        user_id: &str,
    ) -> ApiResult<LikeToggle> {
        self.post_json(
            &format!("/forum/posts/{post_id}/comments/{comment_id}/likes"),
            &like_body(user_id),
        )
        .await
    }

    async fn list_entries(&self, user_id: &str) -> ApiResult<Vec<ListEntry>> {
        self.send(self.client.get(self.url(&format!("/users/{user_id}/list"))))
            .await
    }

    async fn add_list_entry(&self, user_id: &str, entry: &NewListEntry) -> ApiResult<ListEntry> {
        self.post_json(&format!("/users/{user_id}/list"), entry)
            .await
    }

    async fn update_list_entry(
        &self,
        user_id: &str,
        media_id: &str,
        update: &ListEntryUpdate,
    ) -> ApiResult<ListEntry> {
        let url = self.url(&format!("/users/{user_id}/list/{media_id}"));
        self.send(self.client.put(url).json(update)).await
    }

    async fn remove_list_entry(&self, user_id: &str, media_id: &str) -> ApiResult<()> {
        let url = self.url(&format!("/users/{user_id}/list/{media_id}"));
        self.send_empty(self.client.delete(url)).await
    }

    async fn get_profile(&self, user_id: &str) -> ApiResult<Option<Profile>> {
        self.send(self.client.get(self.url(&format!("/users/{user_id}/profile"))))
            .await
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> ApiResult<Profile> {
        let url = self.url(&format!("/users/{user_id}/profile"));
        self.send(self.client.put(url).json(update)).await
    }

    async fn public_profile(&self, slug: &str) -> ApiResult<PublicProfile> {
        self.send(self.client.get(self.url(&format!("/public-profiles/{slug}"))))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forum::{Comment, LikeSet, count_comments};
    use chrono::Utc;

    fn chain(depth: usize) -> CommentNode {
        let comment = |n: usize| Comment {
            id: format!("c{n}"),
            post_id: "p1".into(),
            parent_id: n.checked_sub(1).map(|p| format!("c{p}")),
            author_id: "u1".into(),
            content: format!("level {n}"),
            liked_by: LikeSet::new(),
            created_at: Utc::now(),
        };
        let mut node = CommentNode::leaf(comment(depth - 1));
        for n in (0..depth - 1).rev() {
            node = CommentNode::with_replies(comment(n), vec![node]);
        }
        node
    }

    #[test]
    fn decodes_reply_chains_past_the_default_recursion_limit() {
        let body = serde_json::to_vec(&vec![chain(500)]).unwrap();
        let forest: Vec<CommentNode> = decode_body(&body).unwrap();
        assert_eq!(count_comments(&forest), 500);
    }

    #[test]
    fn trailing_garbage_is_a_decode_error() {
        let err = decode_body::<Vec<CommentNode>>(b"[] []").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
