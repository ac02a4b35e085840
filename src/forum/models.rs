use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::likes::LikeSet;
use crate::media::MediaSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Movies,
    Series,
    Anime,
    Manga,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Movies => "movies",
            Category::Series => "series",
            Category::Anime => "anime",
            Category::Manga => "manga",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movies" => Ok(Category::Movies),
            "series" => Ok(Category::Series),
            "anime" => Ok(Category::Anime),
            "manga" => Ok(Category::Manga),
            "general" => Ok(Category::General),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "user_id")]
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub liked_by: LikeSet,
    pub created_at: DateTime<Utc>,
}

/// A comment with its replies, as rendered inside a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(default)]
    pub likes_count: usize,
    #[serde(default)]
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn leaf(comment: Comment) -> Self {
        Self::with_replies(comment, Vec::new())
    }

    pub fn with_replies(comment: Comment, replies: Vec<CommentNode>) -> Self {
        Self {
            likes_count: comment.liked_by.len(),
            comment,
            replies,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumPost {
    pub id: String,
    #[serde(rename = "user_id")]
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub liked_by: LikeSet,
    #[serde(rename = "media_id", default, skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who wrote a post, either resolved from their profile or a stand-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Author {
    Profile {
        user_id: String,
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        avatar_url: Option<String>,
    },
    Placeholder {
        user_id: String,
        label: String,
    },
}

impl Author {
    pub fn display_name(&self) -> &str {
        match self {
            Author::Profile { username, .. } => username,
            Author::Placeholder { label, .. } => label,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Author::Profile { user_id, .. } | Author::Placeholder { user_id, .. } => user_id,
        }
    }
}

/// A post assembled for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: ForumPost,
    pub author: Author,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaSummary>,
    #[serde(default)]
    pub comments: Vec<CommentNode>,
    #[serde(default)]
    pub likes_count: usize,
    #[serde(default)]
    pub comment_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPost {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewComment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LikeRequest {
    #[serde(alias = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub media_id: Option<String>,
    pub category: String,
    pub tags_json: String,
    pub liked_by_json: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for ForumPost {
    type Error = crate::error::AppError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(ForumPost {
            category: row.category.parse().map_err(crate::error::AppError::Internal)?,
            tags: serde_json::from_str(&row.tags_json)?,
            liked_by: LikeSet::from_json(&row.liked_by_json)?,
            id: row.id,
            author_id: row.user_id,
            title: row.title,
            content: row.content,
            media_ref: row.media_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub content: String,
    pub liked_by_json: String,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = crate::error::AppError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(Comment {
            liked_by: LikeSet::from_json(&row.liked_by_json)?,
            id: row.id,
            post_id: row.post_id,
            parent_id: row.parent_id,
            author_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn comment_node_wire_shape_flattens_comment() {
        let comment = Comment {
            id: "c1".into(),
            post_id: "p1".into(),
            parent_id: None,
            author_id: "u1".into(),
            content: "hi".into(),
            liked_by: ["u2", "u3"].into_iter().collect(),
            created_at: "2024-01-15T12:00:00Z".parse().unwrap(),
        };
        let value = serde_json::to_value(CommentNode::leaf(comment.clone())).unwrap();
        assert_eq!(value["user_id"], json!("u1"));
        assert_eq!(value["likes_count"], json!(2));
        assert_eq!(value["replies"], json!([]));
        assert!(value.get("parent_id").is_none());

        let back: CommentNode = serde_json::from_value(value).unwrap();
        assert_eq!(back.comment, comment);
    }

    #[test]
    fn author_is_tagged() {
        let author = Author::Placeholder {
            user_id: "abcdef123".into(),
            label: "user-abcdef".into(),
        };
        let value = serde_json::to_value(&author).unwrap();
        assert_eq!(value["kind"], json!("placeholder"));
        assert_eq!(author.display_name(), "user-abcdef");
    }

    #[test]
    fn new_comment_accepts_camel_case_user_id() {
        let body: NewComment = serde_json::from_str(r#"{"userId":"u1","content":"x"}"#).unwrap();
        assert_eq!(body.user_id.as_deref(), Some("u1"));
    }
}
