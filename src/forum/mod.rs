pub mod aggregate;
mod handlers;
pub mod likes;
mod models;
pub mod tree;

pub use aggregate::{assemble_post, assemble_posts, placeholder_label, resolve_author};
pub use handlers::{
    add_comment, add_reply, create_post, list_posts, load_post_view, toggle_comment_like,
    toggle_post_like,
};
pub use likes::{LikeSet, LikeToggle};
pub use models::{
    Author, Category, Comment, CommentNode, CommentRow, ForumPost, LikeRequest, NewComment,
    NewPost, PostRow, PostView,
};
pub use tree::{build_comment_tree, count_comments};

use axum::{Router, routing::{get, post}};
use sqlx::SqlitePool;

pub fn routes() -> Router<SqlitePool> {
    Router::new()
        .route("/forum/posts", get(list_posts).post(create_post))
        .route("/forum/posts/:post_id/comments", post(add_comment))
        .route(
            "/forum/posts/:post_id/comments/:comment_id/replies",
            post(add_reply),
        )
        .route("/forum/posts/:post_id/likes", post(toggle_post_like))
        .route(
            "/forum/posts/:post_id/comments/:comment_id/likes",
            post(toggle_comment_like),
        )
}
