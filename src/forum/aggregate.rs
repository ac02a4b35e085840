use std::collections::HashMap;

use super::models::{Author, Comment, ForumPost, PostView};
use super::tree::{build_comment_tree, count_comments};
use crate::media::MediaSummary;
use crate::profiles::Profile;

pub fn placeholder_label(user_id: &str) -> String {
    format!("user-{}", user_id.chars().take(6).collect::<String>())
}

/// Resolves the display identity of `author_id`. A missing profile, or one
/// without a username, yields a placeholder instead of an error.
pub fn resolve_author(author_id: &str, profile: Option<&Profile>) -> Author {
    match profile.and_then(|p| p.username.as_deref().map(|name| (name, p))) {
        Some((username, p)) if !username.trim().is_empty() => Author::Profile {
            user_id: author_id.to_string(),
            username: username.to_string(),
            avatar_url: p.avatar_url.clone(),
        },
        _ => Author::Placeholder {
            user_id: author_id.to_string(),
            label: placeholder_label(author_id),
        },
    }
}

pub fn assemble_post(
    post: ForumPost,
    comments: &[Comment],
    profiles: &HashMap<String, Profile>,
    media: &HashMap<String, MediaSummary>,
) -> PostView {
    let forest = build_comment_tree(comments);
    PostView {
        author: resolve_author(&post.author_id, profiles.get(&post.author_id)),
        media: post.media_ref.as_ref().and_then(|id| media.get(id)).cloned(),
        likes_count: post.liked_by.len(),
        comment_count: count_comments(&forest),
        comments: forest,
        post,
    }
}

/// Groups flat comments by post and assembles every post, newest first.
pub fn assemble_posts(
    posts: Vec<ForumPost>,
    comments: Vec<Comment>,
    profiles: &HashMap<String, Profile>,
    media: &HashMap<String, MediaSummary>,
) -> Vec<PostView> {
    let mut by_post: HashMap<String, Vec<Comment>> = HashMap::new();
    for comment in comments {
        by_post.entry(comment.post_id.clone()).or_default().push(comment);
    }

    let mut views: Vec<PostView> = posts
        .into_iter()
        .map(|post| {
            let thread = by_post.remove(&post.id).unwrap_or_default();
            assemble_post(post, &thread, profiles, media)
        })
        .collect();
    views.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at));
    views
}
