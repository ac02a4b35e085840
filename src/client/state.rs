use std::collections::HashMap;

use super::arena::OrderedArena;
use super::thread::CommentThread;
use crate::forum::{
    Author, Comment, ForumPost, LikeSet, PostView, count_comments, resolve_author,
};
use crate::lists::ListEntry;
use crate::media::{MediaItem, MediaSummary, RatingSummary};
use crate::profiles::Profile;

/// A post as held by the client: stored fields, the author it was shown
/// with, its resolved media and its comment arena.
#[derive(Debug, Clone)]
pub struct PostEntry {
    pub post: ForumPost,
    pub author: Author,
    pub media: Option<MediaSummary>,
    pub thread: CommentThread,
}

impl From<PostView> for PostEntry {
    fn from(view: PostView) -> Self {
        Self {
            thread: CommentThread::from_forest(&view.comments),
            post: view.post,
            author: view.author,
            media: view.media,
        }
    }
}

/// Every change to [`ClientState`] is one of these.
#[derive(Debug, Clone)]
pub enum Action {
    Batch(Vec<Action>),

    MediaLoaded(Vec<MediaItem>),
    PostsLoaded(Vec<PostView>),
    ListLoaded {
        user_id: String,
        entries: Vec<ListEntry>,
    },

    MediaAdded(MediaItem),
    MediaConfirmed {
        temp_id: String,
        media: MediaItem,
    },
    MediaRemoved {
        id: String,
    },
    MediaRatingSet {
        media_id: String,
        summary: RatingSummary,
    },

    PostAdded(PostView),
    PostConfirmed {
        temp_id: String,
        post: PostView,
    },
    PostRemoved {
        id: String,
    },
    PostLikeToggled {
        post_id: String,
        user_id: String,
    },
    PostLikesSet {
        post_id: String,
        liked_by: LikeSet,
    },

    CommentAdded(Comment),
    CommentConfirmed {
        temp_id: String,
        comment: Comment,
    },
    CommentRemoved {
        post_id: String,
        id: String,
    },
    CommentLikeToggled {
        post_id: String,
        comment_id: String,
        user_id: String,
    },
    CommentLikesSet {
        post_id: String,
        comment_id: String,
        liked_by: LikeSet,
    },

    ListEntryAdded(ListEntry),
    ListEntrySet(ListEntry),
    ListEntryRemoved {
        user_id: String,
        media_id: String,
    },
    ListEntryRestored {
        entry: ListEntry,
        position: usize,
    },

    RatingSet {
        user_id: String,
        media_id: String,
        value: Option<i64>,
    },

    ProfileSet {
        user_id: String,
        profile: Option<Profile>,
    },
}

impl Action {
    pub fn none() -> Self {
        Action::Batch(Vec::new())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientState {
    media: OrderedArena<MediaItem>,
    posts: OrderedArena<PostEntry>,
    /// Per user, keyed by media id.
    lists: HashMap<String, OrderedArena<ListEntry>>,
    ratings: HashMap<(String, String), i64>,
    profiles: HashMap<String, Profile>,
}

/// Produces the next state from the previous one. Actions whose target is
/// missing leave the state as it was.
pub fn reduce(mut state: ClientState, action: Action) -> ClientState {
    state.apply(action);
    state
}

impl ClientState {
    fn apply(&mut self, action: Action) {
        match action {
            Action::Batch(actions) => {
                for action in actions {
                    self.apply(action);
                }
            }

            Action::MediaLoaded(items) => {
                self.media = items.into_iter().map(|m| (m.id.clone(), m)).collect();
            }
            Action::PostsLoaded(views) => {
                self.posts = views
                    .into_iter()
                    .map(|v| (v.post.id.clone(), PostEntry::from(v)))
                    .collect();
            }
            Action::ListLoaded { user_id, entries } => {
                let list = entries.into_iter().map(|e| (e.media_id.clone(), e)).collect();
                self.lists.insert(user_id, list);
            }

            Action::MediaAdded(item) => self.media.push_back(item.id.clone(), item),
            Action::MediaConfirmed { temp_id, media } => {
                if !self.media.replace(&temp_id, media.id.clone(), media) {
                    tracing::debug!(%temp_id, "confirmed media no longer in state");
                }
            }
            Action::MediaRemoved { id } => {
                self.media.remove(&id);
            }
            Action::MediaRatingSet { media_id, summary } => {
                if let Some(item) = self.media.get_mut(&media_id) {
                    item.rating = summary.rating;
                    item.rating_count = summary.rating_count;
                }
            }

            Action::PostAdded(view) => {
                let id = view.post.id.clone();
                self.posts.push_front(id, PostEntry::from(view));
            }
            Action::PostConfirmed { temp_id, post } => {
                let thread = self.posts.get_mut(&temp_id).map(|e| std::mem::take(&mut e.thread));
                let mut entry = PostEntry::from(post);
                if let Some(local) = thread.filter(|t| !t.is_empty()) {
                    entry.thread = local;
                }
                if !self.posts.replace(&temp_id, entry.post.id.clone(), entry) {
                    tracing::debug!(%temp_id, "confirmed post no longer in state");
                }
            }
            Action::PostRemoved { id } => {
                self.posts.remove(&id);
            }
            Action::PostLikeToggled { post_id, user_id } => {
                if let Some(entry) = self.posts.get_mut(&post_id) {
                    entry.post.liked_by = entry.post.liked_by.toggled(&user_id);
                }
            }
            Action::PostLikesSet { post_id, liked_by } => {
                if let Some(entry) = self.posts.get_mut(&post_id) {
                    entry.post.liked_by = liked_by;
                }
            }

            Action::CommentAdded(comment) => {
                if let Some(entry) = self.posts.get_mut(&comment.post_id) {
                    entry.thread.insert(comment);
                }
            }
            Action::CommentConfirmed { temp_id, comment } => {
                let post_id = comment.post_id.clone();
                let replaced = self
                    .posts
                    .get_mut(&post_id)
                    .is_some_and(|entry| entry.thread.replace(&temp_id, comment));
                if !replaced {
                    tracing::debug!(%temp_id, "confirmed comment no longer in state");
                }
            }
            Action::CommentRemoved { post_id, id } => {
                if let Some(entry) = self.posts.get_mut(&post_id) {
                    entry.thread.remove(&id);
                }
            }
            Action::CommentLikeToggled {
                post_id,
                comment_id,
                user_id,
            } => {
                if let Some(entry) = self.posts.get_mut(&post_id) {
                    if let Some(next) = entry.thread.likes(&comment_id).map(|l| l.toggled(&user_id)) {
                        entry.thread.set_likes(&comment_id, next);
                    }
                }
            }
            Action::CommentLikesSet {
                post_id,
                comment_id,
                liked_by,
            } => {
                if let Some(entry) = self.posts.get_mut(&post_id) {
                    entry.thread.set_likes(&comment_id, liked_by);
                }
            }

            Action::ListEntryAdded(entry) => {
                let list = self.lists.entry(entry.user_id.clone()).or_default();
                if !list.contains(&entry.media_id) {
                    list.push_back(entry.media_id.clone(), entry);
                }
            }
            Action::ListEntrySet(entry) => {
                if let Some(existing) = self
                    .lists
                    .get_mut(&entry.user_id)
                    .and_then(|list| list.get_mut(&entry.media_id))
                {
                    *existing = entry;
                }
            }
            Action::ListEntryRemoved { user_id, media_id } => {
                if let Some(list) = self.lists.get_mut(&user_id) {
                    list.remove(&media_id);
                }
            }
            Action::ListEntryRestored { entry, position } => {
                let list = self.lists.entry(entry.user_id.clone()).or_default();
                list.insert_at(position, entry.media_id.clone(), entry);
            }

            Action::RatingSet {
                user_id,
                media_id,
                value,
            } => match value {
                Some(v) => {
                    self.ratings.insert((user_id, media_id), v);
                }
                None => {
                    self.ratings.remove(&(user_id, media_id));
                }
            },

            Action::ProfileSet { user_id, profile } => match profile {
                Some(p) => {
                    self.profiles.insert(user_id, p);
                }
                None => {
                    self.profiles.remove(&user_id);
                }
            },
        }
    }

    pub fn media(&self) -> impl Iterator<Item = &MediaItem> {
        self.media.iter()
    }

    pub fn media_item(&self, id: &str) -> Option<&MediaItem> {
        self.media.get(id)
    }

    pub fn posts(&self) -> impl Iterator<Item = &PostEntry> {
        self.posts.iter()
    }

    pub fn post(&self, id: &str) -> Option<&PostEntry> {
        self.posts.get(id)
    }

    /// The post assembled for display. A locally known profile of the author
    /// takes precedence over the identity the post was loaded with.
    pub fn post_view(&self, id: &str) -> Option<PostView> {
        self.posts.get(id).map(|entry| self.view_of(entry))
    }

    pub fn post_views(&self) -> Vec<PostView> {
        self.posts.iter().map(|entry| self.view_of(entry)).collect()
    }

    fn view_of(&self, entry: &PostEntry) -> PostView {
        let comments = entry.thread.to_forest();
        let author = match self.profiles.get(&entry.post.author_id) {
            Some(profile) if profile.username.is_some() => {
                resolve_author(&entry.post.author_id, Some(profile))
            }
            _ => entry.author.clone(),
        };
        PostView {
            post: entry.post.clone(),
            author,
            media: entry.media.clone(),
            likes_count: entry.post.liked_by.len(),
            comment_count: count_comments(&comments),
            comments,
        }
    }

    pub fn comment(&self, post_id: &str, comment_id: &str) -> Option<&Comment> {
        self.posts.get(post_id)?.thread.get(comment_id)
    }

    /// All comments of a post, replies at every depth included.
    pub fn comment_count(&self, post_id: &str) -> usize {
        self.posts.get(post_id).map_or(0, |entry| entry.thread.len())
    }

    /// A user's list joined with the media it refers to. Entries whose media
    /// is not loaded are left out.
    pub fn user_list(&self, user_id: &str) -> Vec<(&ListEntry, &MediaItem)> {
        self.lists
            .get(user_id)
            .map(|list| {
                list.iter()
                    .filter_map(|entry| self.media.get(&entry.media_id).map(|m| (entry, m)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn list_entry(&self, user_id: &str, media_id: &str) -> Option<&ListEntry> {
        self.lists.get(user_id)?.get(media_id)
    }

    pub(crate) fn list_entry_with_position(
        &self,
        user_id: &str,
        media_id: &str,
    ) -> Option<(usize, &ListEntry)> {
        let list = self.lists.get(user_id)?;
        Some((list.position(media_id)?, list.get(media_id)?))
    }

    pub fn user_rating(&self, user_id: &str, media_id: &str) -> Option<i64> {
        self.ratings
            .get(&(user_id.to_string(), media_id.to_string()))
            .copied()
    }

    pub fn profile(&self, user_id: &str) -> Option<&Profile> {
        self.profiles.get(user_id)
    }
}
