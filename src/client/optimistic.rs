use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use super::api::{ApiResult, Collaborator};
use super::mutation::{
    MutationError, MutationId, MutationKind, MutationLog, MutationRecord, MutationStatus,
};
use super::state::{Action, ClientState, reduce};
use crate::forum::{
    Author, Comment, CommentNode, ForumPost, LikeSet, LikeToggle, NewComment, NewPost, PostView,
};
use crate::lists::{ListEntry, ListEntryUpdate, NewListEntry};
use crate::media::{
    MediaItem, MediaStatus, NewMedia, RatingSummary,
    rating::{MAX_RATING, MIN_RATING, estimate_after_upsert, is_valid_rating},
};
use crate::profiles::{Profile, ProfileUpdate, PublicProfile};

/// The signed-in user on whose behalf mutations are issued.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            avatar_url: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn author(&self) -> Author {
        let profile = Profile {
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            ..Profile::empty(&self.id)
        };
        crate::forum::resolve_author(&self.id, Some(&profile))
    }
}

/// Shared client state plus the mutation history. Locks are held only for a
/// single reduce step or read, never across an await.
#[derive(Debug, Default)]
pub struct Store {
    state: Mutex<ClientState>,
    log: Mutex<MutationLog>,
}

impl Store {
    pub fn dispatch(&self, action: Action) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::take(&mut *state);
        *state = reduce(previous, action);
    }

    pub fn read<R>(&self, f: impl FnOnce(&ClientState) -> R) -> R {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    pub fn snapshot(&self) -> ClientState {
        self.read(ClientState::clone)
    }

    fn begin(&self, kind: MutationKind, entity_id: &str) -> MutationId {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.begin(kind, entity_id)
    }

    fn settle(&self, id: MutationId, status: MutationStatus) {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.settle(id, status);
    }

    pub fn mutation(&self, id: MutationId) -> Option<MutationRecord> {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.get(id).cloned()
    }

    pub fn mutation_status(&self, id: MutationId) -> Option<MutationStatus> {
        self.mutation(id).map(|r| r.status)
    }

    /// Every recorded mutation, oldest first.
    pub fn mutations(&self) -> Vec<(MutationId, MutationRecord)> {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<_> = log.records().map(|(id, r)| (*id, r.clone())).collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    pub fn mutations_for(&self, entity_id: &str) -> Vec<(MutationId, MutationRecord)> {
        self.mutations()
            .into_iter()
            .filter(|(_, r)| r.entity_id == entity_id)
            .collect()
    }

    pub fn pending_mutations(&self) -> usize {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending()
    }
}

fn temp_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn required(field: &str, value: Option<&str>) -> Result<String, MutationError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MutationError::Validation(format!("{field} is required")))
}

fn check_rating(value: Option<i64>) -> Result<(), MutationError> {
    match value {
        Some(v) if !is_valid_rating(v) => Err(MutationError::Validation(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}"
        ))),
        _ => Ok(()),
    }
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Applies mutations locally first, then reconciles with or rolls back to
/// what the collaborator answers.
pub struct OptimisticClient<C> {
    api: C,
    store: Arc<Store>,
    user: CurrentUser,
}

impl<C: Collaborator> OptimisticClient<C> {
    pub fn new(api: C, user: CurrentUser) -> Self {
        Self::with_store(api, Arc::new(Store::default()), user)
    }

    pub fn with_store(api: C, store: Arc<Store>, user: CurrentUser) -> Self {
        Self { api, store, user }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn state(&self) -> ClientState {
        self.store.snapshot()
    }

    /// Applies `optimistic`, awaits `request`, then applies either the
    /// confirmation built from the response or `rollback`.
    async fn run<T, F>(
        &self,
        kind: MutationKind,
        entity_id: &str,
        optimistic: Action,
        request: F,
        confirm: impl FnOnce(&T) -> Action,
        rollback: Action,
    ) -> Result<T, MutationError>
    where
        F: Future<Output = ApiResult<T>>,
    {
        let id = self.store.begin(kind, entity_id);
        tracing::debug!(mutation = %id, ?kind, %entity_id, "optimistic update applied");
        self.store.dispatch(optimistic);

        match request.await {
            Ok(value) => {
                self.store.dispatch(confirm(&value));
                self.store.settle(id, MutationStatus::Confirmed);
                tracing::debug!(mutation = %id, "mutation confirmed");
                Ok(value)
            }
            Err(err) => {
                self.store.dispatch(rollback);
                self.store.settle(
                    id,
                    MutationStatus::RolledBack {
                        reason: err.to_string(),
                    },
                );
                tracing::warn!(mutation = %id, ?kind, %entity_id, error = %err, "mutation rolled back");
                Err(err.into())
            }
        }
    }

    /// Loads the catalog and the forum.
    pub async fn hydrate(&self) -> Result<(), MutationError> {
        let (media, posts) =
            futures_util::try_join!(self.api.list_media(), self.api.list_posts())?;
        tracing::info!(media = media.len(), posts = posts.len(), "client state hydrated");
        self.store.dispatch(Action::Batch(vec![
            Action::MediaLoaded(media),
            Action::PostsLoaded(posts),
        ]));
        Ok(())
    }

    /// Loads the current user's list and profile.
    pub async fn hydrate_user(&self) -> Result<(), MutationError> {
        let user_id = self.user.id.as_str();
        let (entries, profile) = futures_util::try_join!(
            self.api.list_entries(user_id),
            self.api.get_profile(user_id)
        )?;

        let mut actions: Vec<Action> = entries
            .iter()
            .filter_map(|e| {
                e.rating.map(|value| Action::RatingSet {
                    user_id: e.user_id.clone(),
                    media_id: e.media_id.clone(),
                    value: Some(value),
                })
            })
            .collect();
        actions.push(Action::ListLoaded {
            user_id: user_id.to_string(),
            entries,
        });
        actions.push(Action::ProfileSet {
            user_id: user_id.to_string(),
            profile,
        });
        self.store.dispatch(Action::Batch(actions));
        Ok(())
    }

    pub async fn create_post(&self, draft: NewPost) -> Result<PostView, MutationError> {
        let title = required("title", draft.title.as_deref())?;
        let content = required("content", draft.content.as_deref())?;
        let category = draft
            .category
            .ok_or_else(|| MutationError::Validation("category is required".into()))?;
        let tags = clean_tags(&draft.tags);

        let id = temp_id();
        let now = Utc::now();
        let media = draft.media_id.as_deref().and_then(|media_id| {
            self.store
                .read(|s| s.media_item(media_id).map(MediaItem::summary))
        });
        let view = PostView {
            post: ForumPost {
                id: id.clone(),
                author_id: self.user.id.clone(),
                title: title.clone(),
                content: content.clone(),
                category,
                tags: tags.clone(),
                liked_by: LikeSet::new(),
                media_ref: draft.media_id.clone(),
                created_at: now,
                updated_at: now,
            },
            author: self.user.author(),
            media,
            comments: Vec::new(),
            likes_count: 0,
            comment_count: 0,
        };
        let body = NewPost {
            id: Some(id.clone()),
            user_id: Some(self.user.id.clone()),
            title: Some(title),
            content: Some(content),
            category: Some(category),
            media_id: draft.media_id,
            tags,
        };

        self.run(
            MutationKind::CreatePost,
            &id,
            Action::PostAdded(view),
            self.api.create_post(&body),
            |canonical: &PostView| Action::PostConfirmed {
                temp_id: id.clone(),
                post: canonical.clone(),
            },
            Action::PostRemoved { id: id.clone() },
        )
        .await
    }

    pub async fn add_comment(
        &self,
        post_id: &str,
        content: &str,
    ) -> Result<CommentNode, MutationError> {
        self.comment(post_id, None, content).await
    }

    pub async fn add_reply(
        &self,
        post_id: &str,
        parent_id: &str,
        content: &str,
    ) -> Result<CommentNode, MutationError> {
        self.comment(post_id, Some(parent_id), content).await
    }

    async fn comment(
        &self,
        post_id: &str,
        parent_id: Option<&str>,
        content: &str,
    ) -> Result<CommentNode, MutationError> {
        let content = required("content", Some(content))?;
        let id = temp_id();
        let comment = Comment {
            id: id.clone(),
            post_id: post_id.to_string(),
            parent_id: parent_id.map(str::to_string),
            author_id: self.user.id.clone(),
            content: content.clone(),
            liked_by: LikeSet::new(),
            created_at: Utc::now(),
        };
        let body = NewComment {
            id: Some(id.clone()),
            user_id: Some(self.user.id.clone()),
            content: Some(content),
        };

        let (kind, request) = match parent_id {
            Some(parent) => (
                MutationKind::AddReply,
                self.api.add_reply(post_id, parent, &body),
            ),
            None => (MutationKind::AddComment, self.api.add_comment(post_id, &body)),
        };

        self.run(
            kind,
            &id,
            Action::CommentAdded(comment),
            request,
            |node: &CommentNode| Action::CommentConfirmed {
                temp_id: id.clone(),
                comment: node.comment.clone(),
            },
            Action::CommentRemoved {
                post_id: post_id.to_string(),
                id: id.clone(),
            },
        )
        .await
    }

    /// Rollback toggles again.
    pub async fn toggle_post_like(&self, post_id: &str) -> Result<LikeToggle, MutationError> {
        let toggle = Action::PostLikeToggled {
            post_id: post_id.to_string(),
            user_id: self.user.id.clone(),
        };
        self.run(
            MutationKind::TogglePostLike,
            post_id,
            toggle.clone(),
            self.api.toggle_post_like(post_id, &self.user.id),
            |canonical: &LikeToggle| Action::PostLikesSet {
                post_id: post_id.to_string(),
                liked_by: canonical.liked_by.clone(),
            },
            toggle,
        )
        .await
    }

    pub async fn toggle_comment_like(
        &self,
        post_id: &str,
        comment_id: &str,
    ) -> Result<LikeToggle, MutationError> {
        let toggle = Action::CommentLikeToggled {
            post_id: post_id.to_string(),
            comment_id: comment_id.to_string(),
            user_id: self.user.id.clone(),
        };
        self.run(
            MutationKind::ToggleCommentLike,
            comment_id,
            toggle.clone(),
            self.api
                .toggle_comment_like(post_id, comment_id, &self.user.id),
            |canonical: &LikeToggle| Action::CommentLikesSet {
                post_id: post_id.to_string(),
                comment_id: comment_id.to_string(),
                liked_by: canonical.liked_by.clone(),
            },
            toggle,
        )
        .await
    }

    /// An entry the user already has is not touched locally.
    pub async fn add_list_entry(&self, draft: NewListEntry) -> Result<ListEntry, MutationError> {
        let media_id = required("media_id", draft.media_id.as_deref())?;
        check_rating(draft.rating)?;

        let user_id = self.user.id.clone();
        let exists = self
            .store
            .read(|s| s.list_entry(&user_id, &media_id).is_some());

        let id = temp_id();
        let now = Utc::now();
        let entry = ListEntry {
            id: id.clone(),
            user_id: user_id.clone(),
            media_id: media_id.clone(),
            status: draft.status.unwrap_or_default(),
            rating: draft.rating,
            progress: draft.progress.unwrap_or(0),
            is_public: draft.is_public.unwrap_or(true),
            notes: draft.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        let body = NewListEntry {
            id: Some(id.clone()),
            media_id: Some(media_id.clone()),
            ..draft
        };

        let (optimistic, rollback) = if exists {
            (Action::none(), Action::none())
        } else {
            (
                Action::ListEntryAdded(entry),
                Action::ListEntryRemoved {
                    user_id: user_id.clone(),
                    media_id: media_id.clone(),
                },
            )
        };

        self.run(
            MutationKind::AddListEntry,
            &id,
            optimistic,
            self.api.add_list_entry(&user_id, &body),
            |canonical: &ListEntry| Action::ListEntrySet(canonical.clone()),
            rollback,
        )
        .await
    }

    pub async fn update_list_entry(
        &self,
        media_id: &str,
        update: ListEntryUpdate,
    ) -> Result<ListEntry, MutationError> {
        if update.is_empty() {
            return Err(MutationError::Validation("nothing to update".into()));
        }
        check_rating(update.rating)?;

        let user_id = self.user.id.as_str();
        let prior = self
            .store
            .read(|s| s.list_entry(user_id, media_id).cloned());
        let (optimistic, rollback) = match &prior {
            Some(entry) => (
                Action::ListEntrySet(entry.updated(&update, Utc::now())),
                Action::ListEntrySet(entry.clone()),
            ),
            None => (Action::none(), Action::none()),
        };
        let entity_id = prior.as_ref().map_or(media_id, |e| e.id.as_str());

        self.run(
            MutationKind::UpdateListEntry,
            entity_id,
            optimistic,
            self.api.update_list_entry(user_id, media_id, &update),
            |canonical: &ListEntry| Action::ListEntrySet(canonical.clone()),
            rollback,
        )
        .await
    }

    /// Rolling back puts the entry back where it was in the list.
    pub async fn remove_list_entry(&self, media_id: &str) -> Result<(), MutationError> {
        let user_id = self.user.id.as_str();
        let prior = self.store.read(|s| {
            s.list_entry_with_position(user_id, media_id)
                .map(|(position, entry)| (position, entry.clone()))
        });
        let rollback = match &prior {
            Some((position, entry)) => Action::ListEntryRestored {
                entry: entry.clone(),
                position: *position,
            },
            None => Action::none(),
        };
        let entity_id = prior.as_ref().map_or(media_id, |(_, e)| e.id.as_str());

        self.run(
            MutationKind::RemoveListEntry,
            entity_id,
            Action::ListEntryRemoved {
                user_id: user_id.to_string(),
                media_id: media_id.to_string(),
            },
            self.api.remove_list_entry(user_id, media_id),
            |_: &()| Action::none(),
            rollback,
        )
        .await
    }

    /// Records the user's rating, estimates the new media rating locally and
    /// mirrors the value into the user's list entry when there is one.
    pub async fn rate_media(
        &self,
        media_id: &str,
        value: i64,
    ) -> Result<RatingSummary, MutationError> {
        check_rating(Some(value))?;
        let user_id = self.user.id.as_str();

        let (stored, media_summary, entry) = self.store.read(|s| {
            let summary = s.media_item(media_id).map(|m| RatingSummary {
                rating: m.rating,
                rating_count: m.rating_count,
            });
            (
                s.user_rating(user_id, media_id),
                summary,
                s.list_entry(user_id, media_id).cloned(),
            )
        });
        // The list entry mirrors the server-side rating when none was loaded.
        let previous = stored.or_else(|| entry.as_ref().and_then(|e| e.rating));

        let rating_set = |value: Option<i64>| Action::RatingSet {
            user_id: user_id.to_string(),
            media_id: media_id.to_string(),
            value,
        };
        let media_set = |summary: RatingSummary| Action::MediaRatingSet {
            media_id: media_id.to_string(),
            summary,
        };

        let mut optimistic = vec![rating_set(Some(value))];
        let mut rollback = vec![rating_set(stored)];
        if let Some(current) = media_summary {
            optimistic.push(media_set(estimate_after_upsert(current, previous, value)));
            rollback.push(media_set(current));
        }
        if let Some(entry) = entry {
            optimistic.push(Action::ListEntrySet(ListEntry {
                rating: Some(value),
                ..entry.clone()
            }));
            rollback.push(Action::ListEntrySet(entry));
        }

        self.run(
            MutationKind::RateMedia,
            media_id,
            Action::Batch(optimistic),
            self.api.rate_media(media_id, user_id, value),
            |summary: &RatingSummary| media_set(*summary),
            Action::Batch(rollback),
        )
        .await
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile, MutationError> {
        if update == ProfileUpdate::default() {
            return Err(MutationError::Validation("nothing to update".into()));
        }
        if let Some(username) = &update.username {
            required("username", Some(username.as_str()))?;
        }

        let user_id = self.user.id.as_str();
        let prior = self.store.read(|s| s.profile(user_id).cloned());
        let next = prior
            .clone()
            .unwrap_or_else(|| Profile::empty(user_id))
            .merged(&update);
        let profile_set = |profile: Option<Profile>| Action::ProfileSet {
            user_id: user_id.to_string(),
            profile,
        };

        self.run(
            MutationKind::UpdateProfile,
            user_id,
            profile_set(Some(next)),
            self.api.update_profile(user_id, &update),
            |canonical: &Profile| profile_set(Some(canonical.clone())),
            profile_set(prior),
        )
        .await
    }

    pub async fn add_media_item(&self, draft: NewMedia) -> Result<MediaItem, MutationError> {
        let title = required("title", draft.title.as_deref())?;
        let description = required("description", draft.description.as_deref())?;
        let media_type = draft
            .media_type
            .ok_or_else(|| MutationError::Validation("type is required".into()))?;
        let status: MediaStatus = draft
            .status
            .ok_or_else(|| MutationError::Validation("status is required".into()))?;

        let id = temp_id();
        let item = MediaItem {
            id: id.clone(),
            title: title.clone(),
            media_type,
            description: description.clone(),
            image_url: draft.image_url.clone(),
            release_date: draft.release_date.clone(),
            rating: 0.0,
            rating_count: 0,
            genre: draft.genre.clone(),
            status,
            episodes: draft.episodes,
            chapters: draft.chapters,
            cast: draft.cast.clone(),
            created_at: Utc::now(),
        };
        let body = NewMedia {
            id: Some(id.clone()),
            title: Some(title),
            description: Some(description),
            ..draft
        };

        self.run(
            MutationKind::AddMedia,
            &id,
            Action::MediaAdded(item),
            self.api.create_media(&body),
            |canonical: &MediaItem| Action::MediaConfirmed {
                temp_id: id.clone(),
                media: canonical.clone(),
            },
            Action::MediaRemoved { id: id.clone() },
        )
        .await
    }

    /// Read-only; nothing is kept in the client state.
    pub async fn public_profile(&self, slug: &str) -> Result<PublicProfile, MutationError> {
        Ok(self.api.public_profile(slug).await?)
    }
}
