use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use media_forum::client::{
    Action, ApiError, ApiResult, Collaborator, CurrentUser, MutationKind, MutationStatus,
    OptimisticClient,
};
use media_forum::forum::{
    Author, Category, Comment, CommentNode, ForumPost, LikeSet, LikeToggle, NewComment, NewPost,
    PostView,
};
use media_forum::lists::{ListEntry, ListEntryUpdate, ListStatus, NewListEntry};
use media_forum::media::{MediaItem, MediaStatus, MediaType, NewMedia, RatingSummary};
use media_forum::profiles::{Profile, ProfileUpdate, PublicProfile};

fn ts(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap()
}

fn media(id: &str) -> MediaItem {
    MediaItem {
        id: id.into(),
        title: format!("Title {id}"),
        media_type: MediaType::Anime,
        description: "desc".into(),
        image_url: String::new(),
        release_date: None,
        rating: 4.0,
        rating_count: 3,
        genre: vec![],
        status: MediaStatus::Ongoing,
        episodes: None,
        chapters: None,
        cast: None,
        created_at: ts("2024-01-01T00:00:00Z"),
    }
}

fn stored_comment(id: &str, post_id: &str) -> Comment {
    Comment {
        id: id.into(),
        post_id: post_id.into(),
        parent_id: None,
        author_id: "u2".into(),
        content: "first".into(),
        liked_by: LikeSet::new(),
        created_at: ts("2024-01-02T00:00:00Z"),
    }
}

fn post(id: &str, comments: Vec<CommentNode>) -> PostView {
    PostView {
        post: ForumPost {
            id: id.into(),
            author_id: "author".into(),
            title: "t".into(),
            content: "c".into(),
            category: Category::General,
            tags: vec![],
            liked_by: ["u2"].into_iter().collect(),
            media_ref: None,
            created_at: ts("2024-01-01T00:00:00Z"),
            updated_at: ts("2024-01-01T00:00:00Z"),
        },
        author: Author::Placeholder {
            user_id: "author".into(),
            label: "user-author".into(),
        },
        media: None,
        likes_count: 1,
        comment_count: comments.len(),
        comments,
    }
}

fn entry(media_id: &str) -> ListEntry {
    ListEntry {
        id: format!("entry-{media_id}"),
        user_id: "me".into(),
        media_id: media_id.into(),
        status: ListStatus::Watching,
        rating: None,
        progress: 1,
        is_public: true,
        notes: None,
        created_at: ts("2024-01-01T00:00:00Z"),
        updated_at: ts("2024-01-01T00:00:00Z"),
    }
}

struct Gate {
    entered: Notify,
    release: Notify,
}

/// In-memory collaborator. Operations listed in `failing` (as `op` or
/// `op:entity`) answer with an error instead.
struct FakeApi {
    failing: HashSet<String>,
    gate: Option<Arc<Gate>>,
    entries: Mutex<Vec<ListEntry>>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            failing: HashSet::new(),
            gate: None,
            entries: Mutex::new(vec![entry("m1"), entry("m2"), entry("m3")]),
        }
    }

    fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn check(&self, op: &str, entity: &str) -> ApiResult<()> {
        if self.failing.contains(op) || self.failing.contains(&format!("{op}:{entity}")) {
            return Err(ApiError::NotFound(format!("{op} {entity}")));
        }
        Ok(())
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }

    fn saved_comment(&self, post_id: &str, parent: Option<&str>, body: &NewComment) -> CommentNode {
        CommentNode::leaf(Comment {
            id: body.id.clone().unwrap(),
            post_id: post_id.into(),
            parent_id: parent.map(Into::into),
            author_id: body.user_id.clone().unwrap(),
            content: format!("{} (saved)", body.content.clone().unwrap()),
            liked_by: LikeSet::new(),
            created_at: Utc::now(),
        })
    }
}

#[async_trait]
impl Collaborator for FakeApi {
    async fn list_media(&self) -> ApiResult<Vec<MediaItem>> {
        Ok(vec![media("m1"), media("m2"), media("m3")])
    }

    async fn create_media(&self, item: &NewMedia) -> ApiResult<MediaItem> {
        self.check("create_media", "")?;
        let mut saved = media(item.id.as_deref().unwrap());
        saved.title = item.title.clone().unwrap();
        Ok(saved)
    }

    async fn rate_media(&self, media_id: &str, _: &str, _: i64) -> ApiResult<RatingSummary> {
        self.check("rate_media", media_id)?;
        Ok(RatingSummary {
            rating: 4.3,
            rating_count: 4,
        })
    }

    async fn list_posts(&self) -> ApiResult<Vec<PostView>> {
        Ok(vec![
            post("p1", vec![CommentNode::leaf(stored_comment("c1", "p1"))]),
            post("p2", vec![]),
        ])
    }

    async fn create_post(&self, body: &NewPost) -> ApiResult<PostView> {
        self.check("create_post", "")?;
        let mut saved = post(body.id.as_deref().unwrap(), vec![]);
        let author_id = body.user_id.clone().unwrap();
        saved.author = Author::Placeholder {
            label: format!("user-{author_id}"),
            user_id: author_id.clone(),
        };
        saved.post.author_id = author_id;
        saved.post.title = body.title.clone().unwrap();
        saved.post.liked_by = LikeSet::new();
        saved.likes_count = 0;
        Ok(saved)
    }

    async fn add_comment(&self, post_id: &str, body: &NewComment) -> ApiResult<CommentNode> {
        self.pass_gate().await;
        self.check("add_comment", post_id)?;
        Ok(self.saved_comment(post_id, None, body))
    }

    async fn add_reply(
        &self,
        post_id: &str,
        parent_id: &str,
        body: &NewComment,
    ) -> ApiResult<CommentNode> {
        self.check("add_reply", parent_id)?;
        Ok(self.saved_comment(post_id, Some(parent_id), body))
    }

    async fn toggle_post_like(&self, post_id: &str, user_id: &str) -> ApiResult<LikeToggle> {
        self.check("toggle_post_like", post_id)?;
        let set: LikeSet = ["u2", user_id].into_iter().collect();
        Ok(LikeToggle::new(set, user_id))
    }

    async fn toggle_comment_like(
        &self,
        _: &str,
        comment_id: &str,
        user_id: &str,
    ) -> ApiResult<LikeToggle> {
        self.check("toggle_comment_like", comment_id)?;
        Ok(LikeToggle::new([user_id].into_iter().collect(), user_id))
    }

    async fn list_entries(&self, _: &str) -> ApiResult<Vec<ListEntry>> {
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn add_list_entry(&self, user_id: &str, body: &NewListEntry) -> ApiResult<ListEntry> {
        self.check("add_list_entry", "")?;
        let media_id = body.media_id.clone().unwrap();
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| e.media_id == media_id) {
            return Err(ApiError::Conflict("Media is already in the list".into()));
        }
        let saved = ListEntry {
            id: body.id.clone().unwrap(),
            user_id: user_id.into(),
            status: body.status.unwrap_or_default(),
            ..entry(&media_id)
        };
        entries.push(saved.clone());
        Ok(saved)
    }

    async fn update_list_entry(
        &self,
        _: &str,
        media_id: &str,
        update: &ListEntryUpdate,
    ) -> ApiResult<ListEntry> {
        self.check("update_list_entry", media_id)?;
        Ok(entry(media_id).updated(update, Utc::now()))
    }

    async fn remove_list_entry(&self, _: &str, media_id: &str) -> ApiResult<()> {
        self.check("remove_list_entry", media_id)
    }

    async fn get_profile(&self, _: &str) -> ApiResult<Option<Profile>> {
        Ok(None)
    }

    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> ApiResult<Profile> {
        self.check("update_profile", user_id)?;
        let mut saved = Profile::empty(user_id).merged(update);
        saved.share_slug = Some("slug-abcd".into());
        Ok(saved)
    }

    async fn public_profile(&self, slug: &str) -> ApiResult<PublicProfile> {
        Err(ApiError::NotFound(slug.into()))
    }
}

async fn client(api: FakeApi) -> OptimisticClient<FakeApi> {
    let client = OptimisticClient::new(api, CurrentUser::new("me").with_username("Me"));
    client.hydrate().await.unwrap();
    client.hydrate_user().await.unwrap();
    client
}

fn statuses(client: &OptimisticClient<FakeApi>) -> Vec<(MutationKind, MutationStatus)> {
    client
        .store()
        .mutations()
        .into_iter()
        .map(|(_, r)| (r.kind, r.status))
        .collect()
}

#[tokio::test]
async fn hydrate_loads_catalog_forum_and_list() {
    let client = client(FakeApi::new()).await;
    let state = client.state();
    assert_eq!(state.media().count(), 3);
    assert_eq!(state.posts().count(), 2);
    assert_eq!(state.comment_count("p1"), 1);
    assert_eq!(state.user_list("me").len(), 3);
}

#[tokio::test]
async fn confirmed_reply_is_reconciled_in_place() {
    let client = client(FakeApi::new()).await;
    let first = client.add_reply("p1", "c1", "one").await.unwrap();
    let second = client.add_reply("p1", "c1", "two").await.unwrap();

    let view = client.state().post_view("p1").unwrap();
    let replies = &view.comments[0].replies;
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].comment.id, first.comment.id);
    assert_eq!(replies[0].comment.content, "one (saved)");
    assert_eq!(replies[1].comment.id, second.comment.id);
    assert_eq!(view.comment_count, 3);
    assert!(
        statuses(&client)
            .iter()
            .all(|(_, s)| *s == MutationStatus::Confirmed)
    );
}

#[tokio::test]
async fn rejected_comment_is_rolled_back() {
    let client = client(FakeApi::new().failing("add_comment:p1")).await;

    let err = client.add_comment("p1", "doomed").await.unwrap_err();
    assert!(err.is_not_found());

    let state = client.state();
    assert_eq!(state.comment_count("p1"), 1);
    assert_eq!(
        state.post("p1").unwrap().post.updated_at,
        ts("2024-01-01T00:00:00Z")
    );
    let view = state.post_view("p1").unwrap();
    assert!(view.comments.iter().all(|c| c.comment.content != "doomed"));
    assert!(matches!(
        statuses(&client)[0],
        (MutationKind::AddComment, MutationStatus::RolledBack { .. })
    ));
}

#[tokio::test]
async fn concurrent_mutations_settle_independently() {
    let client = client(FakeApi::new().failing("add_comment:p2")).await;

    let (ok, failed) = tokio::join!(
        client.add_comment("p1", "kept"),
        client.add_comment("p2", "dropped")
    );
    assert!(ok.is_ok());
    assert!(failed.is_err());

    let state = client.state();
    assert_eq!(state.comment_count("p1"), 2);
    assert_eq!(state.comment_count("p2"), 0);
    assert_eq!(client.store().pending_mutations(), 0);

    let outcome = statuses(&client);
    assert_eq!(outcome.len(), 2);
    assert!(outcome.iter().any(|(_, s)| *s == MutationStatus::Confirmed));
    assert!(outcome.iter().any(|(_, s)| matches!(s, MutationStatus::RolledBack { .. })));
}

#[tokio::test]
async fn optimistic_comment_is_visible_while_pending() {
    let gate = Arc::new(Gate {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let client = Arc::new(client(FakeApi::new().gated(gate.clone())).await);

    let task = {
        let client = client.clone();
        tokio::spawn(async move { client.add_comment("p1", "hello").await })
    };

    gate.entered.notified().await;
    let pending = client.state().post_view("p1").unwrap();
    assert_eq!(pending.comment_count, 2);
    assert_eq!(pending.comments[0].comment.content, "hello");
    assert_eq!(client.store().pending_mutations(), 1);

    gate.release.notify_one();
    let saved = task.await.unwrap().unwrap();

    let confirmed = client.state().post_view("p1").unwrap();
    assert_eq!(confirmed.comment_count, 2);
    assert_eq!(confirmed.comments[0].comment.id, saved.comment.id);
    assert_eq!(confirmed.comments[0].comment.content, "hello (saved)");
    assert_eq!(client.store().pending_mutations(), 0);
}

#[tokio::test]
async fn validation_errors_touch_nothing() {
    let client = client(FakeApi::new()).await;
    let err = client.add_comment("p1", "   ").await.unwrap_err();
    assert!(matches!(err, media_forum::client::MutationError::Validation(_)));
    assert!(client.rate_media("m1", 9).await.is_err());
    assert!(client.create_post(NewPost::default()).await.is_err());

    assert_eq!(client.state().comment_count("p1"), 1);
    assert!(client.store().mutations().is_empty());
}

#[tokio::test]
async fn duplicate_list_entry_reports_conflict_and_keeps_one() {
    let client = client(FakeApi::new()).await;
    let draft = || NewListEntry {
        media_id: Some("m9".into()),
        ..NewListEntry::default()
    };

    let first = client.add_list_entry(draft()).await.unwrap();
    let err = client.add_list_entry(draft()).await.unwrap_err();
    assert!(err.is_conflict());

    let state = client.state();
    assert_eq!(state.list_entry("me", "m9").unwrap().id, first.id);
    assert!(matches!(
        statuses(&client).last(),
        Some((MutationKind::AddListEntry, MutationStatus::RolledBack { .. }))
    ));
}

#[tokio::test]
async fn failed_removal_restores_the_entry_where_it_was() {
    let client = client(FakeApi::new().failing("remove_list_entry:m2")).await;
    assert!(client.remove_list_entry("m2").await.is_err());

    let state = client.state();
    let order: Vec<_> = state
        .user_list("me")
        .into_iter()
        .map(|(e, _)| e.media_id.clone())
        .collect();
    assert_eq!(order, vec!["m1", "m2", "m3"]);

    client.remove_list_entry("m3").await.unwrap();
    assert!(client.state().list_entry("me", "m3").is_none());
}

#[tokio::test]
async fn failed_update_restores_prior_entry() {
    let client = client(FakeApi::new().failing("update_list_entry:m1")).await;
    let update = ListEntryUpdate {
        progress: Some(12),
        ..ListEntryUpdate::default()
    };
    assert!(client.update_list_entry("m1", update).await.is_err());
    assert_eq!(client.state().list_entry("me", "m1").unwrap().progress, 1);
}

#[tokio::test]
async fn like_toggle_rolls_back_to_prior_set() {
    let client = client(FakeApi::new().failing("toggle_post_like")).await;
    assert!(client.toggle_post_like("p1").await.is_err());
    assert_eq!(client.state().post_view("p1").unwrap().likes_count, 1);
}

#[tokio::test]
async fn like_toggle_takes_the_canonical_set() {
    let client = client(FakeApi::new()).await;
    let toggle = client.toggle_post_like("p1").await.unwrap();
    assert!(toggle.liked);
    let view = client.state().post_view("p1").unwrap();
    assert_eq!(view.post.liked_by, toggle.liked_by);
    assert_eq!(view.likes_count, 2);

    client.toggle_comment_like("p1", "c1").await.unwrap();
    assert_eq!(client.state().post_view("p1").unwrap().comments[0].likes_count, 1);
}

#[tokio::test]
async fn rating_mirrors_into_list_and_takes_canonical_summary() {
    let client = client(FakeApi::new()).await;
    let summary = client.rate_media("m1", 5).await.unwrap();

    let state = client.state();
    assert_eq!(state.user_rating("me", "m1"), Some(5));
    assert_eq!(state.list_entry("me", "m1").unwrap().rating, Some(5));
    let item = state.media_item("m1").unwrap();
    assert_eq!((item.rating, item.rating_count), (summary.rating, summary.rating_count));
}

#[tokio::test]
async fn failed_rating_restores_everything_it_touched() {
    let client = client(FakeApi::new().failing("rate_media:m1")).await;
    assert!(client.rate_media("m1", 5).await.is_err());

    let state = client.state();
    assert_eq!(state.user_rating("me", "m1"), None);
    assert_eq!(state.list_entry("me", "m1").unwrap().rating, None);
    let item = state.media_item("m1").unwrap();
    assert_eq!((item.rating, item.rating_count), (4.0, 3));
}

#[tokio::test]
async fn failed_rating_keeps_list_rating_and_unset_user_rating_apart() {
    let client = client(FakeApi::new().failing("rate_media:m1")).await;
    client.store().dispatch(Action::ListEntrySet(ListEntry {
        rating: Some(3),
        ..entry("m1")
    }));

    assert!(client.rate_media("m1", 5).await.is_err());

    let state = client.state();
    assert_eq!(state.user_rating("me", "m1"), None);
    assert_eq!(state.list_entry("me", "m1").unwrap().rating, Some(3));
    let item = state.media_item("m1").unwrap();
    assert_eq!((item.rating, item.rating_count), (4.0, 3));
}

#[tokio::test]
async fn created_post_stays_first_after_confirmation() {
    let client = client(FakeApi::new()).await;
    let draft = NewPost {
        title: Some("Hot take".into()),
        content: Some("Body".into()),
        category: Some(Category::Anime),
        ..NewPost::default()
    };
    let saved = client.create_post(draft).await.unwrap();

    let state = client.state();
    let first = state.posts().next().unwrap();
    assert_eq!(first.post.id, saved.post.id);
    assert_eq!(state.posts().count(), 3);
    assert_eq!(
        state.post_view(&saved.post.id).unwrap().author.display_name(),
        "user-me"
    );
}

#[tokio::test]
async fn failed_post_and_media_creation_leave_no_trace() {
    let api = FakeApi::new().failing("create_post").failing("create_media");
    let client = client(api).await;

    let draft = NewPost {
        title: Some("Hot take".into()),
        content: Some("Body".into()),
        category: Some(Category::General),
        ..NewPost::default()
    };
    assert!(client.create_post(draft).await.is_err());

    let item = NewMedia {
        title: Some("New".into()),
        media_type: Some(MediaType::Movie),
        description: Some("d".into()),
        status: Some(MediaStatus::Upcoming),
        ..NewMedia::default()
    };
    assert!(client.add_media_item(item).await.is_err());

    let state = client.state();
    assert_eq!(state.posts().count(), 2);
    assert_eq!(state.media().count(), 3);
}

#[tokio::test]
async fn profile_update_renames_the_author_everywhere() {
    let client = client(FakeApi::new()).await;
    let draft = NewPost {
        title: Some("Mine".into()),
        content: Some("Body".into()),
        category: Some(Category::General),
        ..NewPost::default()
    };
    let saved = client.create_post(draft).await.unwrap();

    let profile = client
        .update_profile(ProfileUpdate {
            username: Some("Renamed".into()),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();
    assert_eq!(profile.share_slug.as_deref(), Some("slug-abcd"));

    let state = client.state();
    assert_eq!(state.profile("me").unwrap().username.as_deref(), Some("Renamed"));
    let author = state.post_view(&saved.post.id).unwrap().author;
    assert_eq!(author.display_name(), "Renamed");
    assert_eq!(state.post_view("p1").unwrap().author.display_name(), "user-author");
}
