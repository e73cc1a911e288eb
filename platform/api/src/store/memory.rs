use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ContentStats, Store, StoreError, StoreResult};
use crate::database::{
	non_empty, Bookmark, Comment, Follow, FollowCounts, FollowDirection, Like, LikeState, NewComment, NewSubscription,
	NewTextPost, NewTier, NewTip, NewUser, NewVideo, SubscriptionStatus, SubscriptionTier, Target, TargetCounters,
	TextPost, TextPostFilter, TextPostPatch, TierPatch, Tip, TipFilter, TipTotals, User, UserPatch, UserStats,
	UserSubscription, Video, VideoAssetUpdate, VideoFilter, VideoLookup, VideoPatch, VideoStatus,
};
use crate::feed::{engagement_score, FeedFetch, FeedOrder};

/// A store that keeps every table in process memory. Used for local
/// development and the test suite, it follows the same rules as the
/// PostgreSQL schema, cascades included.
#[derive(Default)]
pub struct MemoryStore {
	tables: RwLock<Tables>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[derive(Default)]
struct Tables {
	users: HashMap<Uuid, User>,
	videos: HashMap<Uuid, Video>,
	text_posts: HashMap<Uuid, TextPost>,
	comments: HashMap<Uuid, Comment>,
	likes: HashMap<Uuid, Like>,
	bookmarks: HashMap<Uuid, Bookmark>,
	follows: HashMap<Uuid, Follow>,
	tiers: HashMap<Uuid, SubscriptionTier>,
	subscriptions: HashMap<Uuid, UserSubscription>,
	tips: HashMap<Uuid, Tip>,
}

#[derive(Clone, Copy)]
enum Counter {
	Likes,
	Comments,
	Views,
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, Uuid)) {
	items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn take<T>(items: Vec<T>, limit: i64) -> Vec<T> {
	items.into_iter().take(limit.max(0) as usize).collect()
}

fn target_of(video_id: Option<Uuid>, text_post_id: Option<Uuid>) -> Option<Target> {
	Target::from_ids(video_id, text_post_id)
}

impl Tables {
	fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
		self.users
			.values()
			.any(|u| Some(u.id) != except && u.username.eq_ignore_ascii_case(username))
	}

	fn target_exists(&self, target: Target) -> bool {
		match target {
			Target::Video(id) => self.videos.contains_key(&id),
			Target::TextPost(id) => self.text_posts.contains_key(&id),
		}
	}

	fn counters(&self, target: Target) -> Option<TargetCounters> {
		match target {
			Target::Video(id) => self.videos.get(&id).map(|v| TargetCounters {
				user_id: v.user_id,
				likes_count: v.likes_count,
				comments_count: v.comments_count,
				views_count: v.views_count,
			}),
			Target::TextPost(id) => self.text_posts.get(&id).map(|p| TargetCounters {
				user_id: p.user_id,
				likes_count: p.likes_count,
				comments_count: p.comments_count,
				views_count: p.views_count,
			}),
		}
	}

	fn bump(&mut self, target: Target, counter: Counter, delta: i64) -> Option<i64> {
		let (likes, comments, views) = match target {
			Target::Video(id) => {
				let v = self.videos.get_mut(&id)?;
				(&mut v.likes_count, &mut v.comments_count, &mut v.views_count)
			}
			Target::TextPost(id) => {
				let p = self.text_posts.get_mut(&id)?;
				(&mut p.likes_count, &mut p.comments_count, &mut p.views_count)
			}
		};

		let slot = match counter {
			Counter::Likes => likes,
			Counter::Comments => comments,
			Counter::Views => views,
		};

		*slot = (*slot + delta).max(0);
		Some(*slot)
	}

	/// Removes the matching comments and every reply below them.
	fn remove_comments(&mut self, matches: impl Fn(&Comment) -> bool) -> Vec<Comment> {
		let mut doomed = self
			.comments
			.values()
			.filter(|c| matches(c))
			.map(|c| c.id)
			.collect::<HashSet<_>>();

		loop {
			let replies = self
				.comments
				.values()
				.filter(|c| !doomed.contains(&c.id) && c.parent_id.is_some_and(|p| doomed.contains(&p)))
				.map(|c| c.id)
				.collect::<Vec<_>>();

			if replies.is_empty() {
				break;
			}

			doomed.extend(replies);
		}

		doomed.into_iter().filter_map(|id| self.comments.remove(&id)).collect()
	}

	fn remove_target(&mut self, target: Target) {
		let is_target = |video_id: Option<Uuid>, text_post_id: Option<Uuid>| target_of(video_id, text_post_id) == Some(target);

		self.remove_comments(|c| is_target(c.video_id, c.text_post_id));
		self.likes.retain(|_, l| !is_target(l.video_id, l.text_post_id));
		self.bookmarks.retain(|_, b| !is_target(b.video_id, b.text_post_id));

		if let Target::Video(id) = target {
			self.tips
				.values_mut()
				.filter(|t| t.video_id == Some(id))
				.for_each(|t| t.video_id = None);
		}
	}

	fn remove_tier(&mut self, id: Uuid) -> bool {
		if self.tiers.remove(&id).is_none() {
			return false;
		}

		self.subscriptions.retain(|_, s| s.tier_id != id);
		true
	}
}

#[async_trait::async_trait]
impl Store for MemoryStore {
	async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
		Ok(self.tables.read().await.users.get(&id).cloned())
	}

	async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
		Ok(self
			.tables
			.read()
			.await
			.users
			.values()
			.find(|u| u.username.eq_ignore_ascii_case(username))
			.cloned())
	}

	async fn get_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
		let tables = self.tables.read().await;
		Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
	}

	async fn search_users(&self, search: Option<&str>, limit: i64) -> StoreResult<Vec<User>> {
		let search = search.map(str::to_lowercase);

		let mut users = self
			.tables
			.read()
			.await
			.users
			.values()
			.filter(|u| match &search {
				Some(search) => {
					u.username.to_lowercase().contains(search) || u.display_name.to_lowercase().contains(search)
				}
				None => true,
			})
			.cloned()
			.collect::<Vec<_>>();

		users.sort_by_key(|u| u.username.to_lowercase());
		Ok(take(users, limit))
	}

	async fn user_stats(&self, id: Uuid) -> StoreResult<UserStats> {
		let tables = self.tables.read().await;

		Ok(UserStats {
			followers_count: tables.follows.values().filter(|f| f.following_id == id).count() as i64,
			following_count: tables.follows.values().filter(|f| f.follower_id == id).count() as i64,
			videos_count: tables.videos.values().filter(|v| v.user_id == id).count() as i64,
			text_posts_count: tables.text_posts.values().filter(|p| p.user_id == id).count() as i64,
		})
	}

	async fn create_user(&self, user: NewUser) -> StoreResult<User> {
		let mut tables = self.tables.write().await;

		if tables.users.contains_key(&user.id) {
			return Err(StoreError::Conflict("User already exists"));
		}

		if tables.username_taken(&user.username, None) {
			return Err(StoreError::Conflict("Username already taken"));
		}

		let now = Utc::now();
		let user = User {
			id: user.id,
			username: user.username,
			display_name: user.display_name,
			email: user.email,
			avatar_url: user.avatar_url,
			bio: user.bio,
			is_creator: false,
			created_at: now,
			updated_at: now,
		};

		tables.users.insert(user.id, user.clone());
		Ok(user)
	}

	async fn update_user(&self, id: Uuid, patch: UserPatch) -> StoreResult<Option<User>> {
		let mut tables = self.tables.write().await;

		if let Some(username) = &patch.username {
			if tables.users.contains_key(&id) && tables.username_taken(username, Some(id)) {
				return Err(StoreError::Conflict("Username already taken"));
			}
		}

		let Some(user) = tables.users.get_mut(&id) else {
			return Ok(None);
		};

		if let Some(username) = patch.username {
			user.username = username;
		}

		if let Some(display_name) = patch.display_name {
			user.display_name = display_name;
		}

		if let Some(avatar_url) = patch.avatar_url {
			user.avatar_url = non_empty(avatar_url);
		}

		if let Some(bio) = patch.bio {
			user.bio = non_empty(bio);
		}

		user.updated_at = Utc::now();
		Ok(Some(user.clone()))
	}

	async fn set_creator(&self, id: Uuid, is_creator: bool) -> StoreResult<Option<User>> {
		let mut tables = self.tables.write().await;

		Ok(tables.users.get_mut(&id).map(|user| {
			user.is_creator = is_creator;
			user.updated_at = Utc::now();
			user.clone()
		}))
	}

	async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
		let mut tables = self.tables.write().await;

		if tables.users.remove(&id).is_none() {
			return Ok(false);
		}

		let videos = tables
			.videos
			.values()
			.filter(|v| v.user_id == id)
			.map(|v| v.id)
			.collect::<Vec<_>>();
		for video in videos {
			tables.videos.remove(&video);
			tables.remove_target(Target::Video(video));
		}

		let text_posts = tables
			.text_posts
			.values()
			.filter(|p| p.user_id == id)
			.map(|p| p.id)
			.collect::<Vec<_>>();
		for post in text_posts {
			tables.text_posts.remove(&post);
			tables.remove_target(Target::TextPost(post));
		}

		let tiers = tables
			.tiers
			.values()
			.filter(|t| t.creator_id == id)
			.map(|t| t.id)
			.collect::<Vec<_>>();
		for tier in tiers {
			tables.remove_tier(tier);
		}

		tables.remove_comments(|c| c.user_id == id);
		tables.likes.retain(|_, l| l.user_id != id);
		tables.bookmarks.retain(|_, b| b.user_id != id);
		tables.follows.retain(|_, f| f.follower_id != id && f.following_id != id);
		tables
			.subscriptions
			.retain(|_, s| s.subscriber_id != id && s.creator_id != id);
		tables.tips.retain(|_, t| t.sender_id != id && t.recipient_id != id);

		Ok(true)
	}

	async fn get_video(&self, id: Uuid) -> StoreResult<Option<Video>> {
		Ok(self.tables.read().await.videos.get(&id).cloned())
	}

	async fn get_videos(&self, ids: &[Uuid]) -> StoreResult<Vec<Video>> {
		let tables = self.tables.read().await;
		Ok(ids.iter().filter_map(|id| tables.videos.get(id).cloned()).collect())
	}

	async fn list_videos(&self, filter: VideoFilter) -> StoreResult<Vec<Video>> {
		let mut videos = self
			.tables
			.read()
			.await
			.videos
			.values()
			.filter(|v| filter.user_id.map_or(true, |id| v.user_id == id))
			.filter(|v| filter.category.as_ref().map_or(true, |c| v.category.as_ref() == Some(c)))
			.filter(|v| filter.status.map_or(true, |s| v.status == s))
			.cloned()
			.collect::<Vec<_>>();

		newest_first(&mut videos, |v| (v.created_at, v.id));
		Ok(take(videos, filter.limit))
	}

	async fn create_video(&self, video: NewVideo) -> StoreResult<Video> {
		let mut tables = self.tables.write().await;

		if !tables.users.contains_key(&video.user_id) {
			return Err(StoreError::NotFound("User"));
		}

		let now = Utc::now();
		let video = Video {
			id: Uuid::new_v4(),
			user_id: video.user_id,
			title: video.title,
			description: video.description,
			category: video.category,
			status: video.status,
			upload_id: None,
			asset_id: None,
			playback_id: None,
			playback_url: video.playback_url,
			thumbnail_url: video.thumbnail_url,
			duration_seconds: None,
			error_message: None,
			views_count: 0,
			likes_count: 0,
			comments_count: 0,
			created_at: now,
			updated_at: now,
		};

		tables.videos.insert(video.id, video.clone());
		Ok(video)
	}

	async fn update_video(&self, id: Uuid, patch: VideoPatch) -> StoreResult<Option<Video>> {
		let mut tables = self.tables.write().await;

		let Some(video) = tables.videos.get_mut(&id) else {
			return Ok(None);
		};

		if let Some(title) = patch.title {
			video.title = title;
		}

		if let Some(description) = patch.description {
			video.description = non_empty(description);
		}

		if let Some(category) = patch.category {
			video.category = non_empty(category);
		}

		if let Some(thumbnail_url) = patch.thumbnail_url {
			video.thumbnail_url = non_empty(thumbnail_url);
		}

		video.updated_at = Utc::now();
		Ok(Some(video.clone()))
	}

	async fn delete_video(&self, id: Uuid) -> StoreResult<bool> {
		let mut tables = self.tables.write().await;

		if tables.videos.remove(&id).is_none() {
			return Ok(false);
		}

		tables.remove_target(Target::Video(id));
		Ok(true)
	}

	async fn set_video_upload(&self, id: Uuid, upload_id: &str) -> StoreResult<Option<Video>> {
		let mut tables = self.tables.write().await;

		if tables
			.videos
			.values()
			.any(|v| v.id != id && v.upload_id.as_deref() == Some(upload_id))
		{
			return Err(StoreError::Conflict("Upload already belongs to another video"));
		}

		Ok(tables.videos.get_mut(&id).map(|video| {
			video.upload_id = Some(upload_id.to_owned());
			video.updated_at = Utc::now();
			video.clone()
		}))
	}

	async fn find_video(&self, lookup: VideoLookup) -> StoreResult<Option<Video>> {
		let tables = self.tables.read().await;

		Ok(match lookup {
			VideoLookup::Id(id) => tables.videos.get(&id).cloned(),
			VideoLookup::UploadId(upload_id) => tables
				.videos
				.values()
				.find(|v| v.upload_id.as_deref() == Some(upload_id.as_str()))
				.cloned(),
			VideoLookup::AssetId(asset_id) => tables
				.videos
				.values()
				.find(|v| v.asset_id.as_deref() == Some(asset_id.as_str()))
				.cloned(),
		})
	}

	async fn update_video_asset(&self, id: Uuid, update: VideoAssetUpdate) -> StoreResult<Option<Video>> {
		let mut tables = self.tables.write().await;

		if let Some(asset_id) = &update.asset_id {
			if tables
				.videos
				.values()
				.any(|v| v.id != id && v.asset_id.as_ref() == Some(asset_id))
			{
				return Err(StoreError::Conflict("Asset already belongs to another video"));
			}
		}

		let Some(video) = tables.videos.get_mut(&id) else {
			return Ok(None);
		};

		let (status, error_message) = update.outcome(video.status, video.error_message.as_deref());
		video.status = status;
		video.error_message = error_message;

		if update.asset_id.is_some() {
			video.asset_id = update.asset_id;
		}

		if update.playback_id.is_some() {
			video.playback_id = update.playback_id;
		}

		if update.playback_url.is_some() {
			video.playback_url = update.playback_url;
		}

		if video.thumbnail_url.is_none() {
			video.thumbnail_url = update.default_thumbnail_url;
		}

		if update.duration_seconds.is_some() {
			video.duration_seconds = update.duration_seconds;
		}

		video.updated_at = Utc::now();
		Ok(Some(video.clone()))
	}

	async fn get_text_post(&self, id: Uuid) -> StoreResult<Option<TextPost>> {
		Ok(self.tables.read().await.text_posts.get(&id).cloned())
	}

	async fn get_text_posts(&self, ids: &[Uuid]) -> StoreResult<Vec<TextPost>> {
		let tables = self.tables.read().await;
		Ok(ids.iter().filter_map(|id| tables.text_posts.get(id).cloned()).collect())
	}

	async fn list_text_posts(&self, filter: TextPostFilter) -> StoreResult<Vec<TextPost>> {
		let mut posts = self
			.tables
			.read()
			.await
			.text_posts
			.values()
			.filter(|p| filter.user_id.map_or(true, |id| p.user_id == id))
			.filter(|p| filter.category.as_ref().map_or(true, |c| p.category.as_ref() == Some(c)))
			.cloned()
			.collect::<Vec<_>>();

		newest_first(&mut posts, |p| (p.created_at, p.id));
		Ok(take(posts, filter.limit))
	}

	async fn create_text_post(&self, post: NewTextPost) -> StoreResult<TextPost> {
		let mut tables = self.tables.write().await;

		if !tables.users.contains_key(&post.user_id) {
			return Err(StoreError::NotFound("User"));
		}

		let now = Utc::now();
		let post = TextPost {
			id: Uuid::new_v4(),
			user_id: post.user_id,
			title: post.title,
			content: post.content,
			category: post.category,
			views_count: 0,
			likes_count: 0,
			comments_count: 0,
			created_at: now,
			updated_at: now,
		};

		tables.text_posts.insert(post.id, post.clone());
		Ok(post)
	}

	async fn update_text_post(&self, id: Uuid, patch: TextPostPatch) -> StoreResult<Option<TextPost>> {
		let mut tables = self.tables.write().await;

		let Some(post) = tables.text_posts.get_mut(&id) else {
			return Ok(None);
		};

		if let Some(title) = patch.title {
			post.title = non_empty(title);
		}

		if let Some(content) = patch.content {
			post.content = content;
		}

		if let Some(category) = patch.category {
			post.category = non_empty(category);
		}

		post.updated_at = Utc::now();
		Ok(Some(post.clone()))
	}

	async fn delete_text_post(&self, id: Uuid) -> StoreResult<bool> {
		let mut tables = self.tables.write().await;

		if tables.text_posts.remove(&id).is_none() {
			return Ok(false);
		}

		tables.remove_target(Target::TextPost(id));
		Ok(true)
	}

	async fn target_counters(&self, target: Target) -> StoreResult<Option<TargetCounters>> {
		Ok(self.tables.read().await.counters(target))
	}

	async fn record_view(&self, target: Target) -> StoreResult<Option<i64>> {
		Ok(self.tables.write().await.bump(target, Counter::Views, 1))
	}

	async fn content_stats(&self, user_id: Uuid) -> StoreResult<ContentStats> {
		let tables = self.tables.read().await;

		let mut stats = ContentStats::default();

		for video in tables.videos.values().filter(|v| v.user_id == user_id) {
			stats.videos += 1;
			stats.total_views += video.views_count;
			stats.total_likes += video.likes_count;
			stats.total_comments += video.comments_count;
		}

		for post in tables.text_posts.values().filter(|p| p.user_id == user_id) {
			stats.text_posts += 1;
			stats.total_views += post.views_count;
			stats.total_likes += post.likes_count;
			stats.total_comments += post.comments_count;
		}

		Ok(stats)
	}

	async fn feed_videos(&self, fetch: &FeedFetch) -> StoreResult<Vec<Video>> {
		let mut videos = self
			.tables
			.read()
			.await
			.videos
			.values()
			.filter(|v| v.status == VideoStatus::Ready)
			.filter(|v| fetch.matches(v.user_id, v.category.as_deref(), v.created_at))
			.cloned()
			.collect::<Vec<_>>();

		match fetch.order {
			FeedOrder::Recent => newest_first(&mut videos, |v| (v.created_at, v.id)),
			FeedOrder::Engagement => videos.sort_by_key(|v| {
				std::cmp::Reverse((
					engagement_score(v.views_count, v.likes_count, v.comments_count),
					v.created_at,
					v.id,
				))
			}),
		}

		Ok(take(videos, fetch.limit))
	}

	async fn feed_text_posts(&self, fetch: &FeedFetch) -> StoreResult<Vec<TextPost>> {
		let mut posts = self
			.tables
			.read()
			.await
			.text_posts
			.values()
			.filter(|p| fetch.matches(p.user_id, p.category.as_deref(), p.created_at))
			.cloned()
			.collect::<Vec<_>>();

		match fetch.order {
			FeedOrder::Recent => newest_first(&mut posts, |p| (p.created_at, p.id)),
			FeedOrder::Engagement => posts.sort_by_key(|p| {
				std::cmp::Reverse((
					engagement_score(p.views_count, p.likes_count, p.comments_count),
					p.created_at,
					p.id,
				))
			}),
		}

		Ok(take(posts, fetch.limit))
	}

	async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
		Ok(self.tables.read().await.comments.get(&id).cloned())
	}

	async fn list_comments(&self, target: Target) -> StoreResult<Vec<Comment>> {
		let mut comments = self
			.tables
			.read()
			.await
			.comments
			.values()
			.filter(|c| c.target() == Some(target))
			.cloned()
			.collect::<Vec<_>>();

		comments.sort_by_key(|c| (c.created_at, c.id));
		Ok(comments)
	}

	async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
		let mut tables = self.tables.write().await;

		if !tables.users.contains_key(&comment.user_id) {
			return Err(StoreError::NotFound("User"));
		}

		if !tables.target_exists(comment.target) {
			return Err(StoreError::NotFound(comment.target.noun()));
		}

		if let Some(parent_id) = comment.parent_id {
			if !tables.comments.contains_key(&parent_id) {
				return Err(StoreError::NotFound("Parent comment"));
			}
		}

		let now = Utc::now();
		let comment = Comment {
			id: Uuid::new_v4(),
			user_id: comment.user_id,
			video_id: comment.target.video_id(),
			text_post_id: comment.target.text_post_id(),
			parent_id: comment.parent_id,
			content: comment.content,
			created_at: now,
			updated_at: now,
		};

		tables.comments.insert(comment.id, comment.clone());
		if let Some(target) = comment.target() {
			tables.bump(target, Counter::Comments, 1);
		}

		Ok(comment)
	}

	async fn update_comment(&self, id: Uuid, content: String) -> StoreResult<Option<Comment>> {
		let mut tables = self.tables.write().await;

		Ok(tables.comments.get_mut(&id).map(|comment| {
			comment.content = content;
			comment.updated_at = Utc::now();
			comment.clone()
		}))
	}

	async fn delete_comment(&self, id: Uuid) -> StoreResult<Option<i64>> {
		let mut tables = self.tables.write().await;

		let Some(target) = tables.comments.get(&id).and_then(Comment::target) else {
			return Ok(None);
		};

		let removed = tables.remove_comments(|c| c.id == id).len() as i64;
		tables.bump(target, Counter::Comments, -removed);

		Ok(Some(removed))
	}

	async fn is_liked(&self, user_id: Uuid, target: Target) -> StoreResult<bool> {
		Ok(self
			.tables
			.read()
			.await
			.likes
			.values()
			.any(|l| l.user_id == user_id && l.target() == Some(target)))
	}

	async fn like(&self, user_id: Uuid, target: Target) -> StoreResult<LikeState> {
		let mut tables = self.tables.write().await;

		if !tables.users.contains_key(&user_id) {
			return Err(StoreError::NotFound("User"));
		}

		if !tables.target_exists(target) {
			return Err(StoreError::NotFound(target.noun()));
		}

		if tables
			.likes
			.values()
			.any(|l| l.user_id == user_id && l.target() == Some(target))
		{
			return Err(StoreError::Conflict("Already liked"));
		}

		let like = Like {
			id: Uuid::new_v4(),
			user_id,
			video_id: target.video_id(),
			text_post_id: target.text_post_id(),
			created_at: Utc::now(),
		};
		tables.likes.insert(like.id, like);

		let likes_count = tables.bump(target, Counter::Likes, 1).unwrap_or_default();
		Ok(LikeState { liked: true, likes_count })
	}

	async fn unlike(&self, user_id: Uuid, target: Target) -> StoreResult<Option<LikeState>> {
		let mut tables = self.tables.write().await;

		let Some(id) = tables
			.likes
			.values()
			.find(|l| l.user_id == user_id && l.target() == Some(target))
			.map(|l| l.id)
		else {
			return Ok(None);
		};

		tables.likes.remove(&id);

		let likes_count = tables.bump(target, Counter::Likes, -1).unwrap_or_default();
		Ok(Some(LikeState {
			liked: false,
			likes_count,
		}))
	}

	async fn list_likes(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Like>> {
		let mut likes = self
			.tables
			.read()
			.await
			.likes
			.values()
			.filter(|l| l.user_id == user_id)
			.cloned()
			.collect::<Vec<_>>();

		newest_first(&mut likes, |l| (l.created_at, l.id));
		Ok(take(likes, limit))
	}

	async fn is_bookmarked(&self, user_id: Uuid, target: Target) -> StoreResult<bool> {
		Ok(self
			.tables
			.read()
			.await
			.bookmarks
			.values()
			.any(|b| b.user_id == user_id && b.target() == Some(target)))
	}

	async fn bookmark(&self, user_id: Uuid, target: Target) -> StoreResult<Bookmark> {
		let mut tables = self.tables.write().await;

		if !tables.users.contains_key(&user_id) {
			return Err(StoreError::NotFound("User"));
		}

		if !tables.target_exists(target) {
			return Err(StoreError::NotFound(target.noun()));
		}

		if tables
			.bookmarks
			.values()
			.any(|b| b.user_id == user_id && b.target() == Some(target))
		{
			return Err(StoreError::Conflict("Already bookmarked"));
		}

		let bookmark = Bookmark {
			id: Uuid::new_v4(),
			user_id,
			video_id: target.video_id(),
			text_post_id: target.text_post_id(),
			created_at: Utc::now(),
		};

		tables.bookmarks.insert(bookmark.id, bookmark.clone());
		Ok(bookmark)
	}

	async fn remove_bookmark(&self, user_id: Uuid, target: Target) -> StoreResult<bool> {
		let mut tables = self.tables.write().await;

		let before = tables.bookmarks.len();
		tables
			.bookmarks
			.retain(|_, b| !(b.user_id == user_id && b.target() == Some(target)));

		Ok(tables.bookmarks.len() != before)
	}

	async fn list_bookmarks(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Bookmark>> {
		let mut bookmarks = self
			.tables
			.read()
			.await
			.bookmarks
			.values()
			.filter(|b| b.user_id == user_id)
			.cloned()
			.collect::<Vec<_>>();

		newest_first(&mut bookmarks, |b| (b.created_at, b.id));
		Ok(take(bookmarks, limit))
	}

	async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> StoreResult<bool> {
		Ok(self
			.tables
			.read()
			.await
			.follows
			.values()
			.any(|f| f.follower_id == follower_id && f.following_id == following_id))
	}

	async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> StoreResult<Follow> {
		let mut tables = self.tables.write().await;

		if !tables.users.contains_key(&follower_id) || !tables.users.contains_key(&following_id) {
			return Err(StoreError::NotFound("User"));
		}

		if tables
			.follows
			.values()
			.any(|f| f.follower_id == follower_id && f.following_id == following_id)
		{
			return Err(StoreError::Conflict("Already following"));
		}

		let follow = Follow {
			id: Uuid::new_v4(),
			follower_id,
			following_id,
			created_at: Utc::now(),
		};

		tables.follows.insert(follow.id, follow.clone());
		Ok(follow)
	}

	async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> StoreResult<bool> {
		let mut tables = self.tables.write().await;

		let before = tables.follows.len();
		tables
			.follows
			.retain(|_, f| !(f.follower_id == follower_id && f.following_id == following_id));

		Ok(tables.follows.len() != before)
	}

	async fn follow_counts(&self, user_id: Uuid) -> StoreResult<FollowCounts> {
		let tables = self.tables.read().await;

		Ok(FollowCounts {
			followers_count: tables.follows.values().filter(|f| f.following_id == user_id).count() as i64,
			following_count: tables.follows.values().filter(|f| f.follower_id == user_id).count() as i64,
		})
	}

	async fn list_follows(&self, user_id: Uuid, direction: FollowDirection, limit: i64) -> StoreResult<Vec<User>> {
		let tables = self.tables.read().await;

		let mut follows = tables
			.follows
			.values()
			.filter(|f| match direction {
				FollowDirection::Followers => f.following_id == user_id,
				FollowDirection::Following => f.follower_id == user_id,
			})
			.collect::<Vec<_>>();

		newest_first(&mut follows, |f| (f.created_at, f.id));

		let users = follows
			.into_iter()
			.filter_map(|f| match direction {
				FollowDirection::Followers => tables.users.get(&f.follower_id),
				FollowDirection::Following => tables.users.get(&f.following_id),
			})
			.cloned()
			.collect();

		Ok(take(users, limit))
	}

	async fn following_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
		Ok(self
			.tables
			.read()
			.await
			.follows
			.values()
			.filter(|f| f.follower_id == user_id)
			.map(|f| f.following_id)
			.collect())
	}

	async fn get_tier(&self, id: Uuid) -> StoreResult<Option<SubscriptionTier>> {
		Ok(self.tables.read().await.tiers.get(&id).cloned())
	}

	async fn get_tiers(&self, ids: &[Uuid]) -> StoreResult<Vec<SubscriptionTier>> {
		let tables = self.tables.read().await;
		Ok(ids.iter().filter_map(|id| tables.tiers.get(id).cloned()).collect())
	}

	async fn list_tiers(&self, creator_id: Uuid, include_inactive: bool) -> StoreResult<Vec<SubscriptionTier>> {
		let mut tiers = self
			.tables
			.read()
			.await
			.tiers
			.values()
			.filter(|t| t.creator_id == creator_id && (include_inactive || t.is_active))
			.cloned()
			.collect::<Vec<_>>();

		tiers.sort_by_key(|t| (t.price_cents, t.created_at, t.id));
		Ok(tiers)
	}

	async fn create_tier(&self, tier: NewTier) -> StoreResult<SubscriptionTier> {
		let mut tables = self.tables.write().await;

		let now = Utc::now();

		if !tables.users.contains_key(&tier.creator_id) {
			return Err(StoreError::NotFound("Creator"));
		}

		if tables
			.tiers
			.values()
			.any(|t| t.creator_id == tier.creator_id && t.name == tier.name)
		{
			return Err(StoreError::Conflict("A tier with this name already exists"));
		}

		if let Some(creator) = tables.users.get_mut(&tier.creator_id) {
			if !creator.is_creator {
				creator.is_creator = true;
				creator.updated_at = now;
			}
		}

		let tier = SubscriptionTier {
			id: Uuid::new_v4(),
			creator_id: tier.creator_id,
			name: tier.name,
			description: tier.description,
			price_cents: tier.price_cents,
			benefits: tier.benefits,
			is_active: true,
			created_at: now,
			updated_at: now,
		};

		tables.tiers.insert(tier.id, tier.clone());
		Ok(tier)
	}

	async fn update_tier(&self, id: Uuid, patch: TierPatch) -> StoreResult<Option<SubscriptionTier>> {
		let mut tables = self.tables.write().await;

		let Some(creator_id) = tables.tiers.get(&id).map(|t| t.creator_id) else {
			return Ok(None);
		};

		if let Some(name) = &patch.name {
			if tables
				.tiers
				.values()
				.any(|t| t.id != id && t.creator_id == creator_id && &t.name == name)
			{
				return Err(StoreError::Conflict("A tier with this name already exists"));
			}
		}

		let Some(tier) = tables.tiers.get_mut(&id) else {
			return Ok(None);
		};

		if let Some(name) = patch.name {
			tier.name = name;
		}

		if let Some(description) = patch.description {
			tier.description = non_empty(description);
		}

		if let Some(price_cents) = patch.price_cents {
			tier.price_cents = price_cents;
		}

		if let Some(benefits) = patch.benefits {
			tier.benefits = benefits;
		}

		if let Some(is_active) = patch.is_active {
			tier.is_active = is_active;
		}

		tier.updated_at = Utc::now();
		Ok(Some(tier.clone()))
	}

	async fn delete_tier(&self, id: Uuid) -> StoreResult<bool> {
		Ok(self.tables.write().await.remove_tier(id))
	}

	async fn count_current_subscriptions(&self, tier_id: Uuid, now: DateTime<Utc>) -> StoreResult<i64> {
		Ok(self
			.tables
			.read()
			.await
			.subscriptions
			.values()
			.filter(|s| s.tier_id == tier_id && s.is_current(now))
			.count() as i64)
	}

	async fn get_subscription(&self, id: Uuid) -> StoreResult<Option<UserSubscription>> {
		Ok(self.tables.read().await.subscriptions.get(&id).cloned())
	}

	async fn current_subscription(
		&self,
		subscriber_id: Uuid,
		creator_id: Uuid,
		now: DateTime<Utc>,
	) -> StoreResult<Option<UserSubscription>> {
		Ok(self
			.tables
			.read()
			.await
			.subscriptions
			.values()
			.find(|s| s.subscriber_id == subscriber_id && s.creator_id == creator_id && s.is_current(now))
			.cloned())
	}

	async fn list_subscriptions(&self, subscriber_id: Uuid) -> StoreResult<Vec<UserSubscription>> {
		let mut subscriptions = self
			.tables
			.read()
			.await
			.subscriptions
			.values()
			.filter(|s| s.subscriber_id == subscriber_id)
			.cloned()
			.collect::<Vec<_>>();

		newest_first(&mut subscriptions, |s| (s.started_at, s.id));
		Ok(subscriptions)
	}

	async fn list_current_subscribers(&self, creator_id: Uuid, now: DateTime<Utc>) -> StoreResult<Vec<UserSubscription>> {
		let mut subscriptions = self
			.tables
			.read()
			.await
			.subscriptions
			.values()
			.filter(|s| s.creator_id == creator_id && s.is_current(now))
			.cloned()
			.collect::<Vec<_>>();

		newest_first(&mut subscriptions, |s| (s.started_at, s.id));
		Ok(subscriptions)
	}

	async fn create_subscription(&self, subscription: NewSubscription, now: DateTime<Utc>) -> StoreResult<UserSubscription> {
		let mut tables = self.tables.write().await;

		if !tables.users.contains_key(&subscription.subscriber_id) {
			return Err(StoreError::NotFound("User"));
		}

		if !tables.tiers.contains_key(&subscription.tier_id) {
			return Err(StoreError::NotFound("Tier"));
		}

		for existing in tables.subscriptions.values_mut().filter(|s| {
			s.subscriber_id == subscription.subscriber_id
				&& s.creator_id == subscription.creator_id
				&& s.status == SubscriptionStatus::Active
		}) {
			if existing.current_period_end > now {
				return Err(StoreError::Conflict("Already subscribed to this creator"));
			}

			existing.status = SubscriptionStatus::Expired;
		}

		let subscription = UserSubscription {
			id: Uuid::new_v4(),
			subscriber_id: subscription.subscriber_id,
			creator_id: subscription.creator_id,
			tier_id: subscription.tier_id,
			status: SubscriptionStatus::Active,
			started_at: now,
			current_period_end: subscription.current_period_end,
			cancelled_at: None,
		};

		tables.subscriptions.insert(subscription.id, subscription.clone());
		Ok(subscription)
	}

	async fn change_subscription_tier(&self, id: Uuid, tier_id: Uuid) -> StoreResult<Option<UserSubscription>> {
		let mut tables = self.tables.write().await;

		if !tables.tiers.contains_key(&tier_id) {
			return Err(StoreError::NotFound("Tier"));
		}

		Ok(tables.subscriptions.get_mut(&id).map(|subscription| {
			subscription.tier_id = tier_id;
			subscription.clone()
		}))
	}

	async fn cancel_subscription(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<Option<UserSubscription>> {
		let mut tables = self.tables.write().await;

		Ok(tables.subscriptions.get_mut(&id).map(|subscription| {
			subscription.status = SubscriptionStatus::Cancelled;
			subscription.cancelled_at = Some(now);
			subscription.clone()
		}))
	}

	async fn create_tip(&self, tip: NewTip) -> StoreResult<Tip> {
		let mut tables = self.tables.write().await;

		if !tables.users.contains_key(&tip.sender_id) || !tables.users.contains_key(&tip.recipient_id) {
			return Err(StoreError::NotFound("User"));
		}

		if let Some(video_id) = tip.video_id {
			if !tables.videos.contains_key(&video_id) {
				return Err(StoreError::NotFound("Video"));
			}
		}

		let tip = Tip {
			id: Uuid::new_v4(),
			sender_id: tip.sender_id,
			recipient_id: tip.recipient_id,
			amount_cents: tip.amount_cents,
			message: tip.message,
			video_id: tip.video_id,
			created_at: Utc::now(),
		};

		tables.tips.insert(tip.id, tip.clone());
		Ok(tip)
	}

	async fn list_tips(&self, filter: TipFilter, limit: i64) -> StoreResult<Vec<Tip>> {
		let mut tips = self
			.tables
			.read()
			.await
			.tips
			.values()
			.filter(|t| tip_matches(t, filter))
			.cloned()
			.collect::<Vec<_>>();

		newest_first(&mut tips, |t| (t.created_at, t.id));
		Ok(take(tips, limit))
	}

	async fn tip_totals(&self, filter: TipFilter, since: Option<DateTime<Utc>>) -> StoreResult<TipTotals> {
		let tables = self.tables.read().await;

		Ok(tables
			.tips
			.values()
			.filter(|t| tip_matches(t, filter))
			.filter(|t| since.map_or(true, |since| t.created_at >= since))
			.fold(TipTotals::default(), |totals, t| TipTotals {
				count: totals.count + 1,
				total_cents: totals.total_cents + t.amount_cents,
			}))
	}
}

fn tip_matches(tip: &Tip, filter: TipFilter) -> bool {
	match filter {
		TipFilter::Recipient(id) => tip.recipient_id == id,
		TipFilter::Sender(id) => tip.sender_id == id,
	}
}
