use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::{
	Bookmark, Comment, Follow, FollowCounts, FollowDirection, Like, LikeState, NewComment, NewSubscription, NewTextPost,
	NewTier, NewTip, NewUser, NewVideo, SubscriptionTier, Target, TargetCounters, TextPost, TextPostFilter, TextPostPatch,
	TierPatch, Tip, TipFilter, TipTotals, User, UserPatch, UserStats, UserSubscription, Video, VideoAssetUpdate,
	VideoFilter, VideoLookup, VideoPatch,
};
use crate::feed::FeedFetch;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	/// A referenced row does not exist, the message names it.
	#[error("{0} not found")]
	NotFound(&'static str),
	/// A uniqueness rule was violated, the message is user facing.
	#[error("{0}")]
	Conflict(&'static str),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("migration error: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Totals over everything a creator published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ContentStats {
	pub videos: i64,
	pub text_posts: i64,
	pub total_views: i64,
	pub total_likes: i64,
	pub total_comments: i64,
}

/// Persistence for every resource of the API.
///
/// Methods returning `Option` or `bool` report a missing row as `None` or
/// `false`. Writes that reference other rows fail with
/// [`StoreError::NotFound`] when those rows are missing, and writes that break
/// a uniqueness rule fail with [`StoreError::Conflict`]. Counter updates are
/// applied atomically with the write that triggers them.
#[async_trait::async_trait]
pub trait Store: Send + Sync + 'static {
	// Users
	async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
	async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
	async fn get_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;
	async fn search_users(&self, search: Option<&str>, limit: i64) -> StoreResult<Vec<User>>;
	async fn user_stats(&self, id: Uuid) -> StoreResult<UserStats>;
	async fn create_user(&self, user: NewUser) -> StoreResult<User>;
	async fn update_user(&self, id: Uuid, patch: UserPatch) -> StoreResult<Option<User>>;
	async fn set_creator(&self, id: Uuid, is_creator: bool) -> StoreResult<Option<User>>;
	async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

	// Videos
	async fn get_video(&self, id: Uuid) -> StoreResult<Option<Video>>;
	async fn get_videos(&self, ids: &[Uuid]) -> StoreResult<Vec<Video>>;
	async fn list_videos(&self, filter: VideoFilter) -> StoreResult<Vec<Video>>;
	async fn create_video(&self, video: NewVideo) -> StoreResult<Video>;
	async fn update_video(&self, id: Uuid, patch: VideoPatch) -> StoreResult<Option<Video>>;
	async fn delete_video(&self, id: Uuid) -> StoreResult<bool>;
	async fn set_video_upload(&self, id: Uuid, upload_id: &str) -> StoreResult<Option<Video>>;
	async fn find_video(&self, lookup: VideoLookup) -> StoreResult<Option<Video>>;
	async fn update_video_asset(&self, id: Uuid, update: VideoAssetUpdate) -> StoreResult<Option<Video>>;

	// Text posts
	async fn get_text_post(&self, id: Uuid) -> StoreResult<Option<TextPost>>;
	async fn get_text_posts(&self, ids: &[Uuid]) -> StoreResult<Vec<TextPost>>;
	async fn list_text_posts(&self, filter: TextPostFilter) -> StoreResult<Vec<TextPost>>;
	async fn create_text_post(&self, post: NewTextPost) -> StoreResult<TextPost>;
	async fn update_text_post(&self, id: Uuid, patch: TextPostPatch) -> StoreResult<Option<TextPost>>;
	async fn delete_text_post(&self, id: Uuid) -> StoreResult<bool>;

	// Content and feed
	async fn target_counters(&self, target: Target) -> StoreResult<Option<TargetCounters>>;
	/// Returns the new view count.
	async fn record_view(&self, target: Target) -> StoreResult<Option<i64>>;
	async fn content_stats(&self, user_id: Uuid) -> StoreResult<ContentStats>;
	/// Ready videos matching the fetch.
	async fn feed_videos(&self, fetch: &FeedFetch) -> StoreResult<Vec<Video>>;
	async fn feed_text_posts(&self, fetch: &FeedFetch) -> StoreResult<Vec<TextPost>>;

	// Comments
	async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;
	async fn list_comments(&self, target: Target) -> StoreResult<Vec<Comment>>;
	async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment>;
	async fn update_comment(&self, id: Uuid, content: String) -> StoreResult<Option<Comment>>;
	/// Deletes the comment with its replies, returns how many comments were
	/// removed.
	async fn delete_comment(&self, id: Uuid) -> StoreResult<Option<i64>>;

	// Likes
	async fn is_liked(&self, user_id: Uuid, target: Target) -> StoreResult<bool>;
	async fn like(&self, user_id: Uuid, target: Target) -> StoreResult<LikeState>;
	async fn unlike(&self, user_id: Uuid, target: Target) -> StoreResult<Option<LikeState>>;
	async fn list_likes(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Like>>;

	// Bookmarks
	async fn is_bookmarked(&self, user_id: Uuid, target: Target) -> StoreResult<bool>;
	async fn bookmark(&self, user_id: Uuid, target: Target) -> StoreResult<Bookmark>;
	async fn remove_bookmark(&self, user_id: Uuid, target: Target) -> StoreResult<bool>;
	async fn list_bookmarks(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Bookmark>>;

	// Follows
	async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> StoreResult<bool>;
	async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> StoreResult<Follow>;
	async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> StoreResult<bool>;
	async fn follow_counts(&self, user_id: Uuid) -> StoreResult<FollowCounts>;
	async fn list_follows(&self, user_id: Uuid, direction: FollowDirection, limit: i64) -> StoreResult<Vec<User>>;
	async fn following_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>>;

	// Tiers
	async fn get_tier(&self, id: Uuid) -> StoreResult<Option<SubscriptionTier>>;
	async fn get_tiers(&self, ids: &[Uuid]) -> StoreResult<Vec<SubscriptionTier>>;
	async fn list_tiers(&self, creator_id: Uuid, include_inactive: bool) -> StoreResult<Vec<SubscriptionTier>>;
	/// Also marks the creator as a creator.
	async fn create_tier(&self, tier: NewTier) -> StoreResult<SubscriptionTier>;
	async fn update_tier(&self, id: Uuid, patch: TierPatch) -> StoreResult<Option<SubscriptionTier>>;
	async fn delete_tier(&self, id: Uuid) -> StoreResult<bool>;
	async fn count_current_subscriptions(&self, tier_id: Uuid, now: DateTime<Utc>) -> StoreResult<i64>;

	// Subscriptions
	async fn get_subscription(&self, id: Uuid) -> StoreResult<Option<UserSubscription>>;
	async fn current_subscription(
		&self,
		subscriber_id: Uuid,
		creator_id: Uuid,
		now: DateTime<Utc>,
	) -> StoreResult<Option<UserSubscription>>;
	async fn list_subscriptions(&self, subscriber_id: Uuid) -> StoreResult<Vec<UserSubscription>>;
	async fn list_current_subscribers(&self, creator_id: Uuid, now: DateTime<Utc>) -> StoreResult<Vec<UserSubscription>>;
	/// Fails with a conflict when the pair already has a current
	/// subscription. Active rows whose period ended are marked expired first.
	async fn create_subscription(&self, subscription: NewSubscription, now: DateTime<Utc>) -> StoreResult<UserSubscription>;
	async fn change_subscription_tier(&self, id: Uuid, tier_id: Uuid) -> StoreResult<Option<UserSubscription>>;
	async fn cancel_subscription(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<Option<UserSubscription>>;

	// Tips
	async fn create_tip(&self, tip: NewTip) -> StoreResult<Tip>;
	async fn list_tips(&self, filter: TipFilter, limit: i64) -> StoreResult<Vec<Tip>>;
	async fn tip_totals(&self, filter: TipFilter, since: Option<DateTime<Utc>>) -> StoreResult<TipTotals>;
}
