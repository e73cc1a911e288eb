use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{ContentStats, Store, StoreError, StoreResult};
use crate::config::DatabaseConfig;
use crate::database::{
	non_empty, Bookmark, Comment, Follow, FollowCounts, FollowDirection, Like, LikeState, NewComment, NewSubscription,
	NewTextPost, NewTier, NewTip, NewUser, NewVideo, SubscriptionTier, Target, TargetCounters, TextPost, TextPostFilter,
	TextPostPatch, TierPatch, Tip, TipFilter, TipTotals, User, UserPatch, UserStats, UserSubscription, Video,
	VideoAssetUpdate, VideoFilter, VideoLookup, VideoPatch,
};
use crate::feed::{FeedFetch, FeedOrder};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Foreign keys of rows pointing at a target, keyed by constraint name.
const TARGET_KEYS: &[(&str, &str)] = &[
	("likes_user_id_fkey", "User"),
	("likes_video_id_fkey", "Video"),
	("likes_text_post_id_fkey", "Text post"),
	("bookmarks_user_id_fkey", "User"),
	("bookmarks_video_id_fkey", "Video"),
	("bookmarks_text_post_id_fkey", "Text post"),
	("comments_user_id_fkey", "User"),
	("comments_video_id_fkey", "Video"),
	("comments_text_post_id_fkey", "Text post"),
	("comments_parent_id_fkey", "Parent comment"),
];

/// Maps unique violations to [`StoreError::Conflict`] and foreign key
/// violations to [`StoreError::NotFound`], naming the missing row by the
/// violated constraint.
fn constraint_error(err: sqlx::Error, conflict: &'static str, missing: &[(&str, &'static str)]) -> StoreError {
	if let sqlx::Error::Database(db) = &err {
		match db.code().as_deref() {
			Some(UNIQUE_VIOLATION) => return StoreError::Conflict(conflict),
			Some(FOREIGN_KEY_VIOLATION) => {
				let name = db
					.constraint()
					.and_then(|constraint| missing.iter().find(|(key, _)| *key == constraint))
					.map(|(_, name)| *name)
					.unwrap_or("Referenced row");

				return StoreError::NotFound(name);
			}
			_ => {}
		}
	}

	StoreError::Database(err)
}

fn table(target: Target) -> &'static str {
	match target {
		Target::Video(_) => "videos",
		Target::TextPost(_) => "text_posts",
	}
}

fn column(target: Target) -> &'static str {
	match target {
		Target::Video(_) => "video_id",
		Target::TextPost(_) => "text_post_id",
	}
}

/// Escapes `%`, `_` and `\` so user input is matched literally by `ILIKE`.
fn like_pattern(search: &str) -> String {
	let mut pattern = String::with_capacity(search.len() + 2);
	pattern.push('%');
	for c in search.chars() {
		if matches!(c, '%' | '_' | '\\') {
			pattern.push('\\');
		}
		pattern.push(c);
	}
	pattern.push('%');
	pattern
}

fn push_feed_filters(qb: &mut QueryBuilder<'_, Postgres>, fetch: &FeedFetch) {
	if let Some(category) = &fetch.category {
		qb.push(" AND category = ").push_bind(category.clone());
	}

	if let Some(authors) = &fetch.authors {
		qb.push(" AND user_id = ANY(").push_bind(authors.clone()).push(")");
	}

	if let Some(before) = fetch.before {
		qb.push(" AND created_at < ").push_bind(before);
	}

	if let Some(since) = fetch.since {
		qb.push(" AND created_at >= ").push_bind(since);
	}

	match fetch.order {
		FeedOrder::Recent => qb.push(" ORDER BY created_at DESC, id DESC"),
		FeedOrder::Engagement => {
			qb.push(" ORDER BY (views_count + 2 * likes_count + 3 * comments_count) DESC, created_at DESC, id DESC")
		}
	};

	qb.push(" LIMIT ").push_bind(fetch.limit);
}

pub struct PgStore {
	db: sqlx::PgPool,
}

impl PgStore {
	pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
		let db = PgPoolOptions::new()
			.max_connections(config.max_connections)
			.connect_with(PgConnectOptions::from_str(&config.uri)?.disable_statement_logging())
			.await?;

		Ok(Self { db })
	}

	pub async fn migrate(&self) -> StoreResult<()> {
		sqlx::migrate!("./migrations").run(&self.db).await?;
		Ok(())
	}
}

#[async_trait::async_trait]
impl Store for PgStore {
	async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
		Ok(sqlx::query_as("SELECT * FROM users WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db)
			.await?)
	}

	async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
		Ok(sqlx::query_as("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
			.bind(username)
			.fetch_optional(&self.db)
			.await?)
	}

	async fn get_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
		Ok(sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
			.bind(ids)
			.fetch_all(&self.db)
			.await?)
	}

	async fn search_users(&self, search: Option<&str>, limit: i64) -> StoreResult<Vec<User>> {
		Ok(sqlx::query_as(
			"SELECT * FROM users WHERE $1::TEXT IS NULL OR username ILIKE $1 OR display_name ILIKE $1 ORDER BY LOWER(username) LIMIT $2",
		)
		.bind(search.map(like_pattern))
		.bind(limit)
		.fetch_all(&self.db)
		.await?)
	}

	async fn user_stats(&self, id: Uuid) -> StoreResult<UserStats> {
		let (followers_count, following_count, videos_count, text_posts_count) = sqlx::query_as(
			"SELECT
				(SELECT COUNT(*) FROM follows WHERE following_id = $1),
				(SELECT COUNT(*) FROM follows WHERE follower_id = $1),
				(SELECT COUNT(*) FROM videos WHERE user_id = $1),
				(SELECT COUNT(*) FROM text_posts WHERE user_id = $1)",
		)
		.bind(id)
		.fetch_one(&self.db)
		.await?;

		Ok(UserStats {
			followers_count,
			following_count,
			videos_count,
			text_posts_count,
		})
	}

	async fn create_user(&self, user: NewUser) -> StoreResult<User> {
		sqlx::query_as(
			"INSERT INTO users (id, username, display_name, email, avatar_url, bio) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
		)
		.bind(user.id)
		.bind(user.username)
		.bind(user.display_name)
		.bind(user.email)
		.bind(user.avatar_url)
		.bind(user.bio)
		.fetch_one(&self.db)
		.await
		.map_err(|err| {
			let duplicate_id = matches!(&err, sqlx::Error::Database(db) if db.constraint() == Some("users_pkey"));
			match duplicate_id {
				true => constraint_error(err, "User already exists", &[]),
				false => constraint_error(err, "Username already taken", &[]),
			}
		})
	}

	async fn update_user(&self, id: Uuid, patch: UserPatch) -> StoreResult<Option<User>> {
		let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");

		if let Some(username) = patch.username {
			qb.push(", username = ").push_bind(username);
		}

		if let Some(display_name) = patch.display_name {
			qb.push(", display_name = ").push_bind(display_name);
		}

		if let Some(avatar_url) = patch.avatar_url {
			qb.push(", avatar_url = ").push_bind(non_empty(avatar_url));
		}

		if let Some(bio) = patch.bio {
			qb.push(", bio = ").push_bind(non_empty(bio));
		}

		qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

		qb.build_query_as()
			.fetch_optional(&self.db)
			.await
			.map_err(|err| constraint_error(err, "Username already taken", &[]))
	}

	async fn set_creator(&self, id: Uuid, is_creator: bool) -> StoreResult<Option<User>> {
		Ok(
			sqlx::query_as("UPDATE users SET is_creator = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
				.bind(id)
				.bind(is_creator)
				.fetch_optional(&self.db)
				.await?,
		)
	}

	async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
		let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&self.db).await?;
		Ok(result.rows_affected() > 0)
	}

	async fn get_video(&self, id: Uuid) -> StoreResult<Option<Video>> {
		Ok(sqlx::query_as("SELECT * FROM videos WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db)
			.await?)
	}

	async fn get_videos(&self, ids: &[Uuid]) -> StoreResult<Vec<Video>> {
		Ok(sqlx::query_as("SELECT * FROM videos WHERE id = ANY($1)")
			.bind(ids)
			.fetch_all(&self.db)
			.await?)
	}

	async fn list_videos(&self, filter: VideoFilter) -> StoreResult<Vec<Video>> {
		let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM videos WHERE TRUE");

		if let Some(user_id) = filter.user_id {
			qb.push(" AND user_id = ").push_bind(user_id);
		}

		if let Some(category) = filter.category {
			qb.push(" AND category = ").push_bind(category);
		}

		if let Some(status) = filter.status {
			qb.push(" AND status = ").push_bind(status.as_str());
		}

		qb.push(" ORDER BY created_at DESC, id DESC LIMIT ").push_bind(filter.limit);

		Ok(qb.build_query_as().fetch_all(&self.db).await?)
	}

	async fn create_video(&self, video: NewVideo) -> StoreResult<Video> {
		sqlx::query_as(
			"INSERT INTO videos (id, user_id, title, description, category, status, playback_url, thumbnail_url) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
		)
		.bind(Uuid::new_v4())
		.bind(video.user_id)
		.bind(video.title)
		.bind(video.description)
		.bind(video.category)
		.bind(video.status.as_str())
		.bind(video.playback_url)
		.bind(video.thumbnail_url)
		.fetch_one(&self.db)
		.await
		.map_err(|err| constraint_error(err, "Video already exists", &[("videos_user_id_fkey", "User")]))
	}

	async fn update_video(&self, id: Uuid, patch: VideoPatch) -> StoreResult<Option<Video>> {
		let mut qb = QueryBuilder::<Postgres>::new("UPDATE videos SET updated_at = NOW()");

		if let Some(title) = patch.title {
			qb.push(", title = ").push_bind(title);
		}

		if let Some(description) = patch.description {
			qb.push(", description = ").push_bind(non_empty(description));
		}

		if let Some(category) = patch.category {
			qb.push(", category = ").push_bind(non_empty(category));
		}

		if let Some(thumbnail_url) = patch.thumbnail_url {
			qb.push(", thumbnail_url = ").push_bind(non_empty(thumbnail_url));
		}

		qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

		Ok(qb.build_query_as().fetch_optional(&self.db).await?)
	}

	async fn delete_video(&self, id: Uuid) -> StoreResult<bool> {
		let result = sqlx::query("DELETE FROM videos WHERE id = $1").bind(id).execute(&self.db).await?;
		Ok(result.rows_affected() > 0)
	}

	async fn set_video_upload(&self, id: Uuid, upload_id: &str) -> StoreResult<Option<Video>> {
		sqlx::query_as("UPDATE videos SET upload_id = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
			.bind(id)
			.bind(upload_id)
			.fetch_optional(&self.db)
			.await
			.map_err(|err| constraint_error(err, "Upload already belongs to another video", &[]))
	}

	async fn find_video(&self, lookup: VideoLookup) -> StoreResult<Option<Video>> {
		let video = match lookup {
			VideoLookup::Id(id) => return self.get_video(id).await,
			VideoLookup::UploadId(upload_id) => {
				sqlx::query_as("SELECT * FROM videos WHERE upload_id = $1")
					.bind(upload_id)
					.fetch_optional(&self.db)
					.await?
			}
			VideoLookup::AssetId(asset_id) => {
				sqlx::query_as("SELECT * FROM videos WHERE asset_id = $1")
					.bind(asset_id)
					.fetch_optional(&self.db)
					.await?
			}
		};

		Ok(video)
	}

	async fn update_video_asset(&self, id: Uuid, update: VideoAssetUpdate) -> StoreResult<Option<Video>> {
		let mut tx = self.db.begin().await?;

		let Some(current): Option<Video> = sqlx::query_as("SELECT * FROM videos WHERE id = $1 FOR UPDATE")
			.bind(id)
			.fetch_optional(&mut *tx)
			.await?
		else {
			return Ok(None);
		};

		let (status, error_message) = update.outcome(current.status, current.error_message.as_deref());

		let video = sqlx::query_as(
			"UPDATE videos SET
				status = $2,
				asset_id = COALESCE($3, asset_id),
				playback_id = COALESCE($4, playback_id),
				playback_url = COALESCE($5, playback_url),
				thumbnail_url = COALESCE(thumbnail_url, $6),
				duration_seconds = COALESCE($7, duration_seconds),
				error_message = $8,
				updated_at = NOW()
			WHERE id = $1 RETURNING *",
		)
		.bind(id)
		.bind(status.as_str())
		.bind(update.asset_id)
		.bind(update.playback_id)
		.bind(update.playback_url)
		.bind(update.default_thumbnail_url)
		.bind(update.duration_seconds)
		.bind(error_message)
		.fetch_one(&mut *tx)
		.await
		.map_err(|err| constraint_error(err, "Asset already belongs to another video", &[]))?;

		tx.commit().await?;

		Ok(Some(video))
	}

	async fn get_text_post(&self, id: Uuid) -> StoreResult<Option<TextPost>> {
		Ok(sqlx::query_as("SELECT * FROM text_posts WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db)
			.await?)
	}

	async fn get_text_posts(&self, ids: &[Uuid]) -> StoreResult<Vec<TextPost>> {
		Ok(sqlx::query_as("SELECT * FROM text_posts WHERE id = ANY($1)")
			.bind(ids)
			.fetch_all(&self.db)
			.await?)
	}

	async fn list_text_posts(&self, filter: TextPostFilter) -> StoreResult<Vec<TextPost>> {
		let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM text_posts WHERE TRUE");

		if let Some(user_id) = filter.user_id {
			qb.push(" AND user_id = ").push_bind(user_id);
		}

		if let Some(category) = filter.category {
			qb.push(" AND category = ").push_bind(category);
		}

		qb.push(" ORDER BY created_at DESC, id DESC LIMIT ").push_bind(filter.limit);

		Ok(qb.build_query_as().fetch_all(&self.db).await?)
	}

	async fn create_text_post(&self, post: NewTextPost) -> StoreResult<TextPost> {
		sqlx::query_as(
			"INSERT INTO text_posts (id, user_id, title, content, category) VALUES ($1, $2, $3, $4, $5) RETURNING *",
		)
		.bind(Uuid::new_v4())
		.bind(post.user_id)
		.bind(post.title)
		.bind(post.content)
		.bind(post.category)
		.fetch_one(&self.db)
		.await
		.map_err(|err| constraint_error(err, "Text post already exists", &[("text_posts_user_id_fkey", "User")]))
	}

	async fn update_text_post(&self, id: Uuid, patch: TextPostPatch) -> StoreResult<Option<TextPost>> {
		let mut qb = QueryBuilder::<Postgres>::new("UPDATE text_posts SET updated_at = NOW()");

		if let Some(title) = patch.title {
			qb.push(", title = ").push_bind(non_empty(title));
		}

		if let Some(content) = patch.content {
			qb.push(", content = ").push_bind(content);
		}

		if let Some(category) = patch.category {
			qb.push(", category = ").push_bind(non_empty(category));
		}

		qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

		Ok(qb.build_query_as().fetch_optional(&self.db).await?)
	}

	async fn delete_text_post(&self, id: Uuid) -> StoreResult<bool> {
		let result = sqlx::query("DELETE FROM text_posts WHERE id = $1")
			.bind(id)
			.execute(&self.db)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	async fn target_counters(&self, target: Target) -> StoreResult<Option<TargetCounters>> {
		Ok(sqlx::query_as(&format!(
			"SELECT user_id, likes_count, comments_count, views_count FROM {} WHERE id = $1",
			table(target)
		))
		.bind(target.id())
		.fetch_optional(&self.db)
		.await?)
	}

	async fn record_view(&self, target: Target) -> StoreResult<Option<i64>> {
		Ok(sqlx::query_scalar(&format!(
			"UPDATE {} SET views_count = views_count + 1 WHERE id = $1 RETURNING views_count",
			table(target)
		))
		.bind(target.id())
		.fetch_optional(&self.db)
		.await?)
	}

	async fn content_stats(&self, user_id: Uuid) -> StoreResult<ContentStats> {
		let (videos, text_posts, total_views, total_likes, total_comments) = sqlx::query_as(
			"WITH content AS (
				SELECT 'video' AS kind, views_count, likes_count, comments_count FROM videos WHERE user_id = $1
				UNION ALL
				SELECT 'text_post' AS kind, views_count, likes_count, comments_count FROM text_posts WHERE user_id = $1
			)
			SELECT
				COUNT(*) FILTER (WHERE kind = 'video'),
				COUNT(*) FILTER (WHERE kind = 'text_post'),
				COALESCE(SUM(views_count), 0)::BIGINT,
				COALESCE(SUM(likes_count), 0)::BIGINT,
				COALESCE(SUM(comments_count), 0)::BIGINT
			FROM content",
		)
		.bind(user_id)
		.fetch_one(&self.db)
		.await?;

		Ok(ContentStats {
			videos,
			text_posts,
			total_views,
			total_likes,
			total_comments,
		})
	}

	async fn feed_videos(&self, fetch: &FeedFetch) -> StoreResult<Vec<Video>> {
		let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM videos WHERE status = 'ready'");
		push_feed_filters(&mut qb, fetch);
		Ok(qb.build_query_as().fetch_all(&self.db).await?)
	}

	async fn feed_text_posts(&self, fetch: &FeedFetch) -> StoreResult<Vec<TextPost>> {
		let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM text_posts WHERE TRUE");
		push_feed_filters(&mut qb, fetch);
		Ok(qb.build_query_as().fetch_all(&self.db).await?)
	}

	async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
		Ok(sqlx::query_as("SELECT * FROM comments WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db)
			.await?)
	}

	async fn list_comments(&self, target: Target) -> StoreResult<Vec<Comment>> {
		Ok(sqlx::query_as(&format!(
			"SELECT * FROM comments WHERE {} = $1 ORDER BY created_at, id",
			column(target)
		))
		.bind(target.id())
		.fetch_all(&self.db)
		.await?)
	}

	async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
		let mut tx = self.db.begin().await?;

		let created: Comment = sqlx::query_as(
			"INSERT INTO comments (id, user_id, video_id, text_post_id, parent_id, content) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
		)
		.bind(Uuid::new_v4())
		.bind(comment.user_id)
		.bind(comment.target.video_id())
		.bind(comment.target.text_post_id())
		.bind(comment.parent_id)
		.bind(comment.content)
		.fetch_one(&mut *tx)
		.await
		.map_err(|err| constraint_error(err, "Comment already exists", TARGET_KEYS))?;

		sqlx::query(&format!(
			"UPDATE {} SET comments_count = comments_count + 1 WHERE id = $1",
			table(comment.target)
		))
		.bind(comment.target.id())
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(created)
	}

	async fn update_comment(&self, id: Uuid, content: String) -> StoreResult<Option<Comment>> {
		Ok(
			sqlx::query_as("UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
				.bind(id)
				.bind(content)
				.fetch_optional(&self.db)
				.await?,
		)
	}

	async fn delete_comment(&self, id: Uuid) -> StoreResult<Option<i64>> {
		let mut tx = self.db.begin().await?;

		let Some(comment): Option<Comment> = sqlx::query_as("SELECT * FROM comments WHERE id = $1 FOR UPDATE")
			.bind(id)
			.fetch_optional(&mut *tx)
			.await?
		else {
			return Ok(None);
		};

		let removed = sqlx::query(
			"WITH RECURSIVE tree AS (
				SELECT id FROM comments WHERE id = $1
				UNION ALL
				SELECT c.id FROM comments c JOIN tree t ON c.parent_id = t.id
			)
			DELETE FROM comments WHERE id IN (SELECT id FROM tree)",
		)
		.bind(id)
		.execute(&mut *tx)
		.await?
		.rows_affected() as i64;

		if let Some(target) = comment.target() {
			sqlx::query(&format!(
				"UPDATE {} SET comments_count = GREATEST(comments_count - $2, 0) WHERE id = $1",
				table(target)
			))
			.bind(target.id())
			.bind(removed)
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;

		Ok(Some(removed))
	}

	async fn is_liked(&self, user_id: Uuid, target: Target) -> StoreResult<bool> {
		Ok(sqlx::query_scalar(&format!(
			"SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = $1 AND {} = $2)",
			column(target)
		))
		.bind(user_id)
		.bind(target.id())
		.fetch_one(&self.db)
		.await?)
	}

	async fn like(&self, user_id: Uuid, target: Target) -> StoreResult<LikeState> {
		let mut tx = self.db.begin().await?;

		sqlx::query("INSERT INTO likes (id, user_id, video_id, text_post_id) VALUES ($1, $2, $3, $4)")
			.bind(Uuid::new_v4())
			.bind(user_id)
			.bind(target.video_id())
			.bind(target.text_post_id())
			.execute(&mut *tx)
			.await
			.map_err(|err| constraint_error(err, "Already liked", TARGET_KEYS))?;

		let likes_count: i64 = sqlx::query_scalar(&format!(
			"UPDATE {} SET likes_count = likes_count + 1 WHERE id = $1 RETURNING likes_count",
			table(target)
		))
		.bind(target.id())
		.fetch_one(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(LikeState { liked: true, likes_count })
	}

	async fn unlike(&self, user_id: Uuid, target: Target) -> StoreResult<Option<LikeState>> {
		let mut tx = self.db.begin().await?;

		let removed = sqlx::query(&format!("DELETE FROM likes WHERE user_id = $1 AND {} = $2", column(target)))
			.bind(user_id)
			.bind(target.id())
			.execute(&mut *tx)
			.await?
			.rows_affected();

		if removed == 0 {
			return Ok(None);
		}

		let likes_count: Option<i64> = sqlx::query_scalar(&format!(
			"UPDATE {} SET likes_count = GREATEST(likes_count - 1, 0) WHERE id = $1 RETURNING likes_count",
			table(target)
		))
		.bind(target.id())
		.fetch_optional(&mut *tx)
		.await?;

		tx.commit().await?;

		Ok(Some(LikeState {
			liked: false,
			likes_count: likes_count.unwrap_or_default(),
		}))
	}

	async fn list_likes(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Like>> {
		Ok(
			sqlx::query_as("SELECT * FROM likes WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2")
				.bind(user_id)
				.bind(limit)
				.fetch_all(&self.db)
				.await?,
		)
	}

	async fn is_bookmarked(&self, user_id: Uuid, target: Target) -> StoreResult<bool> {
		Ok(sqlx::query_scalar(&format!(
			"SELECT EXISTS(SELECT 1 FROM bookmarks WHERE user_id = $1 AND {} = $2)",
			column(target)
		))
		.bind(user_id)
		.bind(target.id())
		.fetch_one(&self.db)
		.await?)
	}

	async fn bookmark(&self, user_id: Uuid, target: Target) -> StoreResult<Bookmark> {
		sqlx::query_as("INSERT INTO bookmarks (id, user_id, video_id, text_post_id) VALUES ($1, $2, $3, $4) RETURNING *")
			.bind(Uuid::new_v4())
			.bind(user_id)
			.bind(target.video_id())
			.bind(target.text_post_id())
			.fetch_one(&self.db)
			.await
			.map_err(|err| constraint_error(err, "Already bookmarked", TARGET_KEYS))
	}

	async fn remove_bookmark(&self, user_id: Uuid, target: Target) -> StoreResult<bool> {
		let result = sqlx::query(&format!(
			"DELETE FROM bookmarks WHERE user_id = $1 AND {} = $2",
			column(target)
		))
		.bind(user_id)
		.bind(target.id())
		.execute(&self.db)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	async fn list_bookmarks(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<Bookmark>> {
		Ok(
			sqlx::query_as("SELECT * FROM bookmarks WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2")
				.bind(user_id)
				.bind(limit)
				.fetch_all(&self.db)
				.await?,
		)
	}

	async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> StoreResult<bool> {
		Ok(
			sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)")
				.bind(follower_id)
				.bind(following_id)
				.fetch_one(&self.db)
				.await?,
		)
	}

	async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> StoreResult<Follow> {
		sqlx::query_as("INSERT INTO follows (id, follower_id, following_id) VALUES ($1, $2, $3) RETURNING *")
			.bind(Uuid::new_v4())
			.bind(follower_id)
			.bind(following_id)
			.fetch_one(&self.db)
			.await
			.map_err(|err| {
				constraint_error(
					err,
					"Already following",
					&[("follows_follower_id_fkey", "User"), ("follows_following_id_fkey", "User")],
				)
			})
	}

	async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> StoreResult<bool> {
		let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
			.bind(follower_id)
			.bind(following_id)
			.execute(&self.db)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	async fn follow_counts(&self, user_id: Uuid) -> StoreResult<FollowCounts> {
		let (followers_count, following_count) = sqlx::query_as(
			"SELECT
				(SELECT COUNT(*) FROM follows WHERE following_id = $1),
				(SELECT COUNT(*) FROM follows WHERE follower_id = $1)",
		)
		.bind(user_id)
		.fetch_one(&self.db)
		.await?;

		Ok(FollowCounts {
			followers_count,
			following_count,
		})
	}

	async fn list_follows(&self, user_id: Uuid, direction: FollowDirection, limit: i64) -> StoreResult<Vec<User>> {
		let (join, filter) = match direction {
			FollowDirection::Followers => ("follower_id", "following_id"),
			FollowDirection::Following => ("following_id", "follower_id"),
		};

		Ok(sqlx::query_as(&format!(
			"SELECT u.* FROM follows f JOIN users u ON u.id = f.{join} WHERE f.{filter} = $1 ORDER BY f.created_at DESC, f.id DESC LIMIT $2"
		))
		.bind(user_id)
		.bind(limit)
		.fetch_all(&self.db)
		.await?)
	}

	async fn following_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
		Ok(sqlx::query_scalar("SELECT following_id FROM follows WHERE follower_id = $1")
			.bind(user_id)
			.fetch_all(&self.db)
			.await?)
	}

	async fn get_tier(&self, id: Uuid) -> StoreResult<Option<SubscriptionTier>> {
		Ok(sqlx::query_as("SELECT * FROM subscription_tiers WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db)
			.await?)
	}

	async fn get_tiers(&self, ids: &[Uuid]) -> StoreResult<Vec<SubscriptionTier>> {
		Ok(sqlx::query_as("SELECT * FROM subscription_tiers WHERE id = ANY($1)")
			.bind(ids)
			.fetch_all(&self.db)
			.await?)
	}

	async fn list_tiers(&self, creator_id: Uuid, include_inactive: bool) -> StoreResult<Vec<SubscriptionTier>> {
		Ok(sqlx::query_as(
			"SELECT * FROM subscription_tiers WHERE creator_id = $1 AND ($2 OR is_active) ORDER BY price_cents, created_at, id",
		)
		.bind(creator_id)
		.bind(include_inactive)
		.fetch_all(&self.db)
		.await?)
	}

	async fn create_tier(&self, tier: NewTier) -> StoreResult<SubscriptionTier> {
		let mut tx = self.db.begin().await?;

		let created: SubscriptionTier = sqlx::query_as(
			"INSERT INTO subscription_tiers (id, creator_id, name, description, price_cents, benefits) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
		)
		.bind(Uuid::new_v4())
		.bind(tier.creator_id)
		.bind(tier.name)
		.bind(tier.description)
		.bind(tier.price_cents)
		.bind(tier.benefits)
		.fetch_one(&mut *tx)
		.await
		.map_err(|err| {
			constraint_error(
				err,
				"A tier with this name already exists",
				&[("subscription_tiers_creator_id_fkey", "Creator")],
			)
		})?;

		sqlx::query("UPDATE users SET is_creator = TRUE, updated_at = NOW() WHERE id = $1 AND NOT is_creator")
			.bind(created.creator_id)
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		Ok(created)
	}

	async fn update_tier(&self, id: Uuid, patch: TierPatch) -> StoreResult<Option<SubscriptionTier>> {
		let mut qb = QueryBuilder::<Postgres>::new("UPDATE subscription_tiers SET updated_at = NOW()");

		if let Some(name) = patch.name {
			qb.push(", name = ").push_bind(name);
		}

		if let Some(description) = patch.description {
			qb.push(", description = ").push_bind(non_empty(description));
		}

		if let Some(price_cents) = patch.price_cents {
			qb.push(", price_cents = ").push_bind(price_cents);
		}

		if let Some(benefits) = patch.benefits {
			qb.push(", benefits = ").push_bind(benefits);
		}

		if let Some(is_active) = patch.is_active {
			qb.push(", is_active = ").push_bind(is_active);
		}

		qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

		qb.build_query_as()
			.fetch_optional(&self.db)
			.await
			.map_err(|err| constraint_error(err, "A tier with this name already exists", &[]))
	}

	async fn delete_tier(&self, id: Uuid) -> StoreResult<bool> {
		let result = sqlx::query("DELETE FROM subscription_tiers WHERE id = $1")
			.bind(id)
			.execute(&self.db)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	async fn count_current_subscriptions(&self, tier_id: Uuid, now: DateTime<Utc>) -> StoreResult<i64> {
		Ok(sqlx::query_scalar(
			"SELECT COUNT(*) FROM user_subscriptions WHERE tier_id = $1 AND status = 'active' AND current_period_end > $2",
		)
		.bind(tier_id)
		.bind(now)
		.fetch_one(&self.db)
		.await?)
	}

	async fn get_subscription(&self, id: Uuid) -> StoreResult<Option<UserSubscription>> {
		Ok(sqlx::query_as("SELECT * FROM user_subscriptions WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.db)
			.await?)
	}

	async fn current_subscription(
		&self,
		subscriber_id: Uuid,
		creator_id: Uuid,
		now: DateTime<Utc>,
	) -> StoreResult<Option<UserSubscription>> {
		Ok(sqlx::query_as(
			"SELECT * FROM user_subscriptions WHERE subscriber_id = $1 AND creator_id = $2 AND status = 'active' AND current_period_end > $3",
		)
		.bind(subscriber_id)
		.bind(creator_id)
		.bind(now)
		.fetch_optional(&self.db)
		.await?)
	}

	async fn list_subscriptions(&self, subscriber_id: Uuid) -> StoreResult<Vec<UserSubscription>> {
		Ok(sqlx::query_as(
			"SELECT * FROM user_subscriptions WHERE subscriber_id = $1 ORDER BY started_at DESC, id DESC",
		)
		.bind(subscriber_id)
		.fetch_all(&self.db)
		.await?)
	}

	async fn list_current_subscribers(&self, creator_id: Uuid, now: DateTime<Utc>) -> StoreResult<Vec<UserSubscription>> {
		Ok(sqlx::query_as(
			"SELECT * FROM user_subscriptions WHERE creator_id = $1 AND status = 'active' AND current_period_end > $2 ORDER BY started_at DESC, id DESC",
		)
		.bind(creator_id)
		.bind(now)
		.fetch_all(&self.db)
		.await?)
	}

	async fn create_subscription(&self, subscription: NewSubscription, now: DateTime<Utc>) -> StoreResult<UserSubscription> {
		let mut tx = self.db.begin().await?;

		sqlx::query(
			"UPDATE user_subscriptions SET status = 'expired' WHERE subscriber_id = $1 AND creator_id = $2 AND status = 'active' AND current_period_end <= $3",
		)
		.bind(subscription.subscriber_id)
		.bind(subscription.creator_id)
		.bind(now)
		.execute(&mut *tx)
		.await?;

		let created = sqlx::query_as(
			"INSERT INTO user_subscriptions (id, subscriber_id, creator_id, tier_id, status, started_at, current_period_end) VALUES ($1, $2, $3, $4, 'active', $5, $6) RETURNING *",
		)
		.bind(Uuid::new_v4())
		.bind(subscription.subscriber_id)
		.bind(subscription.creator_id)
		.bind(subscription.tier_id)
		.bind(now)
		.bind(subscription.current_period_end)
		.fetch_one(&mut *tx)
		.await
		.map_err(|err| {
			constraint_error(
				err,
				"Already subscribed to this creator",
				&[
					("user_subscriptions_subscriber_id_fkey", "User"),
					("user_subscriptions_creator_id_fkey", "Creator"),
					("user_subscriptions_tier_id_fkey", "Tier"),
				],
			)
		})?;

		tx.commit().await?;

		Ok(created)
	}

	async fn change_subscription_tier(&self, id: Uuid, tier_id: Uuid) -> StoreResult<Option<UserSubscription>> {
		sqlx::query_as("UPDATE user_subscriptions SET tier_id = $2 WHERE id = $1 RETURNING *")
			.bind(id)
			.bind(tier_id)
			.fetch_optional(&self.db)
			.await
			.map_err(|err| constraint_error(err, "Subscription conflict", &[("user_subscriptions_tier_id_fkey", "Tier")]))
	}

	async fn cancel_subscription(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<Option<UserSubscription>> {
		Ok(sqlx::query_as(
			"UPDATE user_subscriptions SET status = 'cancelled', cancelled_at = $2 WHERE id = $1 RETURNING *",
		)
		.bind(id)
		.bind(now)
		.fetch_optional(&self.db)
		.await?)
	}

	async fn create_tip(&self, tip: NewTip) -> StoreResult<Tip> {
		sqlx::query_as(
			"INSERT INTO tips (id, sender_id, recipient_id, amount_cents, message, video_id) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
		)
		.bind(Uuid::new_v4())
		.bind(tip.sender_id)
		.bind(tip.recipient_id)
		.bind(tip.amount_cents)
		.bind(tip.message)
		.bind(tip.video_id)
		.fetch_one(&self.db)
		.await
		.map_err(|err| {
			constraint_error(
				err,
				"Tip already exists",
				&[
					("tips_sender_id_fkey", "User"),
					("tips_recipient_id_fkey", "User"),
					("tips_video_id_fkey", "Video"),
				],
			)
		})
	}

	async fn list_tips(&self, filter: TipFilter, limit: i64) -> StoreResult<Vec<Tip>> {
		let (column, id) = tip_column(filter);

		Ok(sqlx::query_as(&format!(
			"SELECT * FROM tips WHERE {column} = $1 ORDER BY created_at DESC, id DESC LIMIT $2"
		))
		.bind(id)
		.bind(limit)
		.fetch_all(&self.db)
		.await?)
	}

	async fn tip_totals(&self, filter: TipFilter, since: Option<DateTime<Utc>>) -> StoreResult<TipTotals> {
		let (column, id) = tip_column(filter);

		let (count, total_cents) = sqlx::query_as(&format!(
			"SELECT COUNT(*), COALESCE(SUM(amount_cents), 0)::BIGINT FROM tips WHERE {column} = $1 AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2)"
		))
		.bind(id)
		.bind(since)
		.fetch_one(&self.db)
		.await?;

		Ok(TipTotals { count, total_cents })
	}
}

fn tip_column(filter: TipFilter) -> (&'static str, Uuid) {
	match filter {
		TipFilter::Recipient(id) => ("recipient_id", id),
		TipFilter::Sender(id) => ("sender_id", id),
	}
}
