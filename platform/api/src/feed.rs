use std::cmp::Ordering;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use uuid::Uuid;

use crate::database::{TextPost, Video};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSort {
	#[default]
	Recent,
	Trending,
}

/// Which kinds of content to include.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
	#[default]
	All,
	Video,
	TextPost,
}

impl ContentKind {
	pub fn videos(&self) -> bool {
		matches!(self, Self::All | Self::Video)
	}

	pub fn text_posts(&self) -> bool {
		matches!(self, Self::All | Self::TextPost)
	}
}

/// How a store orders the rows it returns for a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrder {
	/// Newest first.
	Recent,
	/// Highest engagement score first, then newest.
	Engagement,
}

/// A query against one content source.
#[derive(Debug, Clone)]
pub struct FeedFetch {
	pub category: Option<String>,
	/// Restricts the rows to these authors.
	pub authors: Option<Vec<Uuid>>,
	/// Only rows created strictly before this instant.
	pub before: Option<DateTime<Utc>>,
	/// Only rows created at or after this instant.
	pub since: Option<DateTime<Utc>>,
	pub order: FeedOrder,
	pub limit: i64,
}

impl FeedFetch {
	/// Whether a row passes the fetch's filters. Stores that cannot push the
	/// filters into a query use this.
	pub fn matches(&self, user_id: Uuid, category: Option<&str>, created_at: DateTime<Utc>) -> bool {
		if let Some(wanted) = &self.category {
			if category != Some(wanted.as_str()) {
				return false;
			}
		}

		if let Some(authors) = &self.authors {
			if !authors.contains(&user_id) {
				return false;
			}
		}

		if self.before.is_some_and(|before| created_at >= before) {
			return false;
		}

		if self.since.is_some_and(|since| created_at < since) {
			return false;
		}

		true
	}
}

pub fn engagement_score(views: i64, likes: i64, comments: i64) -> i64 {
	views + 2 * likes + 3 * comments
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedItem {
	Video(Video),
	TextPost(TextPost),
}

impl FeedItem {
	pub fn id(&self) -> Uuid {
		match self {
			Self::Video(v) => v.id,
			Self::TextPost(p) => p.id,
		}
	}

	pub fn user_id(&self) -> Uuid {
		match self {
			Self::Video(v) => v.user_id,
			Self::TextPost(p) => p.user_id,
		}
	}

	pub fn created_at(&self) -> DateTime<Utc> {
		match self {
			Self::Video(v) => v.created_at,
			Self::TextPost(p) => p.created_at,
		}
	}

	pub fn score(&self) -> i64 {
		match self {
			Self::Video(v) => engagement_score(v.views_count, v.likes_count, v.comments_count),
			Self::TextPost(p) => engagement_score(p.views_count, p.likes_count, p.comments_count),
		}
	}
}

/// Newest first, ties broken by id.
pub fn recent_order(a: &FeedItem, b: &FeedItem) -> Ordering {
	b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id()))
}

fn trending_order(a: &FeedItem, b: &FeedItem) -> Ordering {
	b.score().cmp(&a.score()).then_with(|| recent_order(a, b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCursor {
	Before(DateTime<Utc>),
	Offset(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
	#[error("invalid cursor: {0}")]
	InvalidCursor(String),
	#[error("store error: {0}")]
	Store(#[from] StoreError),
}

impl FeedCursor {
	pub fn parse(sort: FeedSort, cursor: &str) -> Result<Self, FeedError> {
		match sort {
			FeedSort::Recent => DateTime::parse_from_rfc3339(cursor)
				.map(|at| Self::Before(at.with_timezone(&Utc)))
				.map_err(|_| FeedError::InvalidCursor(cursor.to_owned())),
			FeedSort::Trending => match cursor.parse::<i64>() {
				Ok(offset) if offset >= 0 => Ok(Self::Offset(offset)),
				_ => Err(FeedError::InvalidCursor(cursor.to_owned())),
			},
		}
	}

	pub fn encode(&self) -> String {
		match self {
			Self::Before(at) => at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
			Self::Offset(offset) => offset.to_string(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct FeedRequest {
	pub sort: FeedSort,
	pub kind: ContentKind,
	pub category: Option<String>,
	/// `Some` limits the feed to these authors, an empty list yields an empty
	/// page.
	pub authors: Option<Vec<Uuid>>,
	pub cursor: Option<String>,
	pub limit: i64,
	pub trending_window: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
	pub items: Vec<FeedItem>,
	pub next_cursor: Option<String>,
}

fn merge(videos: Vec<Video>, text_posts: Vec<TextPost>) -> Vec<FeedItem> {
	videos
		.into_iter()
		.map(FeedItem::Video)
		.chain(text_posts.into_iter().map(FeedItem::TextPost))
		.collect()
}

/// Merges both sources newest first and keeps the first `limit` items.
pub fn merge_recent(videos: Vec<Video>, text_posts: Vec<TextPost>, limit: usize) -> Vec<FeedItem> {
	let mut items = merge(videos, text_posts);
	items.sort_by(recent_order);
	items.truncate(limit);
	items
}

/// Merges both sources by engagement score and returns the `limit` items
/// after `offset`.
pub fn merge_trending(videos: Vec<Video>, text_posts: Vec<TextPost>, offset: usize, limit: usize) -> Vec<FeedItem> {
	let mut items = merge(videos, text_posts);
	items.sort_by(trending_order);
	items.into_iter().skip(offset).take(limit).collect()
}

/// Assembles one page of the feed from ready videos and text posts.
pub async fn get_feed_items(store: &dyn Store, request: FeedRequest, now: DateTime<Utc>) -> Result<FeedPage, FeedError> {
	let cursor = request
		.cursor
		.as_deref()
		.map(|cursor| FeedCursor::parse(request.sort, cursor))
		.transpose()?;

	let empty = FeedPage {
		items: Vec::new(),
		next_cursor: None,
	};

	if request.authors.as_ref().is_some_and(|authors| authors.is_empty()) {
		return Ok(empty);
	}

	let limit = request.limit.max(1);

	let (fetch, offset) = match request.sort {
		FeedSort::Recent => (
			FeedFetch {
				category: request.category,
				authors: request.authors,
				before: match cursor {
					Some(FeedCursor::Before(at)) => Some(at),
					_ => None,
				},
				since: None,
				order: FeedOrder::Recent,
				limit,
			},
			0,
		),
		FeedSort::Trending => {
			let offset = match cursor {
				Some(FeedCursor::Offset(offset)) => offset,
				_ => 0,
			};

			(
				FeedFetch {
					category: request.category,
					authors: request.authors,
					before: None,
					since: Some(now - request.trending_window),
					order: FeedOrder::Engagement,
					limit: offset.saturating_add(limit),
				},
				offset,
			)
		}
	};

	let videos = match request.kind.videos() {
		true => store.feed_videos(&fetch).await?,
		false => Vec::new(),
	};

	let text_posts = match request.kind.text_posts() {
		true => store.feed_text_posts(&fetch).await?,
		false => Vec::new(),
	};

	let items = match request.sort {
		FeedSort::Recent => merge_recent(videos, text_posts, limit as usize),
		FeedSort::Trending => merge_trending(videos, text_posts, offset as usize, limit as usize),
	};

	if (items.len() as i64) < limit {
		return Ok(FeedPage {
			items,
			next_cursor: None,
		});
	}

	let next_cursor = match request.sort {
		FeedSort::Recent => items.last().map(|item| FeedCursor::Before(item.created_at()).encode()),
		FeedSort::Trending => Some(FeedCursor::Offset(offset + limit).encode()),
	};

	Ok(FeedPage { items, next_cursor })
}
