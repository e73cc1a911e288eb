use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Target, TextPost, Video};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct Bookmark {
	pub id: Uuid,
	pub user_id: Uuid,
	pub video_id: Option<Uuid>,
	pub text_post_id: Option<Uuid>,
	pub created_at: DateTime<Utc>,
}

impl Bookmark {
	pub fn target(&self) -> Option<Target> {
		Target::from_ids(self.video_id, self.text_post_id)
	}
}

/// A bookmark with the bookmarked content embedded.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BookmarkWithContent {
	#[serde(flatten)]
	pub bookmark: Bookmark,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub video: Option<Video>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub text_post: Option<TextPost>,
}
