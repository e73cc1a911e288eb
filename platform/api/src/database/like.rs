use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Target;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct Like {
	pub id: Uuid,
	pub user_id: Uuid,
	pub video_id: Option<Uuid>,
	pub text_post_id: Option<Uuid>,
	pub created_at: DateTime<Utc>,
}

impl Like {
	pub fn target(&self) -> Option<Target> {
		Target::from_ids(self.video_id, self.text_post_id)
	}
}

/// Result of liking or unliking a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LikeState {
	pub liked: bool,
	pub likes_count: i64,
}
