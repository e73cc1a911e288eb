use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
pub struct Follow {
	pub id: Uuid,
	pub follower_id: Uuid,
	pub following_id: Uuid,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct FollowCounts {
	pub followers_count: i64,
	pub following_count: i64,
}

/// Which side of the follow graph to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowDirection {
	/// Users following the given user.
	Followers,
	/// Users the given user follows.
	Following,
}
