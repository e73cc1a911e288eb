use uuid::Uuid;

/// The piece of content a like, bookmark, comment or view refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
	Video(Uuid),
	TextPost(Uuid),
}

impl Target {
	/// Exactly one of the ids has to be set.
	pub fn from_ids(video_id: Option<Uuid>, text_post_id: Option<Uuid>) -> Option<Self> {
		match (video_id, text_post_id) {
			(Some(id), None) => Some(Self::Video(id)),
			(None, Some(id)) => Some(Self::TextPost(id)),
			_ => None,
		}
	}

	pub fn id(&self) -> Uuid {
		match self {
			Self::Video(id) | Self::TextPost(id) => *id,
		}
	}

	pub fn video_id(&self) -> Option<Uuid> {
		match self {
			Self::Video(id) => Some(*id),
			Self::TextPost(_) => None,
		}
	}

	pub fn text_post_id(&self) -> Option<Uuid> {
		match self {
			Self::Video(_) => None,
			Self::TextPost(id) => Some(*id),
		}
	}

	/// Human readable name, used in error messages.
	pub fn noun(&self) -> &'static str {
		match self {
			Self::Video(_) => "Video",
			Self::TextPost(_) => "Text post",
		}
	}
}

/// Counters and owner of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
pub struct TargetCounters {
	#[serde(skip)]
	pub user_id: Uuid,
	pub likes_count: i64,
	pub comments_count: i64,
	pub views_count: i64,
}
