use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct TextPost {
	pub id: Uuid,
	pub user_id: Uuid,
	pub title: Option<String>,
	pub content: String,
	pub category: Option<String>,
	pub views_count: i64,
	pub likes_count: i64,
	pub comments_count: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTextPost {
	pub user_id: Uuid,
	pub title: Option<String>,
	pub content: String,
	pub category: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TextPostPatch {
	pub title: Option<String>,
	pub content: Option<String>,
	pub category: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TextPostFilter {
	pub user_id: Option<Uuid>,
	pub category: Option<String>,
	pub limit: i64,
}

pub const MAX_CONTENT_LENGTH: usize = 10_000;

pub fn validate_content(content: &str) -> Result<(), &'static str> {
	if content.trim().is_empty() {
		return Err("Content must not be empty");
	}

	if content.chars().count() > MAX_CONTENT_LENGTH {
		return Err("Content must be at most 10000 characters long");
	}

	Ok(())
}

impl TextPostPatch {
	pub fn is_empty(&self) -> bool {
		self.title.is_none() && self.content.is_none() && self.category.is_none()
	}
}
