use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct User {
	/// The identity provider's id for the user.
	pub id: Uuid,
	/// The unique handle of the user.
	pub username: String,
	/// The name shown next to the user's content.
	pub display_name: String,
	/// Never returned by the API.
	#[serde(skip_serializing)]
	pub email: Option<String>,
	pub avatar_url: Option<String>,
	pub bio: Option<String>,
	/// Whether the user has enabled monetization.
	pub is_creator: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// The public part of a user, embedded as `author` in content responses.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct UserSummary {
	pub id: Uuid,
	pub username: String,
	pub display_name: String,
	pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
	pub id: Uuid,
	pub username: String,
	pub display_name: String,
	pub email: Option<String>,
	pub avatar_url: Option<String>,
	pub bio: Option<String>,
}

/// Fields left as `None` are not touched, an empty string clears an optional
/// field.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
	pub username: Option<String>,
	pub display_name: Option<String>,
	pub avatar_url: Option<String>,
	pub bio: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct UserStats {
	pub followers_count: i64,
	pub following_count: i64,
	pub videos_count: i64,
	pub text_posts_count: i64,
}

pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;

impl User {
	pub fn summary(&self) -> UserSummary {
		UserSummary {
			id: self.id,
			username: self.username.clone(),
			display_name: self.display_name.clone(),
			avatar_url: self.avatar_url.clone(),
		}
	}

	/// Validates a username.
	pub fn validate_username(username: &str) -> Result<(), &'static str> {
		if username.len() < 3 {
			return Err("Username must be at least 3 characters long");
		}

		if username.len() > 30 {
			return Err("Username must be at most 30 characters long");
		}

		if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
			return Err("Username must only contain alphanumeric characters and underscores");
		}

		Ok(())
	}

	pub fn validate_display_name(display_name: &str) -> Result<(), &'static str> {
		if display_name.trim().is_empty() {
			return Err("Display name must not be empty");
		}

		if display_name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
			return Err("Display name must be at most 100 characters long");
		}

		Ok(())
	}

	pub fn validate_bio(bio: &str) -> Result<(), &'static str> {
		if bio.chars().count() > MAX_BIO_LENGTH {
			return Err("Bio must be at most 500 characters long");
		}

		Ok(())
	}
}

impl UserPatch {
	pub fn is_empty(&self) -> bool {
		self.username.is_none() && self.display_name.is_none() && self.avatar_url.is_none() && self.bio.is_none()
	}
}

/// Maps an empty string to `None` so a patch can clear an optional field.
pub fn non_empty(value: String) -> Option<String> {
	if value.trim().is_empty() {
		None
	} else {
		Some(value)
	}
}
