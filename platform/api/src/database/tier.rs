use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
pub struct SubscriptionTier {
	pub id: Uuid,
	pub creator_id: Uuid,
	pub name: String,
	pub description: Option<String>,
	/// Monthly price.
	pub price_cents: i64,
	pub benefits: Vec<String>,
	/// Inactive tiers cannot be subscribed to.
	pub is_active: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTier {
	pub creator_id: Uuid,
	pub name: String,
	pub description: Option<String>,
	pub price_cents: i64,
	pub benefits: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TierPatch {
	pub name: Option<String>,
	pub description: Option<String>,
	pub price_cents: Option<i64>,
	pub benefits: Option<Vec<String>>,
	pub is_active: Option<bool>,
}

impl TierPatch {
	pub fn is_empty(&self) -> bool {
		self.name.is_none()
			&& self.description.is_none()
			&& self.price_cents.is_none()
			&& self.benefits.is_none()
			&& self.is_active.is_none()
	}
}

pub const MAX_TIER_NAME_LENGTH: usize = 100;

impl SubscriptionTier {
	pub fn validate_name(name: &str) -> Result<(), &'static str> {
		if name.trim().is_empty() {
			return Err("Name must not be empty");
		}

		if name.chars().count() > MAX_TIER_NAME_LENGTH {
			return Err("Name must be at most 100 characters long");
		}

		Ok(())
	}

	pub fn validate_price(price_cents: i64) -> Result<(), &'static str> {
		if price_cents <= 0 {
			return Err("Price must be greater than zero");
		}

		Ok(())
	}
}
