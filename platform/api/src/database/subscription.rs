use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
	Active,
	Cancelled,
	/// An active subscription whose period ended, recorded when the pair
	/// subscribes again.
	Expired,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown subscription status: {0}")]
pub struct UnknownSubscriptionStatus(String);

impl SubscriptionStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Active => "active",
			Self::Cancelled => "cancelled",
			Self::Expired => "expired",
		}
	}
}

impl FromStr for SubscriptionStatus {
	type Err = UnknownSubscriptionStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"active" => Ok(Self::Active),
			"cancelled" => Ok(Self::Cancelled),
			"expired" => Ok(Self::Expired),
			_ => Err(UnknownSubscriptionStatus(s.to_owned())),
		}
	}
}

impl TryFrom<String> for SubscriptionStatus {
	type Error = UnknownSubscriptionStatus;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
pub struct UserSubscription {
	pub id: Uuid,
	pub subscriber_id: Uuid,
	pub creator_id: Uuid,
	pub tier_id: Uuid,
	#[sqlx(try_from = "String")]
	pub status: SubscriptionStatus,
	pub started_at: DateTime<Utc>,
	pub current_period_end: DateTime<Utc>,
	pub cancelled_at: Option<DateTime<Utc>>,
}

impl UserSubscription {
	/// Active and inside the paid period.
	pub fn is_current(&self, now: DateTime<Utc>) -> bool {
		self.status == SubscriptionStatus::Active && self.current_period_end > now
	}

	/// Reports an active subscription whose period ended as expired.
	pub fn with_effective_status(mut self, now: DateTime<Utc>) -> Self {
		if self.status == SubscriptionStatus::Active && self.current_period_end <= now {
			self.status = SubscriptionStatus::Expired;
		}

		self
	}
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
	pub subscriber_id: Uuid,
	pub creator_id: Uuid,
	pub tier_id: Uuid,
	pub current_period_end: DateTime<Utc>,
}
