use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
pub struct Tip {
	pub id: Uuid,
	pub sender_id: Uuid,
	pub recipient_id: Uuid,
	pub amount_cents: i64,
	pub message: Option<String>,
	/// The video the tip was sent from, if any.
	pub video_id: Option<Uuid>,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTip {
	pub sender_id: Uuid,
	pub recipient_id: Uuid,
	pub amount_cents: i64,
	pub message: Option<String>,
	pub video_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipFilter {
	Recipient(Uuid),
	Sender(Uuid),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TipTotals {
	pub count: i64,
	pub total_cents: i64,
}
