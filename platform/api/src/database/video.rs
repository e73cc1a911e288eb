use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
	/// Waiting for the file to reach the video host.
	Uploading,
	/// The video host is transcoding the asset.
	Processing,
	/// Playable.
	Ready,
	/// The upload or the transcode failed.
	Errored,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown video status: {0}")]
pub struct UnknownVideoStatus(String);

impl VideoStatus {
	/// Playable videos stay playable and the pipeline never moves backwards.
	/// A failed video may start over.
	pub fn can_become(self, next: Self) -> bool {
		match (self, next) {
			(Self::Ready, next) => next == Self::Ready,
			(Self::Errored, _) | (_, Self::Errored) => true,
			(Self::Processing, Self::Uploading) => false,
			_ => true,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Uploading => "uploading",
			Self::Processing => "processing",
			Self::Ready => "ready",
			Self::Errored => "errored",
		}
	}
}

impl FromStr for VideoStatus {
	type Err = UnknownVideoStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"uploading" => Ok(Self::Uploading),
			"processing" => Ok(Self::Processing),
			"ready" => Ok(Self::Ready),
			"errored" => Ok(Self::Errored),
			_ => Err(UnknownVideoStatus(s.to_owned())),
		}
	}
}

impl TryFrom<String> for VideoStatus {
	type Error = UnknownVideoStatus;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, serde::Serialize)]
pub struct Video {
	pub id: Uuid,
	/// The owner of the video.
	pub user_id: Uuid,
	pub title: String,
	pub description: Option<String>,
	pub category: Option<String>,
	#[sqlx(try_from = "String")]
	pub status: VideoStatus,
	/// The direct upload this video is waiting on.
	pub upload_id: Option<String>,
	/// The asset on the video host.
	pub asset_id: Option<String>,
	pub playback_id: Option<String>,
	pub playback_url: Option<String>,
	pub thumbnail_url: Option<String>,
	pub duration_seconds: Option<f64>,
	pub error_message: Option<String>,
	pub views_count: i64,
	pub likes_count: i64,
	pub comments_count: i64,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
	pub user_id: Uuid,
	pub title: String,
	pub description: Option<String>,
	pub category: Option<String>,
	pub status: VideoStatus,
	pub playback_url: Option<String>,
	pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoPatch {
	pub title: Option<String>,
	pub description: Option<String>,
	pub category: Option<String>,
	pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
	pub user_id: Option<Uuid>,
	pub category: Option<String>,
	pub status: Option<VideoStatus>,
	pub limit: i64,
}

/// How a video host event identifies its video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoLookup {
	Id(Uuid),
	UploadId(String),
	AssetId(String),
}

/// A status transition reported by the video host. `None` fields keep the
/// stored value, `default_thumbnail_url` is only used when no thumbnail is set.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAssetUpdate {
	pub status: VideoStatus,
	pub asset_id: Option<String>,
	pub playback_id: Option<String>,
	pub playback_url: Option<String>,
	pub default_thumbnail_url: Option<String>,
	pub duration_seconds: Option<f64>,
	pub error_message: Option<String>,
}

impl VideoAssetUpdate {
	pub fn status(status: VideoStatus) -> Self {
		Self {
			status,
			asset_id: None,
			playback_id: None,
			playback_url: None,
			default_thumbnail_url: None,
			duration_seconds: None,
			error_message: None,
		}
	}

	/// The status and error message of a video in `status` once this update
	/// is applied. Only errored videos keep an error message.
	pub fn outcome(&self, status: VideoStatus, error_message: Option<&str>) -> (VideoStatus, Option<String>) {
		let status = match status.can_become(self.status) {
			true => self.status,
			false => status,
		};

		let error_message = match status {
			VideoStatus::Errored => self.error_message.as_deref().or(error_message).map(str::to_owned),
			_ => None,
		};

		(status, error_message)
	}
}

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 5000;
pub const MAX_CATEGORY_LENGTH: usize = 64;

pub fn validate_title(title: &str) -> Result<(), &'static str> {
	if title.trim().is_empty() {
		return Err("Title must not be empty");
	}

	if title.chars().count() > MAX_TITLE_LENGTH {
		return Err("Title must be at most 200 characters long");
	}

	Ok(())
}

pub fn validate_description(description: &str) -> Result<(), &'static str> {
	if description.chars().count() > MAX_DESCRIPTION_LENGTH {
		return Err("Description must be at most 5000 characters long");
	}

	Ok(())
}

pub fn validate_category(category: &str) -> Result<(), &'static str> {
	if category.chars().count() > MAX_CATEGORY_LENGTH {
		return Err("Category must be at most 64 characters long");
	}

	Ok(())
}

impl VideoPatch {
	pub fn is_empty(&self) -> bool {
		self.title.is_none() && self.description.is_none() && self.category.is_none() && self.thumbnail_url.is_none()
	}
}
