use std::time::Duration;

use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use crate::config::VideoHostConfig;
use crate::database::{VideoAssetUpdate, VideoLookup, VideoStatus};

/// The header the video host signs webhooks with.
pub const SIGNATURE_HEADER: &str = "mux-signature";

#[derive(Debug, thiserror::Error)]
pub enum VideoHostError {
	#[error("reqwest error: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("video host answered {status}: {body}")]
	Status { status: u16, body: String },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
	#[error("missing signature header")]
	Missing,
	#[error("malformed signature header")]
	Malformed,
	#[error("signature timestamp outside of tolerance")]
	Expired,
	#[error("signature mismatch")]
	Mismatch,
}

/// A direct upload URL the client can `PUT` the video file to.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct DirectUpload {
	pub id: String,
	pub url: String,
}

#[derive(serde::Deserialize)]
struct Envelope<T> {
	data: T,
}

/// Client for the video host's REST API.
pub struct VideoHostClient {
	http: reqwest::Client,
	config: VideoHostConfig,
}

impl VideoHostClient {
	pub fn new(config: VideoHostConfig) -> Result<Self, VideoHostError> {
		let http = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.timeout_secs))
			.build()?;

		Ok(Self { http, config })
	}

	/// Requests a direct upload whose asset echoes `passthrough` back in
	/// webhooks.
	pub async fn create_upload(&self, passthrough: Uuid) -> Result<DirectUpload, VideoHostError> {
		let body = json!({
			"cors_origin": self.config.cors_origin,
			"new_asset_settings": {
				"playback_policy": ["public"],
				"passthrough": passthrough.to_string(),
			},
		});

		let res = self
			.http
			.post(format!("{}/video/v1/uploads", self.config.api_url.trim_end_matches('/')))
			.basic_auth(&self.config.token_id, Some(&self.config.token_secret))
			.json(&body)
			.send()
			.await?;

		let status = res.status();
		if !status.is_success() {
			let body = res.text().await.unwrap_or_default();
			return Err(VideoHostError::Status {
				status: status.as_u16(),
				body,
			});
		}

		Ok(res.json::<Envelope<DirectUpload>>().await?.data)
	}

	pub fn playback_url(&self, playback_id: &str) -> String {
		format!("{}/{playback_id}.m3u8", self.config.playback_base_url.trim_end_matches('/'))
	}

	pub fn thumbnail_url(&self, playback_id: &str) -> String {
		format!(
			"{}/{playback_id}/thumbnail.jpg",
			self.config.thumbnail_base_url.trim_end_matches('/')
		)
	}

	/// Checks the webhook signature when a secret is configured.
	pub fn verify_webhook(&self, header: Option<&str>, body: &[u8], now: i64) -> Result<(), SignatureError> {
		let Some(secret) = self.config.webhook_secret.as_deref() else {
			return Ok(());
		};

		verify_signature(
			secret,
			header.ok_or(SignatureError::Missing)?,
			body,
			now,
			self.config.webhook_tolerance_secs,
		)
	}

	/// Translates an event into the update it implies, `None` for events the
	/// API does not act on.
	pub fn asset_update(&self, event: &WebhookEvent) -> Option<VideoAssetUpdate> {
		let data = &event.data;

		match event.kind.as_str() {
			"video.upload.asset_created" | "video.asset.created" => Some(VideoAssetUpdate {
				asset_id: event.asset_id(),
				..VideoAssetUpdate::status(VideoStatus::Processing)
			}),
			"video.asset.ready" => {
				let playback_id = data
					.playback_ids
					.iter()
					.find(|p| p.policy.as_deref() == Some("public"))
					.map(|p| p.id.clone());

				Some(VideoAssetUpdate {
					asset_id: event.asset_id(),
					playback_url: playback_id.as_deref().map(|id| self.playback_url(id)),
					default_thumbnail_url: playback_id.as_deref().map(|id| self.thumbnail_url(id)),
					playback_id,
					duration_seconds: data.duration,
					..VideoAssetUpdate::status(VideoStatus::Ready)
				})
			}
			"video.asset.errored" | "video.upload.errored" | "video.upload.cancelled" => {
				let messages = data
					.errors
					.as_ref()
					.map(|errors| errors.messages.join("; "))
					.filter(|message| !message.is_empty());

				let fallback = match event.kind.as_str() {
					"video.upload.cancelled" => "Upload cancelled",
					_ => "Video processing failed",
				};

				Some(VideoAssetUpdate {
					asset_id: event.asset_id(),
					error_message: Some(messages.unwrap_or_else(|| fallback.to_owned())),
					..VideoAssetUpdate::status(VideoStatus::Errored)
				})
			}
			_ => None,
		}
	}
}

type HmacSha256 = Hmac<Sha256>;

/// Verifies a `t=<unix>,v1=<hex>` header against `"<t>.<body>"`.
pub fn verify_signature(
	secret: &str,
	header: &str,
	body: &[u8],
	now: i64,
	tolerance_secs: u64,
) -> Result<(), SignatureError> {
	let mut timestamp = None;
	let mut signatures = Vec::new();

	for part in header.split(',') {
		match part.trim().split_once('=') {
			Some(("t", value)) => timestamp = Some(value.parse::<i64>().map_err(|_| SignatureError::Malformed)?),
			Some(("v1", value)) => signatures.push(hex::decode(value).map_err(|_| SignatureError::Malformed)?),
			Some(_) => {}
			None => return Err(SignatureError::Malformed),
		}
	}

	let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
	if signatures.is_empty() {
		return Err(SignatureError::Malformed);
	}

	if now.abs_diff(timestamp) > tolerance_secs {
		return Err(SignatureError::Expired);
	}

	let valid = signatures.iter().any(|signature| {
		let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
			return false;
		};
		mac.update(timestamp.to_string().as_bytes());
		mac.update(b".");
		mac.update(body);
		mac.verify_slice(signature).is_ok()
	});

	match valid {
		true => Ok(()),
		false => Err(SignatureError::Mismatch),
	}
}

/// Builds the header [`verify_signature`] accepts.
#[cfg(test)]
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
	let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
	mac.update(timestamp.to_string().as_bytes());
	mac.update(b".");
	mac.update(body);
	format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct WebhookEvent {
	#[serde(rename = "type")]
	pub kind: String,
	pub data: WebhookData,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct WebhookData {
	/// Upload id for `video.upload.*` events, asset id for `video.asset.*`.
	pub id: Option<String>,
	pub upload_id: Option<String>,
	pub asset_id: Option<String>,
	pub passthrough: Option<String>,
	pub new_asset_settings: Option<AssetSettings>,
	pub playback_ids: Vec<PlaybackId>,
	pub duration: Option<f64>,
	pub errors: Option<WebhookErrors>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct AssetSettings {
	pub passthrough: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct PlaybackId {
	pub id: String,
	#[serde(default)]
	pub policy: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct WebhookErrors {
	pub messages: Vec<String>,
}

impl WebhookEvent {
	fn is_upload_event(&self) -> bool {
		self.kind.starts_with("video.upload.")
	}

	pub fn upload_id(&self) -> Option<String> {
		match self.is_upload_event() {
			true => self.data.id.clone(),
			false => self.data.upload_id.clone(),
		}
	}

	pub fn asset_id(&self) -> Option<String> {
		match self.is_upload_event() {
			true => self.data.asset_id.clone(),
			false => self.data.id.clone(),
		}
	}

	pub fn passthrough(&self) -> Option<Uuid> {
		self.data
			.passthrough
			.as_deref()
			.or(self
				.data
				.new_asset_settings
				.as_ref()
				.and_then(|settings| settings.passthrough.as_deref()))
			.and_then(|passthrough| passthrough.parse().ok())
	}

	/// Ways to find the video, in the order they should be tried.
	pub fn lookups(&self) -> Vec<VideoLookup> {
		let mut lookups = Vec::with_capacity(3);

		if let Some(id) = self.passthrough() {
			lookups.push(VideoLookup::Id(id));
		}

		if let Some(upload_id) = self.upload_id() {
			lookups.push(VideoLookup::UploadId(upload_id));
		}

		if let Some(asset_id) = self.asset_id() {
			lookups.push(VideoLookup::AssetId(asset_id));
		}

		lookups
	}
}
