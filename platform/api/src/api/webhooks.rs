use common::http::ext::ResultExt;
use common::http::json_response;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;

use super::error::Result;
use super::ext::RequestExt;
use super::request;
use super::Builder;
use crate::global::ApiGlobal;
use crate::video_host::{WebhookEvent, SIGNATURE_HEADER};

async fn video<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;

	let signature = req
		.headers()
		.get(SIGNATURE_HEADER)
		.and_then(|value| value.to_str().ok())
		.map(str::to_owned);

	let body = request::body(global.as_ref(), &mut req).await?;

	global
		.video_host()
		.verify_webhook(signature.as_deref(), &body, chrono::Utc::now().timestamp())
		.map_err_route((StatusCode::BAD_REQUEST, "Invalid webhook signature"))?;

	let event: WebhookEvent = serde_json::from_slice(&body).map_err_route((StatusCode::BAD_REQUEST, "Invalid JSON body"))?;

	let Some(update) = global.video_host().asset_update(&event) else {
		tracing::debug!(kind = %event.kind, "ignoring video host event");
		return Ok(json_response(StatusCode::OK, &json!({ "received": true, "handled": false })));
	};

	let mut video = None;
	for lookup in event.lookups() {
		video = global.store().find_video(lookup).await?;
		if video.is_some() {
			break;
		}
	}

	let Some(video) = video else {
		tracing::warn!(kind = %event.kind, "video host event for an unknown video");
		return Err((StatusCode::NOT_FOUND, "Video not found").into());
	};

	let Some(video) = global.store().update_video_asset(video.id, update).await? else {
		return Err((StatusCode::NOT_FOUND, "Video not found").into());
	};

	tracing::info!(
		video_id = %video.id,
		kind = %event.kind,
		status = video.status.as_str(),
		"video updated from video host event"
	);

	Ok(json_response(StatusCode::OK, &json!({ "received": true, "handled": true })))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router.post("/api/webhooks/video", video::<G>)
}
