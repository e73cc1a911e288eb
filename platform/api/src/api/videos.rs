use common::http::ext::OptionExt;
use common::http::{empty_response, json_response, RouteError};
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::error::{ApiError, Result};
use super::ext::RequestExt;
use super::request::{self, bad_request, present, require};
use super::Builder;
use crate::database::{
	validate_category, validate_description, validate_title, NewVideo, Video, VideoAssetUpdate, VideoFilter, VideoPatch,
	VideoStatus,
};
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct VideoQuery {
	id: Option<Uuid>,
	user_id: Option<Uuid>,
	category: Option<String>,
	status: Option<VideoStatus>,
	limit: Option<i64>,
}

#[derive(serde::Deserialize)]
struct CreateVideo {
	user_id: Option<Uuid>,
	title: Option<String>,
	description: Option<String>,
	category: Option<String>,
	playback_url: Option<String>,
	thumbnail_url: Option<String>,
}

#[derive(serde::Deserialize)]
struct UpdateVideo {
	user_id: Option<Uuid>,
	title: Option<String>,
	description: Option<String>,
	category: Option<String>,
	thumbnail_url: Option<String>,
}

fn validate(title: Option<&str>, description: Option<&str>, category: Option<&str>) -> Result<()> {
	if let Some(title) = title {
		validate_title(title).map_err(bad_request)?;
	}

	if let Some(description) = description {
		validate_description(description).map_err(bad_request)?;
	}

	if let Some(category) = category {
		validate_category(category).map_err(bad_request)?;
	}

	Ok(())
}

/// Loads a video the acting user owns.
async fn owned_video<G: ApiGlobal>(global: &G, id: Uuid, user_id: Uuid) -> Result<Video> {
	let video = global
		.store()
		.get_video(id)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Video not found"))?;

	if video.user_id != user_id {
		return Err((StatusCode::FORBIDDEN, "You can only modify your own videos").into());
	}

	Ok(video)
}

async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: VideoQuery = request::query(&req)?;

	if let Some(id) = query.id {
		let video = global
			.store()
			.get_video(id)
			.await?
			.map_err_route((StatusCode::NOT_FOUND, "Video not found"))?;

		let owner = video.user_id;
		let video = request::with_author(global.as_ref(), video, owner).await?;
		return Ok(json_response(StatusCode::OK, &video));
	}

	// Other users only see playable videos unless they ask for a status.
	let status = match (query.status, query.user_id) {
		(Some(status), _) => Some(status),
		(None, Some(_)) => None,
		(None, None) => Some(VideoStatus::Ready),
	};

	let videos = global
		.store()
		.list_videos(VideoFilter {
			user_id: query.user_id,
			category: present(query.category),
			status,
			limit: request::limit(query.limit),
		})
		.await?;

	let videos = request::with_authors(global.as_ref(), videos, |v| v.user_id).await?;

	Ok(json_response(StatusCode::OK, &videos))
}

async fn create<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: CreateVideo = request::json(global.as_ref(), &mut req).await?;

	let user_id = body.user_id;
	let title = present(body.title);
	require!(user_id, title);

	validate(Some(&title), body.description.as_deref(), body.category.as_deref())?;

	let playback_url = present(body.playback_url);
	let status = match playback_url {
		Some(_) => VideoStatus::Ready,
		None => VideoStatus::Uploading,
	};

	let video = global
		.store()
		.create_video(NewVideo {
			user_id,
			title,
			description: present(body.description),
			category: present(body.category),
			status,
			playback_url,
			thumbnail_url: present(body.thumbnail_url),
		})
		.await?;

	tracing::info!(video_id = %video.id, user_id = %user_id, status = video.status.as_str(), "video created");

	Ok(json_response(StatusCode::CREATED, &video))
}

async fn upload<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: CreateVideo = request::json(global.as_ref(), &mut req).await?;

	let user_id = body.user_id;
	let title = present(body.title);
	require!(user_id, title);

	validate(Some(&title), body.description.as_deref(), body.category.as_deref())?;

	let video = global
		.store()
		.create_video(NewVideo {
			user_id,
			title,
			description: present(body.description),
			category: present(body.category),
			status: VideoStatus::Uploading,
			playback_url: None,
			thumbnail_url: None,
		})
		.await?;

	let upload = match global.video_host().create_upload(video.id).await {
		Ok(upload) => upload,
		Err(err) => {
			let update = VideoAssetUpdate {
				error_message: Some(err.to_string()),
				..VideoAssetUpdate::status(VideoStatus::Errored)
			};

			if let Err(err) = global.store().update_video_asset(video.id, update).await {
				tracing::error!(video_id = %video.id, error = %err, "failed to mark video as errored");
			}

			return Err(RouteError::<ApiError>::from((
				StatusCode::INTERNAL_SERVER_ERROR,
				"Internal server error",
				err,
			)));
		}
	};

	let video = global
		.store()
		.set_video_upload(video.id, &upload.id)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Video not found"))?;

	tracing::info!(video_id = %video.id, upload_id = %upload.id, "direct upload created");

	Ok(json_response(
		StatusCode::CREATED,
		&json!({
			"video": video,
			"upload_url": upload.url,
			"upload_id": upload.id,
		}),
	))
}

async fn update<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: VideoQuery = request::query(&req)?;
	let body: UpdateVideo = request::json(global.as_ref(), &mut req).await?;

	let id = query.id;
	let user_id = body.user_id;
	require!(id, user_id);

	validate(body.title.as_deref(), body.description.as_deref(), body.category.as_deref())?;

	owned_video(global.as_ref(), id, user_id).await?;

	let patch = VideoPatch {
		title: body.title,
		description: body.description,
		category: body.category,
		thumbnail_url: body.thumbnail_url,
	};

	if patch.is_empty() {
		return Err(bad_request("No fields to update"));
	}

	let video = global
		.store()
		.update_video(id, patch)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Video not found"))?;

	Ok(json_response(StatusCode::OK, &video))
}

async fn delete<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: VideoQuery = request::query(&req)?;

	let id = query.id;
	let user_id = query.user_id;
	require!(id, user_id);

	owned_video(global.as_ref(), id, user_id).await?;

	if !global.store().delete_video(id).await? {
		return Err((StatusCode::NOT_FOUND, "Video not found").into());
	}

	tracing::info!(video_id = %id, "video deleted");

	Ok(empty_response(StatusCode::NO_CONTENT))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router
		.get("/api/videos", get::<G>)
		.post("/api/videos", create::<G>)
		.put("/api/videos", update::<G>)
		.delete("/api/videos", delete::<G>)
		.post("/api/videos/upload", upload::<G>)
}
