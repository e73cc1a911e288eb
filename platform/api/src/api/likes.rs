use common::http::ext::OptionExt;
use common::http::json_response;
use hyper::{Body, Request, Response, StatusCode};
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, missing_fields, require};
use super::Builder;
use crate::database::LikeState;
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct LikeQuery {
	user_id: Option<Uuid>,
	video_id: Option<Uuid>,
	text_post_id: Option<Uuid>,
	limit: Option<i64>,
}

#[derive(serde::Deserialize)]
struct LikeBody {
	user_id: Option<Uuid>,
	video_id: Option<Uuid>,
	text_post_id: Option<Uuid>,
}

async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: LikeQuery = request::query(&req)?;

	if query.video_id.is_none() && query.text_post_id.is_none() {
		let Some(user_id) = query.user_id else {
			return Err(missing_fields(&["user_id"]));
		};

		let likes = global.store().list_likes(user_id, request::limit(query.limit)).await?;
		return Ok(json_response(StatusCode::OK, &likes));
	}

	let target = request::target(query.video_id, query.text_post_id)?;

	let counters = global
		.store()
		.target_counters(target)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, format!("{} not found", target.noun())))?;

	let liked = match query.user_id {
		Some(user_id) => global.store().is_liked(user_id, target).await?,
		None => false,
	};

	Ok(json_response(
		StatusCode::OK,
		&LikeState {
			liked,
			likes_count: counters.likes_count,
		},
	))
}

async fn create<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: LikeBody = request::json(global.as_ref(), &mut req).await?;

	let user_id = body.user_id;
	require!(user_id);

	let target = request::target(body.video_id, body.text_post_id)?;
	let state = global.store().like(user_id, target).await?;

	Ok(json_response(StatusCode::CREATED, &state))
}

async fn delete<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: LikeQuery = request::query(&req)?;

	let user_id = query.user_id;
	require!(user_id);

	let target = request::target(query.video_id, query.text_post_id)?;

	let state = global
		.store()
		.unlike(user_id, target)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, "Like not found"))?;

	Ok(json_response(StatusCode::OK, &state))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router
		.get("/api/likes", get::<G>)
		.post("/api/likes", create::<G>)
		.delete("/api/likes", delete::<G>)
}
