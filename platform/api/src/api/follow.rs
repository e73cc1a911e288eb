use common::http::{empty_response, json_response};
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, bad_request, missing_fields, require};
use super::Builder;
use crate::database::{FollowDirection, UserSummary};
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct FollowQuery {
	user_id: Option<Uuid>,
	follower_id: Option<Uuid>,
	following_id: Option<Uuid>,
	#[serde(rename = "type")]
	direction: Option<FollowDirection>,
	limit: Option<i64>,
}

#[derive(serde::Deserialize)]
struct FollowBody {
	follower_id: Option<Uuid>,
	following_id: Option<Uuid>,
}

async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: FollowQuery = request::query(&req)?;

	if let (Some(follower_id), Some(following_id)) = (query.follower_id, query.following_id) {
		let following = global.store().is_following(follower_id, following_id).await?;
		return Ok(json_response(StatusCode::OK, &json!({ "following": following })));
	}

	let Some(user_id) = query.user_id else {
		return Err(missing_fields(&["user_id"]));
	};

	if let Some(direction) = query.direction {
		let users = global
			.store()
			.list_follows(user_id, direction, request::limit(query.limit))
			.await?
			.iter()
			.map(|user| user.summary())
			.collect::<Vec<UserSummary>>();

		return Ok(json_response(StatusCode::OK, &users));
	}

	let counts = global.store().follow_counts(user_id).await?;

	Ok(json_response(
		StatusCode::OK,
		&json!({
			"user_id": user_id,
			"followers_count": counts.followers_count,
			"following_count": counts.following_count,
		}),
	))
}

async fn create<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: FollowBody = request::json(global.as_ref(), &mut req).await?;

	let follower_id = body.follower_id;
	let following_id = body.following_id;
	require!(follower_id, following_id);

	if follower_id == following_id {
		return Err(bad_request("You cannot follow yourself"));
	}

	let follow = global.store().follow(follower_id, following_id).await?;

	tracing::debug!(follower_id = %follower_id, following_id = %following_id, "followed");

	Ok(json_response(StatusCode::CREATED, &follow))
}

async fn delete<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: FollowQuery = request::query(&req)?;

	let follower_id = query.follower_id;
	let following_id = query.following_id;
	require!(follower_id, following_id);

	if !global.store().unfollow(follower_id, following_id).await? {
		return Err((StatusCode::NOT_FOUND, "Not following this user").into());
	}

	Ok(empty_response(StatusCode::NO_CONTENT))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router
		.get("/api/follow", get::<G>)
		.post("/api/follow", create::<G>)
		.delete("/api/follow", delete::<G>)
}
