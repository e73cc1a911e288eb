use common::http::ext::OptionExt;
use common::http::json_response;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, bad_request, present, require};
use super::Builder;
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct EngagementQuery {
	user_id: Option<Uuid>,
	video_id: Option<Uuid>,
	text_post_id: Option<Uuid>,
}

#[derive(serde::Deserialize)]
struct EngagementAction {
	video_id: Option<Uuid>,
	text_post_id: Option<Uuid>,
	action: Option<String>,
}

#[derive(Debug, Default, serde::Serialize)]
struct ViewerState {
	liked: bool,
	bookmarked: bool,
	following_author: bool,
}

async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: EngagementQuery = request::query(&req)?;

	let target = request::target(query.video_id, query.text_post_id)?;

	let counters = global
		.store()
		.target_counters(target)
		.await?
		.map_err_route((StatusCode::NOT_FOUND, format!("{} not found", target.noun())))?;

	let viewer = match query.user_id {
		Some(user_id) => ViewerState {
			liked: global.store().is_liked(user_id, target).await?,
			bookmarked: global.store().is_bookmarked(user_id, target).await?,
			following_author: user_id != counters.user_id
				&& global.store().is_following(user_id, counters.user_id).await?,
		},
		None => ViewerState::default(),
	};

	Ok(json_response(
		StatusCode::OK,
		&json!({
			"liked": viewer.liked,
			"bookmarked": viewer.bookmarked,
			"following_author": viewer.following_author,
			"likes_count": counters.likes_count,
			"comments_count": counters.comments_count,
			"views_count": counters.views_count,
		}),
	))
}

async fn record<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: EngagementAction = request::json(global.as_ref(), &mut req).await?;

	let action = present(body.action);
	require!(action);

	let target = request::target(body.video_id, body.text_post_id)?;

	match action.as_str() {
		"view" => {
			let views_count = global
				.store()
				.record_view(target)
				.await?
				.map_err_route((StatusCode::NOT_FOUND, format!("{} not found", target.noun())))?;

			Ok(json_response(StatusCode::OK, &json!({ "views_count": views_count })))
		}
		_ => Err(bad_request("Unknown action")),
	}
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router
		.get("/api/engagement", get::<G>)
		.post("/api/engagement", record::<G>)
}
