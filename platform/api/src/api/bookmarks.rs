use std::collections::HashMap;

use common::http::{empty_response, json_response};
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, require};
use super::Builder;
use crate::database::{Bookmark, BookmarkWithContent, TextPost, Video};
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct BookmarkQuery {
	user_id: Option<Uuid>,
	video_id: Option<Uuid>,
	text_post_id: Option<Uuid>,
	limit: Option<i64>,
}

#[derive(serde::Deserialize)]
struct BookmarkBody {
	user_id: Option<Uuid>,
	video_id: Option<Uuid>,
	text_post_id: Option<Uuid>,
}

/// Loads the bookmarked content in two batches.
async fn with_content<G: ApiGlobal>(global: &G, bookmarks: Vec<Bookmark>) -> Result<Vec<BookmarkWithContent>> {
	let video_ids = bookmarks.iter().filter_map(|b| b.video_id).collect::<Vec<_>>();
	let text_post_ids = bookmarks.iter().filter_map(|b| b.text_post_id).collect::<Vec<_>>();

	let mut videos: HashMap<Uuid, Video> = match video_ids.is_empty() {
		true => HashMap::new(),
		false => global
			.store()
			.get_videos(&video_ids)
			.await?
			.into_iter()
			.map(|v| (v.id, v))
			.collect(),
	};

	let mut text_posts: HashMap<Uuid, TextPost> = match text_post_ids.is_empty() {
		true => HashMap::new(),
		false => global
			.store()
			.get_text_posts(&text_post_ids)
			.await?
			.into_iter()
			.map(|p| (p.id, p))
			.collect(),
	};

	Ok(bookmarks
		.into_iter()
		.map(|bookmark| BookmarkWithContent {
			video: bookmark.video_id.and_then(|id| videos.remove(&id)),
			text_post: bookmark.text_post_id.and_then(|id| text_posts.remove(&id)),
			bookmark,
		})
		.collect())
}

async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: BookmarkQuery = request::query(&req)?;

	let user_id = query.user_id;
	require!(user_id);

	if query.video_id.is_some() || query.text_post_id.is_some() {
		let target = request::target(query.video_id, query.text_post_id)?;
		let bookmarked = global.store().is_bookmarked(user_id, target).await?;

		return Ok(json_response(StatusCode::OK, &json!({ "bookmarked": bookmarked })));
	}

	let bookmarks = global
		.store()
		.list_bookmarks(user_id, request::limit(query.limit))
		.await?;

	Ok(json_response(StatusCode::OK, &with_content(global.as_ref(), bookmarks).await?))
}

async fn create<G: ApiGlobal>(mut req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let body: BookmarkBody = request::json(global.as_ref(), &mut req).await?;

	let user_id = body.user_id;
	require!(user_id);

	let target = request::target(body.video_id, body.text_post_id)?;
	let bookmark = global.store().bookmark(user_id, target).await?;

	Ok(json_response(StatusCode::CREATED, &bookmark))
}

async fn delete<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: BookmarkQuery = request::query(&req)?;

	let user_id = query.user_id;
	require!(user_id);

	let target = request::target(query.video_id, query.text_post_id)?;

	if !global.store().remove_bookmark(user_id, target).await? {
		return Err((StatusCode::NOT_FOUND, "Bookmark not found").into());
	}

	Ok(empty_response(StatusCode::NO_CONTENT))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router
		.get("/api/bookmarks", get::<G>)
		.post("/api/bookmarks", create::<G>)
		.delete("/api/bookmarks", delete::<G>)
}
