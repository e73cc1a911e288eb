use common::http::json_response;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, require};
use super::Builder;
use crate::database::{TextPostFilter, VideoFilter};
use crate::feed::{merge_recent, ContentKind, FeedItem};
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct ContentQuery {
	user_id: Option<Uuid>,
	#[serde(rename = "type", default)]
	kind: ContentKind,
	limit: Option<i64>,
}

/// A creator's own content in every status, newest first.
async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: ContentQuery = request::query(&req)?;

	let user_id = query.user_id;
	require!(user_id);

	let limit = request::limit(query.limit);

	let videos = match query.kind.videos() {
		true => {
			global
				.store()
				.list_videos(VideoFilter {
					user_id: Some(user_id),
					category: None,
					status: None,
					limit,
				})
				.await?
		}
		false => Vec::new(),
	};

	let text_posts = match query.kind.text_posts() {
		true => {
			global
				.store()
				.list_text_posts(TextPostFilter {
					user_id: Some(user_id),
					category: None,
					limit,
				})
				.await?
		}
		false => Vec::new(),
	};

	let items = merge_recent(videos, text_posts, limit as usize);
	let items = request::with_authors(global.as_ref(), items, FeedItem::user_id).await?;
	let stats = global.store().content_stats(user_id).await?;

	Ok(json_response(StatusCode::OK, &json!({ "items": items, "stats": stats })))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router.get("/api/content", get::<G>)
}
