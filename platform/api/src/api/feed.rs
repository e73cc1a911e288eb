use common::http::json_response;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::error::Result;
use super::ext::RequestExt;
use super::request::{self, missing_fields, present};
use super::Builder;
use crate::config::FeedConfig;
use crate::feed::{get_feed_items, ContentKind, FeedItem, FeedRequest, FeedSort};
use crate::global::ApiGlobal;

#[derive(serde::Deserialize)]
struct FeedQuery {
	#[serde(default)]
	sort: FeedSort,
	#[serde(rename = "type", default)]
	kind: ContentKind,
	category: Option<String>,
	user_id: Option<Uuid>,
	#[serde(default)]
	following: bool,
	cursor: Option<String>,
	limit: Option<i64>,
}

async fn get<G: ApiGlobal>(req: Request<Body>) -> Result<Response<Body>> {
	let global = req.get_global::<G>()?;
	let query: FeedQuery = request::query(&req)?;
	let config = global.config::<FeedConfig>();

	let authors = match (query.following, query.user_id) {
		(false, _) => None,
		(true, Some(user_id)) => Some(global.store().following_ids(user_id).await?),
		(true, None) => return Err(missing_fields(&["user_id"])),
	};

	let page = get_feed_items(
		global.store(),
		FeedRequest {
			sort: query.sort,
			kind: query.kind,
			category: present(query.category),
			authors,
			cursor: present(query.cursor),
			limit: query.limit.unwrap_or(config.default_limit).clamp(1, config.max_limit.max(1)),
			trending_window: chrono::Duration::hours(config.trending_window_hours),
		},
		chrono::Utc::now(),
	)
	.await?;

	let items = request::with_authors(global.as_ref(), page.items, FeedItem::user_id).await?;

	Ok(json_response(
		StatusCode::OK,
		&json!({
			"items": items,
			"next_cursor": page.next_cursor,
		}),
	))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router.get("/api/feed", get::<G>)
}
