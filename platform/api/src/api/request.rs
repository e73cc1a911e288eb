use std::collections::{HashMap, HashSet};

use common::http::ext::ResultExt;
use common::http::RouteError;
use hyper::body::{Bytes, HttpBody};
use hyper::{header, Body, Request, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::error::{ApiError, Result};
use crate::config::ApiConfig;
use crate::database::{Target, UserSummary};
use crate::global::ApiGlobal;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Binds every listed `Option` to its value, or returns `400` naming all the
/// fields that are `None`.
macro_rules! require {
	($($name:ident),+ $(,)?) => {
		let missing = [$((stringify!($name), $name.is_none())),+]
			.into_iter()
			.filter_map(|(name, missing)| missing.then_some(name))
			.collect::<Vec<&str>>();

		let ($(Some($name),)+) = ($($name,)+) else {
			return Err($crate::api::request::missing_fields(&missing));
		};
	};
}

pub(crate) use require;

pub fn missing_fields(fields: &[&str]) -> RouteError<ApiError> {
	(
		StatusCode::BAD_REQUEST,
		format!("Missing required fields: {}", fields.join(", ")),
	)
		.into()
}

pub fn bad_request(message: &str) -> RouteError<ApiError> {
	(StatusCode::BAD_REQUEST, message).into()
}

/// Deserializes the URL query string.
pub fn query<T: DeserializeOwned>(req: &Request<Body>) -> Result<T> {
	serde_urlencoded::from_str(req.uri().query().unwrap_or_default())
		.map_err_route((StatusCode::BAD_REQUEST, "Invalid query parameters"))
}

/// Reads the raw body, refusing bodies over the configured size as soon as
/// the limit is passed.
pub async fn body<G: ApiGlobal>(global: &G, req: &mut Request<Body>) -> Result<Bytes> {
	let max_bytes = global.config::<ApiConfig>().max_body_bytes;

	let declared = req
		.headers()
		.get(header::CONTENT_LENGTH)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.parse::<u64>().ok());

	if declared.is_some_and(|len| len > max_bytes) {
		return Err(too_large());
	}

	let body = req.body_mut();
	let mut buf = Vec::with_capacity(declared.unwrap_or_default() as usize);

	while let Some(chunk) = body.data().await {
		let chunk: Result<_> = chunk.map_err_route((StatusCode::BAD_REQUEST, "Failed to read request body"));
		let chunk = chunk?;

		if (buf.len() + chunk.len()) as u64 > max_bytes {
			return Err(too_large());
		}

		buf.extend_from_slice(&chunk);
	}

	Ok(Bytes::from(buf))
}

fn too_large() -> RouteError<ApiError> {
	(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into()
}

/// Reads and deserializes the JSON body.
pub async fn json<G: ApiGlobal, T: DeserializeOwned>(global: &G, req: &mut Request<Body>) -> Result<T> {
	let body = body(global, req).await?;
	serde_json::from_slice(&body).map_err_route((StatusCode::BAD_REQUEST, "Invalid JSON body"))
}

/// Page size for list endpoints.
pub fn limit(requested: Option<i64>) -> i64 {
	requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

pub fn target(video_id: Option<Uuid>, text_post_id: Option<Uuid>) -> Result<Target> {
	if video_id.is_none() && text_post_id.is_none() {
		return Err(missing_fields(&["video_id or text_post_id"]));
	}

	Target::from_ids(video_id, text_post_id)
		.ok_or_else(|| bad_request("Only one of video_id or text_post_id may be given"))
}

/// Loads the author summaries of the given users.
pub async fn authors<G: ApiGlobal>(
	global: &G,
	ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, UserSummary>> {
	let ids = ids.into_iter().collect::<HashSet<_>>().into_iter().collect::<Vec<_>>();

	if ids.is_empty() {
		return Ok(HashMap::new());
	}

	Ok(global
		.store()
		.get_users(&ids)
		.await?
		.into_iter()
		.map(|user| (user.id, user.summary()))
		.collect())
}

/// An owned entity with its owner's summary.
#[derive(Debug, serde::Serialize)]
pub struct Authored<T> {
	#[serde(flatten)]
	pub item: T,
	pub author: Option<UserSummary>,
}

pub async fn with_author<G: ApiGlobal, T: Send>(global: &G, item: T, owner: Uuid) -> Result<Authored<T>> {
	let author = global.store().get_user(owner).await?.map(|user| user.summary());
	Ok(Authored { item, author })
}

pub async fn with_authors<G: ApiGlobal, T: Send>(
	global: &G,
	items: Vec<T>,
	owner: impl Fn(&T) -> Uuid + Send,
) -> Result<Vec<Authored<T>>> {
	let authors = authors(global, items.iter().map(&owner)).await?;

	Ok(items
		.into_iter()
		.map(|item| Authored {
			author: authors.get(&owner(&item)).cloned(),
			item,
		})
		.collect())
}

/// Blank strings count as absent for required fields.
pub fn present(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.trim().is_empty())
}
