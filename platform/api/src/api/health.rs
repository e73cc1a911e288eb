use common::http::json_response;
use hyper::{Body, Request, Response, StatusCode};
use serde_json::json;

use super::error::Result;
use super::Builder;
use crate::global::ApiGlobal;

async fn health(_: Request<Body>) -> Result<Response<Body>> {
	Ok(json_response(StatusCode::OK, &json!({ "status": "ok" })))
}

pub fn routes<G: ApiGlobal>(router: Builder) -> Builder {
	router.get("/api/health", health)
}
