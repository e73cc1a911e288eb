use std::sync::Arc;

use common::http::RouteError;
use hyper::header::{self, HeaderValue};
use hyper::Body;
use routerify::Middleware;

use crate::api::error::ApiError;
use crate::config::ApiConfig;
use crate::global::ApiGlobal;

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

pub fn cors_middleware<G: ApiGlobal>(global: &Arc<G>) -> Middleware<Body, RouteError<ApiError>> {
	let origin = HeaderValue::from_str(&global.config::<ApiConfig>().cors_origin).unwrap_or_else(|err| {
		tracing::warn!(error = %err, "invalid cors origin, allowing any origin");
		HeaderValue::from_static("*")
	});

	Middleware::post(move |mut resp| {
		let origin = origin.clone();

		async move {
			let headers = resp.headers_mut();
			headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
			headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
			headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));

			Ok(resp)
		}
	})
}
