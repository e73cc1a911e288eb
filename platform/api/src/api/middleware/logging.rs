use common::http::RouteError;
use hyper::Body;
use routerify::Middleware;

use crate::api::error::ApiError;

pub fn logging_middleware() -> Middleware<Body, RouteError<ApiError>> {
	Middleware::post_with_info(|resp, info| async move {
		tracing::debug!(
			method = %info.method(),
			path = info.uri().path(),
			status = resp.status().as_u16(),
			"request"
		);

		Ok(resp)
	})
}
