use std::sync::Arc;

use common::http::ext::RequestGlobalExt;
use hyper::{Body, Request};

use super::error::{ApiError, Result};
use crate::global::ApiGlobal;

pub trait RequestExt {
	fn get_global<G: ApiGlobal>(&self) -> Result<Arc<G>>;
}

impl RequestExt for Request<Body> {
	fn get_global<G: ApiGlobal>(&self) -> Result<Arc<G>> {
		RequestGlobalExt::<ApiError>::get_global::<G>(self)
	}
}
