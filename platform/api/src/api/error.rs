use common::http::RouteError;
use hyper::StatusCode;

use crate::feed::FeedError;
use crate::store::StoreError;
use crate::video_host::{SignatureError, VideoHostError};

pub type Result<T, E = RouteError<ApiError>> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
	#[error("failed to read http body: {0}")]
	ReadHttpBody(#[from] hyper::Error),
	#[error("failed to parse json body: {0}")]
	ParseJson(#[from] serde_json::Error),
	#[error("failed to parse query string: {0}")]
	ParseQuery(#[from] serde_urlencoded::de::Error),
	#[error("store error: {0}")]
	Store(#[from] StoreError),
	#[error("feed error: {0}")]
	Feed(#[from] FeedError),
	#[error("video host error: {0}")]
	VideoHost(#[from] VideoHostError),
	#[error("webhook signature error: {0}")]
	Signature(#[from] SignatureError),
}

impl From<StoreError> for RouteError<ApiError> {
	#[track_caller]
	fn from(err: StoreError) -> Self {
		let (status, message) = match &err {
			StoreError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
			StoreError::Conflict(message) => (StatusCode::CONFLICT, message.to_string()),
			StoreError::Database(_) | StoreError::Migrate(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
			}
		};

		Self::from((status, message, err))
	}
}

impl From<FeedError> for RouteError<ApiError> {
	#[track_caller]
	fn from(err: FeedError) -> Self {
		match err {
			FeedError::Store(err) => err.into(),
			err @ FeedError::InvalidCursor(_) => Self::from((StatusCode::BAD_REQUEST, "Invalid cursor", err)),
		}
	}
}
