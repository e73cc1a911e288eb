use std::sync::Arc;

use common::http::{empty_response, error_response, RouteError};
use hyper::server::conn::Http;
use hyper::{Body, Request, Response, StatusCode};
use routerify::{RequestServiceBuilder, Router, RouterBuilder};
use tokio::net::TcpSocket;
use tokio::select;

use self::error::{ApiError, Result};
use crate::config::ApiConfig;
use crate::global::ApiGlobal;

mod bookmarks;
mod comments;
mod content;
mod engagement;
pub mod error;
mod ext;
mod feed;
mod follow;
mod health;
mod likes;
mod middleware;
mod monetization;
mod request;
mod subscriptions;
mod text_posts;
mod tiers;
mod tips;
mod users;
mod videos;
mod webhooks;

type Builder = RouterBuilder<Body, RouteError<ApiError>>;

/// Every resource path, each answers `OPTIONS` and rejects unknown verbs.
const PATHS: &[&str] = &[
	"/api/health",
	"/api/users",
	"/api/videos",
	"/api/videos/upload",
	"/api/webhooks/video",
	"/api/text-posts",
	"/api/comments",
	"/api/likes",
	"/api/bookmarks",
	"/api/follow",
	"/api/engagement",
	"/api/content",
	"/api/feed",
	"/api/tiers",
	"/api/subscriptions",
	"/api/tips",
	"/api/monetization",
];

async fn preflight(_: Request<Body>) -> Result<Response<Body>> {
	Ok(empty_response(StatusCode::NO_CONTENT))
}

async fn method_not_allowed(_: Request<Body>) -> Result<Response<Body>> {
	Ok(error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"))
}

async fn not_found(_: Request<Body>) -> Result<Response<Body>> {
	Ok(error_response(StatusCode::NOT_FOUND, "Not found"))
}

fn resources<G: ApiGlobal>(router: Builder) -> Builder {
	let router = health::routes::<G>(router);
	let router = users::routes::<G>(router);
	let router = videos::routes::<G>(router);
	let router = webhooks::routes::<G>(router);
	let router = text_posts::routes::<G>(router);
	let router = comments::routes::<G>(router);
	let router = likes::routes::<G>(router);
	let router = bookmarks::routes::<G>(router);
	let router = follow::routes::<G>(router);
	let router = engagement::routes::<G>(router);
	let router = content::routes::<G>(router);
	let router = feed::routes::<G>(router);
	let router = tiers::routes::<G>(router);
	let router = subscriptions::routes::<G>(router);
	let router = tips::routes::<G>(router);
	monetization::routes::<G>(router)
}

pub fn routes<G: ApiGlobal>(global: &Arc<G>) -> anyhow::Result<Router<Body, RouteError<ApiError>>> {
	let weak = Arc::downgrade(global);

	let router = Router::builder()
		.data(weak)
		.err_handler_with_info(common::http::error_handler::<ApiError>)
		// Post middlewares also run on error responses, so every response carries the CORS headers.
		.middleware(middleware::cors::cors_middleware(global))
		.middleware(middleware::logging::logging_middleware());

	let router = PATHS.iter().fold(resources::<G>(router), |router, path| {
		router.options(*path, preflight).any_method(*path, method_not_allowed)
	});

	router
		.any(not_found)
		.build()
		.map_err(|err| anyhow::anyhow!("failed to build router: {err}"))
}

pub async fn run<G: ApiGlobal>(global: Arc<G>) -> anyhow::Result<()> {
	let config = global.config::<ApiConfig>();

	tracing::info!("API listening on {}", config.bind_address);
	let socket = if config.bind_address.is_ipv6() {
		TcpSocket::new_v6()?
	} else {
		TcpSocket::new_v4()?
	};

	socket.set_reuseaddr(true)?;
	socket.set_reuseport(true)?;
	socket.bind(config.bind_address)?;
	let listener = socket.listen(1024)?;

	// The router only holds a Weak reference to the global state, so keep-alive
	// connections do not keep it alive and block the shutdown.
	let request_service =
		RequestServiceBuilder::new(routes(&global)?).map_err(|err| anyhow::anyhow!("failed to build request service: {err}"))?;

	loop {
		select! {
			_ = global.ctx().done() => {
				return Ok(());
			},
			r = listener.accept() => {
				let (socket, addr) = r?;

				let service = request_service.build(addr);

				tracing::debug!("Accepted connection from {}", addr);

				tokio::spawn(async move {
					if let Err(err) = Http::new().serve_connection(socket, service).await {
						tracing::debug!(error = %err, "connection closed with error");
					}
				});
			},
		}
	}
}
