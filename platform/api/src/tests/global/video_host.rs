use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hyper::server::conn::Http;
use hyper::{Body, Response, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A request the mock video host received.
#[derive(Debug)]
pub struct MockRequest {
	pub path: String,
	pub authorization: Option<String>,
	pub body: Value,
}

pub struct MockVideoHost {
	pub url: String,
	pub requests: mpsc::UnboundedReceiver<MockRequest>,
	pub handle: tokio::task::JoinHandle<()>,
}

/// Serves direct uploads, or fails every request with a `500` when `fail` is
/// set.
pub async fn mock_video_host(fail: bool) -> MockVideoHost {
	let (tx, rx) = mpsc::unbounded_channel();

	// Bind to a random port
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let url = format!("http://{}", listener.local_addr().unwrap());

	let uploads = Arc::new(AtomicUsize::new(0));

	let handle = tokio::spawn(async move {
		loop {
			let (socket, _) = listener.accept().await.unwrap();
			let tx = tx.clone();
			let uploads = uploads.clone();

			tokio::spawn(async move {
				Http::new()
					.serve_connection(
						socket,
						hyper::service::service_fn(move |req| {
							let tx = tx.clone();
							let uploads = uploads.clone();

							async move {
								let (parts, body) = req.into_parts();
								let body = hyper::body::to_bytes(body).await.unwrap();

								tx.send(MockRequest {
									path: parts.uri.path().to_owned(),
									authorization: parts
										.headers
										.get(hyper::header::AUTHORIZATION)
										.map(|v| v.to_str().unwrap().to_owned()),
									body: serde_json::from_slice(&body).unwrap_or(Value::Null),
								})
								.ok();

								if fail {
									return Ok::<_, Infallible>(
										Response::builder()
											.status(StatusCode::INTERNAL_SERVER_ERROR)
											.body(Body::from(json!({ "error": { "type": "internal" } }).to_string()))
											.unwrap(),
									);
								}

								let n = uploads.fetch_add(1, Ordering::SeqCst) + 1;

								Ok(Response::builder()
									.status(StatusCode::CREATED)
									.header(hyper::header::CONTENT_TYPE, "application/json")
									.body(Body::from(
										json!({
											"data": {
												"id": format!("upload-{n}"),
												"url": format!("https://storage.example.com/upload-{n}"),
												"status": "waiting",
											}
										})
										.to_string(),
									))
									.unwrap())
							}
						}),
					)
					.await
					.ok();
			});
		}
	});

	MockVideoHost {
		url,
		requests: rx,
		handle,
	}
}
