use http::{header, StatusCode};
use serde_json::json;
use serial_test::serial;

use super::TestServer;
use crate::config::{ApiConfig, AppConfig};

#[serial]
#[tokio::test]
async fn test_serial_health() {
	let server = TestServer::start().await;

	let (status, body) = server.get("/api/health").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "status": "ok" }));

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_unknown_route_and_method() {
	let server = TestServer::start().await;

	let (status, body) = server.get("/api/nothing-here").await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "Not found" }));

	let (status, body) = server.put("/api/feed", json!({})).await;
	assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
	assert_eq!(body, json!({ "error": "Method not allowed" }));

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_cors() {
	let server = TestServer::with_config(AppConfig {
		api: ApiConfig {
			cors_origin: "https://xdose.app".to_string(),
			..Default::default()
		},
		..Default::default()
	})
	.await;

	let resp = server
		.client
		.request(reqwest::Method::OPTIONS, server.url("/api/videos"))
		.send()
		.await
		.expect("failed to send preflight");

	assert_eq!(resp.status(), StatusCode::NO_CONTENT);
	assert_eq!(
		resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
		"https://xdose.app"
	);
	assert_eq!(
		resp.headers().get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
		"GET, POST, PUT, DELETE, OPTIONS"
	);
	assert_eq!(
		resp.headers().get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
		"Content-Type, Authorization"
	);

	// Error responses carry the headers too.
	let resp = server
		.client
		.get(server.url("/api/videos?id=00000000-0000-0000-0000-000000000000"))
		.send()
		.await
		.expect("failed to send request");

	assert_eq!(resp.status(), StatusCode::NOT_FOUND);
	assert_eq!(
		resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
		"https://xdose.app"
	);

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_bad_requests() {
	let server = TestServer::with_config(AppConfig {
		api: ApiConfig {
			max_body_bytes: 64,
			..Default::default()
		},
		..Default::default()
	})
	.await;

	let (status, body) = server
		.send(
			server
				.client
				.post(server.url("/api/users"))
				.header(header::CONTENT_TYPE, "application/json")
				.body("{not json"),
		)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Invalid JSON body" }));

	let (status, body) = server.post("/api/videos", json!({})).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Missing required fields: user_id, title" }));

	let (status, body) = server
		.post("/api/text-posts", json!({ "content": "x".repeat(100) }))
		.await;
	assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
	assert_eq!(body, json!({ "error": "Request body too large" }));

	let (status, _) = server.get("/api/videos?id=not-a-uuid").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (status, _) = server.get("/api/likes?video_id=00000000-0000-0000-0000-000000000000&text_post_id=00000000-0000-0000-0000-000000000000").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_chunked_body_over_limit() {
	use tokio::io::{AsyncReadExt, AsyncWriteExt};

	let server = TestServer::with_config(AppConfig {
		api: ApiConfig {
			max_body_bytes: 64,
			..Default::default()
		},
		..Default::default()
	})
	.await;

	let addr = server.url("").trim_start_matches("http://").to_string();
	let mut stream = tokio::net::TcpStream::connect(&addr).await.expect("failed to connect");

	// No Content-Length, so the limit can only be enforced while reading.
	let chunk = format!(r#"{{"content":"{}"}}"#, "x".repeat(200));
	let request = format!(
		"POST /api/text-posts HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n{:x}\r\n{chunk}\r\n0\r\n\r\n",
		chunk.len(),
	);
	stream.write_all(request.as_bytes()).await.expect("failed to write request");

	let mut response = Vec::new();
	stream.read_to_end(&mut response).await.expect("failed to read response");
	let response = String::from_utf8_lossy(&response);

	assert!(response.starts_with("HTTP/1.1 413"), "{response}");
	assert!(response.contains(r#"{"error":"Request body too large"}"#), "{response}");

	server.shutdown().await;
}
