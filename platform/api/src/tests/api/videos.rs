use http::StatusCode;
use serde_json::{json, Value};
use serial_test::serial;

use super::TestServer;
use crate::config::{AppConfig, VideoHostConfig};
use crate::tests::global::mock_video_host;
use crate::video_host::{sign, SIGNATURE_HEADER};

const WEBHOOK_SECRET: &str = "whsec_test";

fn video_host_config(api_url: &str) -> AppConfig {
	AppConfig {
		video_host: VideoHostConfig {
			api_url: api_url.to_owned(),
			token_id: "token-id".to_owned(),
			token_secret: "token-secret".to_owned(),
			webhook_secret: Some(WEBHOOK_SECRET.to_owned()),
			playback_base_url: "https://stream.example.com".to_owned(),
			thumbnail_base_url: "https://image.example.com".to_owned(),
			..Default::default()
		},
		..Default::default()
	}
}

async fn send_webhook(server: &TestServer, event: &Value) -> (StatusCode, Value) {
	let body = event.to_string();
	let signature = sign(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), body.as_bytes());

	server
		.send(
			server
				.client
				.post(server.url("/api/webhooks/video"))
				.header(SIGNATURE_HEADER, signature)
				.header(http::header::CONTENT_TYPE, "application/json")
				.body(body),
		)
		.await
}

#[serial]
#[tokio::test]
async fn test_serial_video_crud() {
	let server = TestServer::start().await;

	let owner = server.create_user("owner").await;
	let other = server.create_user("other").await;

	let (status, video) = server
		.post(
			"/api/videos",
			json!({ "user_id": owner, "title": "Draft", "category": "music" }),
		)
		.await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(video["status"], "uploading");
	let draft = video["id"].as_str().unwrap().to_owned();

	let ready = server.create_video(&owner, "Ready").await;

	// Other users only see ready videos.
	let (_, videos) = server.get("/api/videos").await;
	let videos = videos.as_array().unwrap();
	assert_eq!(videos.len(), 1);
	assert_eq!(videos[0]["id"], ready.as_str());
	assert_eq!(videos[0]["author"]["username"], "owner");

	let (_, videos) = server.get(&format!("/api/videos?user_id={owner}")).await;
	assert_eq!(videos.as_array().unwrap().len(), 2);

	let (_, videos) = server.get("/api/videos?status=uploading").await;
	assert_eq!(videos.as_array().unwrap().len(), 1);

	let (status, video) = server.get(&format!("/api/videos?id={draft}")).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(video["author"]["id"], owner.as_str());

	let (status, _) = server
		.put(&format!("/api/videos?id={draft}"), json!({ "user_id": other, "title": "Mine now" }))
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, video) = server
		.put(
			&format!("/api/videos?id={draft}"),
			json!({ "user_id": owner, "title": "Final", "description": "" }),
		)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(video["title"], "Final");
	assert_eq!(video["description"], Value::Null);

	let (status, _) = server.delete(&format!("/api/videos?id={draft}&user_id={other}")).await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, _) = server.delete(&format!("/api/videos?id={draft}&user_id={owner}")).await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (status, _) = server.get(&format!("/api/videos?id={draft}")).await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	let (status, body) = server
		.post(
			"/api/videos",
			json!({ "user_id": "00000000-0000-0000-0000-000000000000", "title": "Ghost" }),
		)
		.await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "User not found" }));

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_video_upload_and_webhooks() {
	let mut video_host = mock_video_host(false).await;
	let server = TestServer::with_config(video_host_config(&video_host.url)).await;

	let owner = server.create_user("uploader").await;

	let (status, body) = server
		.post("/api/videos/upload", json!({ "user_id": owner, "title": "My upload" }))
		.await;
	assert_eq!(status, StatusCode::CREATED, "{body}");
	assert_eq!(body["upload_id"], "upload-1");
	assert_eq!(body["upload_url"], "https://storage.example.com/upload-1");
	assert_eq!(body["video"]["status"], "uploading");
	assert_eq!(body["video"]["upload_id"], "upload-1");

	let video_id = body["video"]["id"].as_str().unwrap().to_owned();

	let request = video_host.requests.recv().await.unwrap();
	assert_eq!(request.path, "/video/v1/uploads");
	assert!(request.authorization.unwrap().starts_with("Basic "));
	assert_eq!(request.body["new_asset_settings"]["passthrough"], video_id.as_str());
	assert_eq!(request.body["new_asset_settings"]["playback_policy"], json!(["public"]));

	// Found by upload id.
	let (status, body) = send_webhook(
		&server,
		&json!({
			"type": "video.upload.asset_created",
			"data": { "id": "upload-1", "asset_id": "asset-1" },
		}),
	)
	.await;
	assert_eq!(status, StatusCode::OK, "{body}");
	assert_eq!(body, json!({ "received": true, "handled": true }));

	let (_, video) = server.get(&format!("/api/videos?id={video_id}")).await;
	assert_eq!(video["status"], "processing");
	assert_eq!(video["asset_id"], "asset-1");

	// Found by asset id.
	let (status, _) = send_webhook(
		&server,
		&json!({
			"type": "video.asset.ready",
			"data": {
				"id": "asset-1",
				"duration": 12.5,
				"playback_ids": [{ "id": "play-1", "policy": "public" }],
			},
		}),
	)
	.await;
	assert_eq!(status, StatusCode::OK);

	let (_, video) = server.get(&format!("/api/videos?id={video_id}")).await;
	assert_eq!(video["status"], "ready");
	assert_eq!(video["playback_id"], "play-1");
	assert_eq!(video["playback_url"], "https://stream.example.com/play-1.m3u8");
	assert_eq!(video["thumbnail_url"], "https://image.example.com/play-1/thumbnail.jpg");
	assert_eq!(video["duration_seconds"], 12.5);

	// A late event does not take a playable video back to processing.
	let (status, body) = send_webhook(
		&server,
		&json!({ "type": "video.asset.created", "data": { "id": "asset-1" } }),
	)
	.await;
	assert_eq!(status, StatusCode::OK, "{body}");

	let (_, video) = server.get(&format!("/api/videos?id={video_id}")).await;
	assert_eq!(video["status"], "ready");
	assert_eq!(video["playback_id"], "play-1");

	let (status, body) = send_webhook(&server, &json!({ "type": "video.asset.deleted", "data": { "id": "asset-1" } })).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "received": true, "handled": false }));

	let (status, _) = send_webhook(
		&server,
		&json!({ "type": "video.asset.errored", "data": { "id": "asset-unknown" } }),
	)
	.await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	// Unsigned requests are rejected.
	let (status, _) = server
		.post(
			"/api/webhooks/video",
			json!({ "type": "video.asset.errored", "data": { "id": "asset-1" } }),
		)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (_, video) = server.get(&format!("/api/videos?id={video_id}")).await;
	assert_eq!(video["status"], "ready");

	server.shutdown().await;
	video_host.handle.abort();
}

#[serial]
#[tokio::test]
async fn test_serial_video_upload_failure() {
	let video_host = mock_video_host(true).await;
	let server = TestServer::with_config(video_host_config(&video_host.url)).await;

	let owner = server.create_user("unlucky").await;

	let (status, body) = server
		.post("/api/videos/upload", json!({ "user_id": owner, "title": "Doomed" }))
		.await;
	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body, json!({ "error": "Internal server error" }));

	let (_, videos) = server.get(&format!("/api/videos?user_id={owner}")).await;
	let videos = videos.as_array().unwrap();
	assert_eq!(videos.len(), 1);
	assert_eq!(videos[0]["status"], "errored");
	assert!(videos[0]["error_message"].is_string());

	server.shutdown().await;
	video_host.handle.abort();
}

#[serial]
#[tokio::test]
async fn test_serial_video_recovers_from_error() {
	let video_host = mock_video_host(false).await;
	let server = TestServer::with_config(video_host_config(&video_host.url)).await;

	let owner = server.create_user("retrier").await;

	let (status, body) = server
		.post("/api/videos/upload", json!({ "user_id": owner, "title": "Second try" }))
		.await;
	assert_eq!(status, StatusCode::CREATED, "{body}");
	let video_id = body["video"]["id"].as_str().unwrap().to_owned();

	let (status, _) = send_webhook(
		&server,
		&json!({
			"type": "video.upload.errored",
			"data": { "id": "upload-1", "errors": { "messages": ["Input file is corrupt"] } },
		}),
	)
	.await;
	assert_eq!(status, StatusCode::OK);

	let (_, video) = server.get(&format!("/api/videos?id={video_id}")).await;
	assert_eq!(video["status"], "errored");
	assert_eq!(video["error_message"], "Input file is corrupt");

	let (status, _) = send_webhook(
		&server,
		&json!({
			"type": "video.upload.asset_created",
			"data": { "id": "upload-1", "asset_id": "asset-2" },
		}),
	)
	.await;
	assert_eq!(status, StatusCode::OK);

	let (status, _) = send_webhook(
		&server,
		&json!({
			"type": "video.asset.ready",
			"data": { "id": "asset-2", "playback_ids": [{ "id": "play-2", "policy": "public" }] },
		}),
	)
	.await;
	assert_eq!(status, StatusCode::OK);

	let (_, video) = server.get(&format!("/api/videos?id={video_id}")).await;
	assert_eq!(video["status"], "ready");
	assert_eq!(video["error_message"], Value::Null);

	server.shutdown().await;
	video_host.handle.abort();
}
