use std::time::Duration;

use http::StatusCode;
use serde_json::{json, Value};
use serial_test::serial;

use super::TestServer;

fn ids(page: &Value) -> Vec<String> {
	page["items"]
		.as_array()
		.unwrap()
		.iter()
		.map(|item| item["id"].as_str().unwrap().to_owned())
		.collect()
}

/// Keeps creation times apart so the recent order is deterministic.
async fn tick() {
	tokio::time::sleep(Duration::from_millis(5)).await;
}

#[serial]
#[tokio::test]
async fn test_serial_recent_feed() {
	let server = TestServer::start().await;

	let alice = server.create_user("alice").await;
	let bob = server.create_user("bob").await;

	let v1 = server.create_video(&alice, "Oldest").await;
	tick().await;
	let p1 = server.create_text_post(&bob, "Middle").await;
	tick().await;
	let (_, draft) = server
		.post("/api/videos", json!({ "user_id": alice, "title": "Not ready" }))
		.await;
	tick().await;
	let v2 = server.create_video(&bob, "Newest").await;

	let (status, page) = server.get("/api/feed").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(ids(&page), [v2.clone(), p1.clone(), v1.clone()]);
	assert_eq!(page["next_cursor"], Value::Null);
	assert!(!ids(&page).contains(&draft["id"].as_str().unwrap().to_owned()));

	assert_eq!(page["items"][0]["type"], "video");
	assert_eq!(page["items"][0]["author"]["username"], "bob");
	assert_eq!(page["items"][1]["type"], "text_post");

	let (_, first) = server.get("/api/feed?limit=2").await;
	assert_eq!(ids(&first), [v2.clone(), p1.clone()]);
	let cursor = first["next_cursor"].as_str().unwrap().to_owned();

	let (_, second) = server
		.get(&format!("/api/feed?limit=2&cursor={}", urlencode(&cursor)))
		.await;
	assert_eq!(ids(&second), [v1.clone()]);
	assert_eq!(second["next_cursor"], Value::Null);

	let (_, videos) = server.get("/api/feed?type=video").await;
	assert_eq!(ids(&videos), [v2.clone(), v1.clone()]);

	let (status, body) = server.get("/api/feed?cursor=yesterday").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Invalid cursor" }));

	let (status, body) = server.get("/api/feed?sort=popular").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Invalid query parameters" }));

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_following_feed() {
	let server = TestServer::start().await;

	let alice = server.create_user("alice").await;
	let bob = server.create_user("bob").await;
	let carol = server.create_user("carol").await;

	let followed = server.create_text_post(&bob, "From bob").await;
	server.create_text_post(&carol, "From carol").await;

	let (_, page) = server.get(&format!("/api/feed?following=true&user_id={alice}")).await;
	assert_eq!(page["items"], json!([]));

	server
		.post("/api/follow", json!({ "follower_id": alice, "following_id": bob }))
		.await;

	let (status, page) = server.get(&format!("/api/feed?following=true&user_id={alice}")).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(ids(&page), [followed]);

	let (status, body) = server.get("/api/feed?following=true").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Missing required fields: user_id" }));

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_trending_feed() {
	let server = TestServer::start().await;

	let alice = server.create_user("alice").await;
	let bob = server.create_user("bob").await;

	let quiet = server.create_video(&alice, "Quiet").await;
	let viewed = server.create_text_post(&alice, "Viewed").await;
	let discussed = server.create_video(&alice, "Discussed").await;

	// score = views + 2 * likes + 3 * comments
	for _ in 0..2 {
		server
			.post("/api/engagement", json!({ "text_post_id": viewed, "action": "view" }))
			.await;
	}
	server.post("/api/likes", json!({ "user_id": bob, "video_id": discussed })).await;
	server
		.post(
			"/api/comments",
			json!({ "user_id": bob, "video_id": discussed, "content": "Wow" }),
		)
		.await;

	let (status, first) = server.get("/api/feed?sort=trending&limit=2").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(ids(&first), [discussed.clone(), viewed.clone()]);
	assert_eq!(first["next_cursor"], "2");

	let (_, second) = server.get("/api/feed?sort=trending&limit=2&cursor=2").await;
	assert_eq!(ids(&second), [quiet]);
	assert_eq!(second["next_cursor"], Value::Null);

	let (status, _) = server.get("/api/feed?sort=trending&cursor=-1").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	server.shutdown().await;
}

fn urlencode(value: &str) -> String {
	serde_urlencoded::to_string([("v", value)]).unwrap()[2..].to_owned()
}
