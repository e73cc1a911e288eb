use http::StatusCode;
use serde_json::json;
use serial_test::serial;

use super::TestServer;

#[serial]
#[tokio::test]
async fn test_serial_creator_content() {
	let server = TestServer::start().await;

	let alice = server.create_user("alice").await;
	let bob = server.create_user("bob").await;

	let ready = server.create_video(&alice, "Published").await;
	let (status, _) = server
		.post("/api/videos", json!({ "user_id": alice, "title": "Still uploading" }))
		.await;
	assert_eq!(status, StatusCode::CREATED);
	let post = server.create_text_post(&alice, "Behind the scenes").await;
	server.create_text_post(&bob, "Not alice's").await;

	server
		.post("/api/engagement", json!({ "video_id": ready, "action": "view" }))
		.await;
	server.post("/api/likes", json!({ "user_id": bob, "text_post_id": post })).await;
	server
		.post(
			"/api/comments",
			json!({ "user_id": bob, "text_post_id": post, "content": "Nice" }),
		)
		.await;

	let (status, body) = server.get(&format!("/api/content?user_id={alice}")).await;
	assert_eq!(status, StatusCode::OK);

	// Unfinished videos are listed for their creator.
	let items = body["items"].as_array().unwrap();
	assert_eq!(items.len(), 3);
	assert!(items.iter().all(|item| item["author"]["username"] == "alice"));
	assert_eq!(items.iter().filter(|item| item["type"] == "video").count(), 2);

	assert_eq!(
		body["stats"],
		json!({
			"videos": 2,
			"text_posts": 1,
			"total_views": 1,
			"total_likes": 1,
			"total_comments": 1,
		})
	);

	let (_, body) = server
		.get(&format!("/api/content?user_id={alice}&type=text_post"))
		.await;
	let items = body["items"].as_array().unwrap();
	assert_eq!(items.len(), 1);
	assert_eq!(items[0]["id"], post.as_str());

	let (_, body) = server.get(&format!("/api/content?user_id={alice}&limit=1")).await;
	assert_eq!(body["items"].as_array().unwrap().len(), 1);

	let (status, body) = server.get("/api/content").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Missing required fields: user_id" }));

	server.shutdown().await;
}
