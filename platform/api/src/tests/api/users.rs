use http::StatusCode;
use serde_json::json;
use serial_test::serial;

use super::TestServer;

#[serial]
#[tokio::test]
async fn test_serial_user_lifecycle() {
	let server = TestServer::start().await;

	let id = "3f1c6a52-5a4e-4bcb-9c39-7e0b3f4b6d11";
	let (status, user) = server
		.post(
			"/api/users",
			json!({
				"id": id,
				"username": "alice",
				"email": "alice@example.com",
				"bio": "hello",
			}),
		)
		.await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(user["id"], id);
	assert_eq!(user["display_name"], "alice");
	assert_eq!(user["is_creator"], false);
	assert!(user.get("email").is_none(), "email must not be returned");

	let (status, body) = server.post("/api/users", json!({ "username": "ALICE" })).await;
	assert_eq!(status, StatusCode::CONFLICT, "{body}");

	let (status, body) = server.post("/api/users", json!({ "username": "a!" })).await;
	assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

	let (status, user) = server.get(&format!("/api/users?id={id}")).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(user["username"], "alice");
	assert_eq!(user["followers_count"], 0);
	assert_eq!(user["videos_count"], 0);

	let (status, user) = server.get("/api/users?username=alice").await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(user["id"], id);

	let (status, user) = server
		.put(&format!("/api/users?id={id}"), json!({ "display_name": "Alice A." }))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(user["display_name"], "Alice A.");
	assert_eq!(user["bio"], "hello");

	let (status, _) = server.delete(&format!("/api/users?id={id}")).await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (status, body) = server.get(&format!("/api/users?id={id}")).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "User not found" }));

	let (status, _) = server.delete(&format!("/api/users?id={id}")).await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_user_search() {
	let server = TestServer::start().await;

	server.create_user("bob_builder").await;
	server.create_user("bobby").await;
	server.create_user("carol").await;

	let (status, users) = server.get("/api/users?search=BOB").await;
	assert_eq!(status, StatusCode::OK);

	let names = users
		.as_array()
		.unwrap()
		.iter()
		.map(|u| u["username"].as_str().unwrap())
		.collect::<Vec<_>>();
	assert_eq!(names, vec!["bob_builder", "bobby"]);

	let (_, users) = server.get("/api/users?limit=1").await;
	assert_eq!(users.as_array().unwrap().len(), 1);

	let (status, _) = server.put("/api/users?id=00000000-0000-0000-0000-000000000000", json!({ "bio": "x" })).await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	server.shutdown().await;
}
