use http::StatusCode;
use serde_json::json;
use serial_test::serial;

use super::TestServer;

#[serial]
#[tokio::test]
async fn test_serial_comment_threads() {
	let server = TestServer::start().await;

	let alice = server.create_user("alice").await;
	let bob = server.create_user("bob").await;
	let video = server.create_video(&alice, "Threads").await;
	let post = server.create_text_post(&alice, "Hello world").await;

	let (status, root) = server
		.post(
			"/api/comments",
			json!({ "user_id": bob, "video_id": video, "content": "First!" }),
		)
		.await;
	assert_eq!(status, StatusCode::CREATED, "{root}");
	assert_eq!(root["author"]["username"], "bob");
	let root_id = root["id"].as_str().unwrap().to_owned();

	let (status, reply) = server
		.post(
			"/api/comments",
			json!({ "user_id": alice, "video_id": video, "parent_id": root_id, "content": "Thanks" }),
		)
		.await;
	assert_eq!(status, StatusCode::CREATED);
	let reply_id = reply["id"].as_str().unwrap().to_owned();

	// A reply must live on the same content as its parent.
	let (status, body) = server
		.post(
			"/api/comments",
			json!({ "user_id": alice, "text_post_id": post, "parent_id": root_id, "content": "Wrong place" }),
		)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Parent comment belongs to different content" }));

	let (status, body) = server
		.post(
			"/api/comments",
			json!({
				"user_id": alice,
				"video_id": video,
				"parent_id": "00000000-0000-0000-0000-000000000000",
				"content": "Orphan",
			}),
		)
		.await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "Parent comment not found" }));

	let (status, body) = server
		.post("/api/comments", json!({ "user_id": alice, "video_id": video, "content": "   " }))
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Missing required fields: content" }));

	let (status, threads) = server.get(&format!("/api/comments?video_id={video}")).await;
	assert_eq!(status, StatusCode::OK);
	let threads = threads.as_array().unwrap();
	assert_eq!(threads.len(), 1);
	assert_eq!(threads[0]["id"], root_id.as_str());
	assert_eq!(threads[0]["replies"][0]["id"], reply_id.as_str());
	assert_eq!(threads[0]["replies"][0]["author"]["username"], "alice");

	let (_, engagement) = server.get(&format!("/api/engagement?video_id={video}")).await;
	assert_eq!(engagement["comments_count"], 2);

	let (status, _) = server
		.put(
			&format!("/api/comments?id={root_id}"),
			json!({ "user_id": alice, "content": "Hijacked" }),
		)
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, comment) = server
		.put(&format!("/api/comments?id={root_id}"), json!({ "user_id": bob, "content": "Edited" }))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(comment["content"], "Edited");

	// Deleting a comment takes its replies with it.
	let (status, _) = server.delete(&format!("/api/comments?id={root_id}&user_id={bob}")).await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (_, threads) = server.get(&format!("/api/comments?video_id={video}")).await;
	assert_eq!(threads, json!([]));

	let (status, _) = server.get(&format!("/api/comments?id={reply_id}")).await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	let (status, body) = server
		.get("/api/comments?video_id=00000000-0000-0000-0000-000000000000")
		.await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "Video not found" }));

	let (status, body) = server
		.get("/api/comments?text_post_id=00000000-0000-0000-0000-000000000000")
		.await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "Text post not found" }));

	let (_, engagement) = server.get(&format!("/api/engagement?video_id={video}")).await;
	assert_eq!(engagement["comments_count"], 0);

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_likes() {
	let server = TestServer::start().await;

	let alice = server.create_user("alice").await;
	let bob = server.create_user("bob").await;
	let post = server.create_text_post(&alice, "Like me").await;

	let (status, state) = server
		.post("/api/likes", json!({ "user_id": bob, "text_post_id": post }))
		.await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(state, json!({ "liked": true, "likes_count": 1 }));

	let (status, body) = server
		.post("/api/likes", json!({ "user_id": bob, "text_post_id": post }))
		.await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(body, json!({ "error": "Already liked" }));

	let (_, state) = server
		.get(&format!("/api/likes?text_post_id={post}&user_id={bob}"))
		.await;
	assert_eq!(state, json!({ "liked": true, "likes_count": 1 }));

	let (_, state) = server
		.get(&format!("/api/likes?text_post_id={post}&user_id={alice}"))
		.await;
	assert_eq!(state, json!({ "liked": false, "likes_count": 1 }));

	let (_, likes) = server.get(&format!("/api/likes?user_id={bob}")).await;
	assert_eq!(likes.as_array().unwrap().len(), 1);
	assert_eq!(likes[0]["text_post_id"], post.as_str());

	let (status, _) = server.get("/api/likes").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (status, body) = server
		.get("/api/likes?video_id=00000000-0000-0000-0000-000000000000")
		.await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "Video not found" }));

	let (status, state) = server
		.delete(&format!("/api/likes?text_post_id={post}&user_id={bob}"))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(state, json!({ "liked": false, "likes_count": 0 }));

	let (status, body) = server
		.delete(&format!("/api/likes?text_post_id={post}&user_id={bob}"))
		.await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "Like not found" }));

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_bookmarks() {
	let server = TestServer::start().await;

	let alice = server.create_user("alice").await;
	let video = server.create_video(&alice, "Save me").await;
	let post = server.create_text_post(&alice, "Me too").await;

	for body in [
		json!({ "user_id": alice, "video_id": video }),
		json!({ "user_id": alice, "text_post_id": post }),
	] {
		let (status, _) = server.post("/api/bookmarks", body).await;
		assert_eq!(status, StatusCode::CREATED);
	}

	let (status, _) = server
		.post("/api/bookmarks", json!({ "user_id": alice, "video_id": video }))
		.await;
	assert_eq!(status, StatusCode::CONFLICT);

	let (_, body) = server
		.get(&format!("/api/bookmarks?user_id={alice}&video_id={video}"))
		.await;
	assert_eq!(body, json!({ "bookmarked": true }));

	let (_, bookmarks) = server.get(&format!("/api/bookmarks?user_id={alice}")).await;
	let bookmarks = bookmarks.as_array().unwrap();
	assert_eq!(bookmarks.len(), 2);

	let saved_video = bookmarks.iter().find(|b| b["video_id"] == video.as_str()).unwrap();
	assert_eq!(saved_video["video"]["title"], "Save me");
	assert!(saved_video.get("text_post").is_none());

	let saved_post = bookmarks.iter().find(|b| b["text_post_id"] == post.as_str()).unwrap();
	assert_eq!(saved_post["text_post"]["content"], "Me too");

	let (status, _) = server.get("/api/bookmarks").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (status, _) = server
		.delete(&format!("/api/bookmarks?user_id={alice}&video_id={video}"))
		.await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (status, body) = server
		.delete(&format!("/api/bookmarks?user_id={alice}&video_id={video}"))
		.await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "Bookmark not found" }));

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_follow() {
	let server = TestServer::start().await;

	let alice = server.create_user("alice").await;
	let bob = server.create_user("bob").await;
	let carol = server.create_user("carol").await;

	for follower in [&bob, &carol] {
		let (status, follow) = server
			.post("/api/follow", json!({ "follower_id": follower, "following_id": alice }))
			.await;
		assert_eq!(status, StatusCode::CREATED);
		assert_eq!(follow["following_id"], alice.as_str());
	}

	let (status, body) = server
		.post("/api/follow", json!({ "follower_id": bob, "following_id": alice }))
		.await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(body, json!({ "error": "Already following" }));

	let (status, body) = server
		.post("/api/follow", json!({ "follower_id": alice, "following_id": alice }))
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "You cannot follow yourself" }));

	let (_, body) = server
		.get(&format!("/api/follow?follower_id={bob}&following_id={alice}"))
		.await;
	assert_eq!(body, json!({ "following": true }));

	let (_, body) = server
		.get(&format!("/api/follow?follower_id={alice}&following_id={bob}"))
		.await;
	assert_eq!(body, json!({ "following": false }));

	let (_, counts) = server.get(&format!("/api/follow?user_id={alice}")).await;
	assert_eq!(counts["followers_count"], 2);
	assert_eq!(counts["following_count"], 0);

	let (_, followers) = server.get(&format!("/api/follow?user_id={alice}&type=followers")).await;
	let mut names = followers
		.as_array()
		.unwrap()
		.iter()
		.map(|u| u["username"].as_str().unwrap().to_owned())
		.collect::<Vec<_>>();
	names.sort();
	assert_eq!(names, ["bob", "carol"]);

	let (_, following) = server.get(&format!("/api/follow?user_id={bob}&type=following")).await;
	assert_eq!(following[0]["id"], alice.as_str());

	let (_, user) = server.get(&format!("/api/users?id={alice}")).await;
	assert_eq!(user["followers_count"], 2);

	let (status, _) = server
		.delete(&format!("/api/follow?follower_id={bob}&following_id={alice}"))
		.await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (status, body) = server
		.delete(&format!("/api/follow?follower_id={bob}&following_id={alice}"))
		.await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body, json!({ "error": "Not following this user" }));

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_engagement() {
	let server = TestServer::start().await;

	let alice = server.create_user("alice").await;
	let bob = server.create_user("bob").await;
	let video = server.create_video(&alice, "Watch me").await;

	for _ in 0..3 {
		let (status, _) = server
			.post("/api/engagement", json!({ "video_id": video, "action": "view" }))
			.await;
		assert_eq!(status, StatusCode::OK);
	}

	let (_, body) = server
		.post("/api/engagement", json!({ "video_id": video, "action": "view" }))
		.await;
	assert_eq!(body, json!({ "views_count": 4 }));

	let (status, body) = server
		.post("/api/engagement", json!({ "video_id": video, "action": "share" }))
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Unknown action" }));

	server
		.post("/api/likes", json!({ "user_id": bob, "video_id": video }))
		.await;
	server
		.post("/api/follow", json!({ "follower_id": bob, "following_id": alice }))
		.await;

	let (status, body) = server
		.get(&format!("/api/engagement?video_id={video}&user_id={bob}"))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(
		body,
		json!({
			"liked": true,
			"bookmarked": false,
			"following_author": true,
			"likes_count": 1,
			"comments_count": 0,
			"views_count": 4,
		})
	);

	// Authors never follow themselves.
	let (_, body) = server
		.get(&format!("/api/engagement?video_id={video}&user_id={alice}"))
		.await;
	assert_eq!(body["following_author"], false);
	assert_eq!(body["liked"], false);

	let (status, _) = server
		.get("/api/engagement?text_post_id=00000000-0000-0000-0000-000000000000")
		.await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	server.shutdown().await;
}
