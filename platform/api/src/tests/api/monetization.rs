use http::StatusCode;
use serde_json::{json, Value};
use serial_test::serial;

use super::TestServer;

async fn create_tier(server: &TestServer, creator_id: &str, name: &str, price_cents: i64) -> Value {
	let (status, tier) = server
		.post(
			"/api/tiers",
			json!({
				"creator_id": creator_id,
				"name": name,
				"price_cents": price_cents,
				"benefits": ["  Early access ", ""],
			}),
		)
		.await;
	assert_eq!(status, StatusCode::CREATED, "{tier}");
	tier
}

#[serial]
#[tokio::test]
async fn test_serial_tiers() {
	let server = TestServer::start().await;

	let creator = server.create_user("creator").await;
	let fan = server.create_user("fan").await;

	let premium = create_tier(&server, &creator, "Premium", 1500).await;
	let basic = create_tier(&server, &creator, "Basic", 500).await;
	assert_eq!(basic["benefits"], json!(["Early access"]));
	assert_eq!(basic["is_active"], true);

	// Publishing a tier turns monetization on.
	let (_, user) = server.get(&format!("/api/users?id={creator}")).await;
	assert_eq!(user["is_creator"], true);

	let (status, body) = server
		.post("/api/tiers", json!({ "creator_id": creator, "name": "Basic", "price_cents": 700 }))
		.await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(body, json!({ "error": "A tier with this name already exists" }));

	let (status, body) = server
		.post("/api/tiers", json!({ "creator_id": creator, "name": "Free", "price_cents": 0 }))
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Price must be greater than zero" }));

	let (_, tiers) = server.get(&format!("/api/tiers?creator_id={creator}")).await;
	let names = tiers
		.as_array()
		.unwrap()
		.iter()
		.map(|t| t["name"].as_str().unwrap())
		.collect::<Vec<_>>();
	assert_eq!(names, ["Basic", "Premium"]);

	let basic_id = basic["id"].as_str().unwrap();
	let premium_id = premium["id"].as_str().unwrap();

	let (status, _) = server
		.put(&format!("/api/tiers?id={basic_id}"), json!({ "creator_id": fan, "price_cents": 1 }))
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, tier) = server
		.put(
			&format!("/api/tiers?id={basic_id}"),
			json!({ "creator_id": creator, "price_cents": 600 }),
		)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(tier["price_cents"], 600);
	assert_eq!(tier["name"], "Basic");

	let (status, body) = server
		.put(&format!("/api/tiers?id={basic_id}"), json!({ "creator_id": creator }))
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "No fields to update" }));

	// A tier with subscribers is only deactivated.
	let (status, _) = server
		.post("/api/subscriptions", json!({ "subscriber_id": fan, "tier_id": premium_id }))
		.await;
	assert_eq!(status, StatusCode::CREATED);

	let (status, body) = server
		.delete(&format!("/api/tiers?id={premium_id}&creator_id={creator}"))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["deactivated"], true);
	assert_eq!(body["tier"]["is_active"], false);

	let (_, tiers) = server.get(&format!("/api/tiers?creator_id={creator}")).await;
	assert_eq!(tiers.as_array().unwrap().len(), 1);

	let (_, tiers) = server
		.get(&format!("/api/tiers?creator_id={creator}&include_inactive=true"))
		.await;
	assert_eq!(tiers.as_array().unwrap().len(), 2);

	let (status, _) = server
		.delete(&format!("/api/tiers?id={basic_id}&creator_id={creator}"))
		.await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (status, _) = server.get(&format!("/api/tiers?id={basic_id}")).await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_subscriptions() {
	let server = TestServer::start().await;

	let creator = server.create_user("creator").await;
	let other_creator = server.create_user("other_creator").await;
	let fan = server.create_user("fan").await;

	let basic = create_tier(&server, &creator, "Basic", 500).await;
	let premium = create_tier(&server, &creator, "Premium", 1500).await;
	let foreign = create_tier(&server, &other_creator, "Elsewhere", 900).await;

	let (status, body) = server
		.post("/api/subscriptions", json!({ "subscriber_id": creator, "tier_id": basic["id"] }))
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "You cannot subscribe to yourself" }));

	let (status, subscription) = server
		.post("/api/subscriptions", json!({ "subscriber_id": fan, "tier_id": basic["id"] }))
		.await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(subscription["status"], "active");
	assert_eq!(subscription["creator_id"], creator.as_str());
	assert_eq!(subscription["tier"]["name"], "Basic");
	let id = subscription["id"].as_str().unwrap().to_owned();

	let (status, body) = server
		.post("/api/subscriptions", json!({ "subscriber_id": fan, "tier_id": premium["id"] }))
		.await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(body, json!({ "error": "Already subscribed to this creator" }));

	let (_, body) = server
		.get(&format!("/api/subscriptions?subscriber_id={fan}&creator_id={creator}"))
		.await;
	assert_eq!(body["subscribed"], true);
	assert_eq!(body["subscription"]["id"], id.as_str());

	let (status, body) = server
		.put(
			&format!("/api/subscriptions?id={id}"),
			json!({ "subscriber_id": fan, "tier_id": foreign["id"] }),
		)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Tier belongs to a different creator" }));

	let (status, body) = server
		.put(
			&format!("/api/subscriptions?id={id}"),
			json!({ "subscriber_id": fan, "tier_id": premium["id"] }),
		)
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["tier_id"], premium["id"]);
	assert_eq!(body["tier"]["price_cents"], 1500);

	let (_, subscribers) = server.get(&format!("/api/subscriptions?creator_id={creator}")).await;
	let subscribers = subscribers.as_array().unwrap();
	assert_eq!(subscribers.len(), 1);
	assert_eq!(subscribers[0]["subscriber"]["username"], "fan");

	let (_, held) = server.get(&format!("/api/subscriptions?subscriber_id={fan}")).await;
	assert_eq!(held.as_array().unwrap().len(), 1);
	assert!(held[0].get("subscriber").is_none());

	let (status, _) = server
		.delete(&format!("/api/subscriptions?id={id}&subscriber_id={creator}"))
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, body) = server
		.delete(&format!("/api/subscriptions?id={id}&subscriber_id={fan}"))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "cancelled");
	assert!(body["cancelled_at"].is_string());

	let (status, body) = server
		.delete(&format!("/api/subscriptions?id={id}&subscriber_id={fan}"))
		.await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(body, json!({ "error": "Subscription is already cancelled" }));

	let (status, body) = server
		.put(
			&format!("/api/subscriptions?id={id}"),
			json!({ "subscriber_id": fan, "tier_id": basic["id"] }),
		)
		.await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(body, json!({ "error": "Subscription is cancelled" }));

	let (_, body) = server
		.get(&format!("/api/subscriptions?subscriber_id={fan}&creator_id={creator}"))
		.await;
	assert_eq!(body, json!({ "subscribed": false, "subscription": null }));

	let (status, _) = server.get("/api/subscriptions").await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	server.shutdown().await;
}

#[serial]
#[tokio::test]
async fn test_serial_tips_and_summary() {
	let server = TestServer::start().await;

	let creator = server.create_user("creator").await;
	let fan = server.create_user("fan").await;
	let other_fan = server.create_user("other_fan").await;
	let video = server.create_video(&creator, "Tip jar").await;

	let (status, body) = server
		.post("/api/monetization", json!({ "user_id": creator }))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["is_creator"], true);

	let (status, tip) = server
		.post(
			"/api/tips",
			json!({
				"sender_id": fan,
				"recipient_id": creator,
				"amount_cents": 500,
				"message": "Great video",
				"video_id": video,
			}),
		)
		.await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(tip["video_id"], video.as_str());

	let (status, _) = server
		.post(
			"/api/tips",
			json!({ "sender_id": other_fan, "recipient_id": creator, "amount_cents": 250 }),
		)
		.await;
	assert_eq!(status, StatusCode::CREATED);

	let (status, body) = server
		.post(
			"/api/tips",
			json!({ "sender_id": fan, "recipient_id": fan, "amount_cents": 500 }),
		)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "You cannot tip yourself" }));

	let (status, body) = server
		.post(
			"/api/tips",
			json!({ "sender_id": fan, "recipient_id": creator, "amount_cents": 50 }),
		)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Tip amount must be between 100 and 100000 cents" }));

	let (status, body) = server
		.post(
			"/api/tips",
			json!({ "sender_id": fan, "recipient_id": creator, "amount_cents": 500, "message": "x".repeat(501) }),
		)
		.await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body, json!({ "error": "Message must be at most 500 characters long" }));

	let (_, received) = server.get(&format!("/api/tips?recipient_id={creator}")).await;
	assert_eq!(received["total_cents"], 750);
	assert_eq!(received["tips"].as_array().unwrap().len(), 2);

	let (_, sent) = server.get(&format!("/api/tips?sender_id={fan}")).await;
	assert_eq!(sent["total_cents"], 500);

	let tier = create_tier(&server, &creator, "Supporter", 1000).await;
	server
		.post("/api/subscriptions", json!({ "subscriber_id": fan, "tier_id": tier["id"] }))
		.await;

	let (status, summary) = server.get(&format!("/api/monetization?creator_id={creator}")).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(summary["is_creator"], true);
	assert_eq!(summary["tiers"].as_array().unwrap().len(), 1);
	assert_eq!(summary["active_subscribers"], 1);
	assert_eq!(summary["monthly_recurring_cents"], 1000);
	assert_eq!(summary["total_tips_cents"], 750);
	assert_eq!(summary["tips_count"], 2);
	assert_eq!(summary["tips_last_30_days_cents"], 750);
	assert_eq!(summary["estimated_monthly_cents"], 1750);
	assert_eq!(summary["recent_tips"].as_array().unwrap().len(), 2);

	let (status, _) = server
		.get("/api/monetization?creator_id=00000000-0000-0000-0000-000000000000")
		.await;
	assert_eq!(status, StatusCode::NOT_FOUND);

	server.shutdown().await;
}
