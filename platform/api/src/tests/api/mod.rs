use std::sync::Arc;
use std::time::Duration;

use common::context::Handler;
use common::prelude::FutureTimeout;
use serde_json::{json, Value};

use crate::api;
use crate::config::AppConfig;
use crate::global::GlobalState;
use crate::tests::global::mock_global_state;

mod content;
mod feed;
mod monetization;
mod routing;
mod social;
mod users;
mod videos;

/// An API server on a free port backed by the in-memory store.
pub struct TestServer {
	pub global: Arc<GlobalState>,
	pub client: reqwest::Client,
	base: String,
	handler: Handler,
	handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
	pub async fn start() -> Self {
		Self::with_config(AppConfig::default()).await
	}

	pub async fn with_config(mut config: AppConfig) -> Self {
		let port = portpicker::pick_unused_port().expect("failed to pick port");
		config.api.bind_address = format!("127.0.0.1:{port}").parse().unwrap();

		let (global, handler) = mock_global_state(config).await;

		let handle = tokio::spawn(api::run(global.clone()));

		// We need to wait for the server to start
		tokio::time::sleep(Duration::from_millis(300)).await;

		Self {
			global,
			client: reqwest::Client::new(),
			base: format!("http://127.0.0.1:{port}"),
			handler,
			handle,
		}
	}

	pub fn url(&self, path: &str) -> String {
		format!("{}{}", self.base, path)
	}

	pub async fn send(&self, req: reqwest::RequestBuilder) -> (http::StatusCode, Value) {
		let resp = req.send().await.expect("failed to send request");
		let status = resp.status();
		let body = resp.bytes().await.expect("failed to read body");

		let body = match body.is_empty() {
			true => Value::Null,
			false => serde_json::from_slice(&body).expect("response is not json"),
		};

		(status, body)
	}

	pub async fn get(&self, path: &str) -> (http::StatusCode, Value) {
		self.send(self.client.get(self.url(path))).await
	}

	pub async fn post(&self, path: &str, body: Value) -> (http::StatusCode, Value) {
		self.send(self.client.post(self.url(path)).json(&body)).await
	}

	pub async fn put(&self, path: &str, body: Value) -> (http::StatusCode, Value) {
		self.send(self.client.put(self.url(path)).json(&body)).await
	}

	pub async fn delete(&self, path: &str) -> (http::StatusCode, Value) {
		self.send(self.client.delete(self.url(path))).await
	}

	/// Creates a user and returns its id.
	pub async fn create_user(&self, username: &str) -> String {
		let (status, body) = self.post("/api/users", json!({ "username": username })).await;
		assert_eq!(status, http::StatusCode::CREATED, "{body}");
		body["id"].as_str().unwrap().to_owned()
	}

	/// Creates a ready video and returns its id.
	pub async fn create_video(&self, user_id: &str, title: &str) -> String {
		let (status, body) = self
			.post(
				"/api/videos",
				json!({
					"user_id": user_id,
					"title": title,
					"playback_url": "https://stream.example.com/video.m3u8",
				}),
			)
			.await;
		assert_eq!(status, http::StatusCode::CREATED, "{body}");
		body["id"].as_str().unwrap().to_owned()
	}

	/// Creates a text post and returns its id.
	pub async fn create_text_post(&self, user_id: &str, content: &str) -> String {
		let (status, body) = self
			.post("/api/text-posts", json!({ "user_id": user_id, "content": content }))
			.await;
		assert_eq!(status, http::StatusCode::CREATED, "{body}");
		body["id"].as_str().unwrap().to_owned()
	}

	pub async fn shutdown(self) {
		let Self {
			global,
			client,
			handler,
			handle,
			..
		} = self;

		// The client uses Keep-Alive, so we need to drop it to release the global context
		drop(global);
		drop(client);

		handler
			.cancel()
			.timeout(Duration::from_secs(1))
			.await
			.expect("failed to cancel context");

		handle
			.timeout(Duration::from_secs(1))
			.await
			.unwrap()
			.unwrap()
			.unwrap();
	}
}
