use std::sync::Arc;

use common::context::{Context, Handler};

use crate::config::AppConfig;
use crate::global::GlobalState;
use crate::store::MemoryStore;
use crate::video_host::VideoHostClient;

mod video_host;

pub use video_host::{mock_video_host, MockVideoHost};

pub async fn mock_global_state(config: AppConfig) -> (Arc<GlobalState>, Handler) {
	let (ctx, handler) = Context::new();

	let video_host = VideoHostClient::new(config.video_host.clone()).expect("failed to build video host client");

	let global = Arc::new(GlobalState::new(config, ctx, Arc::new(MemoryStore::new()), video_host));

	(global, handler)
}
