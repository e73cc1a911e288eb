use std::sync::Arc;

use common::context::Context;

use crate::config::{ApiConfig, AppConfig, FeedConfig, MonetizationConfig, VideoHostConfig};
use crate::store::Store;
use crate::video_host::VideoHostClient;

pub trait ApiState {
	fn store(&self) -> &dyn Store;
	fn video_host(&self) -> &VideoHostClient;
}

pub trait ApiGlobal:
	common::global::GlobalCtx
	+ common::global::GlobalConfigProvider<ApiConfig>
	+ common::global::GlobalConfigProvider<FeedConfig>
	+ common::global::GlobalConfigProvider<MonetizationConfig>
	+ common::global::GlobalConfigProvider<VideoHostConfig>
	+ common::global::GlobalConfig
	+ ApiState
	+ Send
	+ Sync
	+ 'static
{
}

impl<T> ApiGlobal for T where
	T: common::global::GlobalCtx
		+ common::global::GlobalConfigProvider<ApiConfig>
		+ common::global::GlobalConfigProvider<FeedConfig>
		+ common::global::GlobalConfigProvider<MonetizationConfig>
		+ common::global::GlobalConfigProvider<VideoHostConfig>
		+ common::global::GlobalConfig
		+ ApiState
		+ Send
		+ Sync
		+ 'static
{
}

pub struct GlobalState {
	pub config: AppConfig,
	pub ctx: Context,
	pub store: Arc<dyn Store>,
	pub video_host: VideoHostClient,
}

impl GlobalState {
	pub fn new(config: AppConfig, ctx: Context, store: Arc<dyn Store>, video_host: VideoHostClient) -> Self {
		Self {
			config,
			ctx,
			store,
			video_host,
		}
	}
}

impl common::global::GlobalCtx for GlobalState {
	fn ctx(&self) -> &Context {
		&self.ctx
	}
}

impl common::global::GlobalConfig for GlobalState {}

impl common::global::GlobalConfigProvider<ApiConfig> for GlobalState {
	fn provide_config(&self) -> &ApiConfig {
		&self.config.api
	}
}

impl common::global::GlobalConfigProvider<FeedConfig> for GlobalState {
	fn provide_config(&self) -> &FeedConfig {
		&self.config.feed
	}
}

impl common::global::GlobalConfigProvider<MonetizationConfig> for GlobalState {
	fn provide_config(&self) -> &MonetizationConfig {
		&self.config.monetization
	}
}

impl common::global::GlobalConfigProvider<VideoHostConfig> for GlobalState {
	fn provide_config(&self) -> &VideoHostConfig {
		&self.config.video_host
	}
}

impl ApiState for GlobalState {
	fn store(&self) -> &dyn Store {
		self.store.as_ref()
	}

	fn video_host(&self) -> &VideoHostClient {
		&self.video_host
	}
}
