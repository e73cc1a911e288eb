use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use common::context::Context;
use common::{logging, signal};
use tokio::signal::unix::SignalKind;
use tokio::{select, time};

use crate::store::{MemoryStore, PgStore, Store};
use crate::video_host::VideoHostClient;

mod api;
mod config;
mod database;
mod feed;
mod global;
mod store;
mod video_host;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() -> Result<()> {
	let config = config::AppConfig::parse()?;

	logging::init(&config.logging.level, config.logging.mode)?;

	if let Some(file) = &config.config_file {
		tracing::info!(file = file, "loaded config from file");
	}

	tracing::debug!("config: {:#?}", config);

	let store: Arc<dyn Store> = if config.database.in_memory {
		tracing::warn!("using the in-memory store, data is lost on shutdown");
		Arc::new(MemoryStore::new())
	} else {
		let store = PgStore::connect(&config.database)
			.await
			.context("failed to connect to database")?;

		if config.database.migrate {
			store.migrate().await.context("failed to run migrations")?;
			tracing::info!("migrations applied");
		}

		Arc::new(store)
	};

	let video_host = VideoHostClient::new(config.video_host.clone()).context("failed to build video host client")?;

	let (ctx, handler) = Context::new();

	let global = Arc::new(global::GlobalState::new(config, ctx, store, video_host));

	let api_future = tokio::spawn(api::run(global.clone()));

	// Listen on both sigint and sigterm and cancel the context when either is received
	let mut signal_handler = signal::SignalHandler::new()
		.with_signal(SignalKind::interrupt())
		.with_signal(SignalKind::terminate());

	select! {
		r = api_future => tracing::error!("api stopped unexpectedly: {:?}", r),
		_ = signal_handler.recv() => tracing::info!("shutting down"),
	}

	// We cannot have a context in scope when we cancel the handler, otherwise it will deadlock.
	drop(global);

	// Cancel the context
	tracing::info!("waiting for tasks to finish");

	select! {
		_ = time::sleep(Duration::from_secs(60)) => tracing::warn!("force shutting down"),
		_ = signal_handler.recv() => tracing::warn!("force shutting down"),
		_ = handler.cancel() => tracing::info!("shutting down"),
	}

	Ok(())
}
