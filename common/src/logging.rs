use std::str::FromStr;

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::{EnvFilter, Registry};

static RELOAD_HANDLE: OnceCell<Handle<EnvFilter, Registry>> = OnceCell::new();

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
	#[default]
	Default,
	Json,
	Pretty,
	Compact,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
	#[error("invalid log level: {0}")]
	InvalidLevel(#[from] tracing_subscriber::filter::ParseError),
	#[error("failed to init logger: {0}")]
	Init(#[from] tracing_subscriber::util::TryInitError),
	#[error("failed to reload logger: {0}")]
	Reload(#[from] tracing_subscriber::reload::Error),
}

/// Installs the global subscriber on the first call. Later calls only swap the
/// level filter, the mode chosen first stays in place.
pub fn init(level: &str, mode: Mode) -> Result<(), LoggingError> {
	let handle = RELOAD_HANDLE.get_or_try_init(|| {
		let (filter, handle) = tracing_subscriber::reload::Layer::new(EnvFilter::from_str(level)?);

		let fmt = tracing_subscriber::fmt::layer().with_line_number(true).with_file(true);

		let registry = tracing_subscriber::registry().with(filter);

		match mode {
			Mode::Default => registry.with(fmt).try_init()?,
			Mode::Json => registry.with(fmt.json()).try_init()?,
			Mode::Pretty => registry.with(fmt.pretty()).try_init()?,
			Mode::Compact => registry.with(fmt.compact()).try_init()?,
		}

		Ok::<_, LoggingError>(handle)
	})?;

	handle.reload(EnvFilter::from_str(level)?)?;

	Ok(())
}
