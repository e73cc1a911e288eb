use clap::Parser;

use crate::logging;

/// Prefix of the environment variables overriding config keys, nested keys are
/// separated by a double underscore (`XDOSE_DATABASE__URI`).
pub const ENV_PREFIX: &str = "XDOSE";

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
	/// The log level to use, this is a tracing env filter
	pub level: String,

	/// What logging mode we should use
	pub mode: logging::Mode,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			mode: logging::Mode::Default,
		}
	}
}

#[derive(Debug, Parser)]
struct Cli {
	/// Path to the config file, the extension picks the format
	#[arg(long, short = 'c')]
	config_file: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to load config: {0}")]
	Load(#[from] config::ConfigError),
	#[error("failed to parse command line: {0}")]
	Cli(#[from] clap::Error),
	#[error("failed to resolve config path: {0}")]
	Path(#[from] std::io::Error),
}

/// Loads `C` from, in increasing priority, its serde defaults, the config file
/// and the environment.
///
/// A file passed with `--config-file` must exist, the fallback `config_file`
/// is optional. Returns the canonical path of the file that was read.
pub fn parse<C: serde::de::DeserializeOwned>(
	enable_cli: bool,
	config_file: Option<String>,
) -> Result<(C, Option<String>), ConfigError> {
	let cli_file = if enable_cli { Cli::try_parse()?.config_file } else { None };

	let required = cli_file.is_some();

	let mut builder = config::Config::builder();

	let mut config_path = None;

	if let Some(path) = cli_file.or(config_file) {
		let source = config::File::with_name(&path).required(required);

		// `with_name` also accepts a stem without extension, resolve what was
		// actually found so it can be reported
		config_path = ["", ".toml", ".yaml", ".yml", ".json"]
			.iter()
			.map(|ext| format!("{path}{ext}"))
			.find(|candidate| std::path::Path::new(candidate).is_file());

		builder = builder.add_source(source);
	}

	builder = builder.add_source(
		config::Environment::with_prefix(ENV_PREFIX)
			.prefix_separator("_")
			.separator("__")
			.try_parsing(true),
	);

	let config = builder.build()?.try_deserialize()?;

	let config_path = match config_path {
		Some(path) => Some(std::fs::canonicalize(path)?.display().to_string()),
		None => None,
	};

	Ok((config, config_path))
}
