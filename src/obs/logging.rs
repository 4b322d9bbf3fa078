// std
use std::{
	fs::{self, OpenOptions},
	sync::Mutex as StdMutex,
};
// crates.io
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
// self
use crate::_prelude::*;

/// Log file the backup binary appends to by default.
pub const DEFAULT_LOG_FILE: &str = "strava_backup.log";
/// Filter applied when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global subscriber: a stdout layer plus, when `log_file` is set, an
/// append-only file layer without ANSI colors.
pub fn init_logging(log_file: Option<&Path>) -> Result<(), ConfigError> {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
	let file_layer = match log_file {
		Some(path) => {
			if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
				fs::create_dir_all(parent).map_err(|e| ConfigError::Logging {
					message: format!("cannot create {}: {e}", parent.display()),
				})?;
			}

			let file = OpenOptions::new().create(true).append(true).open(path).map_err(|e| {
				ConfigError::Logging { message: format!("cannot open {}: {e}", path.display()) }
			})?;

			Some(fmt::layer().with_ansi(false).with_writer(StdMutex::new(file)))
		},
		None => None,
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer())
		.with(file_layer)
		.try_init()
		.map_err(|e| ConfigError::Logging { message: e.to_string() })
}
