//! Command-line argument models for both binaries.

// std
use std::time::Duration as StdDuration;
// crates.io
use clap::Parser;
use time::{Date, format_description::well_known::Rfc3339, macros::format_description};
// self
use crate::{
	_prelude::*,
	activities::{ActivityQuery, DEFAULT_PAGE_SIZE},
	auth::ScopeSet,
	backup::{DEFAULT_DATA_DIR, DEFAULT_PREFIX},
	credentials::DEFAULT_CONFIG_FILE,
	obs::DEFAULT_LOG_FILE,
	pipeline::{AuthorizeSettings, BackupSettings, DEFAULT_AUTH_SCOPE, DEFAULT_REDIRECT_PORT},
};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Back up the full Strava activity history to a timestamped JSON file.
#[derive(Debug, Parser)]
#[command(name = "strava-backup", version)]
pub struct BackupArgs {
	/// Credentials file consulted when STRAVA_* variables are missing.
	#[arg(long, env = "STRAVA_BACKUP_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
	pub config: PathBuf,
	/// Directory the snapshot is written to.
	#[arg(long, env = "STRAVA_BACKUP_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
	pub data_dir: PathBuf,
	/// Snapshot filename prefix.
	#[arg(long, default_value = DEFAULT_PREFIX)]
	pub prefix: String,
	/// Append-only log file.
	#[arg(long, default_value = DEFAULT_LOG_FILE)]
	pub log_file: PathBuf,
	/// Activities requested per page.
	#[arg(
		long,
		default_value_t = DEFAULT_PAGE_SIZE,
		value_parser = clap::value_parser!(u32).range(1..=200)
	)]
	pub per_page: u32,
	/// Only back up activities after this instant (RFC 3339 or YYYY-MM-DD, UTC).
	#[arg(long, value_parser = parse_instant)]
	pub after: Option<OffsetDateTime>,
	/// Only back up activities before this instant (RFC 3339 or YYYY-MM-DD, UTC).
	#[arg(long, value_parser = parse_instant)]
	pub before: Option<OffsetDateTime>,
	/// Per-request HTTP timeout in seconds.
	#[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
	pub timeout_secs: u64,
}
impl BackupArgs {
	/// Converts the arguments into pipeline settings.
	pub fn settings(&self) -> BackupSettings {
		let mut query = ActivityQuery::default().per_page(self.per_page);

		if let Some(after) = self.after {
			query = query.after(after);
		}
		if let Some(before) = self.before {
			query = query.before(before);
		}

		BackupSettings {
			config_path: self.config.clone(),
			data_dir: self.data_dir.clone(),
			prefix: self.prefix.clone(),
			query,
			timeout: StdDuration::from_secs(self.timeout_secs),
		}
	}
}

/// Authorize this client once and print the refresh token for `strava-backup`.
#[derive(Debug, Parser)]
#[command(name = "strava-auth", version)]
pub struct AuthArgs {
	/// Credentials file holding the client ID and secret.
	#[arg(long, env = "STRAVA_BACKUP_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
	pub config: PathBuf,
	/// Port for the local redirect listener.
	#[arg(long, default_value_t = DEFAULT_REDIRECT_PORT)]
	pub port: u16,
	/// Comma-separated scopes to request.
	#[arg(long, default_value = DEFAULT_AUTH_SCOPE)]
	pub scope: ScopeSet,
	/// Paste the redirect URL instead of running the local listener.
	#[arg(long)]
	pub manual: bool,
	/// Store the new refresh token in the credentials file.
	#[arg(long)]
	pub write_config: bool,
	/// Per-request HTTP timeout in seconds.
	#[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
	pub timeout_secs: u64,
}
impl AuthArgs {
	/// Converts the arguments into authorization settings.
	pub fn settings(&self) -> AuthorizeSettings {
		AuthorizeSettings {
			config_path: self.config.clone(),
			port: self.port,
			scope: self.scope.clone(),
			manual: self.manual,
			write_config: self.write_config,
			timeout: StdDuration::from_secs(self.timeout_secs),
		}
	}
}

/// Parses an RFC 3339 timestamp or a calendar date taken as UTC midnight.
pub fn parse_instant(raw: &str) -> Result<OffsetDateTime, String> {
	if let Ok(instant) = OffsetDateTime::parse(raw, &Rfc3339) {
		return Ok(instant);
	}

	Date::parse(raw, format_description!("[year]-[month]-[day]"))
		.map(|date| date.midnight().assume_utc())
		.map_err(|_| format!("expected RFC 3339 or YYYY-MM-DD, got `{raw}`"))
}
