//! End-to-end jobs: the recurring backup and the one-time authorization.
//!
//! [`BackupJob`] runs Loader → Exchanger → Fetcher → Writer exactly once. Every stage failure
//! is terminal and nothing is written unless every page was fetched.

mod authorize;

pub use authorize::*;

// std
use std::time::{Duration as StdDuration, Instant};
// self
use crate::{
	_prelude::*,
	activities::{ActivityFetcher, ActivityQuery},
	backup::{BackupReport, BackupWriter, DEFAULT_DATA_DIR, DEFAULT_PREFIX},
	credentials::{CredentialLoader, Credentials, DEFAULT_CONFIG_FILE},
	flows::TokenExchanger,
	http::{DEFAULT_TIMEOUT, ReqwestHttpClient},
	obs::{self, Stage, StageOutcome, StageSpan},
	provider::ProviderDescriptor,
};

/// Read-only configuration for one backup run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupSettings {
	/// Fallback credentials file.
	pub config_path: PathBuf,
	/// Directory the snapshot is written to.
	pub data_dir: PathBuf,
	/// Snapshot filename prefix.
	pub prefix: String,
	/// Activity listing filters.
	pub query: ActivityQuery,
	/// Per-request HTTP timeout.
	pub timeout: StdDuration,
}
impl Default for BackupSettings {
	fn default() -> Self {
		Self {
			config_path: DEFAULT_CONFIG_FILE.into(),
			data_dir: DEFAULT_DATA_DIR.into(),
			prefix: DEFAULT_PREFIX.into(),
			query: ActivityQuery::default(),
			timeout: DEFAULT_TIMEOUT,
		}
	}
}

/// The backup pipeline with its collaborators resolved.
#[derive(Debug)]
pub struct BackupJob {
	settings: BackupSettings,
	loader: CredentialLoader,
	descriptor: ProviderDescriptor,
	http_client: ReqwestHttpClient,
}
impl BackupJob {
	/// Builds a job against the production API reading the process environment.
	pub fn new(settings: BackupSettings) -> Result<Self> {
		let loader = CredentialLoader::new(&settings.config_path);
		let descriptor = ProviderDescriptor::strava()?;
		let http_client = ReqwestHttpClient::with_timeout(settings.timeout)?;

		Ok(Self { settings, loader, descriptor, http_client })
	}

	/// Replaces the credential loader.
	pub fn with_loader(mut self, loader: CredentialLoader) -> Self {
		self.loader = loader;

		self
	}

	/// Replaces the provider descriptor.
	pub fn with_descriptor(mut self, descriptor: ProviderDescriptor) -> Self {
		self.descriptor = descriptor;

		self
	}

	/// Settings the job was built with.
	pub fn settings(&self) -> &BackupSettings {
		&self.settings
	}

	/// Runs the pipeline once.
	pub async fn run(&self) -> Result<BackupReport> {
		let started = Instant::now();

		tracing::info!(data_dir = %self.settings.data_dir.display(), "Starting Strava backup.");

		let credentials = self.load_credentials()?;
		let token = TokenExchanger::<ReqwestHttpClient>::new(
			self.descriptor.clone(),
			self.http_client.clone(),
		)
		.exchange(&credentials)
		.await?;
		let batch = ActivityFetcher::new(&self.descriptor, self.http_client.clone())
			.with_query(self.settings.query)
			.fetch_all(&token)
			.await?;

		drop(token);

		let report = BackupWriter::new(&self.settings.data_dir, self.settings.prefix.as_str())
			.write(&batch)?;

		tracing::info!(
			total = report.activities,
			pages = report.pages,
			elapsed_ms = started.elapsed().as_millis(),
			"Backed up {} activities.",
			report.activities
		);

		Ok(report)
	}

	fn load_credentials(&self) -> Result<Credentials> {
		const STAGE: Stage = Stage::Credentials;

		let _span = StageSpan::new(STAGE, "load").entered();

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let result = self.loader.load();
		let outcome = if result.is_ok() { StageOutcome::Success } else { StageOutcome::Failure };

		obs::record_stage_outcome(STAGE, outcome);

		result
	}
}
