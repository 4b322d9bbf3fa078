//! Observability helpers shared by the pipeline stages and the authorization helper.
//!
//! - Every stage runs inside a `strava_backup.stage` span carrying the `stage` and `op` fields.
//! - Enable the `metrics` feature to increment the `strava_backup_stage_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`, plus
//!   `strava_backup_pages_total` and `strava_backup_activities_total` for fetched pages.
//! - [`init_logging`] installs the stdout and log-file subscribers used by both binaries.

mod logging;
mod metrics;
mod tracing;

pub use self::{logging::*, metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Pipeline stages observed by spans, logs, and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Credential resolution from the environment and config file.
	Credentials,
	/// Refresh-token exchange.
	Authenticate,
	/// Paginated activity listing.
	Fetch,
	/// Backup file persistence.
	Write,
	/// One-time authorization-code flow run by `strava-auth`.
	Authorize,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Credentials => "credentials",
			Stage::Authenticate => "authenticate",
			Stage::Fetch => "fetch",
			Stage::Write => "write",
			Stage::Authorize => "authorize",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
