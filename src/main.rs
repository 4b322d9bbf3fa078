//! `strava-backup`: back up the athlete's full activity history once and exit.

// std
use std::process::ExitCode;
// crates.io
use clap::Parser;
// self
use strava_backup::{cli::BackupArgs, error::Error, obs, pipeline::BackupJob};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let args = BackupArgs::parse();

	if let Err(err) = obs::init_logging(Some(&args.log_file)) {
		eprintln!("{err}");

		return ExitCode::from(Error::from(err).exit_code());
	}

	let result = match BackupJob::new(args.settings()) {
		Ok(job) => job.run().await,
		Err(err) => Err(err),
	};

	match result {
		Ok(report) => {
			println!("{} activities backed up to {}.", report.activities, report.path.display());

			ExitCode::SUCCESS
		},
		Err(err) => {
			tracing::error!(
				kind = %err.kind(),
				exit_code = err.exit_code(),
				"Backup failed: {err}"
			);

			ExitCode::from(err.exit_code())
		},
	}
}
