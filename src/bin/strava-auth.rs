//! `strava-auth`: run the one-time consent flow and print a refresh token for `strava-backup`.

// std
use std::process::ExitCode;
// crates.io
use clap::Parser;
// self
use strava_backup::{
	auth::ACTIVITY_READ_ALL, cli::AuthArgs, error::Error, obs, pipeline::AuthorizeJob,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let args = AuthArgs::parse();

	if let Err(err) = obs::init_logging(None) {
		eprintln!("{err}");

		return ExitCode::from(Error::from(err).exit_code());
	}

	let settings = args.settings();
	let manual = settings.manual;
	let result = match AuthorizeJob::new(settings) {
		Ok(job) =>
			job.run(|url| {
				println!("Open this URL in a browser and approve access:\n\n  {url}\n");

				if manual {
					println!("Then paste the full URL the browser was redirected to:");
				} else {
					println!("Waiting for the browser to redirect back...");
				}
			})
			.await,
		Err(err) => Err(err),
	};

	match result {
		Ok(outcome) => {
			println!("\nRefresh token: {}", outcome.refresh_token.expose());

			if let Some(scope) = &outcome.scope {
				println!("Granted scopes: {scope}");
			}
			if let Some(athlete_id) = outcome.athlete_id {
				println!("Athlete ID: {athlete_id}");
			}
			if !outcome.can_read_activities() {
				println!("Warning: reauthorize with {ACTIVITY_READ_ALL} to back up activities.");
			}

			match &outcome.config_written {
				Some(path) => println!("Saved to {}.", path.display()),
				None => println!("Set STRAVA_REFRESH_TOKEN or add it to the credentials file."),
			}

			ExitCode::SUCCESS
		},
		Err(err) => {
			tracing::error!(kind = %err.kind(), "Authorization failed: {err}");

			ExitCode::from(err.exit_code())
		},
	}
}
