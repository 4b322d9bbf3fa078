// self
use crate::obs::{Stage, StageOutcome};

/// Records a stage outcome via the global metrics recorder (when enabled).
pub fn record_stage_outcome(stage: Stage, outcome: StageOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"strava_backup_stage_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}

/// Adds one fetched page and its item count to the activity counters.
pub fn record_page_fetched(count: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("strava_backup_pages_total").increment(1);
		metrics::counter!("strava_backup_activities_total")
			.increment(u64::try_from(count).unwrap_or(u64::MAX));
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = count;
	}
}
