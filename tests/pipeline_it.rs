// std
use std::fs;
// crates.io
use httpmock::prelude::*;
// self
use strava_backup::{
	_preludet::*,
	activities::ActivityQuery,
	credentials::ENV_CLIENT_ID,
	error::Error,
	pipeline::{BackupJob, BackupSettings},
};

const TOKEN_BODY: &str =
	"{\"token_type\":\"Bearer\",\"access_token\":\"access-pipeline\",\"expires_at\":1900000000}";

fn job<I>(server: &MockServer, data_dir: &Path, env: I) -> BackupJob
where
	I: IntoIterator<Item = (&'static str, &'static str)>,
{
	let settings = BackupSettings {
		config_path: temp_path("pipeline_absent.conf"),
		data_dir: data_dir.to_path_buf(),
		query: ActivityQuery::default().per_page(2),
		..BackupSettings::default()
	};

	BackupJob::new(settings)
		.expect("Backup job should build.")
		.with_loader(loader_with_env(temp_path("pipeline_absent.conf"), env))
		.with_descriptor(mock_descriptor(&server.base_url()))
}

async fn mock_token<'a>(server: &'a MockServer) -> httpmock::Mock<'a> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await
}

async fn mock_page<'a>(server: &'a MockServer, page: u32, body: String) -> httpmock::Mock<'a> {
	server
		.mock_async(move |when, then| {
			when.method(GET)
				.path("/athlete/activities")
				.header("authorization", "Bearer access-pipeline")
				.query_param("page", page.to_string())
				.query_param("per_page", "2");
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

fn page_json(start: usize, count: usize) -> String {
	serde_json::to_string(&activity_page(start, count)).expect("Page fixture should serialize.")
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
	match fs::read_dir(dir) {
		Ok(entries) => entries
			.filter_map(|entry| entry.ok().map(|entry| entry.path()))
			.filter(|path| path.extension().is_some_and(|ext| ext == "json"))
			.collect(),
		Err(_) => Vec::new(),
	}
}

#[tokio::test]
async fn successful_run_writes_every_activity_in_order() {
	let server = MockServer::start_async().await;
	let data_dir = temp_path("pipeline_ok");
	let token = mock_token(&server).await;

	mock_page(&server, 1, page_json(0, 2)).await;
	mock_page(&server, 2, page_json(2, 2)).await;
	mock_page(&server, 3, page_json(4, 1)).await;

	let report = job(&server, &data_dir, test_env())
		.run()
		.await
		.expect("Backup run should succeed.");

	token.assert_calls_async(1).await;

	assert_eq!(report.activities, 5);
	assert_eq!(report.pages, 3);
	assert_eq!(report.path.parent(), Some(data_dir.as_path()));

	let file_name = report
		.path
		.file_name()
		.and_then(|name| name.to_str())
		.expect("Backup path should have a UTF-8 file name.");

	assert!(file_name.starts_with("strava_activities_"));
	assert!(file_name.ends_with(".json"));

	let written: Vec<serde_json::Value> = serde_json::from_slice(
		&fs::read(&report.path).expect("Backup file should be readable."),
	)
	.expect("Backup file should hold a JSON array.");

	assert_eq!(written, activity_page(0, 5));

	let _ = fs::remove_dir_all(data_dir);
}

#[tokio::test]
async fn missing_credentials_stop_before_any_request() {
	let server = MockServer::start_async().await;
	let data_dir = temp_path("pipeline_missing");
	let token = mock_token(&server).await;
	let page = mock_page(&server, 1, page_json(0, 1)).await;
	let err = job(&server, &data_dir, [(ENV_CLIENT_ID, TEST_CLIENT_ID)])
		.run()
		.await
		.expect_err("Incomplete credentials must fail.");

	token.assert_calls_async(0).await;
	page.assert_calls_async(0).await;

	assert_eq!(err.exit_code(), 2);
	assert!(matches!(
		err,
		Error::MissingCredentials { ref missing } if missing == &["client_secret", "refresh_token"]
	));
	assert!(!data_dir.exists());
}

#[tokio::test]
async fn rejected_refresh_token_fails_authentication() {
	let server = MockServer::start_async().await;
	let data_dir = temp_path("pipeline_auth");

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"message\":\"Authorization Error\"}");
		})
		.await;

	let page = mock_page(&server, 1, page_json(0, 1)).await;
	let err = job(&server, &data_dir, test_env())
		.run()
		.await
		.expect_err("Rejected refresh must fail.");

	page.assert_calls_async(0).await;

	assert_eq!(err.exit_code(), 3);
	assert!(matches!(err, Error::AuthenticationFailed { status: Some(401), .. }));
	assert!(!data_dir.exists());
}

#[tokio::test]
async fn failed_page_discards_partial_results() {
	let server = MockServer::start_async().await;
	let data_dir = temp_path("pipeline_partial");

	mock_token(&server).await;
	mock_page(&server, 1, page_json(0, 2)).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/athlete/activities").query_param("page", "2");
			then.status(429).body("{\"message\":\"Rate Limit Exceeded\"}");
		})
		.await;

	let err = job(&server, &data_dir, test_env())
		.run()
		.await
		.expect_err("A failed page must fail the run.");

	assert_eq!(err.exit_code(), 4);
	assert!(matches!(err, Error::FetchFailed { page: 2, status: Some(429), .. }));
	assert!(json_files(&data_dir).is_empty());
}
