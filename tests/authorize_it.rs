// std
use std::fs;
// crates.io
use httpmock::prelude::*;
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::TcpStream,
	task::JoinHandle,
};
// self
use strava_backup::{
	_preludet::*,
	credentials::{ENV_CLIENT_ID, ENV_CLIENT_SECRET, conf_file},
	error::Error,
	pipeline::{AuthorizeJob, AuthorizeSettings},
};

const CODE_GRANT_BODY: &str = "{\"token_type\":\"Bearer\",\"access_token\":\"access-auth\",\
	\"expires_at\":1900000000,\"refresh_token\":\"refresh-minted\",\"athlete\":{\"id\":4242}}";

fn job(server: &MockServer, config_path: &Path) -> AuthorizeJob {
	let settings = AuthorizeSettings {
		config_path: config_path.to_path_buf(),
		port: 0,
		write_config: true,
		..AuthorizeSettings::default()
	};

	AuthorizeJob::new(settings)
		.expect("Authorize job should build.")
		.with_loader(loader_with_env(
			config_path,
			[(ENV_CLIENT_ID, TEST_CLIENT_ID), (ENV_CLIENT_SECRET, TEST_CLIENT_SECRET)],
		))
		.with_descriptor(mock_descriptor(&server.base_url()))
}

fn query_value(url: &Url, key: &str) -> String {
	url.query_pairs()
		.find(|(name, _)| name == key)
		.map(|(_, value)| value.into_owned())
		.expect("Authorize URL should carry the parameter.")
}

// Plays the browser: follows the redirect URI from the authorize URL with extra query pairs.
fn follow_redirect(authorize_url: &Url, extra: &'static str) -> JoinHandle<String> {
	let redirect = Url::parse(&query_value(authorize_url, "redirect_uri"))
		.expect("Redirect URI should parse.");
	let state = query_value(authorize_url, "state");
	let port = redirect.port().expect("Loopback redirect URI should carry a port.");

	tokio::spawn(async move {
		let mut stream =
			TcpStream::connect(("127.0.0.1", port)).await.expect("Listener should accept.");
		let request = format!(
			"GET {}?state={state}&{extra} HTTP/1.1\r\n\
			 Host: localhost\r\nConnection: close\r\n\r\n",
			redirect.path()
		);

		stream.write_all(request.as_bytes()).await.expect("Redirect request should send.");

		let mut response = String::new();

		stream.read_to_string(&mut response).await.expect("Listener should respond.");

		response
	})
}

#[tokio::test]
async fn consent_round_trip_mints_and_stores_refresh_token() {
	let server = MockServer::start_async().await;
	let config_path = temp_path("authorize_ok").join("strava.conf");
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(CODE_GRANT_BODY);
		})
		.await;
	let mut browser = None;
	let outcome = job(&server, &config_path)
		.run(|url| {
			assert_eq!(query_value(url, "client_id"), TEST_CLIENT_ID);
			assert_eq!(query_value(url, "response_type"), "code");
			assert_eq!(query_value(url, "approval_prompt"), "force");

			browser = Some(follow_redirect(url, "code=consent-code&scope=read,activity:read_all"));
		})
		.await
		.expect("Consent round trip should succeed.");
	let page = browser
		.expect("Authorize URL should have been presented.")
		.await
		.expect("Browser task should finish.");

	token.assert_calls_async(1).await;

	assert!(page.starts_with("HTTP/1.1 200 OK"));
	assert_eq!(outcome.refresh_token.expose(), "refresh-minted");
	assert_eq!(outcome.athlete_id, Some(4242));
	assert!(outcome.can_read_activities());
	assert_eq!(outcome.config_written.as_deref(), Some(config_path.as_path()));

	let stored = conf_file::parse(
		&fs::read_to_string(&config_path).expect("Config file should have been written."),
	);

	assert_eq!(stored.client_id.as_deref(), Some(TEST_CLIENT_ID));
	assert_eq!(stored.refresh_token.as_ref().map(|secret| secret.expose()), Some("refresh-minted"));

	if let Some(dir) = config_path.parent() {
		let _ = fs::remove_dir_all(dir);
	}
}

#[tokio::test]
async fn denied_consent_never_reaches_the_token_endpoint() {
	let server = MockServer::start_async().await;
	let config_path = temp_path("authorize_denied").join("strava.conf");
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(CODE_GRANT_BODY);
		})
		.await;
	let mut browser = None;
	let err = job(&server, &config_path)
		.run(|url| browser = Some(follow_redirect(url, "error=access_denied")))
		.await
		.expect_err("Denied consent must fail.");
	let page = browser
		.expect("Authorize URL should have been presented.")
		.await
		.expect("Browser task should finish.");

	token.assert_calls_async(0).await;

	assert!(page.contains("Authorization not granted"));
	assert_eq!(err.exit_code(), 3);
	assert!(matches!(
		err,
		Error::AuthenticationFailed { ref reason, .. } if reason.contains("access_denied")
	));
	assert!(!config_path.exists());
}
