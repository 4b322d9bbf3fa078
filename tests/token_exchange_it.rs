// crates.io
use httpmock::prelude::*;
// self
use strava_backup::{
	_preludet::*,
	auth::TokenSecret,
	error::Error,
	flows::{ReqwestTokenExchanger, TokenExchanger},
};

fn exchanger(server: &MockServer) -> ReqwestTokenExchanger {
	TokenExchanger::new(mock_descriptor(&server.base_url()), test_http_client())
}

#[tokio::test]
async fn refresh_returns_access_token_with_absolute_expiry() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(
				"{\"token_type\":\"Bearer\",\"access_token\":\"access-new\",\"expires_at\":1900000000,\"expires_in\":21600,\"refresh_token\":\"refresh-backup\"}",
			);
		})
		.await;
	let grant = exchanger(&server)
		.refresh(&test_credentials())
		.await
		.expect("Refresh exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(grant.access_token.value.expose(), "access-new");
	assert_eq!(grant.access_token.expires_at.unix_timestamp(), 1_900_000_000);
	assert_eq!(grant.refresh_token.as_ref().map(TokenSecret::expose), Some(TEST_REFRESH_TOKEN));
}

#[tokio::test]
async fn relative_expiry_is_used_when_absolute_is_missing() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"token_type\":\"Bearer\",\"access_token\":\"access-new\",\"expires_in\":600}");
		})
		.await;

	let before = OffsetDateTime::now_utc();
	let token = exchanger(&server)
		.exchange(&test_credentials())
		.await
		.expect("Relative expiry should be accepted.");

	assert!(token.expires_at >= before + Duration::seconds(600));
	assert!(token.expires_at <= OffsetDateTime::now_utc() + Duration::seconds(600));
}

#[tokio::test]
async fn rejected_refresh_carries_status_and_body() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(400).header("content-type", "application/json").body(
				"{\"message\":\"Bad Request\",\"errors\":[{\"resource\":\"RefreshToken\",\"field\":\"refresh_token\",\"code\":\"invalid\"}]}",
			);
		})
		.await;
	let err = exchanger(&server)
		.exchange(&test_credentials())
		.await
		.expect_err("A 400 response must fail the exchange.");

	mock.assert_calls_async(1).await;

	match err {
		Error::AuthenticationFailed { status, body, .. } => {
			assert_eq!(status, Some(400));
			assert!(body.is_some_and(|body| body.contains("RefreshToken")));
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn standard_error_response_is_an_authentication_failure() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"revoked\"}");
		})
		.await;

	let err = exchanger(&server)
		.exchange(&test_credentials())
		.await
		.expect_err("invalid_grant must fail the exchange.");

	assert_eq!(err.exit_code(), 3);
	assert!(err.to_string().contains("invalid_grant"));
	assert!(matches!(err, Error::AuthenticationFailed { status: Some(401), .. }));
}

#[tokio::test]
async fn success_without_access_token_is_malformed() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"token_type\":\"Bearer\",\"expires_in\":600}");
		})
		.await;

	let err = exchanger(&server)
		.exchange(&test_credentials())
		.await
		.expect_err("A body without access_token must be rejected.");

	assert!(matches!(err, Error::AuthenticationFailed { status: Some(200), body: Some(_), .. }));
}

#[tokio::test]
async fn success_without_any_expiry_is_malformed() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"token_type\":\"Bearer\",\"access_token\":\"access-new\"}");
		})
		.await;

	let err = exchanger(&server)
		.exchange(&test_credentials())
		.await
		.expect_err("A token without expiry must be rejected.");

	assert!(err.to_string().contains("expir"));
}
