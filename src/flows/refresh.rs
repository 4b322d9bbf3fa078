//! Refresh-token and authorization-code exchanges.
//!
//! Both grants authenticate with `client_secret_post`. Neither is retried: a rejected or
//! malformed response surfaces as [`Error::AuthenticationFailed`] with the HTTP status and a
//! body preview, and the run ends there.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet, TokenGrant},
	credentials::{ClientCredentials, Credentials},
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::{GrantType, TokenEndpoint},
	obs::{self, Stage, StageOutcome, StageSpan},
	provider::ProviderDescriptor,
};

/// Exchanger specialized for the crate's reqwest transport.
pub type ReqwestTokenExchanger = TokenExchanger<ReqwestHttpClient>;

/// Trades long-lived credentials for short-lived access tokens.
pub struct TokenExchanger<C>
where
	C: ?Sized + TokenHttpClient,
{
	descriptor: ProviderDescriptor,
	http_client: Arc<C>,
	scope: ScopeSet,
}
impl<C> TokenExchanger<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates an exchanger that requests `activity:read_all` on refresh.
	pub fn new(descriptor: ProviderDescriptor, http_client: impl Into<Arc<C>>) -> Self {
		Self { descriptor, http_client: http_client.into(), scope: ScopeSet::activity_read_all() }
	}

	/// Exchanges the refresh token and returns the access token for this run.
	pub async fn exchange(&self, credentials: &Credentials) -> Result<AccessToken> {
		self.refresh(credentials).await.map(|grant| grant.access_token)
	}

	/// Performs `grant_type=refresh_token` and returns the full grant.
	///
	/// A rotated refresh token is logged as a warning; persisting it is left to the operator.
	pub async fn refresh(&self, credentials: &Credentials) -> Result<TokenGrant> {
		const STAGE: Stage = Stage::Authenticate;

		let span = StageSpan::new(STAGE, "refresh");

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		span.instrument(async move {
			let result: Result<TokenGrant> = async {
				let endpoint = TokenEndpoint::<C>::new(
					&self.descriptor,
					&credentials.client_id,
					&credentials.client_secret,
					self.http_client.clone(),
				)?;

				endpoint.refresh(&credentials.refresh_token, &self.scope).await
			}
			.await;

			match &result {
				Ok(grant) => {
					let rotated = grant
						.refresh_token
						.as_ref()
						.is_some_and(|token| token.expose() != credentials.refresh_token.expose());

					if rotated {
						tracing::warn!(
							"Provider rotated the refresh token; update the stored credentials."
						);
					}

					tracing::info!(
						expires_at = %grant.access_token.expires_at,
						"Authentication succeeded."
					);
				},
				Err(err) => log_failure(GrantType::RefreshToken, err),
			}

			record_result(STAGE, &result);

			result
		})
		.await
	}

	/// Performs `grant_type=authorization_code` for the one-time consent flow.
	pub async fn exchange_code(
		&self,
		client: &ClientCredentials,
		code: &str,
	) -> Result<TokenGrant> {
		const STAGE: Stage = Stage::Authorize;

		let span = StageSpan::new(STAGE, "exchange_code");

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		span.instrument(async move {
			let result: Result<TokenGrant> = async {
				let endpoint = TokenEndpoint::<C>::new(
					&self.descriptor,
					&client.client_id,
					&client.client_secret,
					self.http_client.clone(),
				)?;

				endpoint.exchange_code(code).await
			}
			.await;

			match &result {
				Ok(grant) => tracing::info!(
					athlete_id = grant.athlete_id,
					refresh_token_issued = grant.refresh_token.is_some(),
					"Authorization code exchanged."
				),
				Err(err) => log_failure(GrantType::AuthorizationCode, err),
			}

			record_result(STAGE, &result);

			result
		})
		.await
	}
}
impl<C> Debug for TokenExchanger<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchanger")
			.field("descriptor", &self.descriptor)
			.field("scope", &self.scope)
			.finish()
	}
}

fn log_failure(grant: GrantType, err: &Error) {
	match err {
		Error::AuthenticationFailed { status, body, .. } => tracing::error!(
			kind = %err.kind(),
			grant = grant.as_str(),
			status = *status,
			body = body.as_deref(),
			"{err}"
		),
		_ => tracing::error!(kind = %err.kind(), grant = grant.as_str(), "{err}"),
	}
}

fn record_result<T>(stage: Stage, result: &Result<T>) {
	let outcome = if result.is_ok() { StageOutcome::Success } else { StageOutcome::Failure };

	obs::record_stage_outcome(stage, outcome);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[test]
	fn debug_omits_transport() {
		let exchanger: ReqwestTokenExchanger =
			TokenExchanger::new(mock_descriptor("http://127.0.0.1:9"), test_http_client());
		let rendered = format!("{exchanger:?}");

		assert!(rendered.contains("activity:read_all"));
		assert!(!rendered.contains("ReqwestHttpClient"));
	}

	#[tokio::test]
	async fn unreachable_endpoint_is_an_authentication_failure() {
		let exchanger: ReqwestTokenExchanger =
			TokenExchanger::new(mock_descriptor("http://127.0.0.1:9"), test_http_client());
		let err = exchanger
			.exchange(&test_credentials())
			.await
			.expect_err("Closed port must fail the exchange.");

		assert!(matches!(err, Error::AuthenticationFailed { status: None, .. }));
	}
}
