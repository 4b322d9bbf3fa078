//! Internal token-endpoint facade over the `oauth2` crate.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthorizationCode, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	ExtraTokenFields, HttpClientError, RefreshToken, RequestTokenError, StandardRevocableToken,
	StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet, TokenGrant, TokenSecret},
	error::body_preview,
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::ProviderDescriptor,
};

type StravaTokenResponse = StandardTokenResponse<StravaTokenFields, BasicTokenType>;
type ConfiguredClient = Client<
	BasicErrorResponse,
	StravaTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Strava-specific members of a token endpoint response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StravaTokenFields {
	/// Absolute expiry as Unix seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<i64>,
	/// Summary of the authorizing athlete (authorization-code responses only).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub athlete: Option<AthleteSummary>,
}
impl ExtraTokenFields for StravaTokenFields {}

/// Athlete summary embedded in authorization-code responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AthleteSummary {
	/// Numeric athlete identifier.
	pub id: u64,
	/// Public username, when set.
	#[serde(default)]
	pub username: Option<String>,
}

/// Grant labels used in log fields and error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantType {
	/// `grant_type=refresh_token`.
	RefreshToken,
	/// `grant_type=authorization_code`.
	AuthorizationCode,
}
impl GrantType {
	/// Returns the RFC 6749 identifier for the grant.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::RefreshToken => "refresh_token",
			GrantType::AuthorizationCode => "authorization_code",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Client for the provider's token endpoint using `client_secret_post` authentication.
pub(crate) struct TokenEndpoint<C>
where
	C: ?Sized + TokenHttpClient,
{
	oauth_client: ConfiguredClient,
	http_client: Arc<C>,
}
impl<C> TokenEndpoint<C>
where
	C: ?Sized + TokenHttpClient,
{
	pub(crate) fn new(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		client_secret: &TokenSecret,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidUrl { endpoint: "token", source })?;
		let oauth_client: ConfiguredClient = Client::new(ClientId::new(client_id.to_owned()))
			.set_token_uri(token_url)
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client, http_client: http_client.into() })
	}

	/// Performs `grant_type=refresh_token`.
	pub(crate) async fn refresh(
		&self,
		refresh_token: &TokenSecret,
		scope: &ScopeSet,
	) -> Result<TokenGrant> {
		let requested_at = OffsetDateTime::now_utc();
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let refresh_secret = RefreshToken::new(refresh_token.expose().to_owned());
		let mut request = self.oauth_client.exchange_refresh_token(&refresh_secret);

		if let Some(value) = scope.delimited() {
			request = request.add_extra_param("scope", value);
		}

		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(GrantType::RefreshToken, meta.take(), err))?;

		map_token_response(GrantType::RefreshToken, meta.take(), response, requested_at)
	}

	/// Performs `grant_type=authorization_code`.
	pub(crate) async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
		let requested_at = OffsetDateTime::now_utc();
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let response = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(GrantType::AuthorizationCode, meta.take(), err))?;

		map_token_response(GrantType::AuthorizationCode, meta.take(), response, requested_at)
	}
}

fn map_token_response(
	grant: GrantType,
	meta: Option<ResponseMetadata>,
	response: StravaTokenResponse,
	requested_at: OffsetDateTime,
) -> Result<TokenGrant> {
	let status = meta.and_then(|value| value.status);
	let malformed = |reason: String| Error::authentication(reason, status, None);
	let extra = response.extra_fields();
	let mut builder = AccessToken::builder()
		.value(response.access_token().secret().to_owned())
		.issued_at(requested_at);

	if let Some(secs) = extra.expires_at {
		let instant = OffsetDateTime::from_unix_timestamp(secs).map_err(|_| {
			malformed(format!("{grant} response carries an out-of-range expires_at ({secs})"))
		})?;

		builder = builder.expires_at(instant);
	}
	if let Some(expires_in) = response.expires_in() {
		let secs = i64::try_from(expires_in.as_secs()).map_err(|_| {
			malformed(format!("{grant} response carries an out-of-range expires_in"))
		})?;

		builder = builder.expires_in(Duration::seconds(secs));
	}

	let access_token = builder
		.build()
		.map_err(|err| {
			let detail = err.to_string();

			malformed(format!("{grant} response is unusable: {}", detail.trim_end_matches('.')))
		})?;
	// `oauth2` splits on whitespace only; Strava joins with commas.
	let scope = match response.scopes() {
		Some(scopes) => {
			let raw = scopes.iter().map(|scope| scope.as_str()).collect::<Vec<_>>().join(" ");

			Some(ScopeSet::from_str(&raw).map_err(|err| {
				let detail = err.to_string();

				malformed(format!(
					"{grant} response scopes are invalid: {}",
					detail.trim_end_matches('.')
				))
			})?)
		},
		None => None,
	};

	Ok(TokenGrant {
		access_token,
		refresh_token: response.refresh_token().map(|token| TokenSecret::new(token.secret())),
		scope,
		athlete_id: extra.athlete.as_ref().map(|athlete| athlete.id),
	})
}

fn map_request_error<E>(
	grant: GrantType,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	let status = meta.as_ref().and_then(|value| value.status);
	let captured = meta.and_then(|value| value.body_preview);

	match err {
		RequestTokenError::ServerResponse(response) => {
			let reason = match response.error_description() {
				Some(description) => format!(
					"token endpoint rejected the {grant} grant: {} ({description})",
					response.error().as_ref()
				),
				None => format!(
					"token endpoint rejected the {grant} grant: {}",
					response.error().as_ref()
				),
			};

			Error::authentication(reason, status, captured)
		},
		RequestTokenError::Request(error) => Error::authentication(
			format!("token endpoint could not be reached: {}", describe_transport_error(&error)),
			status,
			captured,
		),
		RequestTokenError::Parse(error, body) => {
			let body = captured.or_else(|| {
				Some(body_preview(&String::from_utf8_lossy(&body))).filter(|b| !b.is_empty())
			});

			Error::authentication(
				format!("token endpoint returned a malformed {grant} response: {error}"),
				status,
				body,
			)
		},
		RequestTokenError::Other(message) => Error::authentication(
			format!("token endpoint returned an unexpected {grant} response: {message}"),
			status,
			captured,
		),
	}
}

fn describe_transport_error<E>(err: &HttpClientError<E>) -> String
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => inner.to_string(),
		HttpClientError::Http(inner) => inner.to_string(),
		HttpClientError::Io(inner) => inner.to_string(),
		HttpClientError::Other(message) => message.clone(),
		_ => "unknown transport failure".into(),
	}
}
