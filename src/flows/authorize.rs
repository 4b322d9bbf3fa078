//! Authorize-URL construction and redirect callback handling for `strava-auth`.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, auth::ScopeSet, provider::ProviderDescriptor};

/// Path the provider redirects back to after consent.
pub const REDIRECT_PATH: &str = "/exchange_token";

const STATE_LEN: usize = 32;

/// Handshake metadata for one consent round-trip.
#[derive(Clone, Debug)]
pub struct AuthorizationSession {
	/// Requested scope set.
	pub scope: ScopeSet,
	/// Opaque state value that must round-trip via the redirect.
	pub state: String,
	/// Redirect URI supplied when constructing the authorize URL.
	pub redirect_uri: Url,
	/// Fully-formed authorize URL the user opens in a browser.
	pub authorize_url: Url,
}
impl AuthorizationSession {
	/// Starts a session with a fresh random `state`.
	pub fn start(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		scope: ScopeSet,
		redirect_uri: Url,
	) -> Self {
		Self::with_state(descriptor, client_id, scope, redirect_uri, random_string(STATE_LEN))
	}

	/// Starts a session with a caller-chosen `state`.
	pub fn with_state(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		scope: ScopeSet,
		redirect_uri: Url,
		state: String,
	) -> Self {
		let authorize_url =
			build_authorize_url(descriptor, client_id, &redirect_uri, &scope, &state);

		Self { scope, state, redirect_uri, authorize_url }
	}

	/// Validates the returned `state` parameter after the redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state {
			Ok(())
		} else {
			Err(Error::authentication("authorization state mismatch", None, None))
		}
	}

	/// Extracts the authorization code from a callback, checking `error` and `state` first.
	pub fn authorization_code(&self, callback: &AuthorizationCallback) -> Result<String> {
		if let Some(error) = &callback.error {
			return Err(Error::authentication(
				format!("provider denied authorization: {error}"),
				None,
				None,
			));
		}

		self.validate_state(callback.state.as_deref().unwrap_or_default())?;

		callback
			.code
			.clone()
			.filter(|code| !code.is_empty())
			.ok_or_else(|| {
				Error::authentication("redirect carries no authorization code", None, None)
			})
	}
}

/// Query parameters the provider appends to the redirect URI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AuthorizationCallback {
	/// Authorization code to exchange.
	pub code: Option<String>,
	/// Echoed `state` value.
	pub state: Option<String>,
	/// Error code such as `access_denied`.
	pub error: Option<String>,
	/// Comma-delimited scopes the user accepted.
	pub scope: Option<String>,
}
impl AuthorizationCallback {
	/// Collects the callback parameters from a redirect URL.
	pub fn from_url(url: &Url) -> Self {
		let mut callback = Self::default();

		for (key, value) in url.query_pairs() {
			let slot = match &*key {
				"code" => &mut callback.code,
				"state" => &mut callback.state,
				"error" => &mut callback.error,
				"scope" => &mut callback.scope,
				_ => continue,
			};

			*slot = Some(value.into_owned());
		}

		callback
	}

	/// Parses a redirect URL pasted by the user.
	pub fn parse_pasted(raw: &str) -> Result<Self> {
		let url = Url::parse(raw.trim())
			.map_err(|source| ConfigError::InvalidUrl { endpoint: "pasted redirect", source })?;

		Ok(Self::from_url(&url))
	}

	/// Scopes granted by the user, when the redirect reported them.
	pub fn granted_scope(&self) -> Option<ScopeSet> {
		self.scope.as_deref().and_then(|raw| ScopeSet::from_str(raw).ok())
	}
}

/// Builds the loopback redirect URI for `port`.
pub fn loopback_redirect_uri(port: u16) -> Result<Url> {
	Url::parse(&format!("http://localhost:{port}{REDIRECT_PATH}"))
		.map_err(|source| ConfigError::InvalidUrl { endpoint: "redirect", source }.into())
}

fn build_authorize_url(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	redirect_uri: &Url,
	scope: &ScopeSet,
	state: &str,
) -> Url {
	let mut url = descriptor.endpoints.authorization.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", redirect_uri.as_str());

	if let Some(prompt) = &descriptor.quirks.approval_prompt {
		pairs.append_pair("approval_prompt", prompt);
	}
	if let Some(scope_value) = scope.delimited() {
		pairs.append_pair("scope", &scope_value);
	}

	pairs.append_pair("state", state);

	drop(pairs);

	url
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
