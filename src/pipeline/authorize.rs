//! The one-time `strava-auth` consent flow that mints a refresh token.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::io::{AsyncBufReadExt, BufReader};
// self
use crate::{
	_prelude::*,
	auth::{ACTIVITY_READ, ACTIVITY_READ_ALL, ScopeSet, TokenSecret},
	credentials::{CredentialLoader, DEFAULT_CONFIG_FILE, conf_file},
	flows::{
		AuthorizationCallback, AuthorizationSession, RedirectListener, TokenExchanger,
		loopback_redirect_uri,
	},
	http::{DEFAULT_TIMEOUT, ReqwestHttpClient},
	provider::ProviderDescriptor,
};

/// Port the loopback redirect listener binds by default.
pub const DEFAULT_REDIRECT_PORT: u16 = 8000;
/// Scopes requested by default.
pub const DEFAULT_AUTH_SCOPE: &str = "read,activity:read_all";

/// Read-only configuration for one `strava-auth` run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizeSettings {
	/// Credentials file holding the client pair; also the `--write-config` target.
	pub config_path: PathBuf,
	/// Loopback port; `0` picks an ephemeral one.
	pub port: u16,
	/// Scopes to request.
	pub scope: ScopeSet,
	/// Read the redirect URL from stdin instead of listening for it.
	pub manual: bool,
	/// Persist the new refresh token into `config_path`.
	pub write_config: bool,
	/// Per-request HTTP timeout.
	pub timeout: StdDuration,
}
impl Default for AuthorizeSettings {
	fn default() -> Self {
		Self {
			config_path: DEFAULT_CONFIG_FILE.into(),
			port: DEFAULT_REDIRECT_PORT,
			scope: ScopeSet::from_str(DEFAULT_AUTH_SCOPE).unwrap_or_default(),
			manual: false,
			write_config: false,
			timeout: DEFAULT_TIMEOUT,
		}
	}
}

/// Result of a completed consent round-trip.
#[derive(Clone, Debug)]
pub struct AuthorizationOutcome {
	/// Newly minted long-lived refresh token.
	pub refresh_token: TokenSecret,
	/// Scopes the user granted, when known.
	pub scope: Option<ScopeSet>,
	/// Athlete that authorized the client, when reported.
	pub athlete_id: Option<u64>,
	/// Config file the token was written to, when requested.
	pub config_written: Option<PathBuf>,
}
impl AuthorizationOutcome {
	/// Returns true when the granted scopes allow listing activities.
	pub fn can_read_activities(&self) -> bool {
		self.scope.as_ref().is_some_and(ScopeSet::can_read_activities)
	}
}

/// The one-time authorization-code flow that mints a refresh token.
#[derive(Debug)]
pub struct AuthorizeJob {
	settings: AuthorizeSettings,
	loader: CredentialLoader,
	descriptor: ProviderDescriptor,
	http_client: ReqwestHttpClient,
}
impl AuthorizeJob {
	/// Builds a job against the production API reading the process environment.
	pub fn new(settings: AuthorizeSettings) -> Result<Self> {
		let loader = CredentialLoader::new(&settings.config_path);
		let descriptor = ProviderDescriptor::strava()?;
		let http_client = ReqwestHttpClient::with_timeout(settings.timeout)?;

		Ok(Self { settings, loader, descriptor, http_client })
	}

	/// Replaces the credential loader.
	pub fn with_loader(mut self, loader: CredentialLoader) -> Self {
		self.loader = loader;

		self
	}

	/// Replaces the provider descriptor.
	pub fn with_descriptor(mut self, descriptor: ProviderDescriptor) -> Self {
		self.descriptor = descriptor;

		self
	}

	/// Runs the flow; `present` receives the authorize URL the user must open.
	pub async fn run<F>(&self, present: F) -> Result<AuthorizationOutcome>
	where
		F: FnOnce(&Url),
	{
		let client = self.loader.load_client()?;
		let (session, callback) = if self.settings.manual {
			let redirect_uri = loopback_redirect_uri(self.settings.port)?;
			let session = self.session(&client.client_id, redirect_uri);

			present(&session.authorize_url);

			(session, AuthorizationCallback::parse_pasted(&read_pasted_line().await?)?)
		} else {
			let listener = RedirectListener::bind(self.settings.port).await?;
			let session = self.session(&client.client_id, listener.redirect_uri().clone());

			present(&session.authorize_url);

			(session, listener.accept_callback().await?)
		};
		let code = session.authorization_code(&callback)?;
		let grant = TokenExchanger::<ReqwestHttpClient>::new(
			self.descriptor.clone(),
			self.http_client.clone(),
		)
		.exchange_code(&client, &code)
		.await?;
		let refresh_token = grant.refresh_token.ok_or_else(|| {
			Error::authentication("token endpoint issued no refresh token", None, None)
		})?;
		let scope = grant.scope.or_else(|| callback.granted_scope());

		if !scope.as_ref().is_some_and(ScopeSet::can_read_activities) {
			tracing::warn!(
				"Granted scopes lack {ACTIVITY_READ_ALL} and {ACTIVITY_READ}; backups will fail."
			);
		}

		let config_written = if self.settings.write_config {
			let credentials = client.with_refresh_token(refresh_token.clone());

			conf_file::write(&self.settings.config_path, &credentials)?;

			Some(self.settings.config_path.clone())
		} else {
			None
		};

		Ok(AuthorizationOutcome {
			refresh_token,
			scope,
			athlete_id: grant.athlete_id,
			config_written,
		})
	}

	fn session(&self, client_id: &str, redirect_uri: Url) -> AuthorizationSession {
		AuthorizationSession::start(
			&self.descriptor,
			client_id,
			self.settings.scope.clone(),
			redirect_uri,
		)
	}
}

async fn read_pasted_line() -> Result<String> {
	let mut line = String::new();

	BufReader::new(tokio::io::stdin())
		.read_line(&mut line)
		.await
		.map_err(ConfigError::Prompt)?;

	Ok(line)
}
