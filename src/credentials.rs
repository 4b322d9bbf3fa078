//! Credential loading from the environment with a `strava.conf` fallback.
//!
//! Environment variables always win; the config file only fills gaps. The loader fails fast
//! with [`Error::MissingCredentials`] naming every field neither source could provide, before
//! any network call is made.

pub mod conf_file;

// std
use std::{env, fs, io};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Environment variable holding the OAuth client identifier.
pub const ENV_CLIENT_ID: &str = "STRAVA_CLIENT_ID";
/// Environment variable holding the OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "STRAVA_CLIENT_SECRET";
/// Environment variable holding the long-lived refresh token.
pub const ENV_REFRESH_TOKEN: &str = "STRAVA_REFRESH_TOKEN";
/// Config file consulted when the environment is incomplete.
pub const DEFAULT_CONFIG_FILE: &str = "strava.conf";

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Fully-resolved credentials for the refresh-token exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Long-lived refresh token.
	pub refresh_token: TokenSecret,
}
impl Credentials {
	/// Builds credentials from raw values.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		refresh_token: impl Into<String>,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			refresh_token: TokenSecret::new(refresh_token),
		}
	}

	/// Drops the refresh token, keeping the client pair.
	pub fn client(&self) -> ClientCredentials {
		ClientCredentials {
			client_id: self.client_id.clone(),
			client_secret: self.client_secret.clone(),
		}
	}
}

/// OAuth client pair used by the authorization helper, which has no refresh token yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCredentials {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
}
impl ClientCredentials {
	/// Combines the client pair with a freshly minted refresh token.
	pub fn with_refresh_token(self, refresh_token: TokenSecret) -> Credentials {
		Credentials { client_id: self.client_id, client_secret: self.client_secret, refresh_token }
	}
}

/// Credential fields gathered from one or more sources; any of them may still be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartialCredentials {
	/// OAuth client identifier.
	pub client_id: Option<String>,
	/// OAuth client secret.
	pub client_secret: Option<TokenSecret>,
	/// Long-lived refresh token.
	pub refresh_token: Option<TokenSecret>,
}
impl PartialCredentials {
	/// Returns true when all three fields are present.
	pub fn is_complete(&self) -> bool {
		self.missing().is_empty()
	}

	/// Field names that are still absent, in declaration order.
	pub fn missing(&self) -> Vec<&'static str> {
		let mut missing = Vec::new();

		if self.client_id.is_none() {
			missing.push("client_id");
		}
		if self.client_secret.is_none() {
			missing.push("client_secret");
		}
		if self.refresh_token.is_none() {
			missing.push("refresh_token");
		}

		missing
	}

	/// Fills absent fields from `fallback`, leaving present ones untouched.
	pub fn fill_gaps(&mut self, fallback: PartialCredentials) {
		if self.client_id.is_none() {
			self.client_id = fallback.client_id;
		}
		if self.client_secret.is_none() {
			self.client_secret = fallback.client_secret;
		}
		if self.refresh_token.is_none() {
			self.refresh_token = fallback.refresh_token;
		}
	}

	/// Converts into [`Credentials`], failing with every missing field name.
	pub fn into_credentials(self) -> Result<Credentials> {
		match self {
			Self {
				client_id: Some(client_id),
				client_secret: Some(client_secret),
				refresh_token: Some(refresh_token),
			} => Ok(Credentials { client_id, client_secret, refresh_token }),
			partial => Err(Error::MissingCredentials { missing: partial.missing() }),
		}
	}

	/// Converts into [`ClientCredentials`], ignoring the refresh token.
	pub fn into_client(self) -> Result<ClientCredentials> {
		match self {
			Self { client_id: Some(client_id), client_secret: Some(client_secret), .. } =>
				Ok(ClientCredentials { client_id, client_secret }),
			partial => {
				let missing =
					partial.missing().into_iter().filter(|field| *field != "refresh_token").collect();

				Err(Error::MissingCredentials { missing })
			},
		}
	}
}

/// Resolves credentials from the process environment and the config file.
#[derive(Clone)]
pub struct CredentialLoader {
	config_path: PathBuf,
	env: EnvLookup,
}
impl CredentialLoader {
	/// Creates a loader that reads the real process environment.
	pub fn new(config_path: impl Into<PathBuf>) -> Self {
		Self::with_env(config_path, |key| env::var(key).ok())
	}

	/// Creates a loader with a custom environment lookup so tests never mutate global state.
	pub fn with_env<F>(config_path: impl Into<PathBuf>, lookup: F) -> Self
	where
		F: 'static + Fn(&str) -> Option<String> + Send + Sync,
	{
		Self { config_path: config_path.into(), env: Arc::new(lookup) }
	}

	/// Path of the fallback config file.
	pub fn config_path(&self) -> &Path {
		&self.config_path
	}

	/// Loads the three fields required by the backup pipeline.
	pub fn load(&self) -> Result<Credentials> {
		self.resolve()?.into_credentials().inspect_err(|err| {
			tracing::error!(kind = %err.kind(), "{err}");
		})
	}

	/// Loads only the client pair, as needed before a refresh token exists.
	pub fn load_client(&self) -> Result<ClientCredentials> {
		self.resolve()?.into_client().inspect_err(|err| {
			tracing::error!(kind = %err.kind(), "{err}");
		})
	}

	/// Gathers whatever both sources provide without validating completeness.
	pub fn resolve(&self) -> Result<PartialCredentials> {
		let mut resolved = self.from_env();

		if resolved.is_complete() {
			tracing::debug!("Credentials resolved from the environment.");

			return Ok(resolved);
		}

		match fs::read_to_string(&self.config_path) {
			Ok(contents) => {
				tracing::debug!(
					path = %self.config_path.display(),
					"Filling credential gaps from config file."
				);

				resolved.fill_gaps(conf_file::parse(&contents));
			},
			Err(err) if err.kind() == io::ErrorKind::NotFound => {
				tracing::debug!(path = %self.config_path.display(), "Config file not found.");
			},
			Err(source) => {
				let path = self.config_path.clone();

				return Err(ConfigError::ConfigFile { path, source }.into());
			},
		}

		Ok(resolved)
	}

	fn from_env(&self) -> PartialCredentials {
		let get = |key: &str| {
			(self.env)(key).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
		};

		PartialCredentials {
			client_id: get(ENV_CLIENT_ID),
			client_secret: get(ENV_CLIENT_SECRET).map(TokenSecret::new),
			refresh_token: get(ENV_REFRESH_TOKEN).map(TokenSecret::new),
		}
	}
}
impl Debug for CredentialLoader {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialLoader").field("config_path", &self.config_path).finish()
	}
}
