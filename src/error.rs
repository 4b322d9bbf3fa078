//! Error types shared by every pipeline stage and the authorization helper.

// std
use std::io;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Number of characters retained when an HTTP response body is attached to an error.
pub const BODY_PREVIEW_LIMIT: usize = 256;

/// Canonical error exposed by public APIs.
///
/// The first four variants are the run-failure categories of a backup; all of them are
/// terminal for the run. [`Error::Config`] covers local setup problems that happen before a
/// stage gets to do any work.
#[derive(Debug, ThisError)]
pub enum Error {
	/// One or more credential fields are absent from both the environment and the config file.
	#[error("Missing credentials: {}.", missing.join(", "))]
	MissingCredentials {
		/// Field names that could not be resolved.
		missing: Vec<&'static str>,
	},
	/// The token endpoint rejected the exchange or returned a malformed body.
	#[error("Authentication failed{}: {reason}.", status_suffix(*status))]
	AuthenticationFailed {
		/// Human-readable reason string.
		reason: String,
		/// HTTP status code, when a response was received.
		status: Option<u16>,
		/// Preview of the response body, when one was received.
		body: Option<String>,
	},
	/// An activities page could not be fetched or decoded.
	#[error("Failed to fetch activities page {page}{}: {reason}.", status_suffix(*status))]
	FetchFailed {
		/// One-based page index that failed.
		page: u32,
		/// HTTP status code, when a response was received.
		status: Option<u16>,
		/// Human-readable reason string.
		reason: String,
	},
	/// The backup file could not be written.
	#[error("Failed to write backup {}.", path.display())]
	WriteFailed {
		/// Target file path.
		path: PathBuf,
		/// Underlying filesystem failure.
		#[source]
		source: io::Error,
	},
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Returns the failure category for logging and exit-code mapping.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::MissingCredentials { .. } => ErrorKind::MissingCredentials,
			Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
			Self::FetchFailed { .. } => ErrorKind::FetchFailed,
			Self::WriteFailed { .. } => ErrorKind::WriteFailed,
			Self::Config(_) => ErrorKind::Config,
		}
	}

	/// Process exit code for this failure.
	pub fn exit_code(&self) -> u8 {
		self.kind().exit_code()
	}

	pub(crate) fn authentication(
		reason: impl Into<String>,
		status: Option<u16>,
		body: Option<String>,
	) -> Self {
		Self::AuthenticationFailed { reason: reason.into(), status, body }
	}
}

/// Failure categories surfaced by [`Error::kind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// See [`Error::MissingCredentials`].
	MissingCredentials,
	/// See [`Error::AuthenticationFailed`].
	AuthenticationFailed,
	/// See [`Error::FetchFailed`].
	FetchFailed,
	/// See [`Error::WriteFailed`].
	WriteFailed,
	/// See [`Error::Config`].
	Config,
}
impl ErrorKind {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::MissingCredentials => "missing_credentials",
			ErrorKind::AuthenticationFailed => "authentication_failed",
			ErrorKind::FetchFailed => "fetch_failed",
			ErrorKind::WriteFailed => "write_failed",
			ErrorKind::Config => "config",
		}
	}

	/// Returns the process exit code associated with the category.
	pub const fn exit_code(self) -> u8 {
		match self {
			ErrorKind::Config => 1,
			ErrorKind::MissingCredentials => 2,
			ErrorKind::AuthenticationFailed => 3,
			ErrorKind::FetchFailed => 4,
			ErrorKind::WriteFailed => 5,
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and environment failures raised before or between stages.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// An endpoint or redirect URL cannot be parsed.
	#[error("The {endpoint} URL is invalid.")]
	InvalidUrl {
		/// Which URL failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Provider(#[from] crate::provider::ProviderDescriptorError),
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// The credentials config file exists but cannot be read or written.
	#[error("Config file {} is not accessible.", path.display())]
	ConfigFile {
		/// Config file path.
		path: PathBuf,
		/// Underlying filesystem failure.
		#[source]
		source: io::Error,
	},
	/// The log file cannot be opened or the subscriber cannot be installed.
	#[error("Logging could not be initialized: {message}.")]
	Logging {
		/// Failure description.
		message: String,
	},
	/// The loopback redirect listener failed.
	#[error("Redirect listener failed.")]
	RedirectListener(#[source] io::Error),
	/// The pasted redirect URL could not be read from stdin.
	#[error("Failed to read the redirect URL from stdin.")]
	Prompt(#[source] io::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Truncates a response body to [`BODY_PREVIEW_LIMIT`] characters.
pub fn body_preview(body: &str) -> String {
	if body.chars().count() <= BODY_PREVIEW_LIMIT {
		return body.to_owned();
	}

	let mut buf: String = body.chars().take(BODY_PREVIEW_LIMIT).collect();

	buf.push('…');

	buf
}

fn status_suffix(status: Option<u16>) -> String {
	status.map(|code| format!(" (HTTP {code})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn exit_codes_are_distinct_and_non_zero() {
		let kinds = [
			ErrorKind::Config,
			ErrorKind::MissingCredentials,
			ErrorKind::AuthenticationFailed,
			ErrorKind::FetchFailed,
			ErrorKind::WriteFailed,
		];
		let mut codes: Vec<u8> = kinds.iter().map(|kind| kind.exit_code()).collect();

		assert!(codes.iter().all(|code| *code != 0));

		codes.sort_unstable();
		codes.dedup();

		assert_eq!(codes.len(), kinds.len());
	}

	#[test]
	fn display_includes_status_and_page() {
		let err = Error::FetchFailed { page: 2, status: Some(500), reason: "server error".into() };

		assert_eq!(err.to_string(), "Failed to fetch activities page 2 (HTTP 500): server error.");

		let err = Error::MissingCredentials { missing: vec!["client_id", "refresh_token"] };

		assert_eq!(err.to_string(), "Missing credentials: client_id, refresh_token.");
		assert_eq!(err.kind().as_str(), "missing_credentials");
	}

	#[test]
	fn body_preview_truncates_long_bodies() {
		let long = "x".repeat(BODY_PREVIEW_LIMIT + 10);
		let preview = body_preview(&long);

		assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
		assert_eq!(body_preview("short"), "short");
	}
}
