//! Access-token and grant models produced by token endpoint exchanges.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
};

/// Errors produced by [`AccessTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AccessTokenBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// Short-lived bearer credential authorizing API calls for the current run.
///
/// Never persisted; the backup pipeline drops it once the last page is fetched.
#[derive(Clone)]
pub struct AccessToken {
	/// Bearer secret; callers must avoid logging it.
	pub value: TokenSecret,
	/// Instant after which the provider stops accepting the token.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Returns a builder for assembling a token from an endpoint response.
	pub fn builder() -> AccessTokenBuilder {
		AccessTokenBuilder::default()
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`AccessToken`].
#[derive(Clone, Debug, Default)]
pub struct AccessTokenBuilder {
	value: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl AccessTokenBuilder {
	/// Provides the access token value.
	pub fn value(mut self, token: impl Into<String>) -> Self {
		self.value = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issued-at instant used for relative expiry (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant; takes precedence over [`Self::expires_in`].
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces an [`AccessToken`].
	pub fn build(self) -> Result<AccessToken, AccessTokenBuilderError> {
		let value = self.value.ok_or(AccessTokenBuilderError::MissingAccessToken)?;
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => self.issued_at.unwrap_or_else(OffsetDateTime::now_utc) + delta,
			(None, None) => return Err(AccessTokenBuilderError::MissingExpiry),
		};

		Ok(AccessToken { value, expires_at })
	}
}

/// Everything an authorization-code or refresh exchange hands back.
#[derive(Clone, Debug)]
pub struct TokenGrant {
	/// Access token for immediate API use.
	pub access_token: AccessToken,
	/// Refresh token, when the provider issued or rotated one.
	pub refresh_token: Option<TokenSecret>,
	/// Scopes the provider reported as granted, when it reported any.
	pub scope: Option<ScopeSet>,
	/// Athlete identifier embedded in authorization-code responses.
	pub athlete_id: Option<u64>,
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn builder_prefers_absolute_expiry() {
		let token = AccessToken::builder()
			.value("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::hours(6))
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Access token builder should succeed.");

		assert_eq!(token.expires_at, macros::datetime!(2025-01-01 01:00 UTC));
	}

	#[test]
	fn builder_handles_relative_expiry() {
		let token = AccessToken::builder()
			.value("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Access token builder should support relative expiry.");

		assert_eq!(token.expires_at, macros::datetime!(2025-01-01 00:30 UTC));
	}

	#[test]
	fn builder_rejects_incomplete_tokens() {
		assert_eq!(
			AccessToken::builder().expires_in(Duration::hours(1)).build().unwrap_err(),
			AccessTokenBuilderError::MissingAccessToken
		);
		assert_eq!(
			AccessToken::builder().value("access").build().unwrap_err(),
			AccessTokenBuilderError::MissingExpiry
		);
	}

	#[test]
	fn debug_redacts_value() {
		let token = AccessToken::builder()
			.value("very-secret")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Access token builder should succeed.");

		assert!(!format!("{token:?}").contains("very-secret"));
	}
}
