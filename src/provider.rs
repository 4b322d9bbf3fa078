//! Provider descriptor: the endpoints and quirks of the Strava API.
//!
//! [`ProviderDescriptor::strava`] returns the production endpoints. Tests and alternative
//! deployments assemble their own through [`ProviderDescriptor::builder`], which enforces
//! HTTPS for every endpoint except loopback hosts.

pub mod builder;

pub use builder::*;

// self
use crate::_prelude::*;

const STRAVA_AUTHORIZATION_ENDPOINT: &str = "https://www.strava.com/oauth/authorize";
const STRAVA_TOKEN_ENDPOINT: &str = "https://www.strava.com/api/v3/oauth/token";
const STRAVA_ACTIVITIES_ENDPOINT: &str = "https://www.strava.com/api/v3/athlete/activities";

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint used by the one-time consent flow.
	pub authorization: Url,
	/// Token endpoint used for code exchanges and refreshes.
	pub token: Url,
	/// Paginated activities listing for the authenticated athlete.
	pub activities: Url,
}

/// Provider-specific behavior toggles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderQuirks {
	/// Value sent as `approval_prompt` on the authorize URL (`force` or `auto`).
	pub approval_prompt: Option<String>,
	/// Largest `per_page` value the activities endpoint honors.
	pub max_page_size: u32,
}
impl Default for ProviderQuirks {
	fn default() -> Self {
		Self { approval_prompt: Some("force".into()), max_page_size: 200 }
	}
}

/// Immutable provider descriptor consumed by flows and the fetcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a new builder with default quirks and no endpoints.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::default()
	}

	/// Descriptor for the production Strava API.
	pub fn strava() -> Result<Self> {
		let parse = |endpoint: &'static str, raw: &str| {
			Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { endpoint, source })
		};

		Ok(Self::builder()
			.authorization_endpoint(parse("authorization", STRAVA_AUTHORIZATION_ENDPOINT)?)
			.token_endpoint(parse("token", STRAVA_TOKEN_ENDPOINT)?)
			.activities_endpoint(parse("activities", STRAVA_ACTIVITIES_ENDPOINT)?)
			.build()
			.map_err(ConfigError::from)?)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn strava_descriptor_uses_production_endpoints() {
		let descriptor = ProviderDescriptor::strava().expect("Strava descriptor should build.");

		assert_eq!(descriptor.endpoints.token.as_str(), STRAVA_TOKEN_ENDPOINT);
		assert_eq!(descriptor.endpoints.activities.as_str(), STRAVA_ACTIVITIES_ENDPOINT);
		assert_eq!(descriptor.endpoints.authorization.as_str(), STRAVA_AUTHORIZATION_ENDPOINT);
		assert_eq!(descriptor.quirks.max_page_size, 200);
	}
}
