//! Back up a Strava athlete's activity history to timestamped JSON snapshots.
//!
//! The crate is a linear pipeline: [`credentials`] loads the OAuth client and refresh token,
//! [`flows::TokenExchanger`] trades the refresh token for an access token,
//! [`activities::ActivityFetcher`] pages through the activities endpoint, and
//! [`backup::BackupWriter`] persists the aggregated batch. [`pipeline::BackupJob`] wires the
//! stages together; the `strava-auth` binary drives the one-time authorization flow that mints
//! the refresh token in the first place.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod activities;
pub mod auth;
pub mod backup;
pub mod cli;
pub mod credentials;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod pipeline;
pub mod provider;
#[cfg(any(test, feature = "test"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and fixtures for tests; enabled via `cfg(test)` or the `test`
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::{env, process};
	// self
	use crate::{
		credentials::{CredentialLoader, Credentials},
		http::ReqwestHttpClient,
		provider::ProviderDescriptor,
	};

	/// Client identifier used by test fixtures.
	pub const TEST_CLIENT_ID: &str = "client-backup";
	/// Client secret used by test fixtures.
	pub const TEST_CLIENT_SECRET: &str = "secret-backup";
	/// Refresh token used by test fixtures.
	pub const TEST_REFRESH_TOKEN: &str = "refresh-backup";

	/// Builds a descriptor whose endpoints all live under the provided mock server base URL.
	pub fn mock_descriptor(base_url: &str) -> ProviderDescriptor {
		let base = base_url.trim_end_matches('/');
		let parse = |path: &str| {
			Url::parse(&format!("{base}{path}")).expect("Mock endpoint URL should parse.")
		};

		ProviderDescriptor::builder()
			.authorization_endpoint(parse("/oauth/authorize"))
			.token_endpoint(parse("/oauth/token"))
			.activities_endpoint(parse("/athlete/activities"))
			.build()
			.expect("Mock provider descriptor should build successfully.")
	}

	/// Builds a reqwest transport with the default timeout for tests.
	pub fn test_http_client() -> ReqwestHttpClient {
		ReqwestHttpClient::with_timeout(std::time::Duration::from_secs(5))
			.expect("Failed to build reqwest client for tests.")
	}

	/// Returns fully-populated credentials matching the `TEST_*` constants.
	pub fn test_credentials() -> Credentials {
		Credentials::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET, TEST_REFRESH_TOKEN)
	}

	/// Builds a loader that reads credentials from a fixed map instead of the process environment.
	pub fn loader_with_env<I>(config_path: impl Into<PathBuf>, vars: I) -> CredentialLoader
	where
		I: IntoIterator<Item = (&'static str, &'static str)>,
	{
		let vars: HashMap<&'static str, &'static str> = vars.into_iter().collect();

		CredentialLoader::with_env(config_path, move |key| vars.get(key).map(|v| v.to_string()))
	}

	/// Returns the environment entries for the `TEST_*` fixtures.
	pub fn test_env() -> [(&'static str, &'static str); 3] {
		[
			(crate::credentials::ENV_CLIENT_ID, TEST_CLIENT_ID),
			(crate::credentials::ENV_CLIENT_SECRET, TEST_CLIENT_SECRET),
			(crate::credentials::ENV_REFRESH_TOKEN, TEST_REFRESH_TOKEN),
		]
	}

	/// Returns a unique, not-yet-created path under the system temp directory.
	pub fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"strava_backup_{label}_{}_{}",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	/// Produces `count` opaque activity objects numbered from `start`.
	pub fn activity_page(start: usize, count: usize) -> Vec<serde_json::Value> {
		(start..start + count)
			.map(|id| serde_json::json!({ "id": id, "name": format!("Ride {id}"), "distance": 1000.5 }))
			.collect()
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, StatusCode};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{ConfigError, Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
#[cfg(test)] use strava_backup as _;
