//! Paginated listing of the authenticated athlete's activities.
//!
//! Pages are requested in order starting at 1. A page holding at least `per_page` items means
//! more data likely follows, so an exactly-full final page costs one extra (empty) request.
//! The first short page ends pagination. Activities are opaque JSON objects and pass through
//! untouched.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::body_preview,
	http::ReqwestHttpClient,
	obs::{self, Stage, StageOutcome, StageSpan},
	provider::ProviderDescriptor,
};

/// Page size requested when the caller does not override it.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// One activity exactly as the provider returned it.
pub type Activity = Value;

/// Filters applied to the activities listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivityQuery {
	/// Items requested per page.
	pub per_page: u32,
	/// Only activities that started before this instant.
	pub before: Option<OffsetDateTime>,
	/// Only activities that started after this instant.
	pub after: Option<OffsetDateTime>,
}
impl ActivityQuery {
	/// Sets the page size.
	pub fn per_page(mut self, per_page: u32) -> Self {
		self.per_page = per_page;

		self
	}

	/// Restricts the listing to activities before `instant`.
	pub fn before(mut self, instant: OffsetDateTime) -> Self {
		self.before = Some(instant);

		self
	}

	/// Restricts the listing to activities after `instant`.
	pub fn after(mut self, instant: OffsetDateTime) -> Self {
		self.after = Some(instant);

		self
	}
}
impl Default for ActivityQuery {
	fn default() -> Self {
		Self { per_page: DEFAULT_PAGE_SIZE, before: None, after: None }
	}
}

/// Activities accumulated across pages, in request order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivityBatch {
	activities: Vec<Activity>,
	pages: u32,
}
impl ActivityBatch {
	/// Appends one fetched page; empty pages only bump the page counter.
	pub fn push_page(&mut self, page: Vec<Activity>) {
		self.pages += 1;

		if !page.is_empty() {
			self.activities.extend(page);
		}
	}

	/// Number of activities collected.
	pub fn len(&self) -> usize {
		self.activities.len()
	}

	/// Returns true when no activities were collected.
	pub fn is_empty(&self) -> bool {
		self.activities.is_empty()
	}

	/// Number of pages requested successfully.
	pub fn pages(&self) -> u32 {
		self.pages
	}

	/// Borrowed view of the activities.
	pub fn activities(&self) -> &[Activity] {
		&self.activities
	}
}

/// Fetches every page of the activities endpoint with a bearer token.
#[derive(Clone, Debug)]
pub struct ActivityFetcher {
	endpoint: Url,
	http_client: ReqwestHttpClient,
	query: ActivityQuery,
	max_page_size: u32,
}
impl ActivityFetcher {
	/// Creates a fetcher for the descriptor's activities endpoint with the default query.
	pub fn new(descriptor: &ProviderDescriptor, http_client: ReqwestHttpClient) -> Self {
		Self {
			endpoint: descriptor.endpoints.activities.clone(),
			http_client,
			query: ActivityQuery::default(),
			max_page_size: descriptor.quirks.max_page_size,
		}
	}

	/// Replaces the query; the page size is clamped to what the provider honors.
	pub fn with_query(mut self, query: ActivityQuery) -> Self {
		let per_page = query.per_page.clamp(1, self.max_page_size);

		if per_page != query.per_page {
			tracing::warn!(requested = query.per_page, per_page, "Page size clamped.");
		}

		self.query = ActivityQuery { per_page, ..query };

		self
	}

	/// Query in effect.
	pub fn query(&self) -> &ActivityQuery {
		&self.query
	}

	/// Fetches all pages and concatenates them.
	///
	/// A failure on any page discards the pages fetched before it.
	pub async fn fetch_all(&self, token: &AccessToken) -> Result<ActivityBatch> {
		const STAGE: Stage = Stage::Fetch;

		let span = StageSpan::new(STAGE, "fetch_all");

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		span.instrument(async move {
			let per_page = usize::try_from(self.query.per_page).unwrap_or(usize::MAX);
			let mut batch = ActivityBatch::default();
			let mut page = 1_u32;
			let result = loop {
				match self.fetch_page(token, page).await {
					Ok(items) => {
						let count = items.len();

						tracing::info!(page, count, "Fetched activities page.");
						obs::record_page_fetched(count);

						batch.push_page(items);

						if count < per_page {
							break Ok(batch);
						}

						page = page.saturating_add(1);
					},
					Err(err) => {
						tracing::error!(kind = %err.kind(), page, "{err}");

						break Err(err);
					},
				}
			};

			match &result {
				Ok(batch) => {
					tracing::info!(total = batch.len(), pages = batch.pages(), "Fetch complete.");
					obs::record_stage_outcome(STAGE, StageOutcome::Success);
				},
				Err(_) => obs::record_stage_outcome(STAGE, StageOutcome::Failure),
			}

			result
		})
		.await
	}

	/// Fetches a single one-based page.
	pub async fn fetch_page(&self, token: &AccessToken, page: u32) -> Result<Vec<Activity>> {
		let failed =
			|status: Option<u16>, reason: String| Error::FetchFailed { page, status, reason };
		let mut params =
			vec![("page", page.to_string()), ("per_page", self.query.per_page.to_string())];

		if let Some(before) = self.query.before {
			params.push(("before", before.unix_timestamp().to_string()));
		}
		if let Some(after) = self.query.after {
			params.push(("after", after.unix_timestamp().to_string()));
		}

		let response = self
			.http_client
			.get(self.endpoint.clone())
			.bearer_auth(token.value.expose())
			.query(&params)
			.send()
			.await
			.map_err(|err| {
				failed(err.status().map(|s| s.as_u16()), format!("request failed: {err}"))
			})?;
		let status = response.status();
		let code = Some(status.as_u16());
		let body = response
			.text()
			.await
			.map_err(|err| failed(code, format!("response body unreadable: {err}")))?;

		if status != StatusCode::OK {
			return Err(failed(code, format!("unexpected response: {}", body_preview(&body))));
		}

		let mut de = serde_json::Deserializer::from_str(&body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|err| failed(code, format!("response is not an activity array: {err}")))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[test]
	fn empty_pages_count_but_add_nothing() {
		let mut batch = ActivityBatch::default();

		batch.push_page(activity_page(0, 3));
		batch.push_page(Vec::new());

		assert_eq!(batch.len(), 3);
		assert_eq!(batch.pages(), 2);
		assert_eq!(batch.activities()[2]["id"], 2);
	}

	#[test]
	fn page_size_is_clamped_to_provider_limit() {
		let descriptor = mock_descriptor("http://127.0.0.1:9");
		let fetcher = ActivityFetcher::new(&descriptor, test_http_client());
		let oversized = fetcher.clone().with_query(ActivityQuery::default().per_page(500));
		let zero = fetcher.with_query(ActivityQuery::default().per_page(0));

		assert_eq!(oversized.query().per_page, 200);
		assert_eq!(zero.query().per_page, 1);
	}
}
