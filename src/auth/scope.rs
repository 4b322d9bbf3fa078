//! Scope modeling for Strava's comma-delimited scope strings.

// std
use std::collections::BTreeSet;
// self
use crate::_prelude::*;

/// Scope that grants read access to every activity, including private ones.
pub const ACTIVITY_READ_ALL: &str = "activity:read_all";
/// Scope that grants read access to activities visible to everyone or followers.
pub const ACTIVITY_READ: &str = "activity:read";

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain whitespace or the delimiter.
	#[error("Scope contains a forbidden character: {scope}.")]
	ForbiddenCharacter {
		/// The offending scope string.
		scope: String,
	},
}

/// Normalized set of OAuth scopes.
///
/// Scopes are deduplicated and sorted so equality stays independent of the order the
/// provider echoes them back in.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopeSet(Arc<[String]>);
impl ScopeSet {
	/// Delimiter Strava uses between scopes in `scope` parameters.
	pub const DELIMITER: char = ',';

	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut set = BTreeSet::new();

		for scope in scopes {
			let owned: String = scope.into();

			if owned.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if owned.chars().any(|c| c.is_whitespace() || c == Self::DELIMITER) {
				return Err(ScopeValidationError::ForbiddenCharacter { scope: owned });
			}

			set.insert(owned);
		}

		Ok(Self(Arc::from(set.into_iter().collect::<Vec<_>>())))
	}

	/// The single scope the backup pipeline requests on refresh.
	pub fn activity_read_all() -> Self {
		Self(Arc::from(vec![ACTIVITY_READ_ALL.to_owned()]))
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the normalized set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Returns true if the set allows listing activities.
	pub fn can_read_activities(&self) -> bool {
		self.contains(ACTIVITY_READ_ALL) || self.contains(ACTIVITY_READ)
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(|s| s.as_str())
	}

	/// Joins the scopes with [`Self::DELIMITER`], or returns `None` for an empty set.
	pub fn delimited(&self) -> Option<String> {
		if self.is_empty() {
			return None;
		}

		Some(self.0.join(&Self::DELIMITER.to_string()))
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.0).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.delimited().unwrap_or_default())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	/// Parses a comma- or whitespace-delimited scope string.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}

		let parts: Vec<&str> = s
			.split(|c: char| c == Self::DELIMITER || c.is_whitespace())
			.filter(|part| !part.is_empty())
			.collect();

		if parts.is_empty() {
			return Err(ScopeValidationError::Empty);
		}

		Self::new(parts)
	}
}
