//! Reader and writer for the label-per-line `strava.conf` format.
//!
//! ```text
//! Client ID
//! 12345
//! Client Secret
//! abcdef
//! Refresh Token
//! 0123456789
//! ```
//!
//! Labels match case-insensitively and may carry a trailing colon. A label's value is the next
//! non-blank line that is not itself a label. Lines starting with `#` and unrecognized lines
//! are ignored.

// std
use std::{
	fs::{self, File},
	io::Write,
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	credentials::{Credentials, PartialCredentials},
};

/// Field labels recognized in the config file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfLabel {
	/// `Client ID`.
	ClientId,
	/// `Client Secret`.
	ClientSecret,
	/// `Refresh Token`.
	RefreshToken,
}
impl ConfLabel {
	/// Labels in the order they are rendered.
	pub const ALL: [ConfLabel; 3] =
		[ConfLabel::ClientId, ConfLabel::ClientSecret, ConfLabel::RefreshToken];

	/// Canonical label text written to the file.
	pub const fn as_str(self) -> &'static str {
		match self {
			ConfLabel::ClientId => "Client ID",
			ConfLabel::ClientSecret => "Client Secret",
			ConfLabel::RefreshToken => "Refresh Token",
		}
	}

	/// Matches a trimmed line against the known labels.
	pub fn parse(line: &str) -> Option<Self> {
		let candidate = line.trim().trim_end_matches(':').trim_end();

		Self::ALL.into_iter().find(|label| label.as_str().eq_ignore_ascii_case(candidate))
	}
}
impl Display for ConfLabel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Extracts whatever credential fields the file contents provide.
///
/// A later value for the same label replaces an earlier one.
pub fn parse(contents: &str) -> PartialCredentials {
	let mut parsed = PartialCredentials::default();
	let mut pending = None;

	for line in contents.lines().map(str::trim) {
		if line.is_empty() || line.starts_with('#') {
			continue;
		}
		if let Some(label) = ConfLabel::parse(line) {
			pending = Some(label);

			continue;
		}

		match pending.take() {
			Some(ConfLabel::ClientId) => parsed.client_id = Some(line.to_owned()),
			Some(ConfLabel::ClientSecret) => parsed.client_secret = Some(TokenSecret::new(line)),
			Some(ConfLabel::RefreshToken) => parsed.refresh_token = Some(TokenSecret::new(line)),
			None => tracing::trace!("Ignoring unrecognized config line."),
		}
	}

	parsed
}

/// Renders credentials in the format [`parse`] reads back.
pub fn render(credentials: &Credentials) -> String {
	let values = [
		credentials.client_id.as_str(),
		credentials.client_secret.expose(),
		credentials.refresh_token.expose(),
	];

	ConfLabel::ALL
		.into_iter()
		.zip(values)
		.map(|(label, value)| format!("{label}\n{value}\n"))
		.collect()
}

/// Atomically replaces the config file at `path` with the rendered credentials.
pub fn write(path: &Path, credentials: &Credentials) -> Result<(), ConfigError> {
	let to_config_error = |source| ConfigError::ConfigFile { path: path.to_path_buf(), source };

	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(to_config_error)?;
	}

	let mut tmp_path = path.to_path_buf();

	tmp_path.set_extension("conf.tmp");

	{
		let mut file = File::create(&tmp_path).map_err(to_config_error)?;

		file.write_all(render(credentials).as_bytes()).map_err(to_config_error)?;
		file.sync_all().map_err(to_config_error)?;
	}

	fs::rename(&tmp_path, path).map_err(|source| {
		let _ = fs::remove_file(&tmp_path);

		to_config_error(source)
	})?;

	tracing::info!(path = %path.display(), "Config file updated.");

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[test]
	fn parses_label_value_pairs() {
		let parsed = parse("Client ID\n1376\n\nClient Secret\n  s3cr3t  \nRefresh Token\nabc\n");

		assert_eq!(parsed.client_id.as_deref(), Some("1376"));
		assert_eq!(parsed.client_secret.as_ref().map(TokenSecret::expose), Some("s3cr3t"));
		assert_eq!(parsed.refresh_token.as_ref().map(TokenSecret::expose), Some("abc"));
	}

	#[test]
	fn labels_are_case_insensitive_and_comments_are_skipped() {
		let parsed = parse("# backup credentials\nclient id:\n# inline\n1376\nsomething else\n");

		assert_eq!(parsed.client_id.as_deref(), Some("1376"));
		assert!(parsed.client_secret.is_none());
	}

	#[test]
	fn label_followed_by_label_has_no_value() {
		let parsed = parse("Client ID\nClient Secret\nsecret\nRefresh Token\n");

		assert_eq!(parsed.missing(), vec!["client_id", "refresh_token"]);
		assert_eq!(parsed.client_secret.as_ref().map(TokenSecret::expose), Some("secret"));
	}

	#[test]
	fn write_then_parse_restores_credentials() {
		let path = temp_path("conf_file").join("strava.conf");

		write(&path, &test_credentials()).expect("Config file should be written.");

		let contents = fs::read_to_string(&path).expect("Config file should be readable.");

		assert!(contents.starts_with("Client ID\nclient-backup\n"));
		assert_eq!(
			parse(&contents).into_credentials().expect("Rendered file should be complete."),
			test_credentials()
		);

		if let Some(parent) = path.parent() {
			let _ = fs::remove_dir_all(parent);
		}
	}
}
