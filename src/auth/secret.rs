//! Access token material handed to the policy engine.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const FINGERPRINT_BYTES: usize = 6;

/// Access token issued by the identity provider.
///
/// Formatting never reveals the token. Logs refer to a token through its
/// [`fingerprint`](Self::fingerprint). The type is deliberately not serializable.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps token material returned by the provider.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Borrows the token material. Do not log the result.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Unwraps the token for the policy engine.
	pub fn into_inner(self) -> String {
		self.0
	}

	/// True when the provider returned nothing usable.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}

	/// Short, non-reversible tag that correlates log lines about the same token.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.0.as_bytes());

		URL_SAFE_NO_PAD.encode(&digest[..FINGERPRINT_BYTES])
	}
}
impl From<String> for AccessToken {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "AccessToken(<{} bytes>)", self.0.len())
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
