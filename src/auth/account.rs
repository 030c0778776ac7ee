//! Signed-in account snapshots and the account-matching rule guarding token release.

// self
use crate::{_prelude::*, auth::AccountId};

/// Snapshot of the account currently signed in to the identity client.
///
/// Records are fetched fresh for every operation; the signed-in account can change
/// underneath the bridge at any time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
	/// User principal name.
	pub username: String,
	/// Directory object identifier.
	pub account_id: AccountId,
	/// Authority the account actually authenticated against, when known.
	pub authority_url: Option<String>,
}
impl AccountRecord {
	/// Creates a record without authority information.
	pub fn new(username: impl Into<String>, account_id: AccountId) -> Self {
		Self { username: username.into(), account_id, authority_url: None }
	}

	/// Attaches the authority the account authenticated against.
	pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
		self.authority_url = Some(authority.into());

		self
	}

	/// Returns true when this account is the identity a caller asked for.
	///
	/// A non-blank `account_id` is authoritative and must match exactly. Only when it is
	/// absent is `username` compared, case-insensitively. Blank usernames never match.
	pub fn matches(&self, username: &str, account_id: Option<&str>) -> bool {
		match account_id.map(str::trim).filter(|id| !id.is_empty()) {
			Some(id) => self.account_id.as_ref() == id,
			None => {
				let username = username.trim();

				!username.is_empty() && username.to_lowercase() == self.username.to_lowercase()
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn account() -> AccountRecord {
		AccountRecord::new(
			"A@X.com",
			AccountId::new("id1").expect("Account identifier fixture should be valid."),
		)
	}

	#[test]
	fn account_id_is_authoritative_when_present() {
		let account = account();

		assert!(account.matches("someone-else@x.com", Some("id1")));
		assert!(!account.matches("a@x.com", Some("id2")));
	}

	#[test]
	fn username_matches_case_insensitively_without_account_id() {
		let account = account();

		assert!(account.matches("a@x.COM", None));
		assert!(account.matches("a@x.com", Some("  ")));
		assert!(!account.matches("b@x.com", None));
		assert!(!account.matches("", None));
	}
}
