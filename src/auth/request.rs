//! Token requests issued by the policy engine and the typed outcomes returned to it.

// self
use crate::{_prelude::*, auth::AccessToken};

/// Suffix that turns a resource identifier into its static-permissions scope.
pub const DEFAULT_SCOPE_SUFFIX: &str = "/.default";

/// Builds the `{resource}/.default` scope requested for a protected resource.
pub fn default_scope(resource_id: &str) -> String {
	format!("{resource_id}{DEFAULT_SCOPE_SUFFIX}")
}

/// Token request received from the policy engine.
///
/// Fields hold the raw strings the engine supplied; validation happens inside the token
/// flow so that malformed requests still produce a typed denial.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
	/// User principal name the engine is acting for.
	pub username: String,
	/// Directory object identifier the engine is acting for.
	pub account_id: Option<String>,
	/// Tenant hint supplied by newer engines.
	pub tenant_id_hint: Option<String>,
	/// Authority hint supplied by newer engines.
	pub authority_hint: Option<String>,
	/// Protected resource the token must be minted for.
	pub resource_id: String,
}
impl TokenRequest {
	/// Creates a request for an account identifier without tenant or authority hints.
	pub fn new(
		username: impl Into<String>,
		account_id: impl Into<String>,
		resource_id: impl Into<String>,
	) -> Self {
		Self::for_username(username, resource_id).with_account_id(Some(&account_id.into()))
	}

	/// Creates a request that identifies the account by username only.
	pub fn for_username(username: impl Into<String>, resource_id: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			account_id: None,
			tenant_id_hint: None,
			authority_hint: None,
			resource_id: resource_id.into(),
		}
	}

	/// Overrides the account identifier.
	pub fn with_account_id(mut self, account_id: Option<&str>) -> Self {
		self.account_id = account_id.map(str::to_owned);

		self
	}

	/// Sets the tenant hint.
	pub fn with_tenant_hint(mut self, tenant: Option<&str>) -> Self {
		self.tenant_id_hint = tenant.map(str::to_owned);

		self
	}

	/// Sets the authority hint.
	pub fn with_authority_hint(mut self, authority: Option<&str>) -> Self {
		self.authority_hint = authority.map(str::to_owned);

		self
	}

	/// Returns the scope list for a silent acquisition of this request's resource.
	pub fn scopes(&self) -> Vec<String> {
		vec![default_scope(self.resource_id.trim())]
	}
}

/// Reason a token was withheld from the policy engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenialReason {
	/// Identity client is not constructed.
	NoClient,
	/// No account is signed in.
	NoAccount,
	/// Signed-in account differs from the requested identity.
	AccountMismatch,
	/// Request named no resource.
	ResourceMissing,
	/// Provider failed or timed out.
	ProviderFailure,
	/// User cancelled an interactive flow.
	Cancelled,
}
impl DenialReason {
	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			DenialReason::NoClient => "no-client",
			DenialReason::NoAccount => "no-account",
			DenialReason::AccountMismatch => "account-mismatch",
			DenialReason::ResourceMissing => "resource-missing",
			DenialReason::ProviderFailure => "provider-failure",
			DenialReason::Cancelled => "cancelled",
		}
	}
}
impl Display for DenialReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl From<&Error> for DenialReason {
	fn from(err: &Error) -> Self {
		match err {
			Error::ClientUnavailable { .. } => DenialReason::NoClient,
			Error::NoActiveAccount => DenialReason::NoAccount,
			Error::AccountMismatch => DenialReason::AccountMismatch,
			Error::ResourceMissing => DenialReason::ResourceMissing,
			Error::Cancelled => DenialReason::Cancelled,
			_ => DenialReason::ProviderFailure,
		}
	}
}

/// Definitive answer to a token request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenOutcome {
	/// A token was acquired for the requested identity and resource.
	Granted(AccessToken),
	/// No token is released.
	Denied(DenialReason),
}
impl TokenOutcome {
	/// Returns true for [`TokenOutcome::Granted`].
	pub fn is_granted(&self) -> bool {
		matches!(self, Self::Granted(_))
	}

	/// Returns the denial reason, if any.
	pub fn denial(&self) -> Option<DenialReason> {
		match self {
			Self::Granted(_) => None,
			Self::Denied(reason) => Some(*reason),
		}
	}

	/// Converts the outcome into the nullable token the policy engine expects.
	pub fn into_token(self) -> Option<AccessToken> {
		match self {
			Self::Granted(token) => Some(token),
			Self::Denied(_) => None,
		}
	}
}
impl From<Result<AccessToken>> for TokenOutcome {
	fn from(result: Result<AccessToken>) -> Self {
		match result {
			Ok(token) => Self::Granted(token),
			Err(err) => Self::Denied(DenialReason::from(&err)),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ProviderError;

	#[test]
	fn default_scope_appends_suffix() {
		assert_eq!(default_scope("res1"), "res1/.default");
		assert_eq!(
			TokenRequest::new("a@x.com", "id1", " https://graph.microsoft.com ").scopes(),
			vec!["https://graph.microsoft.com/.default".to_owned()]
		);
	}

	#[test]
	fn errors_map_onto_denial_reasons() {
		let cases = [
			(Error::ClientUnavailable { reason: "not built".into() }, DenialReason::NoClient),
			(Error::NoActiveAccount, DenialReason::NoAccount),
			(Error::AccountMismatch, DenialReason::AccountMismatch),
			(Error::ResourceMissing, DenialReason::ResourceMissing),
			(
				ProviderError::Timeout { timeout: StdDuration::from_secs(1) }.into(),
				DenialReason::ProviderFailure,
			),
		];

		for (err, expected) in cases {
			assert_eq!(TokenOutcome::from(Err(err)), TokenOutcome::Denied(expected));
		}
	}

	#[test]
	fn denial_reasons_serialize_as_kebab_case() {
		let payload = serde_json::to_string(&DenialReason::AccountMismatch)
			.expect("DenialReason should serialize to JSON.");

		assert_eq!(payload, "\"account-mismatch\"");
		assert_eq!(DenialReason::AccountMismatch.to_string(), "account-mismatch");
	}

	#[test]
	fn granted_outcome_releases_token() {
		let outcome = TokenOutcome::from(Ok(AccessToken::new("tok-123")));

		assert!(outcome.is_granted());
		assert_eq!(outcome.denial(), None);
		assert_eq!(outcome.into_token().map(AccessToken::into_inner), Some("tok-123".into()));
	}
}
