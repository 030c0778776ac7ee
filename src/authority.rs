//! Authority resolution for silent token requests.
//!
//! The signed-in account's own authority reflects where it actually authenticated, so a
//! caller-supplied hint never overrides it. The configured tenant authority is the last
//! resort.

/// Picks the authority for a token request: the first non-blank of the account's authority,
/// the request's authority hint, and the tenant default, in that order.
pub fn resolve_authority<'a>(
	account_authority: Option<&'a str>,
	request_authority: Option<&'a str>,
	tenant_default: &'a str,
) -> &'a str {
	[account_authority, request_authority]
		.into_iter()
		.flatten()
		.map(str::trim)
		.find(|authority| !authority.is_empty())
		.unwrap_or(tenant_default)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const TENANT: &str = "https://login.microsoftonline.com/tenant-default";

	#[test]
	fn account_authority_wins_over_everything() {
		let candidates = [None, Some(""), Some("https://login.microsoftonline.com/hint")];

		for hint in candidates {
			assert_eq!(
				resolve_authority(Some("https://login.microsoftonline.com/home"), hint, TENANT),
				"https://login.microsoftonline.com/home"
			);
		}
	}

	#[test]
	fn blank_values_fall_through_in_order() {
		assert_eq!(
			resolve_authority(Some("  "), Some("https://login.microsoftonline.com/hint"), TENANT),
			"https://login.microsoftonline.com/hint"
		);
		assert_eq!(resolve_authority(None, Some("\t"), TENANT), TENANT);
		assert_eq!(resolve_authority(None, None, TENANT), TENANT);
	}
}
