//! Validated account and tenant identifiers.
//!
//! Both arrive as raw strings from the identity client, the policy engine, or configuration.
//! Tenant identifiers are also spliced into the default authority URL, so they are restricted
//! to characters that are safe in a URL path segment.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const ACCOUNT_ID_MAX_LEN: usize = 128;
const TENANT_ID_MAX_LEN: usize = 64;

macro_rules! identifier {
	($(#[$meta:meta])* $name:ident, $label:literal, $check:path) => {
		$(#[$meta])*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates and wraps an identifier.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				Self::try_from(value.into())
			}

			/// Borrows the identifier.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				$check($label, &value)?;

				Ok(Self(value))
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", stringify!($name), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
	};
}

identifier! {
	/// Directory object identifier of a signed-in account.
	AccountId, "account", check_account_id
}
identifier! {
	/// Directory tenant the bridge enrolls accounts into.
	TenantId, "tenant", check_tenant_id
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("The {label} identifier cannot be empty.")]
	Empty {
		/// Identifier label (account, tenant).
		label: &'static str,
	},
	/// The identifier contains a character that is not allowed for its kind.
	#[error("The {label} identifier contains the disallowed character {found:?}.")]
	InvalidCharacter {
		/// Identifier label (account, tenant).
		label: &'static str,
		/// First offending character.
		found: char,
	},
	/// The identifier is longer than its kind allows.
	#[error("The {label} identifier exceeds {max} bytes.")]
	TooLong {
		/// Identifier label (account, tenant).
		label: &'static str,
		/// Maximum permitted length in bytes.
		max: usize,
	},
}

fn check_account_id(label: &'static str, value: &str) -> Result<(), IdentifierError> {
	check_shape(label, value, ACCOUNT_ID_MAX_LEN, |c| !c.is_whitespace() && !c.is_control())
}

fn check_tenant_id(label: &'static str, value: &str) -> Result<(), IdentifierError> {
	check_shape(label, value, TENANT_ID_MAX_LEN, |c| {
		c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_')
	})
}

fn check_shape(
	label: &'static str,
	value: &str,
	max: usize,
	allowed: impl Fn(char) -> bool,
) -> Result<(), IdentifierError> {
	if value.is_empty() {
		return Err(IdentifierError::Empty { label });
	}
	if let Some(found) = value.chars().find(|c| !allowed(*c)) {
		return Err(IdentifierError::InvalidCharacter { label, found });
	}
	if value.len() > max {
		return Err(IdentifierError::TooLong { label, max });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn account_ids_reject_blank_and_whitespace() {
		assert_eq!(AccountId::new(""), Err(IdentifierError::Empty { label: "account" }));
		assert_eq!(
			AccountId::new("id 1"),
			Err(IdentifierError::InvalidCharacter { label: "account", found: ' ' })
		);
		assert!(AccountId::new("00000000-0000-0000-66f3-3332eca7ea81.9188040d").is_ok());
	}

	#[test]
	fn tenant_ids_stay_url_path_safe() {
		let tenant = TenantId::new("516f6912-3d81-47b6-8866-20353e6bfdda")
			.expect("GUID tenant should be valid.");

		assert_eq!(format!("{tenant:?}"), "TenantId(516f6912-3d81-47b6-8866-20353e6bfdda)");
		assert!(TenantId::new("contoso.onmicrosoft.com").is_ok());
		assert!(matches!(
			TenantId::new("contoso/../common"),
			Err(IdentifierError::InvalidCharacter { found: '/', .. })
		));
		assert!(matches!(TenantId::new("t".repeat(65)), Err(IdentifierError::TooLong { .. })));
	}

	#[test]
	fn deserialization_runs_validation() {
		let account: AccountId =
			serde_json::from_str("\"id1\"").expect("Account identifier should deserialize.");

		assert_eq!(account.as_str(), "id1");
		assert!(serde_json::from_str::<TenantId>("\"bad tenant\"").is_err());
	}
}
