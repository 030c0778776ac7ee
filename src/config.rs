//! Bridge configuration shared by the identity handle, token bridge, and dispatcher.
//!
//! [`BridgeConfig`] carries the tenant the bridge serves, the authority used when neither the
//! account nor the request names one, the scopes requested during interactive sign-in, and the
//! deadline that bounds every synchronous token callback.

/// Builder API for assembling bridge configuration.
pub mod builder;

pub use builder::*;

// self
use crate::{
	_prelude::*,
	auth::TenantId,
	error::ConfigError,
	notify::NotificationKind,
};

/// Login host used to derive the default tenant authority.
pub const DEFAULT_LOGIN_HOST: &str = "https://login.microsoftonline.com";
/// Scope requested during interactive sign-in unless overridden.
pub const DEFAULT_SIGN_IN_SCOPE: &str = "https://msmamservice.api.application/.default";
/// Default deadline for a synchronous token callback.
pub const DEFAULT_SILENT_TOKEN_TIMEOUT: StdDuration = StdDuration::from_secs(30);
/// Default number of handled delivery ids remembered for deduplication.
pub const DEFAULT_LEDGER_CAPACITY: usize = 256;

/// Immutable, validated bridge configuration.
///
/// Deserializing goes through the same validation as [`BridgeConfigBuilder::build`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBridgeConfig")]
pub struct BridgeConfig {
	/// Tenant the bridge enrolls accounts into.
	pub tenant_id: TenantId,
	/// Fallback authority used when neither the account nor the request provides one.
	pub tenant_authority: Url,
	/// Application (client) identifier handed to the identity client factory.
	pub client_id: Option<String>,
	/// Redirect URI handed to the identity client factory.
	pub redirect_uri: Option<String>,
	/// Scopes requested during interactive sign-in.
	pub sign_in_scopes: Vec<String>,
	/// Deadline applied to every synchronous token callback.
	#[serde(rename = "silent_token_timeout_ms", serialize_with = "serialize_millis")]
	pub silent_token_timeout: StdDuration,
	/// Number of handled delivery ids remembered for deduplication.
	pub ledger_capacity: usize,
	/// Notification kinds the dispatcher registers for.
	pub notification_kinds: Vec<NotificationKind>,
}
impl BridgeConfig {
	/// Creates a new builder for the provided tenant.
	pub fn builder(tenant_id: TenantId) -> BridgeConfigBuilder {
		BridgeConfigBuilder::new(tenant_id)
	}

	/// Parses and validates configuration from JSON.
	///
	/// Only `tenant_id` is required; every other field falls back to the builder defaults.
	/// Parse failures report the path of the offending field.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(json);
		let raw: RawBridgeConfig =
			serde_path_to_error::deserialize(de).map_err(|source| ConfigError::Parse { source })?;

		Self::try_from(raw)
	}
}
impl TryFrom<RawBridgeConfig> for BridgeConfig {
	type Error = ConfigError;

	fn try_from(raw: RawBridgeConfig) -> Result<Self, Self::Error> {
		let mut builder = Self::builder(raw.tenant_id);

		if let Some(authority) = raw.tenant_authority {
			builder = builder.tenant_authority_str(&authority)?;
		}
		if let Some(client_id) = raw.client_id {
			builder = builder.client_id(client_id);
		}
		if let Some(redirect_uri) = raw.redirect_uri {
			builder = builder.redirect_uri(redirect_uri);
		}
		if let Some(scopes) = raw.sign_in_scopes {
			builder = builder.sign_in_scopes(scopes);
		}
		if let Some(timeout_ms) = raw.silent_token_timeout_ms {
			builder = builder.silent_token_timeout(StdDuration::from_millis(timeout_ms));
		}
		if let Some(capacity) = raw.ledger_capacity {
			builder = builder.ledger_capacity(capacity);
		}
		if let Some(kinds) = raw.notification_kinds {
			builder = builder.notification_kinds(kinds);
		}

		builder.build()
	}
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBridgeConfig {
	tenant_id: TenantId,
	tenant_authority: Option<String>,
	client_id: Option<String>,
	redirect_uri: Option<String>,
	sign_in_scopes: Option<Vec<String>>,
	silent_token_timeout_ms: Option<u64>,
	ledger_capacity: Option<usize>,
	notification_kinds: Option<Vec<NotificationKind>>,
}

fn serialize_millis<S>(value: &StdDuration, serializer: S) -> Result<S::Ok, S::Error>
where
	S: serde::Serializer,
{
	serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}
