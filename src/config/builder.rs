// self
use crate::{
	_prelude::*,
	auth::TenantId,
	config::{
		BridgeConfig, DEFAULT_LEDGER_CAPACITY, DEFAULT_LOGIN_HOST, DEFAULT_SIGN_IN_SCOPE,
		DEFAULT_SILENT_TOKEN_TIMEOUT,
	},
	error::ConfigError,
	notify::NotificationKind,
};

/// Builder for [`BridgeConfig`] values.
#[derive(Debug)]
pub struct BridgeConfigBuilder {
	/// Tenant the bridge enrolls accounts into.
	pub tenant_id: TenantId,
	/// Optional explicit tenant authority (derived from the tenant when unset).
	pub tenant_authority: Option<Url>,
	/// Application (client) identifier.
	pub client_id: Option<String>,
	/// Redirect URI.
	pub redirect_uri: Option<String>,
	/// Interactive sign-in scopes.
	pub sign_in_scopes: Vec<String>,
	/// Synchronous token callback deadline.
	pub silent_token_timeout: StdDuration,
	/// Notification ledger capacity.
	pub ledger_capacity: usize,
	/// Notification kinds to register for.
	pub notification_kinds: Vec<NotificationKind>,
}
impl BridgeConfigBuilder {
	/// Creates a new builder seeded with defaults for the provided tenant.
	pub fn new(tenant_id: TenantId) -> Self {
		Self {
			tenant_id,
			tenant_authority: None,
			client_id: None,
			redirect_uri: None,
			sign_in_scopes: vec![DEFAULT_SIGN_IN_SCOPE.to_owned()],
			silent_token_timeout: DEFAULT_SILENT_TOKEN_TIMEOUT,
			ledger_capacity: DEFAULT_LEDGER_CAPACITY,
			notification_kinds: NotificationKind::known().to_vec(),
		}
	}

	/// Sets the fallback tenant authority.
	pub fn tenant_authority(mut self, url: Url) -> Self {
		self.tenant_authority = Some(url);

		self
	}

	/// Parses and sets the fallback tenant authority.
	pub fn tenant_authority_str(self, url: &str) -> Result<Self, ConfigError> {
		let url = Url::parse(url).map_err(|source| ConfigError::InvalidAuthority { source })?;

		Ok(self.tenant_authority(url))
	}

	/// Sets the application (client) identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the redirect URI.
	pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
		self.redirect_uri = Some(redirect_uri.into());

		self
	}

	/// Replaces the interactive sign-in scopes.
	pub fn sign_in_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.sign_in_scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the synchronous token callback deadline.
	pub fn silent_token_timeout(mut self, timeout: StdDuration) -> Self {
		self.silent_token_timeout = timeout;

		self
	}

	/// Overrides the notification ledger capacity.
	pub fn ledger_capacity(mut self, capacity: usize) -> Self {
		self.ledger_capacity = capacity;

		self
	}

	/// Replaces the notification kinds the dispatcher registers for.
	pub fn notification_kinds<I>(mut self, kinds: I) -> Self
	where
		I: IntoIterator<Item = NotificationKind>,
	{
		self.notification_kinds = kinds.into_iter().collect();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<BridgeConfig, ConfigError> {
		let tenant_authority = match self.tenant_authority {
			Some(url) => url,
			None => Url::parse(&format!("{DEFAULT_LOGIN_HOST}/{}", self.tenant_id))
				.map_err(|source| ConfigError::InvalidAuthority { source })?,
		};
		let config = BridgeConfig {
			tenant_id: self.tenant_id,
			tenant_authority,
			client_id: self.client_id,
			redirect_uri: self.redirect_uri,
			sign_in_scopes: self.sign_in_scopes,
			silent_token_timeout: self.silent_token_timeout,
			ledger_capacity: self.ledger_capacity,
			notification_kinds: self.notification_kinds,
		};

		config.validate()?;

		Ok(config)
	}
}

impl BridgeConfig {
	/// Validates invariants for the configuration.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.tenant_authority.scheme() != "https" {
			return Err(ConfigError::InsecureAuthority { url: self.tenant_authority.to_string() });
		}
		if self.sign_in_scopes.is_empty() {
			return Err(ConfigError::NoSignInScopes);
		}
		if self.sign_in_scopes.iter().any(|scope| scope.trim().is_empty()) {
			return Err(ConfigError::BlankSignInScope);
		}
		if self.silent_token_timeout.is_zero() {
			return Err(ConfigError::ZeroTimeout);
		}
		if self.ledger_capacity == 0 {
			return Err(ConfigError::ZeroLedgerCapacity);
		}

		Ok(())
	}
}
