//! Identity-provider client contract and the process-wide handle that owns it.
//!
//! The identity client owns the signed-in account, its token cache, and the network transport;
//! the bridge only consumes it through [`IdentityClient`]. Futures are boxed and `Send` so the
//! token bridge can drive them on a runtime it does not otherwise share with the caller.

pub mod handle;

pub use handle::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, AccountRecord},
	config::BridgeConfig,
	error::ProviderError,
};

/// Boxed future returned by [`IdentityClient`] operations.
pub type IdentityFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ProviderError>> + 'a + Send>>;

/// Shared reference to the constructed identity client.
pub type ClientRef = Arc<dyn IdentityClient>;

/// Operations consumed from the identity-provider client.
pub trait IdentityClient
where
	Self: Send + Sync,
{
	/// Loads the account currently signed in, if any.
	fn current_account(&self) -> IdentityFuture<'_, Option<AccountRecord>>;

	/// Acquires a token from the cached session without ever prompting the user.
	fn acquire_token_silently<'a>(
		&'a self,
		account: &'a AccountRecord,
		scopes: &'a [String],
		authority: &'a str,
	) -> IdentityFuture<'a, AccessToken>;

	/// Runs the provider's interactive sign-in flow.
	fn sign_in_interactive<'a>(
		&'a self,
		context: &'a InteractiveContext,
		scopes: &'a [String],
	) -> IdentityFuture<'a, InteractiveOutcome>;

	/// Signs the current account out.
	fn sign_out(&self) -> IdentityFuture<'_, ()>;
}

/// Constructs the identity client exactly once per [`IdentityClientHandle`].
pub trait IdentityClientFactory
where
	Self: Send + Sync,
{
	/// Builds a client from configuration.
	fn create(&self, config: &BridgeConfig) -> Result<ClientRef, ProviderError>;
}
impl<F> IdentityClientFactory for F
where
	F: Send + Sync + Fn(&BridgeConfig) -> Result<ClientRef, ProviderError>,
{
	fn create(&self, config: &BridgeConfig) -> Result<ClientRef, ProviderError> {
		self(config)
	}
}

/// Prompt behavior requested for an interactive sign-in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
	/// Let the user pick among known accounts.
	#[default]
	SelectAccount,
	/// Always ask for credentials.
	Login,
	/// Ask for consent even if previously granted.
	Consent,
	/// Prompt only when the provider requires it.
	WhenRequired,
}

/// UI context handed to the provider's interactive flow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InteractiveContext {
	/// Opaque handle of the window or activity the flow is parented to.
	pub parent_window: Option<u64>,
	/// Prompt behavior.
	pub prompt: Prompt,
	/// Username pre-filled in the sign-in form.
	pub login_hint: Option<String>,
}
impl InteractiveContext {
	/// Parents the flow to the provided window handle.
	pub fn with_parent_window(mut self, handle: u64) -> Self {
		self.parent_window = Some(handle);

		self
	}

	/// Overrides the prompt behavior.
	pub fn with_prompt(mut self, prompt: Prompt) -> Self {
		self.prompt = prompt;

		self
	}

	/// Pre-fills the username.
	pub fn with_login_hint(mut self, hint: impl Into<String>) -> Self {
		self.login_hint = Some(hint.into());

		self
	}
}

/// Result of an interactive sign-in that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractiveOutcome {
	/// The user signed in and a token was issued.
	Completed(AccessToken),
	/// The user dismissed the flow.
	Cancelled,
}
