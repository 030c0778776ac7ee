//! Policy-engine contract and the version-tolerant call adapter.
//!
//! The policy engine ships independently of the bridge, and different releases expose
//! different argument shapes for the same logical operation. [`PolicyEngine`] lists every
//! known shape as its own method; the default body of each reports
//! [`EngineCallError::UnsupportedShape`], so an adapter for a given engine release overrides
//! exactly the shapes that release has. [`MethodCache`] then finds and remembers the richest
//! shape that works.

pub mod variant;

pub use variant::*;

// self
use crate::{
	_prelude::*,
	notify::{NotificationEvent, NotificationKind},
};

/// Result of a single policy-engine call.
pub type EngineResult<T = ()> = Result<T, EngineCallError>;

/// Failure of a single policy-engine call.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum EngineCallError {
	/// The installed engine does not expose this call shape; try the next one.
	#[error("The installed policy engine does not expose this call shape.")]
	UnsupportedShape,
	/// The engine understood the call and refused it.
	#[error("Policy engine rejected the call: {reason}.")]
	Rejected {
		/// Engine-supplied reason.
		reason: String,
	},
}

/// Capability surface of the installed policy engine.
#[allow(unused_variables)]
pub trait PolicyEngine
where
	Self: Send + Sync,
{
	/// Registers an account with tenant and authority.
	fn register_account_with_authority(
		&self,
		username: &str,
		account_id: &str,
		tenant_id: &str,
		authority: &str,
	) -> EngineResult {
		Err(EngineCallError::UnsupportedShape)
	}

	/// Registers an account with tenant only.
	fn register_account_with_tenant(
		&self,
		username: &str,
		account_id: &str,
		tenant_id: &str,
	) -> EngineResult {
		Err(EngineCallError::UnsupportedShape)
	}

	/// Registers an account by identity only.
	fn register_account(&self, username: &str, account_id: &str) -> EngineResult {
		Err(EngineCallError::UnsupportedShape)
	}

	/// Unregisters an account with tenant and authority.
	fn unregister_account_with_authority(
		&self,
		username: &str,
		account_id: &str,
		tenant_id: &str,
		authority: &str,
	) -> EngineResult {
		Err(EngineCallError::UnsupportedShape)
	}

	/// Unregisters an account with tenant only.
	fn unregister_account_with_tenant(
		&self,
		username: &str,
		account_id: &str,
		tenant_id: &str,
	) -> EngineResult {
		Err(EngineCallError::UnsupportedShape)
	}

	/// Unregisters an account by identity only.
	fn unregister_account(&self, username: &str, account_id: &str) -> EngineResult {
		Err(EngineCallError::UnsupportedShape)
	}

	/// Registers a token callback that the engine invokes with tenant and authority hints.
	fn register_authentication_callback_extended(
		&self,
		callback: Arc<dyn AuthenticationCallback>,
	) -> EngineResult {
		Err(EngineCallError::UnsupportedShape)
	}

	/// Registers a token callback that the engine invokes without hints.
	fn register_authentication_callback(
		&self,
		callback: Arc<dyn AuthenticationCallback>,
	) -> EngineResult {
		Err(EngineCallError::UnsupportedShape)
	}

	/// Registers a notification receiver for specific kinds.
	fn register_notification_receiver_for(
		&self,
		receiver: Arc<dyn NotificationReceiver>,
		kinds: &[NotificationKind],
	) -> EngineResult {
		Err(EngineCallError::UnsupportedShape)
	}

	/// Registers a notification receiver for every kind the engine emits.
	fn register_notification_receiver(
		&self,
		receiver: Arc<dyn NotificationReceiver>,
	) -> EngineResult {
		Err(EngineCallError::UnsupportedShape)
	}
}

/// Token callback the policy engine invokes on its own threads.
///
/// Both shapes return the raw token or `None`; a `None` is a definitive denial, never a
/// request to retry immediately.
pub trait AuthenticationCallback
where
	Self: Send + Sync,
{
	/// Acquires a token for `resource_id` on behalf of the identified account.
	fn acquire_token_with_hints(
		&self,
		username: &str,
		account_id: &str,
		tenant_id: Option<&str>,
		authority: Option<&str>,
		resource_id: &str,
	) -> Option<String>;

	/// Older three-argument shape; delegates with no tenant or authority hint.
	fn acquire_token(&self, username: &str, account_id: &str, resource_id: &str) -> Option<String> {
		self.acquire_token_with_hints(username, account_id, None, None, resource_id)
	}
}

/// Receiver the policy engine pushes lifecycle notifications to.
pub trait NotificationReceiver
where
	Self: Send + Sync,
{
	/// Handles one delivery; `false` asks the engine to redeliver later.
	fn on_receive(&self, event: NotificationEvent) -> bool;
}
