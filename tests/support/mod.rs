//! Scriptable identity client and policy engine shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::{HashMap, HashSet},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
use tokio::runtime::{Builder, Runtime};
// self
use credential_bridge::{
	auth::{AccessToken, AccountId, AccountRecord, TenantId},
	config::BridgeConfig,
	engine::{
		AuthenticationCallback, EngineCallError, EngineResult, NotificationReceiver, PolicyEngine,
	},
	error::ProviderError,
	flows::Bridge,
	identity::{
		ClientRef, IdentityClient, IdentityFuture, InteractiveContext, InteractiveOutcome,
	},
	notify::NotificationKind,
};

pub const TENANT: &str = "tenant-1";
pub const TENANT_AUTHORITY: &str = "https://login.microsoftonline.com/tenant-1";

pub fn tenant() -> TenantId {
	TenantId::new(TENANT).expect("Tenant fixture should be valid.")
}

pub fn account(username: &str, id: &str) -> AccountRecord {
	AccountRecord::new(username, AccountId::new(id).expect("Account identifier should be valid."))
}

pub fn config() -> BridgeConfig {
	config_with_timeout(Duration::from_secs(5))
}

pub fn config_with_timeout(timeout: Duration) -> BridgeConfig {
	BridgeConfig::builder(tenant())
		.silent_token_timeout(timeout)
		.ledger_capacity(16)
		.build()
		.expect("Bridge configuration fixture should build.")
}

pub fn runtime() -> Runtime {
	Builder::new_multi_thread()
		.worker_threads(2)
		.enable_all()
		.build()
		.expect("Test runtime should build.")
}

/// Builds a bridge around the fakes; the identity client is not constructed yet.
pub fn bridge(
	runtime: &tokio::runtime::Handle,
	config: BridgeConfig,
	client: &Arc<FakeIdentityClient>,
	engine: &Arc<FakeEngine>,
) -> Bridge {
	let client = client.clone();
	let factory = move |_: &BridgeConfig| -> Result<ClientRef, ProviderError> {
		let client: ClientRef = client.clone();

		Ok(client)
	};
	let engine: Arc<dyn PolicyEngine> = engine.clone();

	Bridge::new(config, Arc::new(factory), engine, runtime.clone())
}

/// What the next interactive sign-in does.
#[derive(Clone, Debug)]
pub enum InteractiveScript {
	/// Sign the account in and issue the token.
	Complete { account: AccountRecord, token: String },
	/// The user dismisses the flow.
	Cancel,
	/// The provider fails.
	Fail(ProviderError),
}

pub struct FakeIdentityClient {
	pub account: Mutex<Option<AccountRecord>>,
	pub silent_result: Mutex<Result<String, ProviderError>>,
	pub silent_delay: Mutex<Option<Duration>>,
	pub silent_calls: AtomicUsize,
	pub last_authority: Mutex<Option<String>>,
	pub last_scopes: Mutex<Vec<String>>,
	pub interactive: Mutex<InteractiveScript>,
	pub sign_out_calls: AtomicUsize,
}
impl FakeIdentityClient {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			account: Mutex::new(None),
			silent_result: Mutex::new(Ok("tok-123".into())),
			silent_delay: Mutex::new(None),
			silent_calls: AtomicUsize::new(0),
			last_authority: Mutex::new(None),
			last_scopes: Mutex::new(Vec::new()),
			interactive: Mutex::new(InteractiveScript::Cancel),
			sign_out_calls: AtomicUsize::new(0),
		})
	}

	pub fn signed_in(account: AccountRecord) -> Arc<Self> {
		let client = Self::new();

		*client.account.lock() = Some(account);

		client
	}

	pub fn silent_calls(&self) -> usize {
		self.silent_calls.load(Ordering::SeqCst)
	}
}
impl IdentityClient for FakeIdentityClient {
	fn current_account(&self) -> IdentityFuture<'_, Option<AccountRecord>> {
		let account = self.account.lock().clone();

		Box::pin(async move { Ok(account) })
	}

	fn acquire_token_silently<'a>(
		&'a self,
		_: &'a AccountRecord,
		scopes: &'a [String],
		authority: &'a str,
	) -> IdentityFuture<'a, AccessToken> {
		self.silent_calls.fetch_add(1, Ordering::SeqCst);
		*self.last_authority.lock() = Some(authority.to_owned());
		*self.last_scopes.lock() = scopes.to_vec();

		let delay = *self.silent_delay.lock();
		let result = self.silent_result.lock().clone();

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			result.map(AccessToken::new)
		})
	}

	fn sign_in_interactive<'a>(
		&'a self,
		_: &'a InteractiveContext,
		_: &'a [String],
	) -> IdentityFuture<'a, InteractiveOutcome> {
		let script = self.interactive.lock().clone();

		Box::pin(async move {
			match script {
				InteractiveScript::Complete { account, token } => {
					*self.account.lock() = Some(account);

					Ok(InteractiveOutcome::Completed(AccessToken::new(token)))
				},
				InteractiveScript::Cancel => Ok(InteractiveOutcome::Cancelled),
				InteractiveScript::Fail(e) => Err(e),
			}
		})
	}

	fn sign_out(&self) -> IdentityFuture<'_, ()> {
		self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
		*self.account.lock() = None;

		Box::pin(async { Ok(()) })
	}
}

/// Call shapes the fake engine can expose.
pub mod shape {
	pub const REGISTER_4: &str = "register/4";
	pub const REGISTER_3: &str = "register/3";
	pub const REGISTER_2: &str = "register/2";
	pub const UNREGISTER_4: &str = "unregister/4";
	pub const UNREGISTER_3: &str = "unregister/3";
	pub const UNREGISTER_2: &str = "unregister/2";
	pub const CALLBACK_5: &str = "callback/5";
	pub const CALLBACK_3: &str = "callback/3";
	pub const RECEIVER_KINDS: &str = "receiver/kinds";
	pub const RECEIVER_ALL: &str = "receiver/all";
}

/// Policy engine exposing a configurable subset of call shapes.
#[derive(Default)]
pub struct FakeEngine {
	pub supported: Mutex<HashSet<&'static str>>,
	pub rejections: Mutex<HashMap<&'static str, String>>,
	pub calls: Mutex<Vec<(&'static str, Vec<String>)>>,
	pub callback: Mutex<Option<Arc<dyn AuthenticationCallback>>>,
	pub receiver: Mutex<Option<Arc<dyn NotificationReceiver>>>,
	pub receiver_kinds: Mutex<Option<Vec<NotificationKind>>>,
}
impl FakeEngine {
	pub fn supporting(shapes: &[&'static str]) -> Arc<Self> {
		let engine = Self::default();

		engine.supported.lock().extend(shapes.iter().copied());

		Arc::new(engine)
	}

	pub fn support(&self, shape: &'static str) {
		self.supported.lock().insert(shape);
	}

	pub fn reject(&self, shape: &'static str, reason: &str) {
		self.rejections.lock().insert(shape, reason.to_owned());
	}

	pub fn calls(&self) -> Vec<(&'static str, Vec<String>)> {
		self.calls.lock().clone()
	}

	pub fn call_shapes(&self) -> Vec<&'static str> {
		self.calls.lock().iter().map(|(shape, _)| *shape).collect()
	}

	fn accept(&self, shape: &'static str, args: &[&str]) -> EngineResult {
		if !self.supported.lock().contains(shape) {
			return Err(EngineCallError::UnsupportedShape);
		}

		self.calls.lock().push((shape, args.iter().map(|arg| (*arg).to_owned()).collect()));

		match self.rejections.lock().get(shape) {
			Some(reason) => Err(EngineCallError::Rejected { reason: reason.clone() }),
			None => Ok(()),
		}
	}
}
impl PolicyEngine for FakeEngine {
	fn register_account_with_authority(
		&self,
		username: &str,
		account_id: &str,
		tenant_id: &str,
		authority: &str,
	) -> EngineResult {
		self.accept(shape::REGISTER_4, &[username, account_id, tenant_id, authority])
	}

	fn register_account_with_tenant(
		&self,
		username: &str,
		account_id: &str,
		tenant_id: &str,
	) -> EngineResult {
		self.accept(shape::REGISTER_3, &[username, account_id, tenant_id])
	}

	fn register_account(&self, username: &str, account_id: &str) -> EngineResult {
		self.accept(shape::REGISTER_2, &[username, account_id])
	}

	fn unregister_account_with_authority(
		&self,
		username: &str,
		account_id: &str,
		tenant_id: &str,
		authority: &str,
	) -> EngineResult {
		self.accept(shape::UNREGISTER_4, &[username, account_id, tenant_id, authority])
	}

	fn unregister_account_with_tenant(
		&self,
		username: &str,
		account_id: &str,
		tenant_id: &str,
	) -> EngineResult {
		self.accept(shape::UNREGISTER_3, &[username, account_id, tenant_id])
	}

	fn unregister_account(&self, username: &str, account_id: &str) -> EngineResult {
		self.accept(shape::UNREGISTER_2, &[username, account_id])
	}

	fn register_authentication_callback_extended(
		&self,
		callback: Arc<dyn AuthenticationCallback>,
	) -> EngineResult {
		self.accept(shape::CALLBACK_5, &[])?;
		*self.callback.lock() = Some(callback);

		Ok(())
	}

	fn register_authentication_callback(
		&self,
		callback: Arc<dyn AuthenticationCallback>,
	) -> EngineResult {
		self.accept(shape::CALLBACK_3, &[])?;
		*self.callback.lock() = Some(callback);

		Ok(())
	}

	fn register_notification_receiver_for(
		&self,
		receiver: Arc<dyn NotificationReceiver>,
		kinds: &[NotificationKind],
	) -> EngineResult {
		self.accept(shape::RECEIVER_KINDS, &[])?;
		*self.receiver.lock() = Some(receiver);
		*self.receiver_kinds.lock() = Some(kinds.to_vec());

		Ok(())
	}

	fn register_notification_receiver(
		&self,
		receiver: Arc<dyn NotificationReceiver>,
	) -> EngineResult {
		self.accept(shape::RECEIVER_ALL, &[])?;
		*self.receiver.lock() = Some(receiver);

		Ok(())
	}
}
