//! Bridge flows orchestrated through the [`Bridge`] facade.

pub mod enrollment;
pub mod install;
pub mod session;
pub mod token;

pub use enrollment::*;
pub use install::*;
pub use session::*;
pub use token::*;

// crates.io
use tokio::runtime::Handle;
// self
use crate::{
	_prelude::*,
	config::BridgeConfig,
	engine::{MethodCache, PolicyEngine},
	identity::{IdentityClientFactory, IdentityClientHandle},
	notify::NotificationDispatcher,
};

/// Direction of an enrollment call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentDirection {
	/// Register the account with the policy engine.
	Register,
	/// Remove the account from the policy engine.
	Unregister,
}
impl EnrollmentDirection {
	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			EnrollmentDirection::Register => "registration",
			EnrollmentDirection::Unregister => "unregistration",
		}
	}
}
impl Display for EnrollmentDirection {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Wires the identity client, the policy engine, and the bridge components together.
///
/// The bridge owns the identity handle, the token bridge the engine calls back into, the
/// notification dispatcher, and the method cache shared by every engine operation. Cloning is
/// cheap; every clone shares the same state. Blocking work (client construction, engine calls,
/// notification handlers) runs on the runtime's blocking pool when started from the `spawn_*`
/// entry points, so the thread that triggered it is never held up.
#[derive(Clone)]
pub struct Bridge {
	/// Validated configuration.
	pub config: Arc<BridgeConfig>,
	/// Process-wide identity client handle.
	pub identity: Arc<IdentityClientHandle>,
	/// Installed policy engine.
	pub engine: Arc<dyn PolicyEngine>,
	/// Token callback registered with the engine.
	pub tokens: Arc<TokenBridge>,
	/// Receiver registered with the engine for policy notifications.
	pub notifications: Arc<NotificationDispatcher>,
	/// Call-shape resolutions for every engine operation.
	pub methods: Arc<MethodCache>,
	runtime: Handle,
	enrollment_gate: Arc<Mutex<()>>,
}
impl Bridge {
	/// Creates a bridge whose provider calls run on `runtime`.
	pub fn new(
		config: BridgeConfig,
		factory: Arc<dyn IdentityClientFactory>,
		engine: Arc<dyn PolicyEngine>,
		runtime: Handle,
	) -> Self {
		let config = Arc::new(config);
		let identity = Arc::new(IdentityClientHandle::new(config.clone(), factory));
		let tokens = Arc::new(TokenBridge::new(identity.clone(), runtime.clone()));
		let notifications = Arc::new(NotificationDispatcher::from_config(&config));

		Self {
			config,
			identity,
			engine,
			tokens,
			notifications,
			methods: Default::default(),
			runtime,
			enrollment_gate: Default::default(),
		}
	}

	/// Runtime that drives provider calls and background work.
	pub fn runtime(&self) -> &Handle {
		&self.runtime
	}
}
impl Debug for Bridge {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Bridge")
			.field("tenant_id", &self.config.tenant_id)
			.field("identity", &self.identity)
			.field("methods", &self.methods)
			.finish()
	}
}
