//! Registration of the bridge's callbacks with the policy engine.

// crates.io
use tokio::task::JoinHandle;
// self
use crate::{
	_prelude::*,
	engine::{
		AuthenticationCallback, EngineResult, Invocation, InvocationFailure, NotificationReceiver,
		OperationKey, PolicyEngine, Variant, VariantAttempt,
	},
	flows::Bridge,
	notify::{AckOutcome, NotificationEvent, NotificationKind},
	obs::{FlowKind, FlowSpan},
};

static CALLBACK_VARIANTS: [Variant<Arc<dyn AuthenticationCallback>>; 2] = [
	Variant::new("register_authentication_callback(acquire_token/5)", callback_extended),
	Variant::new("register_authentication_callback(acquire_token/3)", callback_basic),
];
static RECEIVER_VARIANTS: [Variant<ReceiverRegistration>; 2] = [
	Variant::new("register_notification_receiver(receiver, kinds)", receiver_for_kinds),
	Variant::new("register_notification_receiver(receiver)", receiver_all_kinds),
];

struct ReceiverRegistration {
	receiver: Arc<dyn NotificationReceiver>,
	kinds: Vec<NotificationKind>,
}

/// Call shape the engine accepted for one capability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CapabilityRegistration {
	/// Accepted shape.
	pub shape: &'static str,
	/// Ordered log of every shape called, ending with the accepted one.
	pub attempts: Vec<VariantAttempt>,
}

/// Result of [`Bridge::install`]; each capability is registered independently.
#[derive(Debug)]
pub struct InstallReport {
	/// Token callback registration.
	pub callback: Result<CapabilityRegistration>,
	/// Notification receiver registration.
	pub receiver: Result<CapabilityRegistration>,
}
impl InstallReport {
	/// Returns true when both capabilities are registered.
	pub fn is_complete(&self) -> bool {
		self.callback.is_ok() && self.receiver.is_ok()
	}
}

impl Bridge {
	/// Registers the token bridge and the notification dispatcher with the policy engine.
	///
	/// Each registration picks the richest shape the engine supports; the token callback is
	/// offered with tenant and authority hints first. A failure of one registration does not
	/// prevent the other.
	pub fn install(&self) -> InstallReport {
		let flow = FlowSpan::begin(FlowKind::Install, "install");
		let _entered = flow.enter();

		let callback: Arc<dyn AuthenticationCallback> = self.tokens.clone();
		let callback = self.register_capability(
			OperationKey::REGISTER_AUTHENTICATION_CALLBACK,
			&CALLBACK_VARIANTS,
			&callback,
		);
		let receiver = ReceiverRegistration {
			receiver: self.notifications.clone(),
			kinds: self.config.notification_kinds.clone(),
		};
		let receiver = self.register_capability(
			OperationKey::REGISTER_NOTIFICATION_RECEIVER,
			&RECEIVER_VARIANTS,
			&receiver,
		);
		let report = InstallReport { callback, receiver };

		flow.finish(report.is_complete());

		report
	}

	/// Forgets every resolved call shape after the installed engine changed.
	///
	/// Operations previously found to have no supported shape are probed again.
	pub fn engine_changed(&self) {
		self.methods.reset();

		tracing::info!("policy engine capability changed; call shapes will be probed again");
	}

	/// Dispatches `event` on the runtime's blocking pool.
	pub fn spawn_dispatch(&self, event: NotificationEvent) -> JoinHandle<AckOutcome> {
		let notifications = self.notifications.clone();

		self.runtime.spawn_blocking(move || notifications.dispatch(&event))
	}

	fn register_capability<A>(
		&self,
		key: OperationKey,
		variants: &[Variant<A>],
		args: &A,
	) -> Result<CapabilityRegistration> {
		let Invocation { attempts, outcome } =
			self.methods.invoke(key, self.engine.as_ref(), variants, args);
		let shape_at = |index: usize| variants.get(index).map_or("unknown", |variant| variant.shape);

		match outcome {
			Ok((index, ())) => {
				tracing::info!(operation = %key, shape = shape_at(index), "capability registered");

				Ok(CapabilityRegistration { shape: shape_at(index), attempts })
			},
			Err(InvocationFailure::Exhausted) => {
				tracing::error!(operation = %key, "no registration call shape available");

				Err(Error::AllVariantsExhausted { operation: key, attempts })
			},
			Err(InvocationFailure::Rejected { index, reason }) => {
				tracing::error!(operation = %key, %reason, "policy engine rejected registration");

				Err(Error::RegistrationRejected {
					operation: key,
					shape: shape_at(index),
					reason,
					attempts,
				})
			},
		}
	}
}

fn callback_extended(
	engine: &dyn PolicyEngine,
	callback: &Arc<dyn AuthenticationCallback>,
) -> EngineResult {
	engine.register_authentication_callback_extended(callback.clone())
}

fn callback_basic(
	engine: &dyn PolicyEngine,
	callback: &Arc<dyn AuthenticationCallback>,
) -> EngineResult {
	engine.register_authentication_callback(callback.clone())
}

fn receiver_for_kinds(
	engine: &dyn PolicyEngine,
	registration: &ReceiverRegistration,
) -> EngineResult {
	engine.register_notification_receiver_for(registration.receiver.clone(), &registration.kinds)
}

fn receiver_all_kinds(
	engine: &dyn PolicyEngine,
	registration: &ReceiverRegistration,
) -> EngineResult {
	engine.register_notification_receiver(registration.receiver.clone())
}
