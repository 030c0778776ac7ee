//! Policy lifecycle notifications and the idempotent dispatcher that acknowledges them.
//!
//! The policy engine pushes [`NotificationEvent`]s on its own threads and redelivers any event
//! acknowledged as failed. [`NotificationDispatcher`] routes each event to the handler registered
//! for its kind and turns every handler failure (including a panic) into
//! [`AckOutcome::Failed`]. A [`DeliveryLedger`] keeps the same delivery from running on two
//! threads at once and, for events that carry an engine delivery id, skips redeliveries of an
//! id that was already handled. Events without an id are never deduplicated by content: the
//! same payload arriving later is a new event.

pub mod ledger;

pub use ledger::*;

// std
use std::panic::{self, AssertUnwindSafe};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use serde::{Deserializer, Serializer};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	config::BridgeConfig,
	engine::NotificationReceiver,
	obs::{FlowKind, FlowSpan},
};

/// Kind of lifecycle event emitted by the policy engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
	/// Result of an enrollment attempt.
	EnrollmentResult,
	/// Compliance state of the managed identity changed.
	ComplianceStatus,
	/// Organizational data must be removed.
	WipeSignal,
	/// Any kind this bridge does not know about.
	Other,
}
impl NotificationKind {
	const KNOWN: [Self; 4] =
		[Self::EnrollmentResult, Self::ComplianceStatus, Self::WipeSignal, Self::Other];

	/// Every kind, in registration order.
	pub const fn known() -> &'static [Self] {
		&Self::KNOWN
	}

	/// Returns the stable kebab-case label.
	pub const fn as_str(self) -> &'static str {
		match self {
			NotificationKind::EnrollmentResult => "enrollment-result",
			NotificationKind::ComplianceStatus => "compliance-status",
			NotificationKind::WipeSignal => "wipe-signal",
			NotificationKind::Other => "other",
		}
	}

	/// Maps an engine-supplied kind name onto a kind; unknown names become [`Self::Other`].
	///
	/// Matching ignores case and treats `_` like `-`, so `WIPE_USER_DATA` is a wipe signal.
	pub fn from_name(name: &str) -> Self {
		let normalized = name.trim().to_ascii_lowercase().replace('_', "-");

		match normalized.as_str() {
			"enrollment-result" | "mam-enrollment-result" => NotificationKind::EnrollmentResult,
			"compliance-status" => NotificationKind::ComplianceStatus,
			"wipe-signal" | "wipe-user-data" => NotificationKind::WipeSignal,
			_ => NotificationKind::Other,
		}
	}
}
impl Display for NotificationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for NotificationKind {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::from_name(s))
	}
}
impl Serialize for NotificationKind {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(self.as_str())
	}
}
impl<'de> Deserialize<'de> for NotificationKind {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(|name| Self::from_name(&name))
	}
}

/// Event delivered by the policy engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
	/// Kind used for routing.
	pub kind: NotificationKind,
	/// Engine-defined payload.
	#[serde(default)]
	pub payload: serde_json::Value,
	/// Whether the engine waits for an acknowledgement.
	#[serde(default = "requires_ack_default")]
	pub requires_ack: bool,
	/// Engine-assigned id that stays the same across redeliveries, when the engine has one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub delivery_id: Option<String>,
}
impl NotificationEvent {
	/// Creates an event that requires acknowledgement.
	pub fn new(kind: NotificationKind, payload: serde_json::Value) -> Self {
		Self { kind, payload, requires_ack: true, delivery_id: None }
	}

	/// Attaches the engine's delivery id.
	pub fn with_delivery_id(mut self, id: impl Into<String>) -> Self {
		self.delivery_id = Some(id.into());

		self
	}

	/// Key the ledger tracks this delivery under.
	///
	/// A non-blank delivery id wins; otherwise the content fingerprint is used.
	pub fn delivery_key(&self) -> DeliveryKey {
		match self.delivery_id.as_deref().map(str::trim) {
			Some(id) if !id.is_empty() => DeliveryKey::Id(id.to_owned()),
			_ => DeliveryKey::Content(self.fingerprint()),
		}
	}

	/// SHA-256 over the kind and the canonical JSON payload.
	///
	/// Object keys serialize in sorted order, so logically equal payloads share a fingerprint.
	pub fn fingerprint(&self) -> String {
		let mut hasher = Sha256::new();

		hasher.update(self.kind.as_str().as_bytes());
		hasher.update([0]);
		hasher.update(self.payload.to_string().as_bytes());

		STANDARD_NO_PAD.encode(hasher.finalize())
	}
}

fn requires_ack_default() -> bool {
	true
}

/// Failure raised by a notification handler.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Notification handler failed: {message}.")]
pub struct HandlerError {
	/// Handler-supplied description.
	pub message: String,
}
impl HandlerError {
	/// Creates a handler error.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}
}

/// Why a delivery was not acknowledged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AckFailure {
	/// The handler returned an error or panicked.
	Handler(HandlerError),
	/// The same event is still being handled on another thread.
	InFlight,
}
impl Display for AckFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			AckFailure::Handler(err) => write!(f, "handler-error: {}", err.message),
			AckFailure::InFlight => f.write_str("in-flight"),
		}
	}
}

/// Acknowledgement returned to the policy engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AckOutcome {
	/// The event is delivered; do not redeliver.
	Handled,
	/// Redeliver later.
	Failed(AckFailure),
}
impl AckOutcome {
	/// Returns true for [`AckOutcome::Handled`].
	pub fn is_handled(&self) -> bool {
		matches!(self, Self::Handled)
	}
}

/// Application logic run for one notification kind.
///
/// Handlers may be invoked again for an event whose earlier delivery failed, so any side
/// effect completed before returning an error must be safe to repeat.
pub trait NotificationHandler
where
	Self: Send + Sync,
{
	/// Handles one event.
	fn handle(&self, event: &NotificationEvent) -> Result<(), HandlerError>;
}
impl<F> NotificationHandler for F
where
	F: Send + Sync + Fn(&NotificationEvent) -> Result<(), HandlerError>,
{
	fn handle(&self, event: &NotificationEvent) -> Result<(), HandlerError> {
		self(event)
	}
}

/// Routes events to per-kind handlers and acknowledges them exactly once per distinct event.
pub struct NotificationDispatcher {
	handlers: RwLock<HashMap<NotificationKind, Arc<dyn NotificationHandler>>>,
	ledger: DeliveryLedger,
}
impl NotificationDispatcher {
	/// Creates a dispatcher without handlers.
	pub fn new(ledger_capacity: usize) -> Self {
		Self { handlers: RwLock::new(HashMap::new()), ledger: DeliveryLedger::new(ledger_capacity) }
	}

	/// Creates a dispatcher whose handlers log and acknowledge every known kind.
	///
	/// Wipe signals are only logged; removing organizational data is the application's job and
	/// belongs in a handler installed with [`register`](Self::register).
	pub fn with_default_handlers(ledger_capacity: usize) -> Self {
		let dispatcher = Self::new(ledger_capacity);

		dispatcher.register(NotificationKind::WipeSignal, Arc::new(log_wipe_signal));
		dispatcher.register(NotificationKind::ComplianceStatus, Arc::new(log_compliance_status));
		dispatcher.register(NotificationKind::EnrollmentResult, Arc::new(log_enrollment_result));

		dispatcher
	}

	/// Creates a dispatcher with default handlers sized from configuration.
	pub fn from_config(config: &BridgeConfig) -> Self {
		Self::with_default_handlers(config.ledger_capacity)
	}

	/// Installs `handler` for `kind`, returning the handler it replaced.
	pub fn register(
		&self,
		kind: NotificationKind,
		handler: Arc<dyn NotificationHandler>,
	) -> Option<Arc<dyn NotificationHandler>> {
		self.handlers.write().insert(kind, handler)
	}

	/// Removes the handler for `kind`.
	pub fn unregister(&self, kind: NotificationKind) -> Option<Arc<dyn NotificationHandler>> {
		self.handlers.write().remove(&kind)
	}

	/// Ledger of handled deliveries.
	pub fn ledger(&self) -> &DeliveryLedger {
		&self.ledger
	}

	/// Handles one delivery and returns the acknowledgement for the engine.
	///
	/// Kinds without a handler are acknowledged as handled. This never panics.
	pub fn dispatch(&self, event: &NotificationEvent) -> AckOutcome {
		let flow = FlowSpan::begin(FlowKind::Notification, "dispatch");
		let outcome = {
			let _entered = flow.enter();

			self.dispatch_inner(event)
		};

		flow.finish(outcome.is_handled());

		outcome
	}

	fn dispatch_inner(&self, event: &NotificationEvent) -> AckOutcome {
		let handler = self.handlers.read().get(&event.kind).cloned();
		let Some(handler) = handler else {
			tracing::debug!(kind = %event.kind, "no handler registered; acknowledging");

			return AckOutcome::Handled;
		};
		let key = event.delivery_key();
		let claim = match self.ledger.begin(&key) {
			Admission::Fresh(claim) => claim,
			Admission::Duplicate { handled_at } => {
				tracing::debug!(kind = %event.kind, %key, %handled_at, "duplicate delivery skipped");

				return AckOutcome::Handled;
			},
			Admission::InFlight => {
				tracing::warn!(kind = %event.kind, "delivery already in flight; asking for redelivery");

				return AckOutcome::Failed(AckFailure::InFlight);
			},
		};
		let result = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event)))
			.unwrap_or_else(|payload| Err(HandlerError::new(panic_message(payload.as_ref()))));

		match result {
			Ok(()) => {
				claim.complete();

				AckOutcome::Handled
			},
			Err(err) => {
				tracing::error!(kind = %event.kind, error = %err, "notification handler failed");

				AckOutcome::Failed(AckFailure::Handler(err))
			},
		}
	}
}
impl NotificationReceiver for NotificationDispatcher {
	fn on_receive(&self, event: NotificationEvent) -> bool {
		self.dispatch(&event).is_handled()
	}
}
impl Debug for NotificationDispatcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut kinds = self.handlers.read().keys().map(|kind| kind.as_str()).collect::<Vec<_>>();

		kinds.sort_unstable();

		f.debug_struct("NotificationDispatcher")
			.field("handlers", &kinds)
			.field("ledger", &self.ledger)
			.finish()
	}
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		format!("handler panicked: {message}")
	} else if let Some(message) = payload.downcast_ref::<String>() {
		format!("handler panicked: {message}")
	} else {
		"handler panicked".into()
	}
}

fn log_wipe_signal(event: &NotificationEvent) -> Result<(), HandlerError> {
	tracing::info!(payload = %event.payload, "selective wipe signal received");

	Ok(())
}

fn log_compliance_status(event: &NotificationEvent) -> Result<(), HandlerError> {
	tracing::info!(payload = %event.payload, "compliance status notification received");

	Ok(())
}

fn log_enrollment_result(event: &NotificationEvent) -> Result<(), HandlerError> {
	tracing::info!(payload = %event.payload, "enrollment result notification received");

	Ok(())
}
