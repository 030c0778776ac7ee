//! In-flight claims and a bounded memory of handled delivery ids.
//!
//! Two deliveries with the same key never run their handlers at the same time. Only keys
//! carrying an engine-supplied delivery id are remembered after handling; identical content
//! arriving later is a new event and runs again.

// self
use crate::_prelude::*;

/// Identity of one delivery.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryKey {
	/// Engine-supplied delivery id; redeliveries of a handled id are skipped.
	Id(String),
	/// Content fingerprint; only guards against concurrent handling.
	Content(String),
}
impl DeliveryKey {
	/// Returns true when the key is remembered after the handler succeeds.
	pub fn is_durable(&self) -> bool {
		matches!(self, Self::Id(_))
	}
}
impl Display for DeliveryKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Id(id) => write!(f, "id:{id}"),
			Self::Content(fingerprint) => write!(f, "content:{fingerprint}"),
		}
	}
}

/// Result of [`DeliveryLedger::begin`].
#[derive(Debug)]
pub enum Admission<'a> {
	/// Nobody is handling this delivery; the caller owns it.
	Fresh(DeliveryClaim<'a>),
	/// The delivery id was already handled.
	Duplicate {
		/// When the handler completed.
		handled_at: OffsetDateTime,
	},
	/// Another thread is handling the same delivery right now.
	InFlight,
}

/// Exclusive claim on one in-flight delivery.
///
/// The claim is released on drop. [`complete`](Self::complete) additionally remembers a
/// durable key as handled.
#[derive(Debug)]
pub struct DeliveryClaim<'a> {
	ledger: &'a DeliveryLedger,
	key: Option<DeliveryKey>,
}
impl DeliveryClaim<'_> {
	/// Marks the delivery as handled.
	pub fn complete(mut self) {
		if let Some(key) = self.key.take() {
			self.ledger.finish(key);
		}
	}
}
impl Drop for DeliveryClaim<'_> {
	fn drop(&mut self) {
		if let Some(key) = self.key.take() {
			self.ledger.state.lock().in_flight.remove(&key);
		}
	}
}

#[derive(Debug, Default)]
struct LedgerState {
	in_flight: HashSet<DeliveryKey>,
	handled: HashMap<DeliveryKey, OffsetDateTime>,
	order: VecDeque<DeliveryKey>,
}

/// Tracks in-flight deliveries and the most recent `capacity` handled delivery ids.
#[derive(Debug)]
pub struct DeliveryLedger {
	capacity: usize,
	state: Mutex<LedgerState>,
}
impl DeliveryLedger {
	/// Creates a ledger; a zero capacity is raised to one.
	pub fn new(capacity: usize) -> Self {
		Self { capacity: capacity.max(1), state: Mutex::new(LedgerState::default()) }
	}

	/// Claims `key` unless its id was handled or the same delivery is in flight.
	pub fn begin(&self, key: &DeliveryKey) -> Admission<'_> {
		let mut state = self.state.lock();

		if let Some(handled_at) = state.handled.get(key) {
			return Admission::Duplicate { handled_at: *handled_at };
		}
		if !state.in_flight.insert(key.clone()) {
			return Admission::InFlight;
		}

		Admission::Fresh(DeliveryClaim { ledger: self, key: Some(key.clone()) })
	}

	/// Returns when `key` was handled, if it is still remembered.
	pub fn handled_at(&self, key: &DeliveryKey) -> Option<OffsetDateTime> {
		self.state.lock().handled.get(key).copied()
	}

	/// Number of remembered delivery ids.
	pub fn len(&self) -> usize {
		self.state.lock().handled.len()
	}

	/// Returns true when no delivery id is remembered.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Maximum number of remembered delivery ids.
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	fn finish(&self, key: DeliveryKey) {
		let mut state = self.state.lock();

		state.in_flight.remove(&key);

		if !key.is_durable() {
			return;
		}
		if state.handled.insert(key.clone(), OffsetDateTime::now_utc()).is_none() {
			state.order.push_back(key);
		}

		while state.order.len() > self.capacity {
			if let Some(evicted) = state.order.pop_front() {
				state.handled.remove(&evicted);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn id(value: &str) -> DeliveryKey {
		DeliveryKey::Id(value.into())
	}

	fn handle(ledger: &DeliveryLedger, key: &DeliveryKey) {
		match ledger.begin(key) {
			Admission::Fresh(claim) => claim.complete(),
			other => panic!("Unexpected admission: {other:?}."),
		}
	}

	#[test]
	fn dropped_claim_allows_a_retry() {
		let ledger = DeliveryLedger::new(4);

		match ledger.begin(&id("event-1")) {
			Admission::Fresh(claim) => {
				assert!(matches!(ledger.begin(&id("event-1")), Admission::InFlight));

				drop(claim);
			},
			other => panic!("Unexpected admission: {other:?}."),
		}

		handle(&ledger, &id("event-1"));

		assert!(matches!(ledger.begin(&id("event-1")), Admission::Duplicate { .. }));
		assert!(ledger.handled_at(&id("event-1")).is_some());
	}

	#[test]
	fn content_keys_are_released_after_handling() {
		let ledger = DeliveryLedger::new(4);
		let key = DeliveryKey::Content("fingerprint".into());

		handle(&ledger, &key);
		handle(&ledger, &key);

		assert!(ledger.is_empty());
		assert!(ledger.handled_at(&key).is_none());
	}

	#[test]
	fn oldest_ids_are_evicted_past_capacity() {
		let ledger = DeliveryLedger::new(2);

		for key in ["a", "b", "c"] {
			handle(&ledger, &id(key));
		}

		assert_eq!(ledger.len(), 2);
		assert!(ledger.handled_at(&id("a")).is_none());
		assert!(ledger.handled_at(&id("c")).is_some());
		assert_eq!(ledger.capacity(), 2);
		assert_eq!(id("a").to_string(), "id:a");
	}
}
