// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token requests served to the policy engine.
#[derive(Debug, Default)]
pub struct TokenMetrics {
	attempts: AtomicU64,
	granted: AtomicU64,
	denied: AtomicU64,
}
impl TokenMetrics {
	/// Returns the total number of token requests.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of requests answered with a token.
	pub fn granted(&self) -> u64 {
		self.granted.load(Ordering::Relaxed)
	}

	/// Returns the number of requests answered with a denial.
	pub fn denied(&self) -> u64 {
		self.denied.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_granted(&self) {
		self.granted.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_denied(&self) {
		self.denied.fetch_add(1, Ordering::Relaxed);
	}
}
