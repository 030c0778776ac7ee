//! Ordered call-shape candidates and the cache that remembers which one the engine accepts.
//!
//! Each logical operation has a fixed, richest-first list of [`Variant`]s. The first variant
//! the engine accepts is stored under the operation's [`OperationKey`] and reused for the rest
//! of the process; other variants are probed again only after [`MethodCache::invalidate`],
//! [`MethodCache::reset`], or when the cached variant itself reports
//! [`EngineCallError::UnsupportedShape`]. Candidate order is fixed, so threads racing to fill
//! the same key always store the same index.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	engine::{EngineCallError, EngineResult, PolicyEngine},
};

/// Logical policy-engine operation whose call shape is resolved at runtime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OperationKey(&'static str);
impl OperationKey {
	/// Account registration.
	pub const REGISTER_ACCOUNT: Self = Self("register_account");
	/// Token callback registration.
	pub const REGISTER_AUTHENTICATION_CALLBACK: Self = Self("register_authentication_callback");
	/// Notification receiver registration.
	pub const REGISTER_NOTIFICATION_RECEIVER: Self = Self("register_notification_receiver");
	/// Account unregistration.
	pub const UNREGISTER_ACCOUNT: Self = Self("unregister_account");

	/// Creates a key for a custom operation.
	pub const fn new(name: &'static str) -> Self {
		Self(name)
	}

	/// Returns the operation name.
	pub const fn as_str(self) -> &'static str {
		self.0
	}
}
impl Debug for OperationKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "OperationKey({})", self.0)
	}
}
impl Display for OperationKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.0)
	}
}

/// One strongly typed call shape of a logical operation.
pub struct Variant<A, T = ()> {
	/// Human-readable signature used in attempt logs.
	pub shape: &'static str,
	/// Invokes this shape on the engine.
	pub call: fn(&dyn PolicyEngine, &A) -> EngineResult<T>,
}
impl<A, T> Variant<A, T> {
	/// Creates a new variant.
	pub const fn new(
		shape: &'static str,
		call: fn(&dyn PolicyEngine, &A) -> EngineResult<T>,
	) -> Self {
		Self { shape, call }
	}
}
impl<A, T> Clone for Variant<A, T> {
	fn clone(&self) -> Self {
		*self
	}
}
impl<A, T> Copy for Variant<A, T> {}
impl<A, T> Debug for Variant<A, T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Variant").field(&self.shape).finish()
	}
}

/// Outcome of calling one variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptOutcome {
	/// The engine accepted and completed the call.
	Success,
	/// The engine does not expose this shape.
	ShapeUnsupported,
	/// The engine accepted the shape but refused the request.
	Rejected {
		/// Engine-supplied reason.
		reason: String,
	},
}

/// Entry in an ordered attempt log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VariantAttempt {
	/// Shape that was tried.
	pub shape: &'static str,
	/// What the engine answered.
	pub outcome: AttemptOutcome,
}
impl VariantAttempt {
	/// Creates a log entry.
	pub fn new(shape: &'static str, outcome: AttemptOutcome) -> Self {
		Self { shape, outcome }
	}
}

/// Every candidate for an operation is unsupported by the installed engine.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("No call shape of `{operation}` is available on the installed policy engine.")]
pub struct NoVariantAvailable {
	/// Operation that could not be resolved.
	pub operation: OperationKey,
}

/// Why [`MethodCache::invoke`] produced no value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvocationFailure {
	/// No candidate shape is supported.
	Exhausted,
	/// A supported shape was refused by the engine.
	Rejected {
		/// Index of the refusing variant.
		index: usize,
		/// Engine-supplied reason.
		reason: String,
	},
}

/// Result of [`MethodCache::invoke`]: the value (with the variant index) plus the attempt log.
#[derive(Clone, Debug)]
pub struct Invocation<T> {
	/// Ordered log of every variant called during this invocation.
	pub attempts: Vec<VariantAttempt>,
	/// Index and value of the accepted variant, or the failure.
	pub outcome: Result<(usize, T), InvocationFailure>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum CacheEntry {
	Resolved(usize),
	// Attempt log of the invocation that exhausted the key.
	Exhausted(Vec<VariantAttempt>),
}

/// Process-wide memory of which variant each operation resolved to.
#[derive(Debug, Default)]
pub struct MethodCache {
	entries: RwLock<HashMap<OperationKey, CacheEntry>>,
	probes: AtomicU64,
}
impl MethodCache {
	/// Returns the index of the first candidate `probe` accepts, probing only on a cache miss.
	///
	/// `probe` is called with candidate indexes `0..candidates` in order until it returns
	/// `true`. When none is accepted the key is marked exhausted and fails fast until
	/// invalidated.
	pub fn resolve<F>(
		&self,
		key: OperationKey,
		candidates: usize,
		mut probe: F,
	) -> Result<usize, NoVariantAvailable>
	where
		F: FnMut(usize) -> bool,
	{
		match self.entry(key) {
			Some(CacheEntry::Resolved(index)) => return Ok(index),
			Some(CacheEntry::Exhausted(_)) => return Err(NoVariantAvailable { operation: key }),
			None => {},
		}

		for index in 0..candidates {
			self.probes.fetch_add(1, Ordering::Relaxed);

			if probe(index) {
				self.entries.write().insert(key, CacheEntry::Resolved(index));

				tracing::debug!(operation = %key, index, "call shape resolved");

				return Ok(index);
			}
		}

		self.entries.write().insert(key, CacheEntry::Exhausted(Vec::new()));

		tracing::warn!(operation = %key, candidates, "no call shape available");

		Err(NoVariantAvailable { operation: key })
	}

	/// Calls `variants` on `engine`, reusing the cached variant when there is one.
	///
	/// A cached variant that now reports an unsupported shape is dropped and the remaining
	/// candidates are probed in order within the same call. An exhausted key fails fast with
	/// the attempt log of the invocation that exhausted it.
	pub fn invoke<A, T>(
		&self,
		key: OperationKey,
		engine: &dyn PolicyEngine,
		variants: &[Variant<A, T>],
		args: &A,
	) -> Invocation<T> {
		let mut attempts = Vec::new();
		let mut skip = None;

		match self.entry(key) {
			Some(CacheEntry::Exhausted(log)) =>
				return Invocation { attempts: log, outcome: Err(InvocationFailure::Exhausted) },
			Some(CacheEntry::Resolved(index)) => match variants.get(index) {
				Some(variant) => match Self::call(variant, engine, args, &mut attempts) {
					Ok(value) => return Invocation { attempts, outcome: Ok((index, value)) },
					Err(EngineCallError::Rejected { reason }) =>
						return Invocation {
							attempts,
							outcome: Err(InvocationFailure::Rejected { index, reason }),
						},
					Err(EngineCallError::UnsupportedShape) => {
						tracing::warn!(
							operation = %key,
							shape = variant.shape,
							"cached call shape stopped working"
						);

						self.invalidate(key);

						skip = Some(index);
					},
				},
				None => {
					self.invalidate(key);
				},
			},
			None => {},
		}

		let mut settled = None;
		let resolved = self.resolve(key, variants.len(), |index| {
			if skip == Some(index) {
				return false;
			}

			match Self::call(&variants[index], engine, args, &mut attempts) {
				Err(EngineCallError::UnsupportedShape) => false,
				result => {
					settled = Some((index, result));

					true
				},
			}
		});
		let outcome = match (resolved, settled) {
			(Err(_), _) => {
				if attempts.is_empty() {
					if let Some(CacheEntry::Exhausted(log)) = self.entry(key) {
						attempts = log;
					}
				} else {
					self.entries.write().insert(key, CacheEntry::Exhausted(attempts.clone()));
				}

				Err(InvocationFailure::Exhausted)
			},
			(Ok(_), Some((index, Ok(value)))) => Ok((index, value)),
			(Ok(_), Some((index, Err(EngineCallError::Rejected { reason })))) =>
				Err(InvocationFailure::Rejected { index, reason }),
			(Ok(_), Some((_, Err(EngineCallError::UnsupportedShape)))) =>
				Err(InvocationFailure::Exhausted),
			// Another thread filled the key while this one was reading it.
			(Ok(index), None) => match variants.get(index) {
				Some(variant) => match Self::call(variant, engine, args, &mut attempts) {
					Ok(value) => Ok((index, value)),
					Err(EngineCallError::Rejected { reason }) =>
						Err(InvocationFailure::Rejected { index, reason }),
					Err(EngineCallError::UnsupportedShape) => {
						self.invalidate(key);

						Err(InvocationFailure::Exhausted)
					},
				},
				None => Err(InvocationFailure::Exhausted),
			},
		};

		Invocation { attempts, outcome }
	}

	/// Returns the cached variant index for `key`, if resolved.
	pub fn cached(&self, key: OperationKey) -> Option<usize> {
		match self.entry(key) {
			Some(CacheEntry::Resolved(index)) => Some(index),
			_ => None,
		}
	}

	/// Returns true when every candidate for `key` was found unsupported.
	pub fn is_exhausted(&self, key: OperationKey) -> bool {
		matches!(self.entries.read().get(&key), Some(CacheEntry::Exhausted(_)))
	}

	/// Forgets the resolution for `key`; returns true if there was one.
	pub fn invalidate(&self, key: OperationKey) -> bool {
		self.entries.write().remove(&key).is_some()
	}

	/// Forgets every resolution, e.g. after the engine capability changed.
	pub fn reset(&self) {
		self.entries.write().clear();
	}

	/// Total number of candidate probes performed so far.
	pub fn probe_count(&self) -> u64 {
		self.probes.load(Ordering::Relaxed)
	}

	fn entry(&self, key: OperationKey) -> Option<CacheEntry> {
		self.entries.read().get(&key).cloned()
	}

	fn call<A, T>(
		variant: &Variant<A, T>,
		engine: &dyn PolicyEngine,
		args: &A,
		attempts: &mut Vec<VariantAttempt>,
	) -> EngineResult<T> {
		let result = (variant.call)(engine, args);
		let outcome = match &result {
			Ok(_) => AttemptOutcome::Success,
			Err(EngineCallError::UnsupportedShape) => AttemptOutcome::ShapeUnsupported,
			Err(EngineCallError::Rejected { reason }) =>
				AttemptOutcome::Rejected { reason: reason.clone() },
		};

		tracing::debug!(shape = variant.shape, outcome = ?outcome, "policy engine call attempted");

		attempts.push(VariantAttempt::new(variant.shape, outcome));

		result
	}
}
