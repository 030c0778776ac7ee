//! One-time construction of the identity client shared by every bridge component.

// std
use std::panic::{self, AssertUnwindSafe};
// self
use crate::{
	_prelude::*,
	auth::{AccountRecord, TokenOutcome},
	config::BridgeConfig,
	error::ProviderError,
	identity::{ClientRef, IdentityClientFactory, InteractiveContext, InteractiveOutcome},
};

/// Observable lifecycle of an [`IdentityClientHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleState {
	/// No construction has succeeded and none is running.
	Uninitialized,
	/// A caller is constructing the client; other callers wait for it.
	Initializing,
	/// The client exists and lives for the rest of the process.
	Ready,
}

#[derive(Debug, Default)]
struct InitState {
	constructing: bool,
	generation: u64,
	last_failure: Option<(u64, ProviderError)>,
}

/// Owns the single identity client instance.
///
/// Construct one handle at startup and share it by reference. The first
/// [`get_or_create`](Self::get_or_create) caller builds the client while concurrent callers
/// block; every caller observes the same [`ClientRef`]. A failed construction is reported to
/// that caller and to everyone who was waiting on it, and is not remembered: the next call
/// tries again.
pub struct IdentityClientHandle {
	config: Arc<BridgeConfig>,
	factory: Arc<dyn IdentityClientFactory>,
	client: OnceLock<ClientRef>,
	init: Mutex<InitState>,
	settled: Condvar,
}
impl IdentityClientHandle {
	/// Creates an uninitialized handle.
	pub fn new(config: Arc<BridgeConfig>, factory: Arc<dyn IdentityClientFactory>) -> Self {
		Self {
			config,
			factory,
			client: OnceLock::new(),
			init: Mutex::new(InitState::default()),
			settled: Condvar::new(),
		}
	}

	/// Returns the client, constructing it on first use.
	pub fn get_or_create(&self) -> Result<ClientRef> {
		if let Some(client) = self.current() {
			return Ok(client);
		}

		let mut state = self.init.lock();

		loop {
			if let Some(client) = self.client.get() {
				return Ok(client.clone());
			}
			if !state.constructing {
				break;
			}

			let awaited = state.generation;

			self.settled.wait(&mut state);

			let awaited_failure = state
				.last_failure
				.as_ref()
				.filter(|(generation, _)| *generation == awaited && self.client.get().is_none());

			if let Some((_, failure)) = awaited_failure {
				return Err(Error::ClientUnavailable { reason: failure.to_string() });
			}
		}

		state.constructing = true;
		state.generation += 1;

		let generation = state.generation;

		drop(state);

		let created =
			panic::catch_unwind(AssertUnwindSafe(|| self.factory.create(&self.config)))
				.unwrap_or_else(|_| {
					Err(ProviderError::Construction { message: "client factory panicked".into() })
				});
		let mut state = self.init.lock();

		state.constructing = false;

		let result = match created {
			Ok(client) => {
				state.last_failure = None;

				tracing::info!(generation, "identity client constructed");

				Ok(self.client.get_or_init(|| client).clone())
			},
			Err(failure) => {
				tracing::error!(generation, error = %failure, "identity client construction failed");

				let reason = failure.to_string();

				state.last_failure = Some((generation, failure));

				Err(Error::ClientUnavailable { reason })
			},
		};

		drop(state);
		self.settled.notify_all();

		result
	}

	/// Returns the client if it has already been constructed; never blocks.
	pub fn current(&self) -> Option<ClientRef> {
		self.client.get().cloned()
	}

	/// Reports the construction lifecycle.
	pub fn state(&self) -> HandleState {
		if self.client.get().is_some() {
			return HandleState::Ready;
		}
		if self.init.lock().constructing {
			HandleState::Initializing
		} else {
			HandleState::Uninitialized
		}
	}

	/// Configuration the client was (or will be) built from.
	pub fn config(&self) -> &BridgeConfig {
		&self.config
	}

	/// Loads the account currently signed in to `client`.
	pub async fn current_account(&self, client: &ClientRef) -> Result<Option<AccountRecord>> {
		Ok(client.current_account().await?)
	}

	/// Runs interactive sign-in; a dismissed flow yields `Denied(Cancelled)`.
	pub async fn sign_in_interactive(
		&self,
		client: &ClientRef,
		context: &InteractiveContext,
		scopes: &[String],
	) -> TokenOutcome {
		let result = match client.sign_in_interactive(context, scopes).await {
			Ok(InteractiveOutcome::Completed(token)) if token.is_blank() =>
				Err(ProviderError::EmptyToken.into()),
			Ok(InteractiveOutcome::Completed(token)) => Ok(token),
			Ok(InteractiveOutcome::Cancelled) => {
				tracing::warn!("interactive sign-in cancelled by the user");

				Err(Error::Cancelled)
			},
			Err(failure) => {
				tracing::error!(error = %failure, "interactive sign-in failed");

				Err(failure.into())
			},
		};

		TokenOutcome::from(result)
	}

	/// Signs the current account out of `client`.
	pub async fn sign_out(&self, client: &ClientRef) -> Result<()> {
		Ok(client.sign_out().await?)
	}
}
impl Debug for IdentityClientHandle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdentityClientHandle")
			.field("tenant_id", &self.config.tenant_id)
			.field("state", &self.state())
			.finish()
	}
}
