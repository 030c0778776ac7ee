//! Synchronous token callback invoked by the policy engine.

mod metrics;

pub use metrics::*;

// std
use std::sync::mpsc::{self, RecvTimeoutError};
// crates.io
use tokio::runtime::{Handle, RuntimeFlavor};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenOutcome, TokenRequest},
	authority,
	engine::AuthenticationCallback,
	error::ProviderError,
	identity::IdentityClientHandle,
	obs::{self, FlowKind, FlowSpan},
};

/// Answers token requests from the policy engine with a token or a typed denial.
///
/// [`acquire_token`](Self::acquire_token) blocks the calling thread until the identity provider
/// answers or the configured deadline passes. The provider future runs on the bridge runtime,
/// so call it from a thread that runtime does not drive (the engine's own threads, or
/// [`tokio::task::spawn_blocking`]). Called from inside a current-thread runtime it logs a
/// warning, since the provider future cannot progress there and the call waits out the full
/// deadline. Only silent acquisition is used; this path never prompts.
#[derive(Debug)]
pub struct TokenBridge {
	identity: Arc<IdentityClientHandle>,
	runtime: Handle,
	timeout: StdDuration,
	metrics: TokenMetrics,
}
impl TokenBridge {
	/// Creates a token bridge using the handle's configured deadline.
	pub fn new(identity: Arc<IdentityClientHandle>, runtime: Handle) -> Self {
		let timeout = identity.config().silent_token_timeout;

		Self { identity, runtime, timeout, metrics: Default::default() }
	}

	/// Overrides the deadline applied to each request.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Deadline applied to each request.
	pub fn timeout(&self) -> StdDuration {
		self.timeout
	}

	/// Counters for requests served so far.
	pub fn metrics(&self) -> &TokenMetrics {
		&self.metrics
	}

	/// Resolves a token request to a definitive outcome; never panics or returns an error.
	pub fn acquire_token(&self, request: &TokenRequest) -> TokenOutcome {
		let flow = FlowSpan::begin(FlowKind::TokenAcquisition, "acquire_token");
		let _entered = flow.enter();

		let blocks_runtime = Handle::try_current()
			.is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::CurrentThread);

		if blocks_runtime {
			tracing::warn!(
				timeout = ?self.timeout,
				"token callback blocks a current-thread runtime; the provider may not answer before the deadline"
			);
		}

		self.metrics.record_attempt();

		let outcome = TokenOutcome::from(self.try_acquire(request));

		match &outcome {
			TokenOutcome::Granted(token) => {
				self.metrics.record_granted();
				tracing::debug!(
					resource = %request.resource_id,
					token = %token.fingerprint(),
					"token granted"
				);
			},
			TokenOutcome::Denied(reason) => {
				let reason = *reason;

				self.metrics.record_denied();
				obs::record_token_denial(reason);
				tracing::info!(resource = %request.resource_id, %reason, "token denied");
			},
		}

		flow.finish(outcome.is_granted());

		outcome
	}

	fn try_acquire(&self, request: &TokenRequest) -> Result<AccessToken> {
		let deadline = Instant::now() + self.timeout;

		if request.resource_id.trim().is_empty() {
			return Err(Error::ResourceMissing);
		}

		let client = self.identity.current().ok_or_else(|| Error::ClientUnavailable {
			reason: "identity client has not been constructed".into(),
		})?;
		let account = {
			let client = client.clone();

			self.wait(async move { client.current_account().await }, deadline)?
				.ok_or(Error::NoActiveAccount)?
		};

		if !account.matches(&request.username, request.account_id.as_deref()) {
			tracing::warn!(
				integrity = true,
				tenant_hint = request.tenant_id_hint.as_deref(),
				"signed-in account does not match the requested identity"
			);

			return Err(Error::AccountMismatch);
		}

		let authority = authority::resolve_authority(
			account.authority_url.as_deref(),
			request.authority_hint.as_deref(),
			self.identity.config().tenant_authority.as_str(),
		)
		.to_owned();
		let scopes = request.scopes();

		tracing::debug!(%authority, ?scopes, "acquiring token silently");

		let token = self.wait(
			async move { client.acquire_token_silently(&account, &scopes, &authority).await },
			deadline,
		)?;

		if token.is_blank() {
			return Err(ProviderError::EmptyToken.into());
		}

		Ok(token)
	}

	fn wait<T, Fut>(&self, fut: Fut, deadline: Instant) -> Result<T, ProviderError>
	where
		T: 'static + Send,
		Fut: 'static + Send + Future<Output = Result<T, ProviderError>>,
	{
		let (tx, rx) = mpsc::sync_channel(1);
		let task = self.runtime.spawn(async move {
			let _ = tx.send(fut.await);
		});

		match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
			Ok(result) => result,
			Err(RecvTimeoutError::Timeout) => {
				task.abort();
				tracing::warn!(timeout = ?self.timeout, "identity provider missed the deadline");

				Err(ProviderError::Timeout { timeout: self.timeout })
			},
			Err(RecvTimeoutError::Disconnected) => Err(ProviderError::Interrupted),
		}
	}
}
impl AuthenticationCallback for TokenBridge {
	fn acquire_token_with_hints(
		&self,
		username: &str,
		account_id: &str,
		tenant_id: Option<&str>,
		authority: Option<&str>,
		resource_id: &str,
	) -> Option<String> {
		let request = TokenRequest::for_username(username, resource_id)
			.with_account_id(Some(account_id))
			.with_tenant_hint(tenant_id)
			.with_authority_hint(authority);

		self.acquire_token(&request).into_token().map(AccessToken::into_inner)
	}
}
