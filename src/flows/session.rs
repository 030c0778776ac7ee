//! User-initiated sign-in and sign-out, each paired with the matching enrollment call.

// crates.io
use tokio::task::JoinHandle;
// self
use crate::{
	_prelude::*,
	auth::{AccountRecord, TokenOutcome},
	flows::{Bridge, EnrollmentDirection, EnrollmentReport, EnrollmentRequest},
	identity::{ClientRef, InteractiveContext},
	obs::{FlowKind, FlowSpan},
};

/// Result of [`Bridge::sign_in`].
#[derive(Debug)]
pub struct SignInReport {
	/// Interactive sign-in outcome; `Denied(Cancelled)` when the user dismissed the flow.
	pub outcome: TokenOutcome,
	/// Account signed in afterwards, fetched fresh from the client.
	pub account: Option<AccountRecord>,
	/// Registration result; absent when sign-in did not produce a token.
	pub enrollment: Option<Result<EnrollmentReport>>,
}
impl SignInReport {
	/// Returns true when the user is signed in and registered.
	pub fn is_complete(&self) -> bool {
		self.outcome.is_granted() && matches!(self.enrollment, Some(Ok(_)))
	}
}

/// Result of [`Bridge::sign_out`].
///
/// The two steps are independent: an unregistration failure does not prevent sign-out, and
/// both results are reported.
#[derive(Debug)]
pub struct SignOutReport {
	/// Unregistration result; absent when no account was signed in.
	pub unenrollment: Option<Result<EnrollmentReport>>,
	/// Sign-out result.
	pub sign_out: Result<()>,
}
impl SignOutReport {
	/// Returns true when both steps that ran succeeded.
	pub fn is_clean(&self) -> bool {
		self.sign_out.is_ok() && !matches!(self.unenrollment, Some(Err(_)))
	}
}

impl Bridge {
	/// Signs the user in interactively, then registers the resulting account.
	///
	/// Only failures to obtain the client or read the account are returned as errors; the
	/// sign-in and registration outcomes are reported in the [`SignInReport`].
	pub async fn sign_in(&self, context: InteractiveContext) -> Result<SignInReport> {
		let flow = FlowSpan::begin(FlowKind::SignIn, "sign_in");
		let result = flow.instrument(self.run_sign_in(context)).await;

		flow.finish(matches!(&result, Ok(report) if report.is_complete()));

		result
	}

	/// Runs [`sign_in`](Self::sign_in) as a task on the bridge runtime.
	pub fn spawn_sign_in(&self, context: InteractiveContext) -> JoinHandle<Result<SignInReport>> {
		let bridge = self.clone();

		self.runtime.spawn(async move { bridge.sign_in(context).await })
	}

	/// Unregisters the signed-in account, then signs out.
	///
	/// Both steps always run. Only a failure to obtain the client is returned as an error.
	pub async fn sign_out(&self) -> Result<SignOutReport> {
		let flow = FlowSpan::begin(FlowKind::SignOut, "sign_out");
		let result = flow.instrument(self.run_sign_out()).await;

		flow.finish(matches!(&result, Ok(report) if report.is_clean()));

		result
	}

	/// Runs [`sign_out`](Self::sign_out) as a task on the bridge runtime.
	pub fn spawn_sign_out(&self) -> JoinHandle<Result<SignOutReport>> {
		let bridge = self.clone();

		self.runtime.spawn(async move { bridge.sign_out().await })
	}

	async fn run_sign_in(&self, context: InteractiveContext) -> Result<SignInReport> {
		let client = self.client().await?;
		let outcome = self
			.identity
			.sign_in_interactive(&client, &context, &self.config.sign_in_scopes)
			.await;

		if !outcome.is_granted() {
			return Ok(SignInReport { outcome, account: None, enrollment: None });
		}

		let account = self.identity.current_account(&client).await?;
		let enrollment = match &account {
			Some(account) => {
				let request = EnrollmentRequest::for_account(
					account,
					&self.config,
					EnrollmentDirection::Register,
				);

				self.enroll_in_background(request).await
			},
			None => {
				tracing::warn!("sign-in completed but the client reports no account");

				Err(Error::NoActiveAccount)
			},
		};
		Ok(SignInReport { outcome, account, enrollment: Some(enrollment) })
	}

	async fn run_sign_out(&self) -> Result<SignOutReport> {
		let client = self.client().await?;
		let unenrollment = match self.identity.current_account(&client).await {
			Ok(Some(account)) => {
				let request = EnrollmentRequest::for_account(
					&account,
					&self.config,
					EnrollmentDirection::Unregister,
				);

				Some(self.enroll_in_background(request).await)
			},
			Ok(None) => None,
			Err(e) => Some(Err(e)),
		};

		if let Some(Err(e)) = &unenrollment {
			tracing::warn!(error = %e, "unregistration failed; signing out anyway");
		}

		let sign_out = self.identity.sign_out(&client).await;

		if let Err(e) = &sign_out {
			tracing::error!(error = %e, "sign-out failed");
		}

		Ok(SignOutReport { unenrollment, sign_out })
	}

	async fn client(&self) -> Result<ClientRef> {
		if let Some(client) = self.identity.current() {
			return Ok(client);
		}

		let identity = self.identity.clone();

		self.runtime.spawn_blocking(move || identity.get_or_create()).await?
	}

	async fn enroll_in_background(&self, request: EnrollmentRequest) -> Result<EnrollmentReport> {
		self.spawn_enroll(request).await?
	}
}
