//! Bridge-level error types shared across flows, the identity handle, and the engine adapter.

// self
use crate::{
	_prelude::*,
	engine::{OperationKey, VariantAttempt},
	flows::EnrollmentDirection,
};

/// Bridge-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical bridge error exposed by public APIs.
///
/// Token and notification flows never let these cross into the policy engine; they are
/// converted into [`TokenOutcome`](crate::auth::TokenOutcome) and
/// [`AckOutcome`](crate::notify::AckOutcome) at that boundary.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity-provider failure (network, token service, timeout).
	#[error(transparent)]
	Provider(#[from] ProviderError),

	/// Identity client is not constructed yet or its construction failed.
	#[error("Identity client is unavailable: {reason}.")]
	ClientUnavailable {
		/// Why the client could not be produced.
		reason: String,
	},
	/// No account is signed in; interactive sign-in is required.
	#[error("No account is signed in.")]
	NoActiveAccount,
	/// The signed-in account does not match the requested identity.
	#[error("Signed-in account does not match the requested identity.")]
	AccountMismatch,
	/// The token request did not name a protected resource.
	#[error("Token request is missing a resource identifier.")]
	ResourceMissing,
	/// The user dismissed an interactive flow.
	#[error("Interactive sign-in was cancelled.")]
	Cancelled,
	/// Every known call shape for an engine operation is unsupported.
	#[error("No supported call shape for `{operation}` after {} attempts.", .attempts.len())]
	AllVariantsExhausted {
		/// Operation that could not be resolved.
		operation: OperationKey,
		/// Ordered attempt log for diagnosis.
		attempts: Vec<VariantAttempt>,
	},
	/// The engine accepted the call shape but refused the request.
	#[error("Policy engine rejected {direction} via `{shape}`: {reason}.")]
	EnrollmentRejected {
		/// Enrollment direction that failed.
		direction: EnrollmentDirection,
		/// Call shape that produced the rejection.
		shape: &'static str,
		/// Engine-supplied reason string.
		reason: String,
		/// Ordered attempt log for diagnosis.
		attempts: Vec<VariantAttempt>,
	},
	/// The engine accepted a capability registration shape but refused the registration.
	#[error("Policy engine rejected `{operation}` via `{shape}`: {reason}.")]
	RegistrationRejected {
		/// Registration operation that failed.
		operation: OperationKey,
		/// Call shape that produced the rejection.
		shape: &'static str,
		/// Engine-supplied reason string.
		reason: String,
		/// Ordered attempt log for diagnosis.
		attempts: Vec<VariantAttempt>,
	},
	/// A background worker task failed before producing a result.
	#[error("Background worker failed: {message}.")]
	Worker {
		/// Join failure summary.
		message: String,
	},
}
impl Error {
	/// Returns the attempt log carried by enrollment and resolution failures.
	pub fn attempts(&self) -> &[VariantAttempt] {
		match self {
			Self::AllVariantsExhausted { attempts, .. }
			| Self::EnrollmentRejected { attempts, .. }
			| Self::RegistrationRejected { attempts, .. } => attempts,
			_ => &[],
		}
	}
}
impl From<tokio::task::JoinError> for Error {
	fn from(e: tokio::task::JoinError) -> Self {
		Self::Worker { message: e.to_string() }
	}
}

/// Configuration and validation failures raised while building a [`BridgeConfig`].
///
/// [`BridgeConfig`]: crate::config::BridgeConfig
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Tenant authority could not be parsed.
	#[error("Tenant authority is not a valid URL.")]
	InvalidAuthority {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Tenant authority must use HTTPS.
	#[error("Tenant authority must use HTTPS: {url}.")]
	InsecureAuthority {
		/// Authority that failed validation.
		url: String,
	},
	/// At least one interactive sign-in scope is required.
	#[error("At least one sign-in scope is required.")]
	NoSignInScopes,
	/// Blank sign-in scope entries are rejected.
	#[error("Sign-in scopes cannot contain blank entries.")]
	BlankSignInScope,
	/// Silent token timeout must be positive.
	#[error("The silent token timeout must be greater than zero.")]
	ZeroTimeout,
	/// Notification ledger must retain at least one entry.
	#[error("The notification ledger capacity must be greater than zero.")]
	ZeroLedgerCapacity,
	/// JSON configuration could not be parsed.
	#[error("Configuration JSON is invalid at `{}`.", .source.path())]
	Parse {
		/// Path-aware parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Identity-provider failures surfaced by an [`IdentityClient`].
///
/// [`IdentityClient`]: crate::identity::IdentityClient
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProviderError {
	/// The provider client could not be constructed.
	#[error("Identity client construction failed: {message}.")]
	Construction {
		/// Provider-supplied message.
		message: String,
	},
	/// Silent acquisition is impossible without user interaction.
	#[error("User interaction is required: {message}.")]
	UiRequired {
		/// Provider-supplied message.
		message: String,
	},
	/// Token service returned an error.
	#[error("Token service error `{code}`: {message}.")]
	Service {
		/// Provider error code.
		code: String,
		/// Provider-supplied message.
		message: String,
	},
	/// Network round trip failed.
	#[error("Network failure while contacting the identity provider: {message}.")]
	Network {
		/// Transport-supplied message.
		message: String,
	},
	/// Provider returned an empty access token.
	#[error("Identity provider returned an empty access token.")]
	EmptyToken,
	/// The provider did not answer before the deadline.
	#[error("Identity provider did not respond within {timeout:?}.")]
	Timeout {
		/// Deadline that elapsed.
		timeout: StdDuration,
	},
	/// The background task driving the provider call went away.
	#[error("Identity provider call was interrupted before completing.")]
	Interrupted,
}
