//! Tracing spans and counters shared by every bridge flow.
//!
//! A flow opens a [`FlowSpan`] on entry and finishes it with its result. The span is named
//! `credential_bridge.flow` and carries `flow`, `stage`, and `outcome` fields. With the
//! `metrics` feature the same events feed `credential_bridge_flow_total`, and refused token
//! requests feed `credential_bridge_token_denied_total`.

mod counter;
mod span;

pub use counter::*;
pub use span::*;

// self
use crate::_prelude::*;

macro_rules! labels {
	($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $label:literal,)+ }) => {
		$(#[$meta])*
		#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
		pub enum $name {
			$($(#[$vmeta])* $variant,)+
		}
		impl $name {
			/// Label used in span fields and metric labels.
			pub const fn as_str(self) -> &'static str {
				match self {
					$(Self::$variant => $label,)+
				}
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(self.as_str())
			}
		}
	};
}

labels! {
	/// Bridge flows that get their own span and counter series.
	FlowKind {
		/// Token callback invoked by the policy engine.
		TokenAcquisition => "token_acquisition",
		/// Account registration.
		Enrollment => "enrollment",
		/// Account unregistration.
		Unenrollment => "unenrollment",
		/// Interactive sign-in and the registration that follows it.
		SignIn => "sign_in",
		/// Unregistration and the sign-out that follows it.
		SignOut => "sign_out",
		/// Notification delivery.
		Notification => "notification",
		/// Callback and receiver registration.
		Install => "install",
	}
}

labels! {
	/// Counted stages of a flow.
	FlowOutcome {
		/// The flow started.
		Attempt => "attempt",
		/// The flow achieved its goal.
		Success => "success",
		/// The flow ended without achieving its goal.
		Failure => "failure",
	}
}
impl FlowOutcome {
	/// `Success` when `success` holds, `Failure` otherwise.
	pub const fn from_success(success: bool) -> Self {
		if success { Self::Success } else { Self::Failure }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn labels_are_stable() {
		assert_eq!(FlowKind::TokenAcquisition.to_string(), "token_acquisition");
		assert_eq!(FlowKind::Unenrollment.as_str(), "unenrollment");
		assert_eq!(FlowOutcome::from_success(false).as_str(), "failure");
	}
}
