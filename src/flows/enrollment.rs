//! Account registration and unregistration with the policy engine.
//!
//! Each direction has a richest-first list of call shapes. The [`MethodCache`] picks the first
//! shape the installed engine accepts and reuses it afterwards; every shape actually called is
//! recorded in the attempt log returned to the caller.
//!
//! [`MethodCache`]: crate::engine::MethodCache

// crates.io
use tokio::task::JoinHandle;
// self
use crate::{
	_prelude::*,
	auth::{AccountId, AccountRecord, TenantId},
	authority,
	config::BridgeConfig,
	engine::{
		EngineResult, Invocation, InvocationFailure, OperationKey, PolicyEngine, Variant,
		VariantAttempt,
	},
	flows::{Bridge, EnrollmentDirection},
	obs::{FlowKind, FlowSpan},
};

static REGISTER_VARIANTS: [Variant<EnrollmentRequest>; 3] = [
	Variant::new("register_account(username, account_id, tenant_id, authority)", register_full),
	Variant::new("register_account(username, account_id, tenant_id)", register_with_tenant),
	Variant::new("register_account(username, account_id)", register_identity),
];
static UNREGISTER_VARIANTS: [Variant<EnrollmentRequest>; 3] = [
	Variant::new("unregister_account(username, account_id, tenant_id, authority)", unregister_full),
	Variant::new("unregister_account(username, account_id, tenant_id)", unregister_with_tenant),
	Variant::new("unregister_account(username, account_id)", unregister_identity),
];

/// Identity and tenant an enrollment call is made for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
	/// User principal name.
	pub username: String,
	/// Directory object identifier.
	pub account_id: AccountId,
	/// Tenant the account is enrolled into.
	pub tenant_id: TenantId,
	/// Authority passed to shapes that accept one.
	pub authority: String,
	/// Register or unregister.
	pub direction: EnrollmentDirection,
}
impl EnrollmentRequest {
	/// Creates a registration request.
	pub fn register(
		username: impl Into<String>,
		account_id: AccountId,
		tenant_id: TenantId,
		authority: impl Into<String>,
	) -> Self {
		Self {
			username: username.into(),
			account_id,
			tenant_id,
			authority: authority.into(),
			direction: EnrollmentDirection::Register,
		}
	}

	/// Creates an unregistration request.
	pub fn unregister(
		username: impl Into<String>,
		account_id: AccountId,
		tenant_id: TenantId,
		authority: impl Into<String>,
	) -> Self {
		Self::register(username, account_id, tenant_id, authority)
			.with_direction(EnrollmentDirection::Unregister)
	}

	/// Builds a request for a signed-in account using the configured tenant.
	///
	/// The authority is resolved like a token request without a caller hint: the account's
	/// own authority, then the tenant default.
	pub fn for_account(
		account: &AccountRecord,
		config: &BridgeConfig,
		direction: EnrollmentDirection,
	) -> Self {
		let authority = authority::resolve_authority(
			account.authority_url.as_deref(),
			None,
			config.tenant_authority.as_str(),
		);

		Self::register(
			account.username.clone(),
			account.account_id.clone(),
			config.tenant_id.clone(),
			authority,
		)
		.with_direction(direction)
	}

	/// Overrides the direction.
	pub fn with_direction(mut self, direction: EnrollmentDirection) -> Self {
		self.direction = direction;

		self
	}
}

/// Successful enrollment call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnrollmentReport {
	/// Direction that completed.
	pub direction: EnrollmentDirection,
	/// Shape the engine accepted.
	pub shape: &'static str,
	/// Ordered log of every shape called, ending with the accepted one.
	pub attempts: Vec<VariantAttempt>,
}

impl Bridge {
	/// Registers the account named in `request` with the policy engine.
	pub fn register(&self, request: EnrollmentRequest) -> Result<EnrollmentReport> {
		self.enroll(&request.with_direction(EnrollmentDirection::Register))
	}

	/// Unregisters the account named in `request` from the policy engine.
	pub fn unregister(&self, request: EnrollmentRequest) -> Result<EnrollmentReport> {
		self.enroll(&request.with_direction(EnrollmentDirection::Unregister))
	}

	/// Runs one enrollment call in the request's direction.
	///
	/// Fails with [`Error::AllVariantsExhausted`] when the engine exposes none of the shapes
	/// and with [`Error::EnrollmentRejected`] when it refuses the request; both carry the
	/// attempt log. Enrollment calls are serialized across the bridge.
	pub fn enroll(&self, request: &EnrollmentRequest) -> Result<EnrollmentReport> {
		let direction = request.direction;
		let (kind, key, variants) = match direction {
			EnrollmentDirection::Register =>
				(FlowKind::Enrollment, OperationKey::REGISTER_ACCOUNT, &REGISTER_VARIANTS),
			EnrollmentDirection::Unregister =>
				(FlowKind::Unenrollment, OperationKey::UNREGISTER_ACCOUNT, &UNREGISTER_VARIANTS),
		};
		let flow = FlowSpan::begin(kind, "enroll");
		let _entered = flow.enter();

		let Invocation { attempts, outcome } = {
			let _gate = self.enrollment_gate.lock();

			self.methods.invoke(key, self.engine.as_ref(), variants, request)
		};
		let shape_at = |index: usize| variants.get(index).map_or("unknown", |variant| variant.shape);
		let result = match outcome {
			Ok((index, ())) => {
				tracing::info!(
					%direction,
					shape = shape_at(index),
					"account enrollment call accepted"
				);

				Ok(EnrollmentReport { direction, shape: shape_at(index), attempts })
			},
			Err(InvocationFailure::Exhausted) => {
				tracing::error!(
					%direction,
					attempts = attempts.len(),
					"no enrollment call shape available"
				);

				Err(Error::AllVariantsExhausted { operation: key, attempts })
			},
			Err(InvocationFailure::Rejected { index, reason }) => {
				tracing::error!(
					%direction,
					shape = shape_at(index),
					%reason,
					"policy engine rejected enrollment"
				);

				Err(Error::EnrollmentRejected {
					direction,
					shape: shape_at(index),
					reason,
					attempts,
				})
			},
		};

		flow.finish(result.is_ok());

		result
	}

	/// Runs [`enroll`](Self::enroll) on the runtime's blocking pool.
	pub fn spawn_enroll(&self, request: EnrollmentRequest) -> JoinHandle<Result<EnrollmentReport>> {
		let bridge = self.clone();

		self.runtime.spawn_blocking(move || bridge.enroll(&request))
	}
}

fn register_full(engine: &dyn PolicyEngine, request: &EnrollmentRequest) -> EngineResult {
	engine.register_account_with_authority(
		&request.username,
		&request.account_id,
		&request.tenant_id,
		&request.authority,
	)
}

fn register_with_tenant(engine: &dyn PolicyEngine, request: &EnrollmentRequest) -> EngineResult {
	engine.register_account_with_tenant(&request.username, &request.account_id, &request.tenant_id)
}

fn register_identity(engine: &dyn PolicyEngine, request: &EnrollmentRequest) -> EngineResult {
	engine.register_account(&request.username, &request.account_id)
}

fn unregister_full(engine: &dyn PolicyEngine, request: &EnrollmentRequest) -> EngineResult {
	engine.unregister_account_with_authority(
		&request.username,
		&request.account_id,
		&request.tenant_id,
		&request.authority,
	)
}

fn unregister_with_tenant(engine: &dyn PolicyEngine, request: &EnrollmentRequest) -> EngineResult {
	engine.unregister_account_with_tenant(
		&request.username,
		&request.account_id,
		&request.tenant_id,
	)
}

fn unregister_identity(engine: &dyn PolicyEngine, request: &EnrollmentRequest) -> EngineResult {
	engine.unregister_account(&request.username, &request.account_id)
}
