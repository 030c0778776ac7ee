mod support;

// self
use credential_bridge::{engine::OperationKey, error::Error, notify::NotificationKind};
use support::{FakeEngine, FakeIdentityClient, shape};

#[test]
fn install_prefers_the_richest_shapes() {
	let runtime = support::runtime();
	let engine = FakeEngine::supporting(&[
		shape::CALLBACK_5,
		shape::CALLBACK_3,
		shape::RECEIVER_KINDS,
		shape::RECEIVER_ALL,
	]);
	let client = FakeIdentityClient::signed_in(support::account("a@x.com", "id1"));
	let bridge = support::bridge(runtime.handle(), support::config(), &client, &engine);
	let report = bridge.install();
	let callback = report.callback.expect("Extended callback registration should succeed.");
	let receiver = report.receiver.expect("Receiver registration should succeed.");

	assert_eq!(callback.shape, "register_authentication_callback(acquire_token/5)");
	assert_eq!(callback.attempts.len(), 1);
	assert_eq!(receiver.shape, "register_notification_receiver(receiver, kinds)");
	assert_eq!(
		engine.receiver_kinds.lock().as_deref(),
		Some(NotificationKind::known())
	);
	assert_eq!(engine.call_shapes(), vec![shape::CALLBACK_5, shape::RECEIVER_KINDS]);
}

#[test]
fn registered_callback_serves_tokens_through_the_bridge() {
	let runtime = support::runtime();
	let engine = FakeEngine::supporting(&[shape::CALLBACK_3, shape::RECEIVER_ALL]);
	let client = FakeIdentityClient::signed_in(support::account("a@x.com", "id1"));
	let bridge = support::bridge(runtime.handle(), support::config(), &client, &engine);

	bridge.identity.get_or_create().expect("Fake identity client should construct.");

	let report = bridge.install();

	assert!(report.is_complete());
	assert_eq!(bridge.methods.cached(OperationKey::REGISTER_AUTHENTICATION_CALLBACK), Some(1));

	let callback = engine.callback.lock().clone().expect("Callback should be registered.");

	assert_eq!(callback.acquire_token("a@x.com", "id1", "res1"), Some("tok-123".into()));
	assert_eq!(callback.acquire_token("b@x.com", "id2", "res1"), None);
	assert_eq!(client.silent_calls(), 1);
}

#[test]
fn one_failed_registration_does_not_block_the_other() {
	let runtime = support::runtime();
	let engine = FakeEngine::supporting(&[shape::CALLBACK_5, shape::RECEIVER_ALL]);

	engine.reject(shape::RECEIVER_ALL, "receiver already registered");

	let bridge =
		support::bridge(runtime.handle(), support::config(), &FakeIdentityClient::new(), &engine);
	let report = bridge.install();

	assert!(report.callback.is_ok());
	assert!(!report.is_complete());

	match report.receiver {
		Err(Error::RegistrationRejected { operation, reason, attempts, .. }) => {
			assert_eq!(operation, OperationKey::REGISTER_NOTIFICATION_RECEIVER);
			assert_eq!(reason, "receiver already registered");
			assert_eq!(attempts.len(), 2);
		},
		other => panic!("Unexpected receiver registration: {other:?}."),
	}
}
