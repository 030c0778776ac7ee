mod support;

// std
use std::{
	sync::{
		Arc, Barrier,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	thread,
	time::Duration,
};
// self
use credential_bridge::{
	config::BridgeConfig,
	error::{Error, ProviderError},
	identity::{ClientRef, HandleState, IdentityClientHandle},
};
use support::FakeIdentityClient;

const THREADS: usize = 8;

struct SlowFactory {
	calls: AtomicUsize,
	failing: AtomicBool,
	client: Arc<FakeIdentityClient>,
}
impl SlowFactory {
	fn new(failing: bool) -> Arc<Self> {
		Arc::new(Self {
			calls: AtomicUsize::new(0),
			failing: AtomicBool::new(failing),
			client: FakeIdentityClient::new(),
		})
	}
}
impl credential_bridge::identity::IdentityClientFactory for SlowFactory {
	fn create(&self, _: &BridgeConfig) -> Result<ClientRef, ProviderError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		thread::sleep(Duration::from_millis(100));

		if self.failing.load(Ordering::SeqCst) {
			return Err(ProviderError::Construction { message: "keychain unavailable".into() });
		}

		let client: ClientRef = self.client.clone();

		Ok(client)
	}
}

fn race(handle: &Arc<IdentityClientHandle>) -> Vec<Result<ClientRef, Error>> {
	let barrier = Arc::new(Barrier::new(THREADS));
	let workers = (0..THREADS)
		.map(|_| {
			let handle = handle.clone();
			let barrier = barrier.clone();

			thread::spawn(move || {
				barrier.wait();

				handle.get_or_create()
			})
		})
		.collect::<Vec<_>>();

	workers
		.into_iter()
		.map(|worker| worker.join().expect("Caller thread should not panic."))
		.collect()
}

#[test]
fn concurrent_callers_share_one_construction() {
	let factory = SlowFactory::new(false);
	let handle = Arc::new(IdentityClientHandle::new(Arc::new(support::config()), factory.clone()));
	let clients = race(&handle)
		.into_iter()
		.map(|result| result.expect("Construction should succeed."))
		.collect::<Vec<_>>();

	assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
	assert!(clients.iter().all(|client| Arc::ptr_eq(client, &clients[0])));
	assert_eq!(handle.state(), HandleState::Ready);
	assert!(handle.current().is_some());
}

#[test]
fn construction_failure_reaches_every_waiter_and_is_not_cached() {
	let factory = SlowFactory::new(true);
	let handle = Arc::new(IdentityClientHandle::new(Arc::new(support::config()), factory.clone()));
	let results = race(&handle);

	assert!(results.iter().all(|result| matches!(result, Err(Error::ClientUnavailable { .. }))));
	assert!(factory.calls.load(Ordering::SeqCst) >= 1);
	assert_eq!(handle.state(), HandleState::Uninitialized);

	factory.failing.store(false, Ordering::SeqCst);

	handle.get_or_create().expect("A fresh call should construct the client.");

	assert_eq!(handle.state(), HandleState::Ready);
}
