//! In-process credential bridge that lets a managed-policy engine obtain tokens from an
//! identity-provider client without ever holding credentials itself.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod authority;
pub mod config;
pub mod engine;
pub mod error;
pub mod flows;
pub mod identity;
pub mod notify;
pub mod obs;

mod _prelude {
	pub use std::{
		collections::{HashMap, HashSet, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hash,
		pin::Pin,
		str::FromStr,
		sync::{Arc, OnceLock},
		time::{Duration as StdDuration, Instant},
	};

	pub use parking_lot::{Condvar, Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
#[cfg(test)] use color_eyre as _;
