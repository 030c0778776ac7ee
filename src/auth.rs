//! Identity-domain identifiers, account records, token requests, and outcomes.

pub mod account;
pub mod id;
pub mod request;
pub mod secret;

pub use account::*;
pub use id::*;
pub use request::*;
pub use secret::*;
