//! `orderflow-auth` — typed authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. Token
//! issuance/verification and password handling live outside the core.

pub mod context;
pub mod roles;
pub mod user;

pub use context::{AuthzError, UserContext, authorize};
pub use roles::{Capability, Role};
pub use user::{User, UserDirectory};
