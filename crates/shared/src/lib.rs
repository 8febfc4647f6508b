#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Tally Shared Module
//!
//! Types and database access used by both the API server and the worker:
//! connection pooling, the account/venue/user repository and platform roles.

pub mod accounts;
pub mod db;
pub mod roles;

pub use accounts::{AccountRecord, AccountStore};
pub use db::{create_pool, DbConfig};
pub use roles::PlatformRole;
