//! Authentication module for Tally

pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, JwtVerifier};
pub use middleware::{require_auth, AuthError, AuthState, AuthUser};
