//! Application state

use sqlx::PgPool;
use std::sync::Arc;
use tally_billing::BillingService;
use tally_shared::AccountStore;

use crate::{
    auth::{AuthState, JwtVerifier},
    config::Config,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountStore,
    pub billing: Arc<BillingService>,
    pub jwt_verifier: JwtVerifier,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config, billing: BillingService) -> Self {
        let jwt_verifier = JwtVerifier::new(&config.supabase_jwt_secret, &config.jwt_audience);
        tracing::info!(audience = %config.jwt_audience, "Supabase JWT validation enabled");

        Self {
            accounts: AccountStore::new(pool),
            billing: Arc::new(billing),
            jwt_verifier,
        }
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            verifier: self.jwt_verifier.clone(),
            accounts: self.accounts.clone(),
        }
    }
}
