// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Tally Billing Module
//!
//! Revenue reporting and subscription upkeep on top of Stripe.
//!
//! ## Features
//!
//! - **MRR**: Normalize every live subscription to a monthly figure, per account
//!   and in total, tolerating individual fetch failures
//! - **Venue Quantity Sync**: Keep each subscription's billed quantity equal to the
//!   account's venue count, skipping test and flat-rate plans
//!
//! The computations in [`mrr`] and [`reconcile`] only see the narrow snapshots
//! in [`model`] and reach Stripe through the capabilities in [`provider`].

pub mod client;
pub mod error;
pub mod gateway;
pub mod model;
pub mod mrr;
pub mod provider;
pub mod reconcile;
pub mod venue_sync;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

// Client
pub use client::{StripeClient, StripeConfig};

// Error
pub use error::{BillingError, BillingResult};

// Gateway
pub use gateway::StripeSubscriptionGateway;

// Model
pub use model::{
    Account, BillingInterval, LineItem, PriceDescriptor, SubscriptionSnapshot, SubscriptionStatus,
};

// MRR
pub use mrr::{compute_mrr, monthly_contribution, round_to_cents, MrrReport, MrrService};

// Provider
pub use provider::{SubscriptionFetcher, SubscriptionUpdater};

// Reconcile
pub use reconcile::{
    exemption_for, reconcile_quantity, ExemptionReason, ReconcileAction, ReconcileOutcome,
};

// Venue Sync
pub use venue_sync::{sweep_accounts, AccountSyncResult, SyncSweepSummary, VenueSyncService};

use sqlx::PgPool;
use tally_shared::AccountStore;

/// Main billing service that combines all billing functionality
#[derive(Clone)]
pub struct BillingService {
    pub mrr: MrrService,
    pub venue_sync: VenueSyncService,
}

impl BillingService {
    /// Create a new billing service from environment variables
    pub fn from_env(pool: PgPool) -> BillingResult<Self> {
        Ok(Self::new(StripeConfig::from_env()?, pool))
    }

    /// Create a new billing service with explicit config
    pub fn new(config: StripeConfig, pool: PgPool) -> Self {
        let concurrency = config.fetch_concurrency;
        let gateway = Arc::new(StripeSubscriptionGateway::new(StripeClient::new(&config)));
        Self::with_platform(gateway.clone(), gateway, AccountStore::new(pool), concurrency)
    }

    /// Wire the services to arbitrary payment platform capabilities
    pub fn with_platform(
        fetcher: Arc<dyn SubscriptionFetcher>,
        updater: Arc<dyn SubscriptionUpdater>,
        store: AccountStore,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            mrr: MrrService::new(fetcher.clone(), store.clone(), fetch_concurrency),
            venue_sync: VenueSyncService::new(fetcher, updater, store),
        }
    }
}
