//! Payment platform capabilities
//!
//! The MRR aggregator and the quantity reconciler only reach the payment
//! platform through these traits, so they can run against Stripe in
//! production and an in-memory double in tests.

use async_trait::async_trait;

use crate::error::BillingResult;
use crate::model::SubscriptionSnapshot;

/// Read access to subscriptions
#[async_trait]
pub trait SubscriptionFetcher: Send + Sync {
    /// Fetch a subscription by its platform identifier
    ///
    /// Returns `BillingError::NotFound` when the subscription does not exist and
    /// `BillingError::ExternalFetchFailure` for transport or platform failures.
    async fn fetch_subscription(&self, subscription_id: &str)
        -> BillingResult<SubscriptionSnapshot>;
}

/// Write access to subscription quantities
#[async_trait]
pub trait SubscriptionUpdater: Send + Sync {
    /// Set the quantity of one subscription item
    ///
    /// Proration is deferred to the next invoice; nothing is charged or
    /// credited immediately.
    async fn update_item_quantity(
        &self,
        subscription_id: &str,
        item_id: &str,
        quantity: u64,
    ) -> BillingResult<()>;
}
