//! Stripe-backed subscription capabilities
//!
//! Maps Stripe's subscription objects into [`SubscriptionSnapshot`]s and writes
//! quantity changes back. This is the only module that touches the SDK's
//! subscription types.

use async_trait::async_trait;
use stripe::generated::billing::subscription::SubscriptionProrationBehavior;
use stripe::{
    Expandable, RecurringInterval, Subscription, SubscriptionId,
    SubscriptionStatus as StripeSubStatus, UpdateSubscription, UpdateSubscriptionItems,
};

use crate::client::StripeClient;
use crate::error::{BillingError, BillingResult};
use crate::model::{
    BillingInterval, LineItem, PriceDescriptor, SubscriptionSnapshot, SubscriptionStatus,
};
use crate::provider::{SubscriptionFetcher, SubscriptionUpdater};

/// Expansion needed to read product names for the test-plan check
const SUBSCRIPTION_EXPAND: &[&str] = &["items.data.price.product"];

#[derive(Clone)]
pub struct StripeSubscriptionGateway {
    stripe: StripeClient,
}

impl StripeSubscriptionGateway {
    pub fn new(stripe: StripeClient) -> Self {
        Self { stripe }
    }

    fn parse_subscription_id(subscription_id: &str) -> BillingResult<SubscriptionId> {
        subscription_id.parse::<SubscriptionId>().map_err(|e| {
            BillingError::Validation(format!(
                "Invalid subscription ID '{}': {}",
                subscription_id, e
            ))
        })
    }
}

#[async_trait]
impl SubscriptionFetcher for StripeSubscriptionGateway {
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> BillingResult<SubscriptionSnapshot> {
        let sub_id = Self::parse_subscription_id(subscription_id)?;

        let subscription = Subscription::retrieve(self.stripe.inner(), &sub_id, SUBSCRIPTION_EXPAND)
            .await
            .map_err(|e| match BillingError::from(e) {
                BillingError::NotFound(msg) => BillingError::NotFound(msg),
                other => BillingError::ExternalFetchFailure(other.to_string()),
            })?;

        Ok(snapshot_from_stripe(&subscription))
    }
}

#[async_trait]
impl SubscriptionUpdater for StripeSubscriptionGateway {
    async fn update_item_quantity(
        &self,
        subscription_id: &str,
        item_id: &str,
        quantity: u64,
    ) -> BillingResult<()> {
        let sub_id = Self::parse_subscription_id(subscription_id)?;

        let params = UpdateSubscription {
            items: Some(vec![UpdateSubscriptionItems {
                id: Some(item_id.to_string()),
                quantity: Some(quantity),
                ..Default::default()
            }]),
            // Proration lands on the next invoice instead of being charged now
            proration_behavior: Some(SubscriptionProrationBehavior::CreateProrations),
            ..Default::default()
        };

        Subscription::update(self.stripe.inner(), &sub_id, params)
            .await
            .map_err(|e| write_failure(BillingError::from(e)))?;

        tracing::debug!(
            subscription_id = %subscription_id,
            item_id = %item_id,
            quantity = quantity,
            "Stripe subscription item quantity updated"
        );

        Ok(())
    }
}

/// Any rejected write, a 404 included, is reported as a platform failure
fn write_failure(err: BillingError) -> BillingError {
    match err {
        BillingError::NotFound(message) => BillingError::StripeApi(message),
        other => other,
    }
}

pub(crate) fn status_from_stripe(status: &StripeSubStatus) -> SubscriptionStatus {
    match status {
        StripeSubStatus::Active => SubscriptionStatus::Active,
        StripeSubStatus::Trialing => SubscriptionStatus::Trialing,
        StripeSubStatus::PastDue => SubscriptionStatus::PastDue,
        StripeSubStatus::Canceled => SubscriptionStatus::Canceled,
        StripeSubStatus::Incomplete => SubscriptionStatus::Incomplete,
        StripeSubStatus::IncompleteExpired => SubscriptionStatus::IncompleteExpired,
        StripeSubStatus::Unpaid => SubscriptionStatus::Unpaid,
        StripeSubStatus::Paused => SubscriptionStatus::Paused,
    }
}

pub(crate) fn interval_from_stripe(interval: &RecurringInterval) -> BillingInterval {
    match interval {
        RecurringInterval::Day => BillingInterval::Day,
        RecurringInterval::Week => BillingInterval::Week,
        RecurringInterval::Month => BillingInterval::Month,
        RecurringInterval::Year => BillingInterval::Year,
    }
}

fn price_from_stripe(price: &stripe::Price) -> PriceDescriptor {
    let product_name = match &price.product {
        Some(Expandable::Object(product)) => product.name.clone(),
        _ => None,
    };

    PriceDescriptor {
        id: Some(price.id.to_string()),
        unit_amount: price.unit_amount.unwrap_or(0),
        interval: price
            .recurring
            .as_ref()
            .map(|recurring| interval_from_stripe(&recurring.interval)),
        nickname: price.nickname.clone(),
        product_name,
        metadata: price.metadata.clone().unwrap_or_default(),
    }
}

fn snapshot_from_stripe(subscription: &Subscription) -> SubscriptionSnapshot {
    let items = subscription
        .items
        .data
        .iter()
        .map(|item| LineItem {
            id: item.id.to_string(),
            // Stripe omits quantity for metered prices; treat as a single unit
            quantity: item.quantity.unwrap_or(1),
            price: item.price.as_ref().map(price_from_stripe),
        })
        .collect();

    SubscriptionSnapshot {
        id: subscription.id.to_string(),
        status: status_from_stripe(&subscription.status),
        items,
    }
}
