//! In-memory payment platform for tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{BillingError, BillingResult};
use crate::model::{
    BillingInterval, LineItem, PriceDescriptor, SubscriptionSnapshot, SubscriptionStatus,
};
use crate::provider::{SubscriptionFetcher, SubscriptionUpdater};

/// Recorded quantity update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityUpdate {
    pub subscription_id: String,
    pub item_id: String,
    pub quantity: u64,
}

/// Subscriptions held in memory; updates are applied and recorded
#[derive(Default)]
pub struct FakePaymentPlatform {
    subscriptions: Mutex<HashMap<String, SubscriptionSnapshot>>,
    failing: Mutex<HashSet<String>>,
    updates: Mutex<Vec<QuantityUpdate>>,
    fetches: Mutex<usize>,
}

impl FakePaymentPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, subscription: SubscriptionSnapshot) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id.clone(), subscription);
    }

    /// Make fetches of this subscription fail with a transport error
    pub fn fail_fetches_for(&self, subscription_id: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(subscription_id.to_string());
    }

    pub fn updates(&self) -> Vec<QuantityUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    pub fn quantity_of(&self, subscription_id: &str) -> Option<u64> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .and_then(|s| s.items.first())
            .map(|item| item.quantity)
    }
}

#[async_trait]
impl SubscriptionFetcher for FakePaymentPlatform {
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> BillingResult<SubscriptionSnapshot> {
        *self.fetches.lock().unwrap() += 1;

        if self.failing.lock().unwrap().contains(subscription_id) {
            return Err(BillingError::ExternalFetchFailure(format!(
                "connection reset fetching {}",
                subscription_id
            )));
        }

        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| BillingError::NotFound(format!("No such subscription: {}", subscription_id)))
    }
}

#[async_trait]
impl SubscriptionUpdater for FakePaymentPlatform {
    async fn update_item_quantity(
        &self,
        subscription_id: &str,
        item_id: &str,
        quantity: u64,
    ) -> BillingResult<()> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| BillingError::NotFound(subscription_id.to_string()))?;
        let item = subscription
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| BillingError::NotFound(item_id.to_string()))?;
        item.quantity = quantity;

        self.updates.lock().unwrap().push(QuantityUpdate {
            subscription_id: subscription_id.to_string(),
            item_id: item_id.to_string(),
            quantity,
        });
        Ok(())
    }
}

/// Recurring price in cents
pub fn recurring_price(unit_amount: i64, interval: BillingInterval) -> PriceDescriptor {
    PriceDescriptor {
        id: Some(format!("price_{}", unit_amount)),
        unit_amount,
        interval: Some(interval),
        nickname: Some("Per venue".to_string()),
        product_name: Some("Feedback Pro".to_string()),
        ..Default::default()
    }
}

/// Single-item subscription
pub fn single_item_subscription(
    id: &str,
    status: SubscriptionStatus,
    quantity: u64,
    price: PriceDescriptor,
) -> SubscriptionSnapshot {
    SubscriptionSnapshot {
        id: id.to_string(),
        status,
        items: vec![LineItem {
            id: format!("si_{}", id),
            quantity,
            price: Some(price),
        }],
    }
}
