//! Snapshots handed to the MRR aggregator and the quantity reconciler
//!
//! These are deliberately narrow: the Stripe gateway maps platform responses
//! into them, so nothing downstream depends on the SDK's object shapes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tally_shared::AccountRecord;
use uuid::Uuid;

/// Price metadata key naming how a plan is billed
pub const BILLING_TYPE_METADATA_KEY: &str = "billing_type";

/// `billing_type` value for plans priced independent of venue count
pub const FLAT_BILLING_TYPE: &str = "flat";

/// Account as seen by the billing core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub is_paid: bool,
}

impl Account {
    /// Subscription reference, ignoring blank values
    pub fn subscription_reference(&self) -> Option<&str> {
        self.subscription_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl From<AccountRecord> for Account {
    fn from(record: AccountRecord) -> Self {
        Self {
            id: record.id,
            customer_id: record.stripe_customer_id,
            subscription_id: record.stripe_subscription_id,
            is_paid: record.is_paid,
        }
    }
}

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Paused => "paused",
        }
    }

    /// Whether the subscription counts towards recurring revenue
    pub fn is_revenue_generating(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        )
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recurring billing cadence of a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Day,
    Week,
    Month,
    Year,
}

impl BillingInterval {
    /// Average weeks per month
    pub const WEEKS_PER_MONTH: f64 = 4.33;
    /// Average days per month
    pub const DAYS_PER_MONTH: f64 = 30.0;

    /// Convert an amount billed once per interval into a monthly amount
    pub fn to_monthly(&self, amount: f64) -> f64 {
        match self {
            BillingInterval::Year => amount / 12.0,
            BillingInterval::Month => amount,
            BillingInterval::Week => amount * Self::WEEKS_PER_MONTH,
            BillingInterval::Day => amount * Self::DAYS_PER_MONTH,
        }
    }
}

/// Price attached to a subscription line item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceDescriptor {
    pub id: Option<String>,
    /// Unit amount in minor currency units (cents)
    pub unit_amount: i64,
    /// `None` for one-off prices
    pub interval: Option<BillingInterval>,
    pub nickname: Option<String>,
    pub product_name: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PriceDescriptor {
    pub fn is_recurring(&self) -> bool {
        self.interval.is_some()
    }

    pub fn billing_type(&self) -> Option<&str> {
        self.metadata
            .get(BILLING_TYPE_METADATA_KEY)
            .map(String::as_str)
    }
}

/// One line of a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub quantity: u64,
    pub price: Option<PriceDescriptor>,
}

/// Point-in-time view of a subscription on the payment platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub id: String,
    pub status: SubscriptionStatus,
    pub items: Vec<LineItem>,
}

impl SubscriptionSnapshot {
    /// The only line item; `None` when there are zero or several
    pub fn single_item(&self) -> Option<&LineItem> {
        match self.items.as_slice() {
            [item] => Some(item),
            _ => None,
        }
    }
}
