//! Subscription quantity reconciliation
//!
//! Keeps the billed quantity of an account's subscription equal to its venue
//! count. The decision sequence is:
//!
//! 1. No paid flag or no subscription reference: nothing to update
//! 2. Subscription canceled or not retrievable: error, no mutation
//! 3. Anything but exactly one line item: error, no mutation
//! 4. Test or flat-rate plan: skipped
//! 5. Quantity already equals venue count: unchanged
//! 6. Otherwise: update quantity, proration deferred to the next invoice
//!
//! Every path re-reads the subscription, so repeated calls with the same venue
//! count perform at most one mutation.

use serde::{Deserialize, Serialize};

use crate::error::{BillingError, BillingResult};
use crate::model::{Account, LineItem, SubscriptionStatus, FLAT_BILLING_TYPE};
use crate::provider::{SubscriptionFetcher, SubscriptionUpdater};

/// What the reconciler did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    NoActiveSubscription,
    Skipped,
    Unchanged,
    Updated,
}

/// Why a plan is excluded from quantity sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExemptionReason {
    /// Product name or price nickname mentions "test"
    TestPlan,
    /// Price metadata marks the plan as flat-rate
    FlatRate,
}

/// Structured result of a reconcile call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub action: ReconcileAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_quantity: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_quantity: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exemption: Option<ExemptionReason>,
    pub message: String,
}

impl ReconcileOutcome {
    /// Whether the payment platform was written to
    pub fn mutated(&self) -> bool {
        self.action == ReconcileAction::Updated
    }

    fn no_active_subscription() -> Self {
        Self {
            action: ReconcileAction::NoActiveSubscription,
            subscription_id: None,
            previous_quantity: None,
            new_quantity: None,
            exemption: None,
            message: "No active subscription to update".to_string(),
        }
    }

    fn skipped(subscription_id: &str, quantity: u64, reason: ExemptionReason) -> Self {
        let message = match reason {
            ExemptionReason::TestPlan => "Test plan, quantity sync skipped",
            ExemptionReason::FlatRate => "Flat-rate plan, quantity sync skipped",
        };
        Self {
            action: ReconcileAction::Skipped,
            subscription_id: Some(subscription_id.to_string()),
            previous_quantity: Some(quantity),
            new_quantity: None,
            exemption: Some(reason),
            message: message.to_string(),
        }
    }

    fn unchanged(subscription_id: &str, quantity: u64) -> Self {
        Self {
            action: ReconcileAction::Unchanged,
            subscription_id: Some(subscription_id.to_string()),
            previous_quantity: Some(quantity),
            new_quantity: Some(quantity),
            exemption: None,
            message: "Quantity unchanged".to_string(),
        }
    }

    fn updated(subscription_id: &str, previous: u64, new: u64) -> Self {
        Self {
            action: ReconcileAction::Updated,
            subscription_id: Some(subscription_id.to_string()),
            previous_quantity: Some(previous),
            new_quantity: Some(new),
            exemption: None,
            message: format!("Quantity updated from {} to {}", previous, new),
        }
    }
}

/// Decide whether a line item is excluded from quantity sync
pub fn exemption_for(item: &LineItem) -> Option<ExemptionReason> {
    let price = item.price.as_ref()?;

    let mentions_test = |name: &Option<String>| {
        name.as_deref()
            .map(|n| n.to_lowercase().contains("test"))
            .unwrap_or(false)
    };

    if mentions_test(&price.product_name) || mentions_test(&price.nickname) {
        return Some(ExemptionReason::TestPlan);
    }

    if price.billing_type() == Some(FLAT_BILLING_TYPE) {
        return Some(ExemptionReason::FlatRate);
    }

    None
}

/// Bring an account's billed quantity in line with its venue count
pub async fn reconcile_quantity<F, U>(
    account: &Account,
    venue_count: i64,
    fetcher: &F,
    updater: &U,
) -> BillingResult<ReconcileOutcome>
where
    F: SubscriptionFetcher + ?Sized,
    U: SubscriptionUpdater + ?Sized,
{
    let venue_count = u64::try_from(venue_count).map_err(|_| {
        BillingError::Validation(format!(
            "Venue count must not be negative (got {})",
            venue_count
        ))
    })?;

    let subscription_id = match account.subscription_reference() {
        Some(id) if account.is_paid => id,
        _ => {
            tracing::debug!(account_id = %account.id, "No active subscription to reconcile");
            return Ok(ReconcileOutcome::no_active_subscription());
        }
    };

    let subscription = fetcher.fetch_subscription(subscription_id).await?;

    if subscription.status == SubscriptionStatus::Canceled {
        tracing::warn!(
            account_id = %account.id,
            subscription_id = %subscription_id,
            "Refusing to reconcile a canceled subscription"
        );
        return Err(BillingError::SubscriptionCanceled(subscription.id));
    }

    let item = subscription
        .single_item()
        .ok_or_else(|| BillingError::UnsupportedPlanShape {
            subscription_id: subscription.id.clone(),
            item_count: subscription.items.len(),
        })?;

    if let Some(reason) = exemption_for(item) {
        tracing::info!(
            account_id = %account.id,
            subscription_id = %subscription.id,
            reason = ?reason,
            "Plan exempt from quantity sync"
        );
        return Ok(ReconcileOutcome::skipped(
            &subscription.id,
            item.quantity,
            reason,
        ));
    }

    if item.quantity == venue_count {
        return Ok(ReconcileOutcome::unchanged(&subscription.id, venue_count));
    }

    updater
        .update_item_quantity(&subscription.id, &item.id, venue_count)
        .await?;

    tracing::info!(
        account_id = %account.id,
        subscription_id = %subscription.id,
        previous_quantity = item.quantity,
        new_quantity = venue_count,
        "Updated subscription quantity to venue count"
    );

    Ok(ReconcileOutcome::updated(
        &subscription.id,
        item.quantity,
        venue_count,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BillingInterval, PriceDescriptor, BILLING_TYPE_METADATA_KEY};

    fn item_with_price(price: PriceDescriptor) -> LineItem {
        LineItem {
            id: "si_1".to_string(),
            quantity: 1,
            price: Some(price),
        }
    }

    fn monthly_price() -> PriceDescriptor {
        PriceDescriptor {
            id: Some("price_venue".to_string()),
            unit_amount: 2900,
            interval: Some(BillingInterval::Month),
            nickname: Some("Per venue".to_string()),
            product_name: Some("Feedback Pro".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_regular_plan_not_exempt() {
        assert_eq!(exemption_for(&item_with_price(monthly_price())), None);
    }

    #[test]
    fn test_nickname_with_capital_test_is_exempt() {
        let price = PriceDescriptor {
            nickname: Some("Test Monthly".to_string()),
            ..monthly_price()
        };
        assert_eq!(
            exemption_for(&item_with_price(price)),
            Some(ExemptionReason::TestPlan)
        );
    }

    #[test]
    fn test_product_name_with_lowercase_test_is_exempt() {
        let price = PriceDescriptor {
            product_name: Some("internal test product".to_string()),
            ..monthly_price()
        };
        assert_eq!(
            exemption_for(&item_with_price(price)),
            Some(ExemptionReason::TestPlan)
        );
    }

    #[test]
    fn test_mixed_case_test_is_exempt() {
        let price = PriceDescriptor {
            nickname: Some("TESTING tier".to_string()),
            ..monthly_price()
        };
        assert_eq!(
            exemption_for(&item_with_price(price)),
            Some(ExemptionReason::TestPlan)
        );
    }

    #[test]
    fn test_flat_billing_type_is_exempt() {
        let mut price = monthly_price();
        price
            .metadata
            .insert(BILLING_TYPE_METADATA_KEY.to_string(), "flat".to_string());
        assert_eq!(
            exemption_for(&item_with_price(price)),
            Some(ExemptionReason::FlatRate)
        );
    }

    #[test]
    fn test_other_billing_type_not_exempt() {
        let mut price = monthly_price();
        price
            .metadata
            .insert(BILLING_TYPE_METADATA_KEY.to_string(), "per_venue".to_string());
        assert_eq!(exemption_for(&item_with_price(price)), None);
    }

    #[test]
    fn test_item_without_price_not_exempt() {
        let item = LineItem {
            id: "si_bare".to_string(),
            quantity: 1,
            price: None,
        };
        assert_eq!(exemption_for(&item), None);
    }

    #[test]
    fn test_outcome_serialization_omits_empty_fields() {
        let json = serde_json::to_value(ReconcileOutcome::no_active_subscription()).unwrap();
        assert_eq!(json["action"], "no_active_subscription");
        assert!(json.get("previous_quantity").is_none());
        assert!(json.get("new_quantity").is_none());
    }

    #[test]
    fn test_updated_outcome_serialization() {
        let outcome = ReconcileOutcome::updated("sub_1", 3, 5);
        assert!(outcome.mutated());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["action"], "updated");
        assert_eq!(json["previous_quantity"], 3);
        assert_eq!(json["new_quantity"], 5);
        assert_eq!(json["message"], "Quantity updated from 3 to 5");
    }

    #[test]
    fn test_skipped_outcome_carries_reason() {
        let outcome = ReconcileOutcome::skipped("sub_1", 2, ExemptionReason::FlatRate);
        assert!(!outcome.mutated());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["action"], "skipped");
        assert_eq!(json["exemption"], "flat_rate");
    }
}
