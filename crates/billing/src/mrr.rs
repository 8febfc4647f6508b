//! Monthly recurring revenue
//!
//! Each account's subscription is fetched from the payment platform and its
//! recurring line items are normalized to a monthly figure. Fetches run
//! concurrently with a bounded fan-out; a failed fetch zeroes that account's
//! contribution without affecting the rest of the batch.
//!
//! Rounding: every per-account figure is rounded to cents for reporting, but the
//! total is accumulated from the unrounded figures and rounded once.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tally_shared::AccountStore;
use uuid::Uuid;

use crate::error::BillingResult;
use crate::model::{Account, SubscriptionSnapshot};
use crate::provider::SubscriptionFetcher;

/// Default number of subscription fetches in flight at once
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Result of an MRR run
#[derive(Debug, Clone, Serialize)]
pub struct MrrReport {
    /// Monthly contribution per account, rounded to cents
    pub per_account: BTreeMap<Uuid, f64>,
    /// Sum of unrounded contributions, rounded to cents
    pub total: f64,
    /// Accounts whose subscription could not be fetched (reported as 0)
    pub failed_accounts: Vec<Uuid>,
}

impl MrrReport {
    pub fn accounts_counted(&self) -> usize {
        self.per_account.len()
    }
}

/// Round half up to two decimal places
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Unrounded monthly value of a subscription
///
/// Zero unless the subscription is active or trialing. One-off prices and
/// items without a price contribute nothing.
pub fn monthly_contribution(subscription: &SubscriptionSnapshot) -> f64 {
    if !subscription.status.is_revenue_generating() {
        return 0.0;
    }

    subscription
        .items
        .iter()
        .filter_map(|item| {
            let price = item.price.as_ref()?;
            let interval = price.interval?;
            let amount = price.unit_amount as f64 / 100.0 * item.quantity as f64;
            Some(interval.to_monthly(amount))
        })
        .sum()
}

/// Compute MRR across a set of accounts
///
/// Accounts without a subscription reference are left out of the report.
/// Never fails: fetch errors are logged and recorded in `failed_accounts`.
pub async fn compute_mrr<F>(accounts: &[Account], fetcher: &F, concurrency: usize) -> MrrReport
where
    F: SubscriptionFetcher + ?Sized,
{
    let targets = accounts.iter().filter_map(|account| {
        account
            .subscription_reference()
            .map(|subscription_id| (account.id, subscription_id.to_owned()))
    }).collect::<Vec<(Uuid, String)>>();

    let fetched: Vec<(Uuid, Option<f64>)> = stream::iter(targets)
        .map(|(account_id, subscription_id)| async move {
            match fetcher.fetch_subscription(&subscription_id).await {
                Ok(subscription) => (account_id, Some(monthly_contribution(&subscription))),
                Err(e) => {
                    tracing::warn!(
                        account_id = %account_id,
                        subscription_id = %subscription_id,
                        error = %e,
                        "Subscription fetch failed, counting account as zero MRR"
                    );
                    (account_id, None)
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    // An id listed more than once accumulates all of its subscriptions
    let mut unrounded: BTreeMap<Uuid, f64> = BTreeMap::new();
    let mut failed_accounts = Vec::new();

    for (account_id, contribution) in fetched {
        if contribution.is_none() && !failed_accounts.contains(&account_id) {
            failed_accounts.push(account_id);
        }
        *unrounded.entry(account_id).or_insert(0.0) += contribution.unwrap_or(0.0);
    }

    let total = unrounded.values().sum::<f64>();
    let per_account = unrounded
        .into_iter()
        .map(|(account_id, amount)| (account_id, round_to_cents(amount)))
        .collect();

    MrrReport {
        per_account,
        total: round_to_cents(total),
        failed_accounts,
    }
}

/// Loads accounts from the database and runs the aggregator
#[derive(Clone)]
pub struct MrrService {
    fetcher: Arc<dyn SubscriptionFetcher>,
    store: AccountStore,
    concurrency: usize,
}

impl MrrService {
    pub fn new(fetcher: Arc<dyn SubscriptionFetcher>, store: AccountStore, concurrency: usize) -> Self {
        Self {
            fetcher,
            store,
            concurrency,
        }
    }

    /// MRR across every account with a subscription reference
    pub async fn report(&self) -> BillingResult<MrrReport> {
        let accounts: Vec<Account> = self
            .store
            .list_subscribed_accounts()
            .await?
            .into_iter()
            .map(Account::from)
            .collect();

        let report = compute_mrr(&accounts, self.fetcher.as_ref(), self.concurrency).await;

        tracing::info!(
            accounts = report.accounts_counted(),
            failed = report.failed_accounts.len(),
            total = report.total,
            "Computed MRR"
        );

        Ok(report)
    }
}
