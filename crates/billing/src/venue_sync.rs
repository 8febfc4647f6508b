//! Venue-count driven quantity sync
//!
//! Loads accounts and venue counts from the database and runs the reconciler,
//! either for one account or as a sweep over every paid account.

use std::sync::Arc;

use serde::Serialize;
use tally_shared::{AccountRecord, AccountStore};
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use crate::model::Account;
use crate::provider::{SubscriptionFetcher, SubscriptionUpdater};
use crate::reconcile::{reconcile_quantity, ReconcileAction, ReconcileOutcome};

/// Per-account result of a sweep
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccountSyncResult {
    Reconciled {
        account_id: Uuid,
        outcome: ReconcileOutcome,
    },
    Failed {
        account_id: Uuid,
        error: String,
    },
}

impl AccountSyncResult {
    pub fn account_id(&self) -> Uuid {
        match self {
            AccountSyncResult::Reconciled { account_id, .. }
            | AccountSyncResult::Failed { account_id, .. } => *account_id,
        }
    }
}

/// Counts and details from a sweep over all paid accounts
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSweepSummary {
    pub processed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub no_active_subscription: usize,
    pub failed: usize,
    pub results: Vec<AccountSyncResult>,
}

impl SyncSweepSummary {
    pub fn from_results(results: Vec<AccountSyncResult>) -> Self {
        let mut summary = Self {
            processed: results.len(),
            ..Default::default()
        };

        for result in &results {
            match result {
                AccountSyncResult::Reconciled { outcome, .. } => match outcome.action {
                    ReconcileAction::Updated => summary.updated += 1,
                    ReconcileAction::Unchanged => summary.unchanged += 1,
                    ReconcileAction::Skipped => summary.skipped += 1,
                    ReconcileAction::NoActiveSubscription => summary.no_active_subscription += 1,
                },
                AccountSyncResult::Failed { .. } => summary.failed += 1,
            }
        }

        summary.results = results;
        summary
    }
}

/// Service that keeps subscription quantities aligned with venue counts
#[derive(Clone)]
pub struct VenueSyncService {
    fetcher: Arc<dyn SubscriptionFetcher>,
    updater: Arc<dyn SubscriptionUpdater>,
    store: AccountStore,
}

impl VenueSyncService {
    pub fn new(
        fetcher: Arc<dyn SubscriptionFetcher>,
        updater: Arc<dyn SubscriptionUpdater>,
        store: AccountStore,
    ) -> Self {
        Self {
            fetcher,
            updater,
            store,
        }
    }

    /// Reconcile one account against its current venue count
    pub async fn sync_account(&self, account_id: Uuid) -> BillingResult<ReconcileOutcome> {
        let account = require_account(account_id, self.store.get_account(account_id).await?)?;
        let venue_count = self.store.count_venues(account_id).await?;

        reconcile_quantity(
            &account,
            venue_count,
            self.fetcher.as_ref(),
            self.updater.as_ref(),
        )
        .await
    }

    /// Reconcile every paid account; failures are collected, never fatal
    pub async fn sync_all(&self) -> BillingResult<SyncSweepSummary> {
        let records = self.store.list_paid_accounts().await?;

        let mut results = Vec::new();
        let mut targets = Vec::with_capacity(records.len());
        for record in records {
            match self.store.count_venues(record.id).await {
                Ok(venue_count) => targets.push((Account::from(record), venue_count)),
                Err(e) => results.push(failed(record.id, &BillingError::from(e))),
            }
        }

        results.extend(
            sweep_accounts(targets, self.fetcher.as_ref(), self.updater.as_ref()).await,
        );
        let summary = SyncSweepSummary::from_results(results);

        tracing::info!(
            processed = summary.processed,
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            failed = summary.failed,
            "Venue quantity sweep complete"
        );

        Ok(summary)
    }
}

pub(crate) fn require_account(
    account_id: Uuid,
    record: Option<AccountRecord>,
) -> BillingResult<Account> {
    record
        .map(Account::from)
        .ok_or_else(|| BillingError::NotFound(format!("Account {}", account_id)))
}

fn failed(account_id: Uuid, error: &BillingError) -> AccountSyncResult {
    tracing::error!(account_id = %account_id, error = %error, "Venue quantity sync failed");
    AccountSyncResult::Failed {
        account_id,
        error: error.to_string(),
    }
}

/// Reconcile accounts one at a time against their venue counts
///
/// Accounts are processed sequentially, in input order.
pub async fn sweep_accounts<F, U>(
    targets: Vec<(Account, i64)>,
    fetcher: &F,
    updater: &U,
) -> Vec<AccountSyncResult>
where
    F: SubscriptionFetcher + ?Sized,
    U: SubscriptionUpdater + ?Sized,
{
    let mut results = Vec::with_capacity(targets.len());

    for (account, venue_count) in targets {
        results.push(
            match reconcile_quantity(&account, venue_count, fetcher, updater).await {
                Ok(outcome) => AccountSyncResult::Reconciled {
                    account_id: account.id,
                    outcome,
                },
                Err(e) => failed(account.id, &e),
            },
        );
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciled(action: ReconcileAction) -> AccountSyncResult {
        AccountSyncResult::Reconciled {
            account_id: Uuid::new_v4(),
            outcome: ReconcileOutcome {
                action,
                subscription_id: Some("sub_1".to_string()),
                previous_quantity: Some(1),
                new_quantity: Some(1),
                exemption: None,
                message: String::new(),
            },
        }
    }

    #[test]
    fn test_summary_counts_each_action() {
        let failed_id = Uuid::new_v4();
        let summary = SyncSweepSummary::from_results(vec![
            reconciled(ReconcileAction::Updated),
            reconciled(ReconcileAction::Updated),
            reconciled(ReconcileAction::Unchanged),
            reconciled(ReconcileAction::Skipped),
            reconciled(ReconcileAction::NoActiveSubscription),
            AccountSyncResult::Failed {
                account_id: failed_id,
                error: "boom".to_string(),
            },
        ]);

        assert_eq!(summary.processed, 6);
        assert_eq!(summary.updated, 2);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.no_active_subscription, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.results[5].account_id(), failed_id);
    }

    #[test]
    fn test_missing_account_is_not_found() {
        let account_id = Uuid::new_v4();
        let err = require_account(account_id, None).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains(&account_id.to_string()));

        let account = require_account(
            account_id,
            Some(AccountRecord {
                id: account_id,
                stripe_customer_id: None,
                stripe_subscription_id: Some("sub_1".to_string()),
                is_paid: true,
            }),
        )
        .unwrap();
        assert_eq!(account.subscription_reference(), Some("sub_1"));
    }

    #[test]
    fn test_empty_sweep() {
        let summary = SyncSweepSummary::from_results(vec![]);
        assert_eq!(summary.processed, 0);
        assert!(summary.results.is_empty());
    }

    #[test]
    fn test_result_serialization_is_tagged() {
        let result = AccountSyncResult::Failed {
            account_id: Uuid::nil(),
            error: "Subscription sub_1 is canceled".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "Subscription sub_1 is canceled");
    }
}
