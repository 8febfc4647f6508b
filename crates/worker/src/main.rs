//! Tally Background Worker
//!
//! Handles scheduled jobs:
//! - Venue quantity sweep over every paid account (nightly)
//! - MRR snapshot logged for revenue tracking (daily)
//! - Heartbeat with a database ping (every 5 minutes)

mod schedule;

use std::sync::Arc;
use std::time::Duration;

use tally_billing::{AccountSyncResult, BillingService, MrrReport, SyncSweepSummary};
use tally_shared::create_pool;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::schedule::{Schedule, HEARTBEAT_CRON};

/// Log results of a venue quantity sweep
fn log_sync_results(summary: &SyncSweepSummary) {
    info!(
        processed = summary.processed,
        updated = summary.updated,
        unchanged = summary.unchanged,
        skipped = summary.skipped,
        no_active_subscription = summary.no_active_subscription,
        failed = summary.failed,
        "Venue quantity sweep cycle complete"
    );

    // Log individual errors
    for result in &summary.results {
        if let AccountSyncResult::Failed { account_id, error } = result {
            error!(account_id = %account_id, error = %error, "Failed to sync venue quantity");
        }
    }
}

fn log_mrr_snapshot(report: &MrrReport) {
    info!(
        total = report.total,
        accounts = report.accounts_counted(),
        failed = report.failed_accounts.len(),
        "MRR snapshot"
    );

    if !report.failed_accounts.is_empty() {
        warn!(
            failed_accounts = ?report.failed_accounts,
            "MRR snapshot excludes accounts whose subscription could not be fetched"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Tally Worker");

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let pool = create_pool(&database_url).await?;
    info!("Database pool created");

    let billing = Arc::new(BillingService::from_env(pool.clone())?);
    let schedule = Schedule::from_env();

    let scheduler = JobScheduler::new().await?;

    // Job 1: Align subscription quantities with venue counts
    let sync_billing = billing.clone();
    scheduler
        .add(Job::new_async(schedule.venue_sync.as_str(), move |_uuid, _l| {
            let billing = sync_billing.clone();
            Box::pin(async move {
                info!("Running scheduled venue quantity sweep");
                match billing.venue_sync.sync_all().await {
                    Ok(summary) => log_sync_results(&summary),
                    Err(e) => error!(error = %e, "Venue quantity sweep failed to start"),
                }
            })
        })?)
        .await?;
    info!(cron = %schedule.venue_sync, "Scheduled: Venue quantity sweep");

    // Job 2: MRR snapshot
    let mrr_billing = billing.clone();
    scheduler
        .add(Job::new_async(schedule.mrr_snapshot.as_str(), move |_uuid, _l| {
            let billing = mrr_billing.clone();
            Box::pin(async move {
                info!("Running scheduled MRR snapshot");
                match billing.mrr.report().await {
                    Ok(report) => log_mrr_snapshot(&report),
                    Err(e) => error!(error = %e, "MRR snapshot failed"),
                }
            })
        })?)
        .await?;
    info!(cron = %schedule.mrr_snapshot, "Scheduled: MRR snapshot");

    // Job 3: Heartbeat
    let heartbeat_pool = pool.clone();
    scheduler
        .add(Job::new_async(HEARTBEAT_CRON, move |_uuid, _l| {
            let pool = heartbeat_pool.clone();
            Box::pin(async move {
                match sqlx::query("SELECT 1").execute(&pool).await {
                    Ok(_) => info!("Worker heartbeat"),
                    Err(e) => warn!(error = %e, "Worker heartbeat: database unreachable"),
                }
            })
        })?)
        .await?;
    info!("Scheduled: Heartbeat (every 5 minutes)");

    info!("Starting job scheduler");
    scheduler.start().await?;

    info!("Tally Worker started successfully with {} scheduled jobs", 3);

    // The scheduler runs jobs in background tasks
    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_billing::ReconcileOutcome;
    use uuid::Uuid;

    #[test]
    fn test_log_helpers_accept_empty_results() {
        log_sync_results(&SyncSweepSummary::from_results(vec![]));
        log_mrr_snapshot(&MrrReport {
            per_account: Default::default(),
            total: 0.0,
            failed_accounts: vec![Uuid::new_v4()],
        });
    }

    #[test]
    fn test_summary_from_mixed_results() {
        let outcome = unchanged_outcome();
        let summary = SyncSweepSummary::from_results(vec![
            AccountSyncResult::Reconciled {
                account_id: Uuid::new_v4(),
                outcome,
            },
            AccountSyncResult::Failed {
                account_id: Uuid::new_v4(),
                error: "Subscription sub_1 is canceled".to_string(),
            },
        ]);
        log_sync_results(&summary);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed, 2);
    }

    fn unchanged_outcome() -> ReconcileOutcome {
        ReconcileOutcome {
            action: tally_billing::ReconcileAction::Unchanged,
            subscription_id: Some("sub_1".to_string()),
            previous_quantity: Some(2),
            new_quantity: Some(2),
            exemption: None,
            message: "Quantity unchanged".to_string(),
        }
    }
}
