//! Account, venue and user lookups
//!
//! The database platform owns these tables; this module only reads them.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Account row as stored by the database platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct AccountRecord {
    pub id: Uuid,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub is_paid: bool,
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role: Option<String>,
}

/// Read-only access to accounts, venues and user roles
#[derive(Clone)]
pub struct AccountStore {
    pool: PgPool,
}

impl AccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Accounts carrying a subscription reference, for MRR reporting
    pub async fn list_subscribed_accounts(&self) -> Result<Vec<AccountRecord>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, stripe_customer_id, stripe_subscription_id, is_paid
            FROM accounts
            WHERE stripe_subscription_id IS NOT NULL
              AND stripe_subscription_id <> ''
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Paid accounts with a subscription reference, for quantity sweeps
    pub async fn list_paid_accounts(&self) -> Result<Vec<AccountRecord>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, stripe_customer_id, stripe_subscription_id, is_paid
            FROM accounts
            WHERE is_paid = TRUE
              AND stripe_subscription_id IS NOT NULL
              AND stripe_subscription_id <> ''
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_account(&self, account_id: Uuid) -> Result<Option<AccountRecord>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, stripe_customer_id, stripe_subscription_id, is_paid
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Number of venues owned by an account
    pub async fn count_venues(&self, account_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM venues WHERE account_id = $1")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Role attribute of a user, `None` when the user has no record
    pub async fn find_user_role(&self, user_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        let row: Option<RoleRow> =
            sqlx::query_as("SELECT role::TEXT AS role FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|r| r.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subscription: Option<&str>) -> AccountRecord {
        AccountRecord {
            id: Uuid::new_v4(),
            stripe_customer_id: Some("cus_123".to_string()),
            stripe_subscription_id: subscription.map(str::to_string),
            is_paid: true,
        }
    }

    #[test]
    fn test_account_record_serialization() {
        let account = record(Some("sub_789"));
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["stripe_subscription_id"], "sub_789");
        assert_eq!(json["is_paid"], true);
    }
}
