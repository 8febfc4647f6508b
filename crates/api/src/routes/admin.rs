//! Back-office admin routes
//!
//! All handlers sit behind `require_auth` and additionally require a platform
//! role that may manage billing (admin or master).

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use tally_billing::{MrrReport, ReconcileOutcome, SyncSweepSummary};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

fn require_billing_admin(auth_user: &AuthUser) -> ApiResult<()> {
    if auth_user.role.can_manage_billing() {
        return Ok(());
    }

    tracing::warn!(
        user_id = %auth_user.user_id,
        role = %auth_user.role,
        "Unauthorized admin access attempt"
    );
    Err(ApiError::Forbidden)
}

/// Parsed here so a malformed id gets the JSON error body
fn parse_account_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::Validation(format!("Invalid account ID '{}'", raw)))
}

/// GET /api/v1/admin/mrr
pub async fn get_mrr(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<MrrReport>> {
    require_billing_admin(&auth_user)?;

    let report = state.billing.mrr.report().await?;
    Ok(Json(report))
}

/// POST /api/v1/admin/accounts/{account_id}/venue-sync
pub async fn sync_account_venues(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<ReconcileOutcome>> {
    require_billing_admin(&auth_user)?;
    let account_id = parse_account_id(&account_id)?;

    let outcome = state.billing.venue_sync.sync_account(account_id).await?;

    tracing::info!(
        account_id = %account_id,
        admin_id = %auth_user.user_id,
        action = ?outcome.action,
        "Venue quantity sync requested"
    );

    Ok(Json(outcome))
}

/// POST /api/v1/admin/venue-sync
pub async fn sync_all_venues(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<SyncSweepSummary>> {
    require_billing_admin(&auth_user)?;

    tracing::info!(admin_id = %auth_user.user_id, "Venue quantity sweep requested");
    let summary = state.billing.venue_sync.sync_all().await?;
    Ok(Json(summary))
}
