//! Billing errors

use thiserror::Error;

pub type BillingResult<T> = Result<T, BillingError>;

#[derive(Debug, Error)]
pub enum BillingError {
    /// Referenced account or subscription does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transient failure reading from the payment platform
    #[error("Payment platform request failed: {0}")]
    ExternalFetchFailure(String),

    /// Missing or malformed input, rejected before any external call
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Quantity sync only handles single-item subscriptions
    #[error(
        "Unsupported plan shape: subscription {subscription_id} has {item_count} line items (expected 1)"
    )]
    UnsupportedPlanShape {
        subscription_id: String,
        item_count: usize,
    },

    #[error("Subscription {0} is canceled")]
    SubscriptionCanceled(String),

    /// Payment platform rejected or failed a write
    #[error("Stripe API error: {0}")]
    StripeApi(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BillingError {
    /// Map an HTTP status from the payment platform to an error
    pub fn from_platform_status(http_status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match http_status {
            404 => BillingError::NotFound(message),
            _ => BillingError::StripeApi(message),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BillingError::NotFound(_))
    }
}

impl From<stripe::StripeError> for BillingError {
    fn from(err: stripe::StripeError) -> Self {
        match &err {
            stripe::StripeError::Stripe(request_error) => BillingError::from_platform_status(
                request_error.http_status,
                request_error
                    .message
                    .clone()
                    .unwrap_or_else(|| err.to_string()),
            ),
            _ => BillingError::StripeApi(err.to_string()),
        }
    }
}
