//! Stripe client configuration

use stripe::{Client, RequestStrategy};

use crate::error::{BillingError, BillingResult};
use crate::mrr::DEFAULT_FETCH_CONCURRENCY;

const DEFAULT_MAX_NETWORK_RETRIES: u32 = 2;

/// Stripe settings loaded from the environment
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    /// Retries handled by the Stripe client with exponential backoff
    pub max_network_retries: u32,
    /// Subscription fetches in flight during an MRR run
    pub fetch_concurrency: usize,
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            max_network_retries: DEFAULT_MAX_NETWORK_RETRIES,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    pub fn from_env() -> BillingResult<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| BillingError::Config("STRIPE_SECRET_KEY must be set".to_string()))?;

        let max_network_retries = std::env::var("STRIPE_MAX_NETWORK_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_NETWORK_RETRIES);

        let fetch_concurrency = std::env::var("MRR_FETCH_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_FETCH_CONCURRENCY)
            .max(1);

        Ok(Self {
            secret_key,
            max_network_retries,
            fetch_concurrency,
        })
    }

    fn request_strategy(&self) -> RequestStrategy {
        if self.max_network_retries == 0 {
            RequestStrategy::Once
        } else {
            RequestStrategy::ExponentialBackoff(self.max_network_retries)
        }
    }
}

/// Shared handle to the Stripe API
#[derive(Clone)]
pub struct StripeClient {
    inner: Client,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            inner: Client::new(config.secret_key.clone()).with_strategy(config.request_strategy()),
        }
    }

    pub fn inner(&self) -> &Client {
        &self.inner
    }
}
