//! Checkout configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use domain::Money;

use crate::retry::RetryPolicy;

/// Checkout tuning with sensible defaults.
///
/// Reads from environment variables:
/// - `CHECKOUT_FREIGHT_CENTS`: freight per order (default: `1000`)
/// - `CHECKOUT_MAX_ATTEMPTS`: compare-and-set attempts per line (default: `16`)
/// - `CHECKOUT_BACKOFF_BASE_MS`: first retry pause (default: `2`)
/// - `CHECKOUT_BACKOFF_MAX_MS`: retry pause cap (default: `100`)
/// - `CHECKOUT_DEADLINE_MS`: budget for one checkout attempt (default: `5000`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    pub freight: Money,
    pub retry: RetryPolicy,
    pub deadline: Duration,
}

impl CheckoutConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Missing or unparsable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| -> Duration {
            let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
            Duration::from_millis(parse_or(lookup(key), default_ms))
        };

        let freight_cents: i64 =
            parse_or(lookup("CHECKOUT_FREIGHT_CENTS"), defaults.freight.cents());
        let max_attempts = parse_or(lookup("CHECKOUT_MAX_ATTEMPTS"), defaults.retry.max_attempts);
        let base_delay = millis("CHECKOUT_BACKOFF_BASE_MS", defaults.retry.base_delay);
        let max_delay = millis("CHECKOUT_BACKOFF_MAX_MS", defaults.retry.max_delay);
        let deadline = millis("CHECKOUT_DEADLINE_MS", defaults.deadline);

        Self {
            freight: Money::from_cents(freight_cents),
            retry: RetryPolicy::new(max_attempts, base_delay, max_delay),
            deadline,
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            freight: Money::from_cents(1000),
            retry: RetryPolicy::default(),
            deadline: Duration::from_millis(5000),
        }
    }
}
