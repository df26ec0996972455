//! Application configuration loaded from environment variables.

use checkout::CheckoutConfig;

/// Simulator configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory store when unset
/// - `SIM_CUSTOMERS`: number of concurrent buyers (default: `8`)
/// - `SIM_STOCK`: initial stock of the hot SKU (default: `20`)
/// - `SIM_QUANTITY`: units each buyer orders (default: `3`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
///
/// Checkout tuning is read from the same source, see [`CheckoutConfig`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub customers: usize,
    pub stock: u32,
    pub quantity: u32,
    pub log_level: String,
    pub checkout: CheckoutConfig,
}

impl AppConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the simulator settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            customers: lookup("SIM_CUSTOMERS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.customers),
            stock: lookup("SIM_STOCK")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.stock),
            quantity: lookup("SIM_QUANTITY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.quantity),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            checkout: CheckoutConfig::from_lookup(lookup),
        }
    }

    /// Returns how many buyers can be served from the initial stock.
    pub fn expected_orders(&self) -> usize {
        if self.quantity == 0 {
            return 0;
        }
        let servable = usize::try_from(self.stock / self.quantity).unwrap_or(usize::MAX);
        servable.min(self.customers)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            customers: 8,
            stock: 20,
            quantity: 3,
            log_level: "info".to_string(),
            checkout: CheckoutConfig::default(),
        }
    }
}
