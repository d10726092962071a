//! # Application Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TARPAL_DB_PATH=/var/lib/tarpal/tarpal.db                           │
//! │     TARPAL_OVERPAYMENT=allow                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ./tarpal.toml (or the path passed to load)                         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "./tarpal.db"
//! max_connections = 5
//!
//! [engine]
//! tier_policy = "snapshot"          # snapshot | current
//! overpayment = "clamp"             # clamp | allow
//! item_replacement_stock = "ignore" # ignore | reconcile
//! order_code_attempts = 8
//!
//! [inventory]
//! low_stock_threshold = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use tarpal_core::{
    ItemReplacementStock, OverpaymentPolicy, TierPolicy, DEFAULT_LOW_STOCK_THRESHOLD,
};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./tarpal.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Engine Settings
// =============================================================================

/// Behavior switches for the order engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tier used to reprice replaced order items.
    #[serde(default)]
    pub tier_policy: TierPolicy,

    /// Whether incremental payments may exceed the amount owed.
    #[serde(default)]
    pub overpayment: OverpaymentPolicy,

    /// Whether replacing order items touches stock.
    #[serde(default)]
    pub item_replacement_stock: ItemReplacementStock,

    /// How many fresh order codes to try before giving up.
    #[serde(default = "default_order_code_attempts")]
    pub order_code_attempts: u32,
}

fn default_order_code_attempts() -> u32 {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tier_policy: TierPolicy::default(),
            overpayment: OverpaymentPolicy::default(),
            item_replacement_stock: ItemReplacementStock::default(),
            order_code_attempts: default_order_code_attempts(),
        }
    }
}

// =============================================================================
// Inventory Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySettings {
    /// Products with `0 < stock < threshold` count as low stock in reports.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_low_stock_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

impl Default for InventorySettings {
    fn default() -> Self {
        InventorySettings {
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub inventory: InventorySettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`tarpal.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        let path = config_path.unwrap_or_else(|| PathBuf::from("tarpal.toml"));
        if path.exists() {
            info!(?path, "Loading config from file");
            let contents =
                std::fs::read_to_string(&path).map_err(|e| DbError::Config(e.to_string()))?;
            config = Self::from_toml(&contents)?;
        } else {
            debug!(?path, "Config file not found, using defaults");
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document. Missing sections fall back to defaults.
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        toml::from_str(contents).map_err(|e| DbError::Config(e.to_string()))
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.database.max_connections == 0 {
            return Err(DbError::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.engine.order_code_attempts == 0 {
            return Err(DbError::Config(
                "order_code_attempts must be greater than 0".into(),
            ));
        }

        if self.inventory.low_stock_threshold < 1 {
            return Err(DbError::Config(
                "low_stock_threshold must be at least 1".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `TARPAL_*` overrides from any key lookup. Unparseable
    /// values are logged and ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TARPAL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("TARPAL_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid TARPAL_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(policy) = lookup("TARPAL_TIER_POLICY") {
            match policy.parse() {
                Ok(p) => self.engine.tier_policy = p,
                Err(e) => warn!(error = %e, "Ignoring invalid TARPAL_TIER_POLICY"),
            }
        }

        if let Some(policy) = lookup("TARPAL_OVERPAYMENT") {
            match policy.parse() {
                Ok(p) => self.engine.overpayment = p,
                Err(e) => warn!(error = %e, "Ignoring invalid TARPAL_OVERPAYMENT"),
            }
        }

        if let Some(policy) = lookup("TARPAL_ITEM_REPLACEMENT_STOCK") {
            match policy.parse() {
                Ok(p) => self.engine.item_replacement_stock = p,
                Err(e) => warn!(error = %e, "Ignoring invalid TARPAL_ITEM_REPLACEMENT_STOCK"),
            }
        }

        if let Some(threshold) = lookup("TARPAL_LOW_STOCK_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(t) => self.inventory.low_stock_threshold = t,
                Err(_) => warn!(value = %threshold, "Ignoring invalid TARPAL_LOW_STOCK_THRESHOLD"),
            }
        }
    }

    /// Pool configuration carrying the engine switches.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .engine(self.engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.engine.overpayment, OverpaymentPolicy::Clamp);
        assert_eq!(config.engine.tier_policy, TierPolicy::Snapshot);
        assert_eq!(config.engine.order_code_attempts, 8);
        assert_eq!(config.inventory.low_stock_threshold, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            [engine]
            overpayment = "allow"
            item_replacement_stock = "reconcile"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.overpayment, OverpaymentPolicy::Allow);
        assert_eq!(
            config.engine.item_replacement_stock,
            ItemReplacementStock::Reconcile
        );
        assert_eq!(config.engine.order_code_attempts, 8);
        assert_eq!(config.database.path, PathBuf::from("./tarpal.db"));
    }

    #[test]
    fn test_bad_toml_value() {
        let err = AppConfig::from_toml("[engine]\noverpayment = \"never\"").unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("TARPAL_DB_PATH", "/tmp/override.db"),
            ("TARPAL_TIER_POLICY", "current"),
            ("TARPAL_OVERPAYMENT", "bogus"),
            ("TARPAL_LOW_STOCK_THRESHOLD", "25"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/override.db"));
        assert_eq!(config.engine.tier_policy, TierPolicy::Current);
        assert_eq!(config.engine.overpayment, OverpaymentPolicy::Clamp);
        assert_eq!(config.inventory.low_stock_threshold, 25);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.engine.order_code_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("overpayment = \"clamp\""));
    }
}
