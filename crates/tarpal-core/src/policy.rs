//! # Engine Policies
//!
//! Named switches for the behaviors where the order engine has two
//! defensible answers. The defaults keep stock and payment math strict;
//! the alternatives exist so both behaviors stay pinned by tests.
//!
//! | Policy                 | Default     | Alternative                         |
//! |------------------------|-------------|-------------------------------------|
//! | [`TierPolicy`]         | `Snapshot`  | `Current`: re-query customer tier   |
//! | [`OverpaymentPolicy`]  | `Clamp`     | `Allow`: balance may go negative    |
//! | [`ItemReplacementStock`]| `Ignore`   | `Reconcile`: apply quantity deltas  |

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

fn not_allowed(field: &str, allowed: &[&str]) -> ValidationError {
    ValidationError::NotAllowed {
        field: field.to_string(),
        allowed: allowed.iter().map(|s| s.to_string()).collect(),
    }
}

/// Which tier prices an order edit that replaces items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierPolicy {
    /// Tier stored on the order at creation.
    #[default]
    Snapshot,
    /// Tier on the customer record right now.
    Current,
}

impl FromStr for TierPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "snapshot" => Ok(TierPolicy::Snapshot),
            "current" => Ok(TierPolicy::Current),
            _ => Err(not_allowed("tier_policy", &["snapshot", "current"])),
        }
    }
}

/// Whether incremental payments may push `amount_paid` past `net_payable`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverpaymentPolicy {
    /// `amount_paid` never exceeds `net_payable`.
    #[default]
    Clamp,
    /// Payments accumulate unclamped; `balance_remaining` may go negative
    /// and the order still reads `Paid`.
    Allow,
}

impl OverpaymentPolicy {
    #[inline]
    pub const fn clamps(&self) -> bool {
        matches!(self, OverpaymentPolicy::Clamp)
    }
}

impl FromStr for OverpaymentPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clamp" => Ok(OverpaymentPolicy::Clamp),
            "allow" => Ok(OverpaymentPolicy::Allow),
            _ => Err(not_allowed("overpayment", &["clamp", "allow"])),
        }
    }
}

/// What replacing an order's items does to stock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemReplacementStock {
    /// Items are rewritten as a data correction; stock is left alone.
    #[default]
    Ignore,
    /// The per-product quantity difference goes through the stock ledger.
    Reconcile,
}

impl FromStr for ItemReplacementStock {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(ItemReplacementStock::Ignore),
            "reconcile" => Ok(ItemReplacementStock::Reconcile),
            _ => Err(not_allowed("item_replacement_stock", &["ignore", "reconcile"])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(TierPolicy::default(), TierPolicy::Snapshot);
        assert_eq!(OverpaymentPolicy::default(), OverpaymentPolicy::Clamp);
        assert_eq!(ItemReplacementStock::default(), ItemReplacementStock::Ignore);
    }

    #[test]
    fn test_parse() {
        assert_eq!("CURRENT".parse::<TierPolicy>().unwrap(), TierPolicy::Current);
        assert_eq!("allow".parse::<OverpaymentPolicy>().unwrap(), OverpaymentPolicy::Allow);
        assert_eq!(
            " reconcile".parse::<ItemReplacementStock>().unwrap(),
            ItemReplacementStock::Reconcile
        );
        assert!("sometimes".parse::<OverpaymentPolicy>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let parsed: OverpaymentPolicy = serde_json::from_str("\"allow\"").unwrap();
        assert_eq!(parsed, OverpaymentPolicy::Allow);
        assert_eq!(serde_json::to_string(&TierPolicy::Snapshot).unwrap(), "\"snapshot\"");
    }
}
