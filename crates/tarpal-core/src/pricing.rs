//! # Pricing Resolution
//!
//! Turns `(tier, product, quantity)` into a frozen order line price.
//!
//! ## Tier Selection
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  Customer.tier ──► resolve_unit_price ──► OrderItem.unit_price │
//! │                                                                │
//! │   Wholesaler ───────► product.price_wholesale                  │
//! │   Retailer   ───────► product.price_retail                     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The resolved price is written onto the order line once. Changing the
//! product's price later never reprices an existing line.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{CustomerTier, Product};
use crate::validation::{amount_out_of_range, validate_amount_cents, ValidationResult};

/// Unit price a customer of `tier` pays for `product`.
#[inline]
pub fn resolve_unit_price(tier: CustomerTier, product: &Product) -> Money {
    match tier {
        CustomerTier::Wholesaler => product.price_wholesale(),
        CustomerTier::Retailer => product.price_retail(),
    }
}

/// An order line after price resolution, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
}

impl PricedLine {
    /// Fails with `OutOfRange` when the line total leaves the money range.
    pub fn new(tier: CustomerTier, product: &Product, quantity: i64) -> ValidationResult<Self> {
        let unit_price = resolve_unit_price(tier, product);
        let total_price = unit_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| amount_out_of_range("line_total"))?;
        validate_amount_cents("line_total", total_price.cents())?;

        Ok(PricedLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_price,
            total_price,
        })
    }
}

/// Sum of line totals, before discount.
pub fn lines_total(lines: &[PricedLine]) -> ValidationResult<Money> {
    let total = lines.iter().try_fold(Money::zero(), |acc, l| {
        acc.checked_add(l.total_price)
            .ok_or_else(|| amount_out_of_range("total_amount"))
    })?;
    validate_amount_cents("total_amount", total.cents())?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::types::ProductUnit;
    use crate::MAX_AMOUNT_CENTS;
    use chrono::Utc;

    fn product(retail_cents: i64, wholesale_cents: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "prod-1".to_string(),
            name: "HDPE Tarpaulin 10x12".to_string(),
            description: None,
            category_id: "cat-1".to_string(),
            price_retail_cents: retail_cents,
            price_wholesale_cents: wholesale_cents,
            stock: 10,
            unit: ProductUnit::Piece,
            sku: "TAR-001".to_string(),
            gsm: 120,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_tier_selects_price_field() {
        let sheet = product(10_000, 8_000);
        assert_eq!(resolve_unit_price(CustomerTier::Retailer, &sheet).cents(), 10_000);
        assert_eq!(resolve_unit_price(CustomerTier::Wholesaler, &sheet).cents(), 8_000);
    }

    #[test]
    fn test_wholesale_price_may_exceed_retail() {
        // No relation between the tiers is enforced.
        let odd = product(5_000, 7_500);
        assert_eq!(resolve_unit_price(CustomerTier::Wholesaler, &odd).cents(), 7_500);
        assert_eq!(resolve_unit_price(CustomerTier::Retailer, &odd).cents(), 5_000);
    }

    #[test]
    fn test_priced_line_snapshots_name_and_price() {
        let mut sheet = product(10_000, 8_000);
        let line = PricedLine::new(CustomerTier::Retailer, &sheet, 3).unwrap();

        sheet.price_retail_cents = 99_999;
        sheet.name = "Renamed".to_string();

        assert_eq!(line.unit_price.cents(), 10_000);
        assert_eq!(line.total_price.cents(), 30_000);
        assert_eq!(line.product_name, "HDPE Tarpaulin 10x12");
    }

    #[test]
    fn test_lines_total() {
        let a = product(10_000, 8_000);
        let lines = vec![
            PricedLine::new(CustomerTier::Wholesaler, &a, 2).unwrap(),
            PricedLine::new(CustomerTier::Wholesaler, &a, 1).unwrap(),
        ];
        assert_eq!(lines_total(&lines).unwrap().cents(), 24_000);
        assert_eq!(lines_total(&[]).unwrap(), Money::zero());
    }

    #[test]
    fn test_line_total_outside_money_range_is_rejected() {
        let huge = product(i64::MAX / 2, 1);
        assert!(matches!(
            PricedLine::new(CustomerTier::Retailer, &huge, 3),
            Err(ValidationError::OutOfRange { .. })
        ));

        let dear = product(MAX_AMOUNT_CENTS, 1);
        assert!(PricedLine::new(CustomerTier::Retailer, &dear, 1).is_ok());
        assert!(PricedLine::new(CustomerTier::Retailer, &dear, 2).is_err());
    }

    #[test]
    fn test_order_total_outside_money_range_is_rejected() {
        let dear = product(MAX_AMOUNT_CENTS, 1);
        let lines = vec![
            PricedLine::new(CustomerTier::Retailer, &dear, 1).unwrap(),
            PricedLine::new(CustomerTier::Retailer, &dear, 1).unwrap(),
        ];
        assert!(matches!(
            lines_total(&lines),
            Err(ValidationError::OutOfRange { field, .. }) if field == "total_amount"
        ));
    }
}
