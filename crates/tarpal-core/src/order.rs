//! # Order Header Rules
//!
//! Pure state transitions for an order header: creation, payment changes,
//! discount changes, cancellation. Nothing here touches storage; the
//! engine in `tarpal-db` loads a header, calls one of these, then
//! persists the result once.
//!
//! ## Status Derivation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  balance = net_payable - amount_paid                                    │
//! │                                                                         │
//! │  amount_paid == 0 ───────► Unpaid          / Pending                    │
//! │  balance      > 0 ───────► Partially Paid  / Processing                 │
//! │  otherwise        ───────► Paid            / Completed                  │
//! │                                                                         │
//! │  Cancelled is set by cancel() only and is never re-derived.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two Payment Paths
//! - [`Order::set_amount_paid`]: absolute overwrite, always capped at
//!   `net_payable`. Used by order edits.
//! - [`Order::add_payment`]: increment. Capped only under
//!   [`OverpaymentPolicy::Clamp`].

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::policy::OverpaymentPolicy;
use crate::pricing::{lines_total, PricedLine};
use crate::validation::{amount_out_of_range, validate_amount_cents};
use crate::types::{
    CustomerTier, Order, OrderStatus, PaymentRecord, PaymentStatus, StatusChange,
};

// =============================================================================
// Status Derivation
// =============================================================================

/// Payment and order status for a given paid amount and amount owed.
///
/// ```rust
/// use tarpal_core::order::derive_status;
/// use tarpal_core::{Money, OrderStatus, PaymentStatus};
///
/// let net = Money::from_major(300);
/// assert_eq!(
///     derive_status(Money::zero(), net),
///     (PaymentStatus::Unpaid, OrderStatus::Pending)
/// );
/// assert_eq!(
///     derive_status(Money::from_major(150), net),
///     (PaymentStatus::PartiallyPaid, OrderStatus::Processing)
/// );
/// assert_eq!(
///     derive_status(Money::from_major(300), net),
///     (PaymentStatus::Paid, OrderStatus::Completed)
/// );
/// ```
pub fn derive_status(amount_paid: Money, net_payable: Money) -> (PaymentStatus, OrderStatus) {
    let balance = net_payable - amount_paid;
    if amount_paid.is_zero() {
        (PaymentStatus::Unpaid, OrderStatus::Pending)
    } else if balance.is_positive() {
        (PaymentStatus::PartiallyPaid, OrderStatus::Processing)
    } else {
        (PaymentStatus::Paid, OrderStatus::Completed)
    }
}

// =============================================================================
// Order Code
// =============================================================================

/// Prefix of every order code.
pub const ORDER_CODE_PREFIX: &str = "#ORD-";

/// Length of the random suffix.
pub const ORDER_CODE_SUFFIX_LEN: usize = 4;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates a fresh `#ORD-xxxx` code.
///
/// Uniqueness is enforced by the database; callers retry on collision.
pub fn generate_order_code() -> String {
    let mut seed = uuid::Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(ORDER_CODE_SUFFIX_LEN);
    for _ in 0..ORDER_CODE_SUFFIX_LEN {
        suffix.push(BASE36[(seed % 36) as usize] as char);
        seed /= 36;
    }
    format!("{}{}", ORDER_CODE_PREFIX, suffix)
}

/// Checks the `#ORD-xxxx` shape.
pub fn is_order_code(code: &str) -> bool {
    match code.strip_prefix(ORDER_CODE_PREFIX) {
        Some(suffix) => {
            suffix.len() == ORDER_CODE_SUFFIX_LEN
                && suffix
                    .chars()
                    .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        }
        None => false,
    }
}

// =============================================================================
// Header Construction
// =============================================================================

/// Everything needed to build a new order header.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: String,
    pub order_code: String,
    pub customer_id: String,
    pub customer_tier: CustomerTier,
    pub created_by: Option<String>,
    pub discount: Money,
    pub initial_amount_paid: Money,
    pub special_instructions: Option<String>,
}

fn validate_discount(discount: Money, total: Money) -> CoreResult<()> {
    if discount.is_negative() {
        return Err(ValidationError::Negative {
            field: "discount".to_string(),
        }
        .into());
    }
    if discount > total {
        return Err(CoreError::DiscountExceedsTotal {
            discount_cents: discount.cents(),
            total_cents: total.cents(),
        });
    }
    Ok(())
}

fn validate_amount(field: &str, amount: Money) -> CoreResult<()> {
    validate_amount_cents(field, amount.cents())?;
    Ok(())
}

impl Order {
    /// Builds a staff-created order from priced lines.
    ///
    /// The initial payment is capped at `net_payable`, and the status
    /// history starts with the single derived status.
    pub fn create(new: NewOrder, lines: &[PricedLine], now: DateTime<Utc>) -> CoreResult<Self> {
        let total = lines_total(lines)?;
        validate_discount(new.discount, total)?;
        validate_amount("amount_paid", new.initial_amount_paid)?;

        let net = total - new.discount;
        let paid = new.initial_amount_paid.at_most(net);
        let (payment_status, status) = derive_status(paid, net);

        Ok(Order {
            id: new.id,
            order_code: new.order_code,
            customer_id: new.customer_id,
            customer_tier: new.customer_tier,
            created_by: new.created_by,
            total_amount_cents: total.cents(),
            discount_cents: new.discount.cents(),
            net_payable_cents: net.cents(),
            payment: PaymentRecord {
                amount_paid_cents: paid.cents(),
                balance_remaining_cents: (net - paid).cents(),
                payment_status,
            },
            status,
            status_history: vec![StatusChange {
                status,
                changed_at: now,
            }],
            special_instructions: new.special_instructions,
            created_at: now,
            updated_at: now,
        })
    }

    /// Builds the order spawned by an approved order request.
    ///
    /// Approved orders start as `Processing` with nothing paid, bypassing
    /// derivation. The next payment or edit re-derives normally.
    pub fn from_approved_request(
        new: NewOrder,
        lines: &[PricedLine],
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let total = lines_total(lines)?;
        validate_discount(new.discount, total)?;
        let net = total - new.discount;

        Ok(Order {
            id: new.id,
            order_code: new.order_code,
            customer_id: new.customer_id,
            customer_tier: new.customer_tier,
            created_by: new.created_by,
            total_amount_cents: total.cents(),
            discount_cents: new.discount.cents(),
            net_payable_cents: net.cents(),
            payment: PaymentRecord {
                amount_paid_cents: 0,
                balance_remaining_cents: net.cents(),
                payment_status: PaymentStatus::Unpaid,
            },
            status: OrderStatus::Processing,
            status_history: vec![StatusChange {
                status: OrderStatus::Processing,
                changed_at: now,
            }],
            special_instructions: new.special_instructions,
            created_at: now,
            updated_at: now,
        })
    }

    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn net_payable(&self) -> Money {
        Money::from_cents(self.net_payable_cents)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Fails with `OrderClosed` when the order is in a terminal status.
    pub fn ensure_open(&self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::OrderClosed {
                order_code: self.order_code.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Recomputes `net_payable`, `balance_remaining` and both statuses.
    ///
    /// Appends to `status_history` only when the order status changes.
    /// Returns `true` if it did.
    pub fn recompute(&mut self, policy: OverpaymentPolicy, now: DateTime<Utc>) -> bool {
        let net = self.total_amount() - self.discount();
        let mut paid = self.payment.amount_paid();
        if policy.clamps() {
            paid = paid.at_most(net).non_negative();
        }

        let (payment_status, derived) = derive_status(paid, net);
        self.net_payable_cents = net.cents();
        self.payment = PaymentRecord {
            amount_paid_cents: paid.cents(),
            balance_remaining_cents: (net - paid).cents(),
            payment_status,
        };
        self.updated_at = now;

        if self.status.is_terminal() || self.status == derived {
            return false;
        }
        self.status = derived;
        self.status_history.push(StatusChange {
            status: derived,
            changed_at: now,
        });
        true
    }

    /// Replaces the line total (after an item replacement).
    ///
    /// The current discount must still fit under the new total.
    pub fn set_total_amount(&mut self, total: Money) -> CoreResult<()> {
        self.set_totals(total, self.discount())
    }

    /// Overwrites the absolute discount.
    pub fn set_discount(&mut self, discount: Money) -> CoreResult<()> {
        self.set_totals(self.total_amount(), discount)
    }

    /// Sets line total and discount together, so an edit that changes
    /// both is checked against the new pair only.
    pub fn set_totals(&mut self, total: Money, discount: Money) -> CoreResult<()> {
        validate_discount(discount, total)?;
        self.total_amount_cents = total.cents();
        self.discount_cents = discount.cents();
        Ok(())
    }

    /// Absolute overwrite of `amount_paid`, capped at the current
    /// `net_payable`. Call [`Order::recompute`] afterwards.
    pub fn set_amount_paid(&mut self, amount: Money) -> CoreResult<Money> {
        validate_amount("amount_paid", amount)?;
        let net = self.total_amount() - self.discount();
        let applied = amount.at_most(net.non_negative());
        self.payment.amount_paid_cents = applied.cents();
        Ok(applied)
    }

    /// Adds a payment to the running `amount_paid` and re-derives status.
    ///
    /// A zero amount is accepted and only re-derives.
    pub fn add_payment(
        &mut self,
        amount: Money,
        policy: OverpaymentPolicy,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_open()?;
        validate_amount("amount", amount)?;
        let paid = self
            .payment
            .amount_paid()
            .checked_add(amount)
            .ok_or_else(|| amount_out_of_range("amount_paid"))?;
        validate_amount("amount_paid", paid)?;
        self.payment.amount_paid_cents = paid.cents();
        self.recompute(policy, now);
        Ok(())
    }

    /// Moves the order to `Cancelled`. Terminal.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_open()?;
        self.status = OrderStatus::Cancelled;
        self.status_history.push(StatusChange {
            status: OrderStatus::Cancelled,
            changed_at: now,
        });
        self.updated_at = now;
        Ok(())
    }
}

/// Only `Cancelled` may be requested explicitly; every other status is
/// derived from payments.
pub fn check_requested_status(status: OrderStatus) -> CoreResult<()> {
    if status == OrderStatus::Cancelled {
        Ok(())
    } else {
        Err(CoreError::DerivedStatus(status.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
