//! # Order Module
//!
//! Pure rules for turning an order request into something the database
//! layer can persist: customer resolution, line validation, exact pricing
//! and transaction numbers.
//!
//! ## Order Flow (pure part)
//! ```text
//! OrderRequest (JSON)
//!      │ into_draft()          ← validation, no I/O
//!      ▼
//! OrderDraft { customer: CustomerResolution, payment_method, lines }
//!      │ requested_quantities() ← duplicate product lines merged
//!      ▼
//! pos-db loads products ──► PricedLine per line (name + price snapshot)
//!      │ order_total()
//!      ▼
//! total_amount (Money, exact)
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::Product;
use crate::validation::{
    blank_to_none, validate_email, validate_id, validate_name, validate_payment_method,
    validate_phone, validate_quantity,
};
use crate::MAX_ORDER_LINES;

/// Timestamp layout used inside transaction numbers.
pub const TRX_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Suffix appended to an order's trx number for its refund ledger entries.
pub const REFUND_SUFFIX: &str = "-REFUND";

/// Ledger reason for stock taken by an order.
pub const ORDER_REASON: &str = "Order";

/// Ledger reason for stock returned by a refund.
pub const REFUND_REASON: &str = "Refund";

// =============================================================================
// Request Shape
// =============================================================================

/// How the order's customer is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    Guest,
    Member,
    New,
}

/// Payload for registering a customer while ringing up an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl NewCustomer {
    /// Trims and validates, turning blank optionals into `None`.
    pub fn validated(self) -> CoreResult<NewCustomer> {
        let name = validate_name("customer.name", &self.name, 100)?;
        let phone = blank_to_none(self.phone)
            .map(|p| validate_phone(&p))
            .transpose()?;
        let email = blank_to_none(self.email)
            .map(|e| validate_email(&e))
            .transpose()?;
        Ok(NewCustomer { name, phone, email })
    }
}

/// One requested line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLineRequest {
    pub product_id: i64,
    pub quantity: i64,
}

/// Body of `POST /transaction/order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderRequest {
    #[serde(rename = "type")]
    pub customer_type: CustomerType,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub customer: Option<NewCustomer>,
    pub payment_method: String,
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
}

// =============================================================================
// Draft
// =============================================================================

/// Who the order is for, after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerResolution {
    /// Walk-in sale, no customer row.
    Guest,
    /// Existing customer id; existence is checked inside the unit of work.
    Member(i64),
    /// Customer created in the same unit of work as the order.
    New(NewCustomer),
}

/// A validated order, ready for the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub customer: CustomerResolution,
    pub payment_method: String,
    pub lines: Vec<OrderLineRequest>,
}

impl OrderRequest {
    /// Validates the request without touching storage.
    ///
    /// ## Errors
    /// - `items` empty → `Required { field: "items" }`
    /// - more than [`MAX_ORDER_LINES`] lines → `TooManyLines`
    /// - `member` without `customer_id`, `new` without `customer`
    /// - any quantity outside `1..=MAX_ITEM_QUANTITY`
    pub fn into_draft(self) -> CoreResult<OrderDraft> {
        let payment_method = validate_payment_method(&self.payment_method)?;

        if self.items.is_empty() {
            return Err(ValidationError::required("items").into());
        }
        if self.items.len() > MAX_ORDER_LINES {
            return Err(CoreError::TooManyLines {
                max: MAX_ORDER_LINES,
            });
        }
        for line in &self.items {
            validate_id("product_id", line.product_id)?;
            validate_quantity(line.quantity)?;
        }

        let customer = match self.customer_type {
            CustomerType::Guest => CustomerResolution::Guest,
            CustomerType::Member => {
                let id = self
                    .customer_id
                    .ok_or_else(|| ValidationError::required("customer_id"))?;
                validate_id("customer_id", id)?;
                CustomerResolution::Member(id)
            }
            CustomerType::New => {
                let customer = self
                    .customer
                    .ok_or_else(|| ValidationError::required("customer"))?;
                CustomerResolution::New(customer.validated()?)
            }
        };

        Ok(OrderDraft {
            customer,
            payment_method,
            lines: self.items,
        })
    }
}

impl OrderDraft {
    /// Total requested quantity per product, so that two lines for the same
    /// product are checked against stock together.
    pub fn requested_quantities(&self) -> BTreeMap<i64, i64> {
        let mut totals = BTreeMap::new();
        for line in &self.lines {
            *totals.entry(line.product_id).or_insert(0) += line.quantity;
        }
        totals
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// A line with the product snapshot taken at transaction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: i64,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
}

impl PricedLine {
    /// Snapshots a product's current name and stored price.
    pub fn snapshot(product: &Product, quantity: i64) -> Self {
        PricedLine {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
        }
    }

    pub fn line_total(&self) -> CoreResult<Money> {
        self.unit_price
            .checked_multiply_quantity(self.quantity)
            .ok_or_else(|| CoreError::AmountOverflow {
                context: format!("line total for product {}", self.product_id),
            })
    }
}

/// Exact Σ(unit_price × quantity).
///
/// ## Example
/// ```rust
/// use pos_core::money::Money;
/// use pos_core::order::{order_total, PricedLine};
///
/// let lines = vec![
///     PricedLine { product_id: 1, name: "A".into(), unit_price: Money::from_cents(1000), quantity: 2 },
///     PricedLine { product_id: 2, name: "B".into(), unit_price: Money::from_cents(500), quantity: 1 },
/// ];
/// assert_eq!(order_total(&lines).unwrap().to_decimal_string(), "25.00");
/// ```
pub fn order_total(lines: &[PricedLine]) -> CoreResult<Money> {
    lines.iter().try_fold(Money::zero(), |acc, line| {
        acc.checked_add(line.line_total()?)
            .ok_or_else(|| CoreError::AmountOverflow {
                context: "order total".to_string(),
            })
    })
}

/// Fails with `InsufficientStock` unless `requested` units are available.
pub fn ensure_stock(product: &Product, requested: i64) -> CoreResult<()> {
    if product.stock < requested {
        return Err(CoreError::InsufficientStock {
            product_id: product.id,
            available: product.stock,
            requested,
        });
    }
    Ok(())
}

// =============================================================================
// Identifiers
// =============================================================================

/// Builds an order's transaction number: `TRX-{customer|0}-{YYYYMMDDhhmmss}-{actor}`.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use pos_core::order::compose_trx_number;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
/// assert_eq!(compose_trx_number(Some(12), at, 3), "TRX-12-20240309140507-3");
/// assert_eq!(compose_trx_number(None, at, 3), "TRX-0-20240309140507-3");
/// ```
pub fn compose_trx_number(customer_id: Option<i64>, at: DateTime<Utc>, actor: i64) -> String {
    format!(
        "TRX-{}-{}-{}",
        customer_id.unwrap_or(0),
        at.format(TRX_TIME_FORMAT),
        actor
    )
}

/// Disambiguates a trx number already taken within the same second.
pub fn with_sequence(trx_number: &str, sequence: u32) -> String {
    format!("{trx_number}-{sequence}")
}

/// Ledger reference for a refund of `trx_number`.
pub fn refund_reference(trx_number: &str) -> String {
    format!("{trx_number}{REFUND_SUFFIX}")
}

/// Ledger reference for a manual stock adjustment: `TRX-{YYYYMMDDhhmmss}-{actor}`.
pub fn adjustment_reference(at: DateTime<Utc>, actor: i64) -> String {
    format!("TRX-{}-{}", at.format(TRX_TIME_FORMAT), actor)
}

/// Member code for the n-th registered customer.
///
/// ```rust
/// use pos_core::order::member_code;
///
/// assert_eq!(member_code(42), "MBR-000042");
/// ```
pub fn member_code(sequence: i64) -> String {
    format!("MBR-{sequence:06}")
}

// =============================================================================
// Unit Tests
// =============================================================================
