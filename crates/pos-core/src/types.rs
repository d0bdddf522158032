//! # Domain Types
//!
//! Core domain types used throughout Till POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │   OrderItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──┼─ via items ─────┼──►│  order_id (FK)  │       │
//! │  │  name           │   │  trx_number     │   │  old_product    │       │
//! │  │  price (Money)  │   │  total_amount   │   │  unit_price     │       │
//! │  │  stock          │   │  status         │   │  quantity       │       │
//! │  └────────┬────────┘   └────────┬────────┘   └─────────────────┘       │
//! │           │                     │                                       │
//! │  ┌────────▼────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │ ProductHistory  │   │     Refund      │   │    Customer     │       │
//! │  │  (stock ledger) │   │  order_id (FK)  │   │  member_code    │       │
//! │  │  in / out       │   │  reason         │   │  phone / email  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `OrderItem` copies the product name and price at transaction time. Later
//! renames, price changes or deletions never rewrite an order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_PAGE_LIMIT;

// =============================================================================
// Role
// =============================================================================

/// What a user account is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages users and catalog.
    Admin,
    /// Rings up orders and refunds.
    Cashier,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::Cashier];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cashier => "cashier",
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "cashier" => Ok(Role::Cashier),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: Role::ALL.iter().map(|r| r.as_str().to_string()).collect(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle of an order.
///
/// ```text
/// Order ──refund──► Refunded   (terminal, never reversed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Paid and stock taken.
    Order,
    /// Stock returned, refund recorded.
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Order => "order",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Whether a refund may be applied in this state.
    pub fn can_refund(&self) -> bool {
        matches!(self, OrderStatus::Order)
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "order" => Ok(OrderStatus::Order),
            "refunded" => Ok(OrderStatus::Refunded),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["order".to_string(), "refunded".to_string()],
            }),
        }
    }
}

// =============================================================================
// Stock Direction
// =============================================================================

/// Direction of a stock ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockDirection {
    /// Stock received or returned.
    In,
    /// Stock sold or written off.
    Out,
}

impl StockDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockDirection::In => "in",
            StockDirection::Out => "out",
        }
    }

    /// Signed ledger change for a positive quantity.
    ///
    /// ```rust
    /// use pos_core::StockDirection;
    ///
    /// assert_eq!(StockDirection::In.signed(3), 3);
    /// assert_eq!(StockDirection::Out.signed(3), -3);
    /// ```
    pub fn signed(&self, quantity: i64) -> i64 {
        match self {
            StockDirection::In => quantity,
            StockDirection::Out => -quantity,
        }
    }
}

impl FromStr for StockDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "in" => Ok(StockDirection::In),
            "out" => Ok(StockDirection::Out),
            _ => Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec!["in".to_string(), "out".to_string()],
            }),
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub deleted_by: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Display name, copied into order items at sale time.
    pub name: String,

    /// Current shelf price.
    #[ts(type = "string")]
    pub price: Money,

    /// Units on hand. Never negative.
    pub stock: i64,

    pub category_id: Option<i64>,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub deleted_by: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Soft-deleted products stay in history but cannot be sold.
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Checks if `quantity` units can be taken from stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        !self.is_deleted() && self.stock >= quantity
    }
}

// =============================================================================
// People
// =============================================================================

/// A registered customer (member).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    /// Generated, unique, e.g. `MBR-000042`.
    pub member_code: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub deleted_by: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Customer {
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A staff account.
///
/// `password_hash` and `current_token` never leave the server.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub password_hash: String,
    pub role: Role,
    pub full_name: String,
    #[serde(skip_serializing)]
    #[ts(skip)]
    pub current_token: Option<String>,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub deleted_by: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// =============================================================================
// Orders
// =============================================================================

/// A completed (or refunded) sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: i64,

    /// Human-readable unique reference, see [`crate::order::compose_trx_number`].
    pub trx_number: String,

    pub cashier_id: i64,
    pub customer_id: Option<i64>,

    /// Σ(unit_price × quantity) at creation time.
    #[ts(type = "string")]
    pub total_amount: Money,

    pub payment_method: String,
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub order_date: DateTime<Utc>,
    pub updated_by: Option<i64>,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,

    /// Weak reference; NULL once the product is hard deleted.
    pub product_id: Option<i64>,

    /// Product name at transaction time.
    pub old_product: String,

    pub quantity: i64,

    /// Product price at transaction time.
    #[ts(type = "string")]
    pub unit_price: Money,

    pub created_by: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Refund record. One per refunded order, guarded by [`OrderStatus`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Refund {
    pub id: i64,
    pub order_id: i64,
    pub reason: String,
    #[ts(as = "String")]
    pub refund_at: DateTime<Utc>,
    pub created_by: i64,
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// Append-only stock ledger entry.
///
/// ## Invariant
/// Replaying every entry of a product in creation order reproduces its
/// current stock. `quantity_change` is signed: positive for `in`,
/// negative for `out`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductHistory {
    pub id: i64,
    pub trx_ref: String,
    pub product_id: Option<i64>,
    pub quantity_change: i64,
    #[serde(rename = "type")]
    pub direction: StockDirection,
    pub reason: String,
    pub created_by: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Sums a product's ledger entries.
///
/// ```rust
/// use pos_core::types::replay_stock;
///
/// assert_eq!(replay_stock([10, -2, -1, 3]), 10);
/// ```
pub fn replay_stock<I: IntoIterator<Item = i64>>(changes: I) -> i64 {
    changes.into_iter().sum()
}

// =============================================================================
// Pagination
// =============================================================================

/// Page request with 1-based page numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const DEFAULT_PAGE: i64 = 1;
    pub const DEFAULT_LIMIT: i64 = 10;

    /// Builds a page request, filling defaults for absent values.
    ///
    /// ```rust
    /// use pos_core::PageRequest;
    ///
    /// let page = PageRequest::new(None, None).unwrap();
    /// assert_eq!((page.page, page.limit, page.offset()), (1, 10, 0));
    ///
    /// let page = PageRequest::new(Some(3), Some(20)).unwrap();
    /// assert_eq!(page.offset(), 40);
    ///
    /// assert!(PageRequest::new(Some(0), None).is_err());
    /// ```
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self, ValidationError> {
        let page = page.unwrap_or(Self::DEFAULT_PAGE);
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT);

        if page < 1 {
            return Err(ValidationError::MustBePositive {
                field: "page".to_string(),
            });
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(ValidationError::OutOfRange {
                field: "limit".to_string(),
                min: 1,
                max: MAX_PAGE_LIMIT,
            });
        }

        Ok(PageRequest { page, limit })
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// One page of results plus the total row count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        Paginated {
            items,
            page: request.page,
            limit: request.limit,
            total,
        }
    }

    /// Converts every item, keeping the page metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64) -> Product {
        Product {
            id: 1,
            name: "Kopi Susu".to_string(),
            price: Money::from_cents(1500),
            stock,
            category_id: None,
            created_by: Some(1),
            updated_by: None,
            deleted_by: None,
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_can_sell() {
        let p = product(3);
        assert!(p.can_sell(3));
        assert!(!p.can_sell(4));

        let deleted = Product {
            deleted_at: Some(Utc::now()),
            ..product(10)
        };
        assert!(!deleted.can_sell(1));
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&OrderStatus::Refunded).unwrap(), "\"refunded\"");
        assert_eq!(serde_json::to_string(&StockDirection::Out).unwrap(), "\"out\"");
        assert_eq!("cashier".parse::<Role>().unwrap(), Role::Cashier);
        assert!("manager".parse::<Role>().is_err());
        assert!(!OrderStatus::Refunded.can_refund());
    }

    #[test]
    fn test_history_serializes_direction_as_type() {
        let entry = ProductHistory {
            id: 1,
            trx_ref: "TRX-0-20240101120000-1".to_string(),
            product_id: Some(1),
            quantity_change: -2,
            direction: StockDirection::Out,
            reason: "Order".to_string(),
            created_by: 1,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "out");
        assert_eq!(value["quantity_change"], -2);
    }

    #[test]
    fn test_user_hides_secrets() {
        let user = User {
            id: 1,
            username: "admin".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Admin,
            full_name: "Admin".to_string(),
            current_token: Some("token".to_string()),
            created_by: None,
            updated_by: None,
            deleted_by: None,
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert!(value.get("current_token").is_none());
        assert_eq!(value["role"], "admin");
    }

    #[test]
    fn test_page_limit_bounds() {
        assert!(PageRequest::new(Some(1), Some(0)).is_err());
        assert!(PageRequest::new(Some(1), Some(MAX_PAGE_LIMIT + 1)).is_err());
        assert_eq!(PageRequest::default().offset(), 0);
    }
}
