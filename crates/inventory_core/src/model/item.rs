//! Item domain model.
//!
//! # Responsibility
//! - Define the single inventory record persisted in the `items` table.
//! - Provide use-case validation for callers that want to enforce the
//!   stock conventions (non-negative price and quantity).
//!
//! # Invariants
//! - `id` is assigned by the caller and identifies exactly one stored row.
//! - Storage does not enforce `validate()`; only the service layer does.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Primary key of an item row.
///
/// Maps to SQLite `INTEGER PRIMARY KEY`, so it shares the rowid range.
pub type ItemId = i64;

/// One inventory record.
///
/// Equality compares every field, which is what exact-match deletion relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Unit price. Non-negative by convention.
    pub price: f64,
    /// Units in stock. Non-negative by convention.
    pub quantity: i32,
}

/// Validation failures for use-case level writes.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValidationError {
    EmptyName,
    InvalidPrice(f64),
    NegativeQuantity(i32),
    OutOfStock(ItemId),
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "item name cannot be empty"),
            Self::InvalidPrice(price) => {
                write!(f, "item price must be a finite non-negative number, got {price}")
            }
            Self::NegativeQuantity(quantity) => {
                write!(f, "item quantity cannot be negative, got {quantity}")
            }
            Self::OutOfStock(id) => write!(f, "item {id} is out of stock"),
        }
    }
}

impl Error for ItemValidationError {}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, price: f64, quantity: i32) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            quantity,
        }
    }

    /// Checks the stock conventions.
    ///
    /// # Errors
    /// - `EmptyName` when `name` is blank after trimming.
    /// - `InvalidPrice` when `price` is negative, NaN or infinite.
    /// - `NegativeQuantity` when `quantity < 0`.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.name.trim().is_empty() {
            return Err(ItemValidationError::EmptyName);
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ItemValidationError::InvalidPrice(self.price));
        }
        if self.quantity < 0 {
            return Err(ItemValidationError::NegativeQuantity(self.quantity));
        }
        Ok(())
    }

    pub fn is_in_stock(&self) -> bool {
        self.quantity > 0
    }
}
