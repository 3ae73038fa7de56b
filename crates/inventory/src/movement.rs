use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use inventaris_core::{DomainError, DomainResult, Money, TransactionId};
use inventaris_products::Product;

use crate::transaction::StockTransaction;

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Goods received: stock increases by `quantity`.
    In,
    /// Goods issued: stock decreases by `quantity`.
    Out,
    /// Stock count correction: stock is set to `quantity`.
    Adjustment,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
            MovementKind::Adjustment => "adjustment",
        }
    }

    /// Compute the stock level after applying this movement to `current`.
    ///
    /// Never returns a negative level.
    pub fn apply(self, current: i64, quantity: i64) -> DomainResult<i64> {
        match self {
            MovementKind::In => {
                if quantity <= 0 {
                    return Err(DomainError::validation("quantity must be positive"));
                }
                current
                    .checked_add(quantity)
                    .ok_or_else(|| DomainError::validation("stock overflow"))
            }
            MovementKind::Out => {
                if quantity <= 0 {
                    return Err(DomainError::validation("quantity must be positive"));
                }
                if quantity > current {
                    return Err(DomainError::invariant("stock cannot go negative"));
                }
                Ok(current - quantity)
            }
            MovementKind::Adjustment => {
                if quantity < 0 {
                    return Err(DomainError::validation("stock cannot be negative"));
                }
                Ok(quantity)
            }
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(MovementKind::In),
            "out" => Ok(MovementKind::Out),
            "adjustment" => Ok(MovementKind::Adjustment),
            other => Err(DomainError::validation(format!("unknown movement type: {other}"))),
        }
    }
}

/// Descriptive fields recorded on the movement's log row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementDetails {
    pub reason: String,
    pub unit_price: Option<Money>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub performed_by: Option<String>,
}

impl MovementDetails {
    pub fn reason(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            ..Self::default()
        }
    }
}

/// Apply a movement to `product` and return the log row describing it.
///
/// On error the product is left untouched. Outbound movements that exceed the
/// on-hand quantity fail with `DomainError::InsufficientStock`.
pub fn move_stock(
    product: &mut Product,
    kind: MovementKind,
    quantity: i64,
    details: MovementDetails,
    now: DateTime<Utc>,
) -> DomainResult<StockTransaction> {
    if kind == MovementKind::Out && quantity > 0 {
        product.ensure_available(quantity)?;
    }

    let old_stock = product.stock();
    let new_stock = kind.apply(old_stock, quantity)?;
    product.set_stock(new_stock, now)?;

    Ok(StockTransaction {
        id: TransactionId::new(),
        product_id: product.id_typed(),
        kind,
        quantity,
        old_stock,
        new_stock,
        unit_price: details.unit_price,
        reason: details.reason,
        reference: details.reference,
        notes: details.notes,
        performed_by: details.performed_by,
        created_at: now,
    })
}
