use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use inventaris_core::{Entity, Money, ProductId, TransactionId};

use crate::movement::MovementKind;

/// One row of the append-only stock movement log.
///
/// `old_stock`/`new_stock` capture the product's quantity immediately before
/// and after the movement; `quantity` is the amount the caller asked for
/// (for `adjustment` it is the absolute target).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: TransactionId,
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub quantity: i64,
    pub old_stock: i64,
    pub new_stock: i64,
    pub unit_price: Option<Money>,
    pub reason: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub performed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockTransaction {
    /// Signed change in on-hand quantity.
    pub fn delta(&self) -> i64 {
        self.new_stock - self.old_stock
    }

    /// `quantity × unit_price`, or zero when the movement carries no price.
    pub fn value(&self) -> Money {
        self.unit_price
            .and_then(|p| p.checked_mul(self.quantity).ok())
            .unwrap_or(Money::ZERO)
    }
}

impl Entity for StockTransaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
