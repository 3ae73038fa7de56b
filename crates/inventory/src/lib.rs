//! Inventory domain module.
//!
//! Stock arithmetic and the movement log. Every change to a product's
//! on-hand quantity goes through [`move_stock`], which refuses to take stock
//! below zero and returns the [`StockTransaction`] row to persist alongside it.

pub mod alert;
pub mod movement;
pub mod transaction;

pub use alert::{LowStockAlert, Urgency, low_stock_alerts};
pub use movement::{MovementDetails, MovementKind, move_stock};
pub use transaction::StockTransaction;
