//! Purchasing domain module (purchase orders).
//!
//! This crate contains the purchase order lifecycle
//! (`pending → approved → received`, or `cancelled`), implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Receiving an order
//! only flips its status here; the stock effect is applied by the caller inside
//! the same database transaction.

pub mod order;

pub use order::{
    LineItem, NewPurchaseOrder, PurchaseOrder, PurchaseOrderParts, PurchaseOrderStatus,
    PurchaseOrderUpdate, generate_po_number,
};
