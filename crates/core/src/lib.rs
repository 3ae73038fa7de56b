//! `inventaris-core`: domain building blocks shared by every inventory module.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ProductId, PurchaseOrderId, SalesOrderId, SupplierId, TransactionId};
pub use value_object::{Money, ValueObject};
