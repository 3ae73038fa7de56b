//! Products domain module.
//!
//! Catalog rules (validation, SKU generation, stock classification) as pure,
//! deterministic domain logic. No IO, no HTTP, no storage.

pub mod product;
pub mod sku;

pub use product::{
    NewProduct, Product, ProductParts, ProductPatch, ProductStatus, StockStatus,
    DEFAULT_MIN_STOCK,
};
pub use sku::generate_sku;
