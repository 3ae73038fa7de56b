//! Suppliers domain module.
//!
//! Supplier master data, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod supplier;

pub use supplier::{
    ContactInfo, NewSupplier, Supplier, SupplierParts, SupplierPatch, SupplierStatus,
};
