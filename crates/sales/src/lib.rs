//! Sales domain module (sales orders).
//!
//! Sales order lifecycle (`pending → confirmed → shipped → delivered`, or
//! `cancelled`), implemented purely as deterministic domain logic. Stock is
//! only checked at create/confirm time and only deducted when the order ships.

pub mod order;

pub use order::{
    NewSalesOrder, OrderLine, SalesOrder, SalesOrderParts, SalesOrderStatus, SalesOrderUpdate,
    generate_so_number,
};
