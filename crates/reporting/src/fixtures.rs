//! Row builders shared by the report tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use inventaris_core::{
    Money, ProductId, PurchaseOrderId, SalesOrderId, SupplierId, TransactionId,
};
use inventaris_inventory::{MovementKind, StockTransaction};
use inventaris_products::{NewProduct, Product};
use inventaris_purchasing::{LineItem, NewPurchaseOrder, PurchaseOrder};
use inventaris_sales::{NewSalesOrder, OrderLine, SalesOrder};

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

pub fn product(name: &str, category: &str, stock: i64, min_stock: i64, cost: i64) -> Product {
    let input = NewProduct {
        name: name.into(),
        description: None,
        category: category.into(),
        purchase_price: Money::from_minor(cost),
        selling_price: Money::from_minor(cost * 2),
        stock,
        min_stock: Some(min_stock),
        status: None,
    };
    Product::create(ProductId::new(), input, format!("SKU-{name}"), at(2024, 1, 1)).unwrap()
}

pub fn movement(
    product: &Product,
    kind: MovementKind,
    quantity: i64,
    unit_price: Option<i64>,
    created_at: DateTime<Utc>,
) -> StockTransaction {
    let (old_stock, new_stock) = match kind {
        MovementKind::In => (0, quantity),
        MovementKind::Out => (quantity, 0),
        MovementKind::Adjustment => (0, quantity),
    };
    StockTransaction {
        id: TransactionId::new(),
        product_id: product.id_typed(),
        kind,
        quantity,
        old_stock,
        new_stock,
        unit_price: unit_price.map(Money::from_minor),
        reason: "test".into(),
        reference: None,
        notes: None,
        performed_by: None,
        created_at,
    }
}

pub fn sales_order(number: &str, created_at: DateTime<Utc>) -> SalesOrder {
    let input = NewSalesOrder {
        so_number: number.into(),
        customer_name: "Customer".into(),
        customer_email: None,
        customer_phone: None,
        order_date: created_at.date_naive(),
        expected_delivery: None,
        shipping_address: "Somewhere 1".into(),
        notes: None,
        lines: vec![OrderLine {
            product_id: ProductId::new(),
            product_name: "Item".into(),
            quantity: 1,
            unit_price: Money::from_minor(1_000),
        }],
    };
    SalesOrder::create(SalesOrderId::new(), input, created_at).unwrap()
}

/// A sales order with one line per `(product, quantity, unit_price)`.
pub fn sales_order_with(
    number: &str,
    created_at: DateTime<Utc>,
    lines: &[(&Product, i64, i64)],
) -> SalesOrder {
    let input = NewSalesOrder {
        so_number: number.into(),
        customer_name: "Customer".into(),
        customer_email: None,
        customer_phone: None,
        order_date: created_at.date_naive(),
        expected_delivery: None,
        shipping_address: "Somewhere 1".into(),
        notes: None,
        lines: lines
            .iter()
            .map(|(product, quantity, price)| OrderLine {
                product_id: product.id_typed(),
                product_name: product.name().into(),
                quantity: *quantity,
                unit_price: Money::from_minor(*price),
            })
            .collect(),
    };
    SalesOrder::create(SalesOrderId::new(), input, created_at).unwrap()
}

pub fn purchase_order(number: &str, created_at: DateTime<Utc>) -> PurchaseOrder {
    let input = NewPurchaseOrder {
        po_number: number.into(),
        supplier_id: Some(SupplierId::new()),
        supplier_name: Some("Supplier".into()),
        order_date: created_at.date_naive(),
        expected_delivery: None,
        notes: None,
        lines: vec![LineItem {
            product_id: ProductId::new(),
            product_name: "Item".into(),
            quantity: 2,
            unit_price: Money::from_minor(500),
        }],
    };
    PurchaseOrder::create(PurchaseOrderId::new(), input, created_at).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
