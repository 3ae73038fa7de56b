use serde::{Deserialize, Serialize};

use inventaris_core::{Money, ProductId};
use inventaris_products::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Out of stock.
    Critical,
    /// At or below the reorder threshold.
    Warning,
}

/// A product that needs reordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub stock: i64,
    pub min_stock: i64,
    pub purchase_price: Money,
    pub urgency: Urgency,
}

/// Alerts for every product at or below its threshold, lowest stock first.
pub fn low_stock_alerts<'a>(products: impl IntoIterator<Item = &'a Product>) -> Vec<LowStockAlert> {
    let mut alerts: Vec<LowStockAlert> = products
        .into_iter()
        .filter(|p| p.is_low_stock())
        .map(|p| LowStockAlert {
            product_id: p.id_typed(),
            name: p.name().to_string(),
            sku: p.sku().to_string(),
            category: p.category().to_string(),
            stock: p.stock(),
            min_stock: p.min_stock(),
            purchase_price: p.purchase_price(),
            urgency: if p.stock() == 0 {
                Urgency::Critical
            } else {
                Urgency::Warning
            },
        })
        .collect();

    alerts.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use inventaris_products::NewProduct;

    fn product(name: &str, stock: i64, min_stock: i64) -> Product {
        let input = NewProduct {
            name: name.into(),
            description: None,
            category: "General".into(),
            purchase_price: Money::from_minor(100),
            selling_price: Money::from_minor(200),
            stock,
            min_stock: Some(min_stock),
            status: None,
        };
        Product::create(ProductId::new(), input, format!("SKU-{name}"), Utc::now()).unwrap()
    }

    #[test]
    fn alerts_are_sorted_and_graded() {
        let products = vec![
            product("plenty", 50, 10),
            product("low", 4, 10),
            product("empty", 0, 10),
            product("edge", 10, 10),
        ];

        let alerts = low_stock_alerts(&products);
        let names: Vec<&str> = alerts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["empty", "low", "edge"]);
        assert_eq!(alerts[0].urgency, Urgency::Critical);
        assert_eq!(alerts[1].urgency, Urgency::Warning);
    }
}
