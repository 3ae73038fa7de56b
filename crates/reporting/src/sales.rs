use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use inventaris_core::{Money, ProductId};
use inventaris_inventory::{MovementKind, StockTransaction};
use inventaris_products::Product;

use crate::growth_percent;
use crate::period::Period;

const TOP_PRODUCT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
    pub total_revenue: Money,
    pub total_transactions: usize,
    pub average_transaction: Money,
    pub total_items_sold: i64,
    /// Revenue change versus the preceding period of equal length, in percent.
    pub growth_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub revenue: Money,
    pub items_sold: i64,
    pub transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub quantity: i64,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub summary: SalesSummary,
    pub daily: Vec<DailySales>,
    pub top_products: Vec<TopProduct>,
}

/// A sale is an outbound movement that carries a unit price (shipments of
/// sales orders, or priced manual issues).
fn is_sale(t: &StockTransaction) -> bool {
    t.kind == MovementKind::Out && t.unit_price.is_some()
}

pub fn sales_report(
    transactions: &[StockTransaction],
    products: &[Product],
    period: Period,
) -> SalesReport {
    let sales: Vec<&StockTransaction> = transactions
        .iter()
        .filter(|t| is_sale(t) && period.contains(t.created_at))
        .collect();
    let previous_revenue: Money = match period.preceding() {
        Some(previous) => transactions
            .iter()
            .filter(|t| is_sale(t) && previous.contains(t.created_at))
            .map(StockTransaction::value)
            .sum(),
        None => Money::ZERO,
    };

    let total_revenue: Money = sales.iter().map(|t| t.value()).sum();
    let average_transaction = if sales.is_empty() {
        Money::ZERO
    } else {
        Money::from_minor(total_revenue.minor() / sales.len() as i64)
    };

    let summary = SalesSummary {
        total_revenue,
        total_transactions: sales.len(),
        average_transaction,
        total_items_sold: sales.iter().map(|t| t.quantity).sum(),
        growth_percent: growth_percent(total_revenue.minor(), previous_revenue.minor()),
    };

    let mut daily: BTreeMap<NaiveDate, DailySales> = period
        .days()
        .map(|date| {
            (
                date,
                DailySales {
                    date,
                    revenue: Money::ZERO,
                    items_sold: 0,
                    transactions: 0,
                },
            )
        })
        .collect();
    for sale in &sales {
        if let Some(day) = daily.get_mut(&sale.created_at.date_naive()) {
            day.revenue = day.revenue + sale.value();
            day.items_sold += sale.quantity;
            day.transactions += 1;
        }
    }

    let catalog: HashMap<ProductId, &Product> =
        products.iter().map(|p| (p.id_typed(), p)).collect();
    let mut per_product: HashMap<ProductId, (i64, Money)> = HashMap::new();
    for sale in &sales {
        let entry = per_product.entry(sale.product_id).or_insert((0, Money::ZERO));
        entry.0 += sale.quantity;
        entry.1 = entry.1 + sale.value();
    }
    let mut top_products: Vec<TopProduct> = per_product
        .into_iter()
        .map(|(product_id, (quantity, revenue))| {
            let product = catalog.get(&product_id);
            TopProduct {
                product_id,
                name: product.map(|p| p.name().to_string()),
                sku: product.map(|p| p.sku().to_string()),
                quantity,
                revenue,
            }
        })
        .collect();
    top_products.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| b.quantity.cmp(&a.quantity))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    top_products.truncate(TOP_PRODUCT_LIMIT);

    SalesReport {
        from: period.from.date_naive(),
        to: period.to.date_naive(),
        summary,
        daily: daily.into_values().collect(),
        top_products,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, date, movement, product};

    #[test]
    fn revenue_daily_series_and_growth() {
        let pen = product("pen", "Office", 0, 10, 100);
        let ink = product("ink", "Office", 0, 10, 500);
        let transactions = vec![
            movement(&pen, MovementKind::Out, 10, Some(200), at(2024, 3, 2)),
            movement(&ink, MovementKind::Out, 1, Some(1_000), at(2024, 3, 3)),
            movement(&ink, MovementKind::Out, 2, Some(1_000), at(2024, 3, 3)),
            // unpriced issue: not a sale
            movement(&pen, MovementKind::Out, 5, None, at(2024, 3, 3)),
            // inbound: not a sale
            movement(&pen, MovementKind::In, 50, Some(100), at(2024, 3, 2)),
            // previous period
            movement(&pen, MovementKind::Out, 5, Some(200), at(2024, 2, 27)),
        ];
        let period = Period::from_dates(date(2024, 3, 1), date(2024, 3, 5));

        let report = sales_report(&transactions, &[pen.clone(), ink.clone()], period);

        assert_eq!(report.summary.total_revenue, Money::from_minor(5_000));
        assert_eq!(report.summary.total_transactions, 3);
        assert_eq!(report.summary.total_items_sold, 13);
        assert_eq!(report.summary.growth_percent, 400.0);

        assert_eq!(report.daily.len(), 5);
        assert_eq!(report.daily[2].date, date(2024, 3, 3));
        assert_eq!(report.daily[2].revenue, Money::from_minor(3_000));
        assert_eq!(report.daily[0].transactions, 0);

        assert_eq!(report.top_products[0].product_id, ink.id_typed());
        assert_eq!(report.top_products[0].quantity, 3);
        assert_eq!(report.top_products[1].name.as_deref(), Some("pen"));
    }
}
