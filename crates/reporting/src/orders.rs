use chrono::{DateTime, Utc};
use serde::Serialize;

use inventaris_core::Money;
use inventaris_purchasing::{PurchaseOrder, PurchaseOrderStatus};
use inventaris_sales::{SalesOrder, SalesOrderStatus};

use crate::growth_percent;
use crate::period::Period;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderStats {
    pub total_sales_orders: usize,
    pub sales_orders_trend: f64,
    pub total_purchase_orders: usize,
    pub purchase_orders_trend: f64,
    pub pending_orders: usize,
    pub completed_orders: usize,
}

/// Order counts with month-over-month trends (by creation date).
pub fn order_stats(
    sales: &[SalesOrder],
    purchases: &[PurchaseOrder],
    now: DateTime<Utc>,
) -> OrderStats {
    let this_month = Period::month_to_date(now);
    let last_month = Period::previous_month(now);

    let sales_now = created_within(&this_month, sales.iter().map(SalesOrder::created_at));
    let sales_prev = created_within(&last_month, sales.iter().map(SalesOrder::created_at));
    let purchases_now = created_within(&this_month, purchases.iter().map(PurchaseOrder::created_at));
    let purchases_prev = created_within(&last_month, purchases.iter().map(PurchaseOrder::created_at));

    let pending = sales
        .iter()
        .filter(|o| o.status() == SalesOrderStatus::Pending)
        .count()
        + purchases
            .iter()
            .filter(|o| o.status() == PurchaseOrderStatus::Pending)
            .count();
    let completed = sales
        .iter()
        .filter(|o| o.status() == SalesOrderStatus::Delivered)
        .count()
        + purchases
            .iter()
            .filter(|o| o.status() == PurchaseOrderStatus::Received)
            .count();

    OrderStats {
        total_sales_orders: sales.len(),
        sales_orders_trend: growth_percent(sales_now, sales_prev).round(),
        total_purchase_orders: purchases.len(),
        purchase_orders_trend: growth_percent(purchases_now, purchases_prev).round(),
        pending_orders: pending,
        completed_orders: completed,
    }
}

fn created_within(period: &Period, created: impl Iterator<Item = DateTime<Utc>>) -> i64 {
    created.filter(|at| period.contains(*at)).count() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Sales,
    Purchase,
}

/// One row of the merged "recent orders" list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentOrder {
    /// Rendered as a string so both order kinds fit one list.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: OrderKind,
    pub number: String,
    /// Customer for sales orders, supplier for purchase orders.
    pub counterparty: Option<String>,
    pub amount: Money,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
}

/// Newest sales and purchase orders merged, newest first.
pub fn recent_orders(
    sales: &[SalesOrder],
    purchases: &[PurchaseOrder],
    limit: usize,
) -> Vec<RecentOrder> {
    let sales_rows = sales.iter().map(|o| RecentOrder {
        id: o.id_typed().to_string(),
        kind: OrderKind::Sales,
        number: o.so_number().to_string(),
        counterparty: Some(o.customer_name().to_string()),
        amount: o.total_amount(),
        status: o.status().as_str(),
        created_at: o.created_at(),
    });
    let purchase_rows = purchases.iter().map(|o| RecentOrder {
        id: o.id_typed().to_string(),
        kind: OrderKind::Purchase,
        number: o.po_number().to_string(),
        counterparty: o.supplier_name().map(str::to_string),
        amount: o.total_amount(),
        status: o.status().as_str(),
        created_at: o.created_at(),
    });

    let mut rows: Vec<RecentOrder> = sales_rows.chain(purchase_rows).collect();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows.truncate(limit);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, purchase_order, sales_order};

    #[test]
    fn trend_compares_this_month_to_last() {
        let now = at(2024, 5, 20);
        let sales = vec![
            sales_order("SO-1", at(2024, 4, 3)),
            sales_order("SO-2", at(2024, 4, 9)),
            sales_order("SO-3", at(2024, 5, 2)),
            sales_order("SO-4", at(2024, 5, 10)),
            sales_order("SO-5", at(2024, 5, 11)),
        ];
        let purchases = vec![purchase_order("PO-1", at(2024, 5, 1))];

        let stats = order_stats(&sales, &purchases, now);
        assert_eq!(stats.total_sales_orders, 5);
        assert_eq!(stats.sales_orders_trend, 50.0);
        assert_eq!(stats.purchase_orders_trend, 0.0);
        assert_eq!(stats.pending_orders, 6);
        assert_eq!(stats.completed_orders, 0);
    }

    #[test]
    fn completed_counts_delivered_and_received() {
        let now = at(2024, 5, 20);
        let mut so = sales_order("SO-1", at(2024, 5, 1));
        so.confirm(now).unwrap();
        so.ship(now).unwrap();
        so.deliver(now).unwrap();
        let mut po = purchase_order("PO-1", at(2024, 5, 1));
        po.approve(now).unwrap();
        po.receive(now).unwrap();

        let stats = order_stats(&[so], &[po], now);
        assert_eq!(stats.completed_orders, 2);
        assert_eq!(stats.pending_orders, 0);
    }

    #[test]
    fn recent_orders_merge_newest_first() {
        let sales = vec![sales_order("SO-1", at(2024, 5, 1)), sales_order("SO-2", at(2024, 5, 4))];
        let purchases = vec![purchase_order("PO-1", at(2024, 5, 3))];

        let rows = recent_orders(&sales, &purchases, 2);
        let numbers: Vec<&str> = rows.iter().map(|r| r.number.as_str()).collect();
        assert_eq!(numbers, vec!["SO-2", "PO-1"]);
        assert_eq!(rows[1].kind, OrderKind::Purchase);
        assert_eq!(rows[1].counterparty.as_deref(), Some("Supplier"));
    }
}
