//! Recent activity feed for the dashboard.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use inventaris_core::ProductId;
use inventaris_inventory::StockTransaction;
use inventaris_products::Product;

pub const ACTIVITY_WINDOW_DAYS: i64 = 7;
const PER_SOURCE: usize = 5;
const FEED_LENGTH: usize = 10;
const SYSTEM_ACTOR: &str = "System";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ProductAdded,
    StockTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub id: String,
    pub description: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
}

/// Newest product additions and stock movements of the last week, merged
/// newest first. Each source contributes at most five entries.
pub fn recent_activities(
    products: &[Product],
    transactions: &[StockTransaction],
    now: DateTime<Utc>,
) -> Vec<Activity> {
    let since = now
        .checked_sub_signed(Duration::days(ACTIVITY_WINDOW_DAYS))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let names: HashMap<ProductId, &str> = products
        .iter()
        .map(|p| (p.id_typed(), p.name()))
        .collect();

    let mut added: Vec<&Product> = products
        .iter()
        .filter(|p| p.created_at() >= since)
        .collect();
    added.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

    let mut moved: Vec<&StockTransaction> = transactions
        .iter()
        .filter(|t| t.created_at >= since)
        .collect();
    moved.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut feed: Vec<Activity> = added
        .into_iter()
        .take(PER_SOURCE)
        .map(|p| Activity {
            id: format!("product_{}", p.id_typed()),
            description: format!("New product added: {}", p.name()),
            user_name: SYSTEM_ACTOR.to_string(),
            created_at: p.created_at(),
            kind: ActivityKind::ProductAdded,
        })
        .chain(moved.into_iter().take(PER_SOURCE).map(|t| Activity {
            id: format!("transaction_{}", t.id),
            description: format!(
                "Stock {}: {} (Qty: {})",
                t.kind,
                names.get(&t.product_id).copied().unwrap_or("unknown product"),
                t.quantity
            ),
            user_name: t
                .performed_by
                .clone()
                .unwrap_or_else(|| SYSTEM_ACTOR.to_string()),
            created_at: t.created_at,
            kind: ActivityKind::StockTransaction,
        }))
        .collect();

    feed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    feed.truncate(FEED_LENGTH);
    feed
}
