//! Build collection snapshots from the store.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use inventaris_core::ProductId;

use super::{ReplicaError, SyncTable};
use crate::store::{
    ProductRepository, PurchaseOrderRepository, SalesOrderRepository, SupplierRepository,
    TransactionLog, UnitOfWork,
};

/// Serialize every row of `table` into a JSON object keyed by record id.
///
/// Transactions carry the current `product_name` and `product_sku` so the
/// replica can be read without joining.
pub async fn snapshot_table(
    uow: &mut dyn UnitOfWork,
    table: SyncTable,
) -> Result<Map<String, Value>, ReplicaError> {
    match table {
        SyncTable::Products => {
            let rows = uow.all_products().await?;
            keyed(table, rows.iter().map(|p| (p.id_typed().to_string(), p)))
        }
        SyncTable::Suppliers => {
            let rows = uow.list_suppliers(None).await?;
            keyed(table, rows.iter().map(|s| (s.id_typed().to_string(), s)))
        }
        SyncTable::PurchaseOrders => {
            let rows = uow.all_purchase_orders().await?;
            keyed(table, rows.iter().map(|o| (o.id_typed().to_string(), o)))
        }
        SyncTable::SalesOrders => {
            let rows = uow.all_sales_orders().await?;
            keyed(table, rows.iter().map(|o| (o.id_typed().to_string(), o)))
        }
        SyncTable::Transactions => {
            let products: HashMap<ProductId, (String, String)> = uow
                .all_products()
                .await?
                .into_iter()
                .map(|p| (p.id_typed(), (p.name().to_string(), p.sku().to_string())))
                .collect();

            let mut out = Map::new();
            for tx in uow.all_transactions().await? {
                let mut value = to_value(table, &tx)?;
                if let (Value::Object(obj), Some((name, sku))) =
                    (&mut value, products.get(&tx.product_id))
                {
                    obj.insert("product_name".into(), Value::String(name.clone()));
                    obj.insert("product_sku".into(), Value::String(sku.clone()));
                }
                out.insert(tx.id.to_string(), value);
            }
            Ok(out)
        }
    }
}

fn keyed<'a, T, I>(table: SyncTable, rows: I) -> Result<Map<String, Value>, ReplicaError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = (String, &'a T)>,
{
    rows.into_iter()
        .map(|(id, row)| Ok((id, to_value(table, row)?)))
        .collect()
}

fn to_value<T: Serialize>(table: SyncTable, row: &T) -> Result<Value, ReplicaError> {
    serde_json::to_value(row).map_err(|e| ReplicaError::Serialize(table, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, Store};
    use chrono::Utc;
    use inventaris_core::Money;
    use inventaris_inventory::{MovementDetails, MovementKind, move_stock};
    use inventaris_products::{NewProduct, Product};

    #[tokio::test]
    async fn transactions_are_enriched_with_product_identity() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut product = Product::create(
            ProductId::new(),
            NewProduct {
                name: "Stapler".into(),
                description: None,
                category: "Office".into(),
                purchase_price: Money::from_minor(500),
                selling_price: Money::from_minor(900),
                stock: 0,
                min_stock: None,
                status: None,
            },
            "OFFSTA240101001".into(),
            now,
        )
        .unwrap();
        let tx = move_stock(
            &mut product,
            MovementKind::In,
            4,
            MovementDetails::reason("restock"),
            now,
        )
        .unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.insert_product(&product).await.unwrap();
        uow.record_transaction(&tx).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let products = snapshot_table(uow.as_mut(), SyncTable::Products).await.unwrap();
        assert!(products.contains_key(&product.id_typed().to_string()));

        let txs = snapshot_table(uow.as_mut(), SyncTable::Transactions).await.unwrap();
        let entry = &txs[&tx.id.to_string()];
        assert_eq!(entry["product_name"], "Stapler");
        assert_eq!(entry["product_sku"], "OFFSTA240101001");
        assert_eq!(entry["new_stock"], 4);
    }

    #[tokio::test]
    async fn empty_tables_snapshot_to_empty_objects() {
        let store = InMemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        for table in SyncTable::ALL {
            assert!(snapshot_table(uow.as_mut(), table).await.unwrap().is_empty());
        }
    }
}
