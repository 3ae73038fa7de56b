use std::collections::BTreeMap;

use tracing::{info, instrument};

use inventaris_core::DomainError;
use inventaris_infra::replica::SyncTable;

use super::{AppServices, ServiceResult};

/// Selects every replicated table in a manual sync request.
pub const ALL_TABLES: &str = "all";

/// Which tables a manual sync request names.
pub fn tables_for(selector: &str) -> ServiceResult<Vec<SyncTable>> {
    let selector = selector.trim();
    if selector.eq_ignore_ascii_case(ALL_TABLES) {
        return Ok(SyncTable::ALL.to_vec());
    }
    selector
        .parse::<SyncTable>()
        .map(|t| vec![t])
        .map_err(|e| DomainError::validation(e.to_string()).into())
}

impl AppServices {
    /// Push the named tables to the replica now and report the record counts.
    #[instrument(skip(self), fields(sink = self.replicator().sink_name()), err)]
    pub async fn sync_firebase(&self, selector: &str) -> ServiceResult<BTreeMap<SyncTable, usize>> {
        let tables = tables_for(selector)?;
        let counts = self.replicator().sync_tables(&tables).await?;
        info!(tables = counts.len(), records = counts.values().sum::<usize>(), "manual sync finished");
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::app::services::ServiceError;
    use crate::app::services::products::tests::new_product;
    use inventaris_infra::replica::InMemoryReplica;

    #[test]
    fn selector_accepts_all_or_one_table() {
        assert_eq!(tables_for("all").unwrap().len(), SyncTable::ALL.len());
        assert_eq!(tables_for("sales_orders").unwrap(), vec![SyncTable::SalesOrders]);
        assert!(matches!(
            tables_for("invoices"),
            Err(ServiceError::Domain(DomainError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn manual_sync_pushes_every_table() {
        let replica = InMemoryReplica::new();
        let services = AppServices::in_memory_with_sink(Arc::new(replica.clone()));
        services
            .create_product(new_product("Lamp", "Lighting", 4), None, None)
            .await
            .unwrap();

        let counts = services.sync_firebase("all").await.unwrap();
        assert_eq!(counts[&SyncTable::Products], 1);
        assert_eq!(counts[&SyncTable::Transactions], 1);
        assert_eq!(counts[&SyncTable::Suppliers], 0);
        assert_eq!(replica.writes(), SyncTable::ALL.len());

        let transactions = replica.collection("transactions").unwrap();
        let row = transactions.values().next().unwrap();
        assert_eq!(row["product_name"], "Lamp");
    }

    #[tokio::test]
    async fn sink_failure_surfaces_on_manual_sync() {
        let replica = InMemoryReplica::new();
        replica.fail_next_write("offline");
        let services = AppServices::in_memory_with_sink(Arc::new(replica));
        assert!(matches!(
            services.sync_firebase("products").await,
            Err(ServiceError::Replica(_))
        ));
    }
}
