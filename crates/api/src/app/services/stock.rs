use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use inventaris_core::{DomainError, Money, ProductId};
use inventaris_infra::store::{
    Page, PageRequest, ProductQuery, ProductRepository, TransactionLog, UnitOfWork,
};
use inventaris_inventory::{
    LowStockAlert, MovementDetails, MovementKind, StockTransaction, low_stock_alerts, move_stock,
};
use inventaris_products::{Product, StockStatus};

use super::{AppServices, ServiceError, ServiceResult, lock_products};

/// Maximum number of movements accepted by one bulk adjustment.
pub const MAX_BULK_ADJUSTMENTS: usize = 500;

/// One manual stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub kind: MovementKind,
    pub quantity: i64,
    pub reason: String,
    pub unit_price: Option<Money>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// A row of the stock overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub quantity: i64,
    pub min_stock: i64,
    pub purchase_price: Money,
    pub selling_price: Money,
    pub stock_value: Money,
    pub status: StockStatus,
}

impl From<&Product> for StockLevel {
    fn from(p: &Product) -> Self {
        Self {
            product_id: p.id_typed(),
            name: p.name().to_string(),
            sku: p.sku().to_string(),
            category: p.category().to_string(),
            quantity: p.stock(),
            min_stock: p.min_stock(),
            purchase_price: p.purchase_price(),
            selling_price: p.selling_price(),
            stock_value: p.stock_value(),
            status: p.stock_status(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentOutcome {
    pub product: Product,
    pub transaction: StockTransaction,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductHistory {
    pub product: Product,
    pub transactions: Page<StockTransaction>,
}

impl AppServices {
    pub async fn stock_levels(
        &self,
        query: &ProductQuery,
        page: PageRequest,
    ) -> ServiceResult<Page<StockLevel>> {
        let mut uow = self.begin().await?;
        let products = uow.list_products(query, page).await?;
        Ok(products
            .try_map(|p| Ok::<_, std::convert::Infallible>(StockLevel::from(&p)))
            .unwrap_or_else(|never| match never {}))
    }

    /// Apply one movement together with its log row.
    #[instrument(
        skip(self, adjustment),
        fields(product_id = %adjustment.product_id, kind = %adjustment.kind, quantity = adjustment.quantity),
        err
    )]
    pub async fn adjust_stock(
        &self,
        adjustment: StockAdjustment,
        actor: Option<String>,
    ) -> ServiceResult<AdjustmentOutcome> {
        let now = Utc::now();
        let mut uow = self.begin().await?;
        let (product, transaction) = apply_adjustment(uow.as_mut(), adjustment, actor, now).await?;
        uow.commit().await?;

        info!(
            product_id = %product.id_typed(),
            old_stock = transaction.old_stock,
            new_stock = transaction.new_stock,
            "stock adjusted"
        );
        Ok(AdjustmentOutcome {
            product,
            transaction,
        })
    }

    /// Apply every movement or none of them.
    #[instrument(skip(self, adjustments), fields(count = adjustments.len()), err)]
    pub async fn bulk_adjust_stock(
        &self,
        adjustments: Vec<StockAdjustment>,
        actor: Option<String>,
    ) -> ServiceResult<Vec<StockTransaction>> {
        if adjustments.is_empty() {
            return Err(DomainError::validation("adjustments must not be empty").into());
        }
        if adjustments.len() > MAX_BULK_ADJUSTMENTS {
            return Err(DomainError::validation(format!(
                "at most {MAX_BULK_ADJUSTMENTS} adjustments per request"
            ))
            .into());
        }

        let now = Utc::now();
        let mut uow = self.begin().await?;
        lock_products(
            uow.as_mut(),
            adjustments.iter().map(|a| a.product_id).collect(),
        )
        .await?;
        let mut transactions = Vec::with_capacity(adjustments.len());
        for adjustment in adjustments {
            let (_, tx) = apply_adjustment(uow.as_mut(), adjustment, actor.clone(), now).await?;
            transactions.push(tx);
        }
        uow.commit().await?;

        info!(count = transactions.len(), "bulk stock adjustment applied");
        Ok(transactions)
    }

    pub async fn stock_history(
        &self,
        product_id: ProductId,
        page: PageRequest,
    ) -> ServiceResult<ProductHistory> {
        let mut uow = self.begin().await?;
        let product = uow
            .get_product(product_id)
            .await?
            .ok_or(ServiceError::NotFound("product"))?;
        let transactions = uow.transactions_for_product(product_id, page).await?;
        Ok(ProductHistory {
            product,
            transactions,
        })
    }

    pub async fn stock_alerts(&self) -> ServiceResult<Vec<LowStockAlert>> {
        let mut uow = self.begin().await?;
        let products = uow.all_products().await?;
        Ok(low_stock_alerts(&products))
    }

    pub async fn recent_transactions(&self, limit: u32) -> ServiceResult<Vec<StockTransaction>> {
        let mut uow = self.begin().await?;
        Ok(uow.recent_transactions(limit).await?)
    }

    pub async fn product_transactions(
        &self,
        product_id: ProductId,
        page: PageRequest,
    ) -> ServiceResult<Page<StockTransaction>> {
        let mut uow = self.begin().await?;
        if uow.get_product(product_id).await?.is_none() {
            return Err(ServiceError::NotFound("product"));
        }
        Ok(uow.transactions_for_product(product_id, page).await?)
    }
}

async fn apply_adjustment(
    uow: &mut dyn UnitOfWork,
    adjustment: StockAdjustment,
    actor: Option<String>,
    now: chrono::DateTime<Utc>,
) -> ServiceResult<(Product, StockTransaction)> {
    if adjustment.reason.trim().is_empty() {
        return Err(DomainError::validation("reason is required").into());
    }
    let mut product = uow
        .lock_product(adjustment.product_id)
        .await?
        .ok_or(ServiceError::NotFound("product"))?;

    let details = MovementDetails {
        reason: adjustment.reason.trim().to_string(),
        unit_price: adjustment.unit_price,
        reference: adjustment.reference,
        notes: adjustment.notes,
        performed_by: actor,
    };
    let tx = move_stock(&mut product, adjustment.kind, adjustment.quantity, details, now)?;
    uow.update_product(&product).await?;
    uow.record_transaction(&tx).await?;
    Ok((product, tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::services::products::tests::new_product;

    fn adjustment(product_id: ProductId, kind: MovementKind, quantity: i64) -> StockAdjustment {
        StockAdjustment {
            product_id,
            kind,
            quantity,
            reason: "cycle count".into(),
            unit_price: None,
            reference: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn adjustment_logs_before_and_after() {
        let services = AppServices::in_memory();
        let p = services
            .create_product(new_product("Bolt", "Hardware", 10), None, None)
            .await
            .unwrap();

        let out = services
            .adjust_stock(adjustment(p.id_typed(), MovementKind::Out, 4), Some("bob".into()))
            .await
            .unwrap();
        assert_eq!(out.product.stock(), 6);
        assert_eq!((out.transaction.old_stock, out.transaction.new_stock), (10, 6));

        let set = services
            .adjust_stock(adjustment(p.id_typed(), MovementKind::Adjustment, 2), None)
            .await
            .unwrap();
        assert_eq!(set.product.stock(), 2);

        let history = services
            .stock_history(p.id_typed(), PageRequest::new(None, None, 20))
            .await
            .unwrap();
        assert_eq!(history.transactions.total, 3);
        assert_eq!(history.transactions.items[0].kind, MovementKind::Adjustment);
    }

    #[tokio::test]
    async fn outbound_beyond_stock_is_refused_and_nothing_changes() {
        let services = AppServices::in_memory();
        let p = services
            .create_product(new_product("Nut", "Hardware", 3), None, None)
            .await
            .unwrap();

        let err = services
            .adjust_stock(adjustment(p.id_typed(), MovementKind::Out, 5), None)
            .await
            .unwrap_err();
        match err {
            ServiceError::Domain(DomainError::InsufficientStock {
                available,
                requested,
                ..
            }) => assert_eq!((available, requested), (3, 5)),
            other => panic!("unexpected error: {other:?}"),
        }

        let detail = services.get_product(p.id_typed()).await.unwrap();
        assert_eq!(detail.product.stock(), 3);
        assert_eq!(detail.recent_transactions.len(), 1);
    }

    #[tokio::test]
    async fn bulk_adjust_is_all_or_nothing() {
        let services = AppServices::in_memory();
        let a = services
            .create_product(new_product("A", "Misc", 5), None, None)
            .await
            .unwrap();
        let b = services
            .create_product(new_product("B", "Misc", 1), None, None)
            .await
            .unwrap();

        let err = services
            .bulk_adjust_stock(
                vec![
                    adjustment(a.id_typed(), MovementKind::In, 10),
                    adjustment(b.id_typed(), MovementKind::Out, 2),
                ],
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InsufficientStock { .. })));
        assert_eq!(services.get_product(a.id_typed()).await.unwrap().product.stock(), 5);

        let txs = services
            .bulk_adjust_stock(
                vec![
                    adjustment(a.id_typed(), MovementKind::In, 10),
                    adjustment(a.id_typed(), MovementKind::Out, 3),
                    adjustment(b.id_typed(), MovementKind::Out, 1),
                ],
                None,
            )
            .await
            .unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[1].old_stock, 15);
        assert_eq!(services.get_product(a.id_typed()).await.unwrap().product.stock(), 12);
        assert_eq!(services.get_product(b.id_typed()).await.unwrap().product.stock(), 0);
    }

    #[tokio::test]
    async fn alerts_list_low_and_empty_products() {
        let services = AppServices::in_memory();
        services
            .create_product(new_product("Plenty", "Misc", 50), None, None)
            .await
            .unwrap();
        services
            .create_product(new_product("Few", "Misc", 2), None, None)
            .await
            .unwrap();
        services
            .create_product(new_product("None", "Misc", 0), None, None)
            .await
            .unwrap();

        let alerts = services.stock_alerts().await.unwrap();
        let names: Vec<&str> = alerts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["None", "Few"]);
    }

    #[tokio::test]
    async fn stock_levels_filter_by_status() {
        let services = AppServices::in_memory();
        services
            .create_product(new_product("Plenty", "Misc", 50), None, None)
            .await
            .unwrap();
        services
            .create_product(new_product("Few", "Misc", 2), None, None)
            .await
            .unwrap();

        let query = ProductQuery {
            stock_status: Some(StockStatus::LowStock),
            ..ProductQuery::default()
        };
        let page = services
            .stock_levels(&query, PageRequest::new(None, None, 15))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Few");
        assert_eq!(page.items[0].status, StockStatus::LowStock);
    }
}
