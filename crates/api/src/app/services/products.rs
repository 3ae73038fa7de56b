use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use inventaris_core::{DomainError, ProductId};
use inventaris_infra::store::{
    Page, PageRequest, ProductQuery, ProductRepository, PurchaseOrderRepository, SalesOrderRepository,
    TransactionLog, UnitOfWork,
};
use inventaris_inventory::{MovementDetails, MovementKind, StockTransaction, move_stock};
use inventaris_products::{NewProduct, Product, ProductPatch, ProductStatus, generate_sku};

use super::{AppServices, GENERATED_KEY_ATTEMPTS, ServiceError, ServiceResult, lock_order};

/// Transactions shown alongside a single product.
pub const PRODUCT_DETAIL_TRANSACTIONS: u32 = 10;

pub const OPENING_STOCK_REASON: &str = "Opening stock";

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub recent_transactions: Vec<StockTransaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Activate,
    Deactivate,
    UpdateCategory,
    Delete,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub affected: usize,
    /// Missing products, and products with history on `delete`.
    pub skipped: Vec<ProductId>,
}

impl AppServices {
    #[instrument(skip(self, input), fields(name = %input.name), err)]
    pub async fn create_product(
        &self,
        mut input: NewProduct,
        sku: Option<String>,
        actor: Option<String>,
    ) -> ServiceResult<Product> {
        let now = Utc::now();
        let mut uow = self.begin().await?;

        let sku = match sku.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            Some(sku) => {
                if uow.find_product_by_sku(&sku).await?.is_some() {
                    return Err(DomainError::conflict(format!("sku '{sku}' is already in use")).into());
                }
                sku
            }
            None => unused_sku(uow.as_mut(), &input, now.date_naive()).await?,
        };

        let opening_stock = input.stock;
        if opening_stock < 0 {
            return Err(DomainError::validation("stock must be >= 0").into());
        }
        input.stock = 0;
        let mut product = Product::create(ProductId::new(), input, sku, now)?;

        let opening = if opening_stock > 0 {
            let details = MovementDetails {
                performed_by: actor,
                ..MovementDetails::reason(OPENING_STOCK_REASON)
            };
            Some(move_stock(&mut product, MovementKind::In, opening_stock, details, now)?)
        } else {
            None
        };

        uow.insert_product(&product).await?;
        if let Some(tx) = &opening {
            uow.record_transaction(tx).await?;
        }
        uow.commit().await?;

        info!(product_id = %product.id_typed(), sku = product.sku(), "product created");
        Ok(product)
    }

    #[instrument(skip(self), err)]
    pub async fn get_product(&self, id: ProductId) -> ServiceResult<ProductDetail> {
        let mut uow = self.begin().await?;
        let product = uow
            .get_product(id)
            .await?
            .ok_or(ServiceError::NotFound("product"))?;
        let recent = uow
            .transactions_for_product(id, PageRequest::new(Some(1), None, PRODUCT_DETAIL_TRANSACTIONS))
            .await?;
        Ok(ProductDetail {
            product,
            recent_transactions: recent.items,
        })
    }

    pub async fn list_products(
        &self,
        query: &ProductQuery,
        page: PageRequest,
    ) -> ServiceResult<Page<Product>> {
        let mut uow = self.begin().await?;
        Ok(uow.list_products(query, page).await?)
    }

    pub async fn product_categories(&self) -> ServiceResult<Vec<String>> {
        let mut uow = self.begin().await?;
        Ok(uow.categories().await?)
    }

    #[instrument(skip(self, patch), err)]
    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> ServiceResult<Product> {
        let mut uow = self.begin().await?;
        let mut product = uow
            .lock_product(id)
            .await?
            .ok_or(ServiceError::NotFound("product"))?;

        if let Some(sku) = patch.sku.as_deref().map(str::trim) {
            if let Some(other) = uow.find_product_by_sku(sku).await? {
                if other.id_typed() != id {
                    return Err(DomainError::conflict(format!("sku '{sku}' is already in use")).into());
                }
            }
        }

        product.apply_patch(patch, Utc::now())?;
        uow.update_product(&product).await?;
        uow.commit().await?;
        Ok(product)
    }

    #[instrument(skip(self), err)]
    pub async fn delete_product(&self, id: ProductId) -> ServiceResult<()> {
        let mut uow = self.begin().await?;
        if uow.lock_product(id).await?.is_none() {
            return Err(ServiceError::NotFound("product"));
        }
        if has_history(uow.as_mut(), id).await? {
            return Err(DomainError::conflict(
                "product has stock transactions or order lines and cannot be deleted",
            )
            .into());
        }
        uow.delete_product(id).await?;
        uow.commit().await?;
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Apply `action` to every product in `ids` in one unit of work.
    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    pub async fn bulk_product_action(
        &self,
        action: BulkAction,
        ids: &[ProductId],
        category: Option<String>,
    ) -> ServiceResult<BulkOutcome> {
        if ids.is_empty() {
            return Err(DomainError::validation("product_ids must not be empty").into());
        }
        let category = match action {
            BulkAction::UpdateCategory => Some(
                category
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| DomainError::validation("category is required for update_category"))?,
            ),
            _ => None,
        };

        let now = Utc::now();
        let mut uow = self.begin().await?;
        let mut outcome = BulkOutcome::default();

        for id in lock_order(ids.iter().copied()) {
            let Some(mut product) = uow.lock_product(id).await? else {
                outcome.skipped.push(id);
                continue;
            };
            match action {
                BulkAction::Activate => product.set_status(ProductStatus::Active, now),
                BulkAction::Deactivate => product.set_status(ProductStatus::Inactive, now),
                BulkAction::UpdateCategory => {
                    if let Some(category) = &category {
                        product.set_category(category, now)?;
                    }
                }
                BulkAction::Delete => {
                    if has_history(uow.as_mut(), id).await? {
                        outcome.skipped.push(id);
                    } else {
                        uow.delete_product(id).await?;
                        outcome.affected += 1;
                    }
                    continue;
                }
            }
            uow.update_product(&product).await?;
            outcome.affected += 1;
        }

        uow.commit().await?;
        info!(?action, affected = outcome.affected, skipped = outcome.skipped.len(), "bulk product action applied");
        Ok(outcome)
    }
}

async fn has_history(uow: &mut dyn UnitOfWork, id: ProductId) -> ServiceResult<bool> {
    Ok(uow.product_has_transactions(id).await?
        || uow.product_on_purchase_orders(id).await?
        || uow.product_on_sales_orders(id).await?)
}

async fn unused_sku(
    uow: &mut dyn UnitOfWork,
    input: &NewProduct,
    today: chrono::NaiveDate,
) -> ServiceResult<String> {
    for _ in 0..GENERATED_KEY_ATTEMPTS {
        let candidate = generate_sku(&input.name, &input.category, today, rand::random::<u16>());
        if uow.find_product_by_sku(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }
    Err(DomainError::conflict("could not generate an unused sku").into())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use inventaris_core::Money;

    pub(crate) fn new_product(name: &str, category: &str, stock: i64) -> NewProduct {
        NewProduct {
            name: name.into(),
            description: None,
            category: category.into(),
            purchase_price: Money::from_minor(1_000),
            selling_price: Money::from_minor(1_500),
            stock,
            min_stock: Some(5),
            status: None,
        }
    }

    #[tokio::test]
    async fn opening_stock_is_logged_as_inbound_movement() {
        let services = AppServices::in_memory();
        let product = services
            .create_product(new_product("Desk Lamp", "Lighting", 12), None, Some("alice".into()))
            .await
            .unwrap();
        assert_eq!(product.stock(), 12);
        assert!(product.sku().starts_with("LIGDES"));

        let detail = services.get_product(product.id_typed()).await.unwrap();
        assert_eq!(detail.recent_transactions.len(), 1);
        let tx = &detail.recent_transactions[0];
        assert_eq!(tx.kind, MovementKind::In);
        assert_eq!((tx.old_stock, tx.new_stock), (0, 12));
        assert_eq!(tx.reason, OPENING_STOCK_REASON);
        assert_eq!(tx.performed_by.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_conflict() {
        let services = AppServices::in_memory();
        services
            .create_product(new_product("Pen", "Office", 0), Some("SKU-1".into()), None)
            .await
            .unwrap();
        let err = services
            .create_product(new_product("Pencil", "Office", 0), Some("SKU-1".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn delete_is_refused_once_stock_has_moved() {
        let services = AppServices::in_memory();
        let fresh = services
            .create_product(new_product("Tape", "Office", 0), None, None)
            .await
            .unwrap();
        let stocked = services
            .create_product(new_product("Glue", "Office", 3), None, None)
            .await
            .unwrap();

        services.delete_product(fresh.id_typed()).await.unwrap();
        assert!(matches!(
            services.get_product(fresh.id_typed()).await,
            Err(ServiceError::NotFound("product"))
        ));

        let err = services.delete_product(stocked.id_typed()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn bulk_delete_skips_products_with_history() {
        let services = AppServices::in_memory();
        let a = services
            .create_product(new_product("A", "Misc", 0), None, None)
            .await
            .unwrap();
        let b = services
            .create_product(new_product("B", "Misc", 4), None, None)
            .await
            .unwrap();
        let missing = ProductId::new();

        let outcome = services
            .bulk_product_action(BulkAction::Delete, &[a.id_typed(), b.id_typed(), missing], None)
            .await
            .unwrap();
        assert_eq!(outcome.affected, 1);
        let mut expected = vec![b.id_typed(), missing];
        expected.sort();
        assert_eq!(outcome.skipped, expected);
    }

    #[tokio::test]
    async fn bulk_category_update_requires_category() {
        let services = AppServices::in_memory();
        let a = services
            .create_product(new_product("A", "Misc", 0), None, None)
            .await
            .unwrap();

        assert!(services
            .bulk_product_action(BulkAction::UpdateCategory, &[a.id_typed()], None)
            .await
            .is_err());

        services
            .bulk_product_action(BulkAction::UpdateCategory, &[a.id_typed()], Some("Tools".into()))
            .await
            .unwrap();
        assert_eq!(services.product_categories().await.unwrap(), vec!["Tools".to_string()]);
    }

    #[tokio::test]
    async fn update_cannot_steal_another_sku() {
        let services = AppServices::in_memory();
        services
            .create_product(new_product("A", "Misc", 0), Some("A-1".into()), None)
            .await
            .unwrap();
        let b = services
            .create_product(new_product("B", "Misc", 0), Some("B-1".into()), None)
            .await
            .unwrap();

        let patch = ProductPatch {
            sku: Some("A-1".into()),
            ..ProductPatch::default()
        };
        let err = services.update_product(b.id_typed(), patch).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
    }
}
