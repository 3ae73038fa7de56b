use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use inventaris_core::{DomainError, DomainResult, Entity, Money, ProductId};

/// Reorder threshold applied when a product is created without one.
pub const DEFAULT_MIN_STOCK: i64 = 10;

const MAX_NAME_LEN: usize = 255;
const MAX_CATEGORY_LEN: usize = 100;
const MAX_SKU_LEN: usize = 100;

/// Catalog status. Inactive products stay in the catalog but are hidden from
/// selling workflows by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
        }
    }
}

impl core::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProductStatus::Active),
            "inactive" => Ok(ProductStatus::Inactive),
            other => Err(DomainError::validation(format!("unknown product status: {other}"))),
        }
    }
}

/// Stock level classification relative to the product's reorder threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn classify(stock: i64, min_stock: i64) -> Self {
        if stock <= 0 {
            StockStatus::OutOfStock
        } else if stock <= min_stock {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

impl core::str::FromStr for StockStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_stock" => Ok(StockStatus::InStock),
            "low_stock" => Ok(StockStatus::LowStock),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            other => Err(DomainError::validation(format!("unknown stock status: {other}"))),
        }
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub purchase_price: Money,
    pub selling_price: Money,
    #[serde(default)]
    pub stock: i64,
    pub min_stock: Option<i64>,
    pub status: Option<ProductStatus>,
}

/// Partial update for a product. Stock is deliberately absent: on-hand
/// quantities only change through stock movements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub purchase_price: Option<Money>,
    pub selling_price: Option<Money>,
    pub min_stock: Option<i64>,
    pub status: Option<ProductStatus>,
}

/// Every persisted field of a product, used to rebuild one from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductParts {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub category: String,
    pub purchase_price: Money,
    pub selling_price: Money,
    pub stock: i64,
    pub min_stock: i64,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A catalog product together with its on-hand stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    id: ProductId,
    name: String,
    sku: String,
    description: Option<String>,
    category: String,
    purchase_price: Money,
    selling_price: Money,
    stock: i64,
    min_stock: i64,
    status: ProductStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Validate `input` and build a new product carrying `sku`.
    pub fn create(
        id: ProductId,
        input: NewProduct,
        sku: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = validate_name(&input.name)?;
        let category = validate_category(&input.category)?;
        let sku = validate_sku(&sku)?;

        if input.stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }
        let min_stock = input.min_stock.unwrap_or(DEFAULT_MIN_STOCK);
        if min_stock < 0 {
            return Err(DomainError::validation("min_stock cannot be negative"));
        }

        Ok(Self {
            id,
            name,
            sku,
            description: normalize_optional(input.description),
            category,
            purchase_price: input.purchase_price,
            selling_price: input.selling_price,
            stock: input.stock,
            min_stock,
            status: input.status.unwrap_or(ProductStatus::Active),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn restore(parts: ProductParts) -> Self {
        Self {
            id: parts.id,
            name: parts.name,
            sku: parts.sku,
            description: parts.description,
            category: parts.category,
            purchase_price: parts.purchase_price,
            selling_price: parts.selling_price,
            stock: parts.stock,
            min_stock: parts.min_stock,
            status: parts.status,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn purchase_price(&self) -> Money {
        self.purchase_price
    }

    pub fn selling_price(&self) -> Money {
        self.selling_price
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn min_stock(&self) -> i64 {
        self.min_stock
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn stock_status(&self) -> StockStatus {
        StockStatus::classify(self.stock, self.min_stock)
    }

    /// At or below the reorder threshold (including out of stock).
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Stock valued at purchase price.
    pub fn stock_value(&self) -> Money {
        self.purchase_price
            .checked_mul(self.stock)
            .unwrap_or(Money::from_minor(i64::MAX))
    }

    pub fn apply_patch(&mut self, patch: ProductPatch, now: DateTime<Utc>) -> DomainResult<()> {
        // Validate everything before touching state so a failed patch is a no-op.
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let category = patch.category.as_deref().map(validate_category).transpose()?;
        let sku = patch.sku.as_deref().map(validate_sku).transpose()?;
        if let Some(min) = patch.min_stock {
            if min < 0 {
                return Err(DomainError::validation("min_stock cannot be negative"));
            }
        }

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(sku) = sku {
            self.sku = sku;
        }
        if patch.description.is_some() {
            self.description = normalize_optional(patch.description);
        }
        if let Some(price) = patch.purchase_price {
            self.purchase_price = price;
        }
        if let Some(price) = patch.selling_price {
            self.selling_price = price;
        }
        if let Some(min) = patch.min_stock {
            self.min_stock = min;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn set_status(&mut self, status: ProductStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    pub fn set_category(&mut self, category: &str, now: DateTime<Utc>) -> DomainResult<()> {
        self.category = validate_category(category)?;
        self.updated_at = now;
        Ok(())
    }

    /// Overwrite the on-hand quantity. Only stock movements call this; they
    /// compute `new_stock` and log the change.
    pub fn set_stock(&mut self, new_stock: i64, now: DateTime<Utc>) -> DomainResult<()> {
        if new_stock < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        self.stock = new_stock;
        self.updated_at = now;
        Ok(())
    }

    /// Fail with `InsufficientStock` unless `requested` units are on hand.
    pub fn ensure_available(&self, requested: i64) -> DomainResult<()> {
        if requested > self.stock {
            return Err(DomainError::insufficient_stock(
                self.id,
                self.name.clone(),
                self.stock,
                requested,
            ));
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation("name is too long"));
    }
    Ok(name.to_string())
}

fn validate_category(category: &str) -> DomainResult<String> {
    let category = category.trim();
    if category.is_empty() {
        return Err(DomainError::validation("category cannot be empty"));
    }
    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err(DomainError::validation("category is too long"));
    }
    Ok(category.to_string())
}

fn validate_sku(sku: &str) -> DomainResult<String> {
    let sku = sku.trim();
    if sku.is_empty() {
        return Err(DomainError::validation("SKU cannot be empty"));
    }
    if sku.chars().count() > MAX_SKU_LEN {
        return Err(DomainError::validation("SKU is too long"));
    }
    Ok(sku.to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn new_product() -> NewProduct {
        NewProduct {
            name: "Ballpoint Pen".to_string(),
            description: None,
            category: "Stationery".to_string(),
            purchase_price: Money::from_minor(150),
            selling_price: Money::from_minor(300),
            stock: 25,
            min_stock: None,
            status: None,
        }
    }

    fn test_product() -> Product {
        Product::create(ProductId::new(), new_product(), "STABAL240101001".into(), test_time())
            .unwrap()
    }

    #[test]
    fn create_applies_defaults() {
        let product = test_product();
        assert_eq!(product.min_stock(), DEFAULT_MIN_STOCK);
        assert_eq!(product.status(), ProductStatus::Active);
        assert_eq!(product.stock(), 25);
        assert_eq!(product.stock_status(), StockStatus::InStock);
    }

    #[test]
    fn create_rejects_empty_name() {
        let mut input = new_product();
        input.name = "   ".into();
        let err = Product::create(ProductId::new(), input, "SKU".into(), test_time()).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }
    }

    #[test]
    fn create_rejects_negative_stock() {
        let mut input = new_product();
        input.stock = -1;
        assert!(Product::create(ProductId::new(), input, "SKU".into(), test_time()).is_err());
    }

    #[test]
    fn patch_is_all_or_nothing() {
        let mut product = test_product();
        let before = product.clone();
        let patch = ProductPatch {
            name: Some("Gel Pen".into()),
            category: Some(String::new()),
            ..ProductPatch::default()
        };
        assert!(product.apply_patch(patch, test_time()).is_err());
        assert_eq!(product, before);
    }

    #[test]
    fn patch_updates_selected_fields_only() {
        let mut product = test_product();
        let patch = ProductPatch {
            selling_price: Some(Money::from_minor(450)),
            status: Some(ProductStatus::Inactive),
            ..ProductPatch::default()
        };
        product.apply_patch(patch, test_time()).unwrap();
        assert_eq!(product.selling_price(), Money::from_minor(450));
        assert_eq!(product.status(), ProductStatus::Inactive);
        assert_eq!(product.name(), "Ballpoint Pen");
        assert_eq!(product.stock(), 25);
    }

    #[test]
    fn set_stock_refuses_negative_values() {
        let mut product = test_product();
        match product.set_stock(-3, test_time()) {
            Err(DomainError::InvariantViolation(msg)) => assert!(msg.contains("negative")),
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
        assert_eq!(product.stock(), 25);
    }

    #[test]
    fn ensure_available_reports_both_quantities() {
        let product = test_product();
        match product.ensure_available(30) {
            Err(DomainError::InsufficientStock { available, requested, .. }) => {
                assert_eq!(available, 25);
                assert_eq!(requested, 30);
            }
            other => panic!("Expected InsufficientStock, got {other:?}"),
        }
        assert!(product.ensure_available(25).is_ok());
    }

    #[test]
    fn stock_status_boundaries() {
        assert_eq!(StockStatus::classify(0, 10), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(10, 10), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(11, 10), StockStatus::InStock);
        assert_eq!(StockStatus::classify(1, 0), StockStatus::InStock);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 300, ..ProptestConfig::default() })]

        #[test]
        fn low_stock_flag_agrees_with_classification(stock in 0i64..500, min in 0i64..500) {
            let status = StockStatus::classify(stock, min);
            let low = stock <= min;
            prop_assert_eq!(low, status != StockStatus::InStock);
        }
    }
}
