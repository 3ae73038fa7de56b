//! Listing parameters shared by every store implementation.

use serde::{Deserialize, Serialize};

use inventaris_products::{Product, ProductStatus, StockStatus};

/// Upper bound on `per_page` for any listing.
pub const MAX_PER_PAGE: u32 = 100;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_per_page).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }

    /// Slice an in-memory result set according to this request.
    pub fn slice<T: Clone>(&self, rows: &[T]) -> Page<T> {
        let start = (self.offset() as usize).min(rows.len());
        let end = (start + self.per_page as usize).min(rows.len());
        Page {
            items: rows[start..end].to_vec(),
            total: rows.len() as u64,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// One page of a listing plus the totals needed to render pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.per_page.max(1)))
    }

    /// 1-based index of the first item on this page, if any.
    pub fn from(&self) -> Option<u64> {
        if self.items.is_empty() {
            return None;
        }
        Some(u64::from(self.page - 1) * u64::from(self.per_page) + 1)
    }

    /// 1-based index of the last item on this page, if any.
    pub fn to(&self) -> Option<u64> {
        self.from().map(|from| from + self.items.len() as u64 - 1)
    }

    /// Convert every item, keeping the paging figures. Stops at the first error.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    Name,
    Sku,
    Category,
    SellingPrice,
    Stock,
    #[default]
    CreatedAt,
}

impl ProductSort {
    pub fn column(&self) -> &'static str {
        match self {
            ProductSort::Name => "name",
            ProductSort::Sku => "sku",
            ProductSort::Category => "category",
            ProductSort::SellingPrice => "selling_price",
            ProductSort::Stock => "stock",
            ProductSort::CreatedAt => "created_at",
        }
    }
}

/// Product listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Case-insensitive substring of name, category or SKU.
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<ProductStatus>,
    pub stock_status: Option<StockStatus>,
    pub sort: ProductSort,
    pub order: SortOrder,
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(needle) = self.search_term() {
            let hit = [product.name(), product.category(), product.sku()]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if product.category() != category {
                return false;
            }
        }
        if let Some(status) = self.status {
            if product.status() != status {
                return false;
            }
        }
        if let Some(stock_status) = self.stock_status {
            if product.stock_status() != stock_status {
                return false;
            }
        }
        true
    }

    /// Sort `products` in place the way the SQL listing orders them.
    pub fn sort(&self, products: &mut [Product]) {
        products.sort_by(|a, b| {
            let ord = match self.sort {
                ProductSort::Name => a.name().cmp(b.name()),
                ProductSort::Sku => a.sku().cmp(b.sku()),
                ProductSort::Category => a.category().cmp(b.category()),
                ProductSort::SellingPrice => a.selling_price().cmp(&b.selling_price()),
                ProductSort::Stock => a.stock().cmp(&b.stock()),
                ProductSort::CreatedAt => a.created_at().cmp(&b.created_at()),
            }
            .then_with(|| a.id_typed().cmp(&b.id_typed()));
            match self.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
    }

    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Order listing filters (shared by purchase and sales orders).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery<S> {
    pub status: Option<S>,
    /// Case-insensitive substring of the order number or counterparty name.
    pub search: Option<String>,
}

impl<S> Default for OrderQuery<S> {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
        }
    }
}

impl<S> OrderQuery<S> {
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_inputs() {
        let req = PageRequest::new(Some(0), Some(10_000), 10);
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, MAX_PER_PAGE);
        assert_eq!(PageRequest::new(None, None, 15).per_page, 15);
    }

    #[test]
    fn slice_reports_from_and_to() {
        let rows: Vec<u32> = (1..=25).collect();
        let page = PageRequest::new(Some(3), Some(10), 10).slice(&rows);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.from(), Some(21));
        assert_eq!(page.to(), Some(25));

        let empty = PageRequest::new(Some(9), Some(10), 10).slice(&rows);
        assert!(empty.items.is_empty());
        assert_eq!(empty.from(), None);
    }

    proptest::proptest! {
        #[test]
        fn slices_partition_the_rows(len in 0usize..300, per_page in 1u32..=100) {
            let rows: Vec<usize> = (0..len).collect();
            let first = PageRequest::new(Some(1), Some(per_page), 10).slice(&rows);
            let pages = first.total_pages().max(1) as u32;

            let mut seen = Vec::new();
            for page in 1..=pages {
                seen.extend(PageRequest::new(Some(page), Some(per_page), 10).slice(&rows).items);
            }
            proptest::prop_assert_eq!(seen, rows);
        }
    }
}
