use rust_decimal::Decimal;
use serde::Serialize;

use shopfront_core::domain::category::Category;
use shopfront_core::domain::product::{Discount, Product, Variant};
use shopfront_core::errors::ErrorBody;
use shopfront_core::pagination::Pagination;
use shopfront_core::pricing::effective_price;

/// A product as returned across the caller boundary: categories resolved to
/// full records (dangling references already dropped) and the effective sale
/// price annotated at full precision.
#[derive(Clone, Debug, Serialize)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub categories: Vec<Category>,
    pub price: Decimal,
    pub effective_price: Decimal,
    pub variants: Vec<Variant>,
    pub discount: Option<Discount>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ProductView {
    pub fn assemble(product: Product, categories: Vec<Category>) -> Self {
        let effective_price = effective_price(product.price, product.discount.as_ref());
        Self {
            id: product.id.0,
            name: product.name,
            description: product.description,
            categories,
            price: product.price,
            effective_price,
            variants: product.variants,
            discount: product.discount,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// One page of search or listing results plus its window metadata.
#[derive(Clone, Debug, Serialize)]
pub struct ProductPage {
    pub data: Vec<ProductView>,
    pub pagination: Pagination,
}

/// Outcome of a bulk create: independently-valid elements are created even
/// when siblings fail, and every failure is reported against its input
/// index.
#[derive(Clone, Debug, Serialize)]
pub struct BulkCreateReport {
    pub created: Vec<ProductView>,
    pub failures: Vec<BulkFailure>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BulkFailure {
    pub index: usize,
    pub error: ErrorBody,
}
